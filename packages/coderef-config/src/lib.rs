mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Hosting, RateLimit, Registry, Search, Service, Similarity,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.registry.path.as_os_str().is_empty() {
		return Err(Error::Validation { message: "registry.path must be non-empty.".to_string() });
	}

	let repo_parts = cfg.hosting.repo.split('/').collect::<Vec<_>>();

	if repo_parts.len() != 2 || repo_parts.iter().any(|part| part.trim().is_empty()) {
		return Err(Error::Validation {
			message: "hosting.repo must be of the form owner/name.".to_string(),
		});
	}
	if cfg.hosting.default_ref.trim().is_empty() {
		return Err(Error::Validation {
			message: "hosting.default_ref must be non-empty.".to_string(),
		});
	}
	if cfg.hosting.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "hosting.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.hosting.rate_limit.max_wait_secs == 0 {
		return Err(Error::Validation {
			message: "hosting.rate_limit.max_wait_secs must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &cfg.hosting.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("hosting.default_headers.{key} must be a string."),
			});
		}
	}

	if cfg.search.keyword_per_repo_limit == 0 {
		return Err(Error::Validation {
			message: "search.keyword_per_repo_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.expand_concurrency == 0 {
		return Err(Error::Validation {
			message: "search.expand_concurrency must be greater than zero.".to_string(),
		});
	}

	if let Some(deadline_ms) = cfg.search.deadline_ms
		&& deadline_ms == 0
	{
		return Err(Error::Validation {
			message: "search.deadline_ms must be greater than zero.".to_string(),
		});
	}

	if let Some(similarity) = cfg.similarity.as_ref() {
		if similarity.url.trim().is_empty() {
			return Err(Error::Validation {
				message: "similarity.url must be non-empty.".to_string(),
			});
		}
		if similarity.collection.trim().is_empty() {
			return Err(Error::Validation {
				message: "similarity.collection must be non-empty.".to_string(),
			});
		}
		if similarity.vector_dim == 0 {
			return Err(Error::Validation {
				message: "similarity.vector_dim must be greater than zero.".to_string(),
			});
		}
		if similarity.embedding.dimensions != similarity.vector_dim {
			return Err(Error::Validation {
				message: "similarity.embedding.dimensions must match similarity.vector_dim."
					.to_string(),
			});
		}
		if similarity.embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "similarity.embedding.api_key must be non-empty.".to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.hosting.token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false) {
		cfg.hosting.token = None;
	}

	cfg.hosting.api_base = cfg.hosting.api_base.trim_end_matches('/').to_string();
	cfg.hosting.html_base = cfg.hosting.html_base.trim_end_matches('/').to_string();
	cfg.hosting.raw_base = cfg.hosting.raw_base.trim_end_matches('/').to_string();

	if let Some(similarity) = cfg.similarity.as_mut()
		&& similarity.vector_name.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false)
	{
		similarity.vector_name = None;
	}
}
