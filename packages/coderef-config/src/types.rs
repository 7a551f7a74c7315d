use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub registry: Registry,
	#[serde(default)]
	pub hosting: Hosting,
	/// Optional. When absent the similarity layer is skipped entirely.
	pub similarity: Option<Similarity>,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registry {
	pub path: PathBuf,
	/// Optional. Descriptor `metadata_path` values resolve against this directory.
	pub data_root: Option<PathBuf>,
}
impl Registry {
	/// The registry is expected at `<root>/repos/repo_registry.json`, so the fallback root is the
	/// registry file's grandparent.
	pub fn resolved_data_root(&self) -> PathBuf {
		if let Some(root) = self.data_root.as_ref() {
			return root.clone();
		}

		self.path
			.parent()
			.and_then(Path::parent)
			.map(Path::to_path_buf)
			.unwrap_or_else(|| PathBuf::from("."))
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Hosting {
	pub api_base: String,
	pub html_base: String,
	pub raw_base: String,
	pub repo: String,
	pub default_ref: String,
	/// Optional. Falls back to `GITHUB_TOKEN` when unset.
	pub token: Option<String>,
	pub timeout_ms: u64,
	pub user_agent: String,
	pub default_headers: Map<String, Value>,
	pub rate_limit: RateLimit,
}
impl Default for Hosting {
	fn default() -> Self {
		Self {
			api_base: "https://api.github.com".to_string(),
			html_base: "https://github.com".to_string(),
			raw_base: "https://raw.githubusercontent.com".to_string(),
			repo: "kevin-toles/code-reference-engine".to_string(),
			default_ref: "main".to_string(),
			token: None,
			timeout_ms: 30_000,
			user_agent: concat!("coderef/", env!("CARGO_PKG_VERSION")).to_string(),
			default_headers: Map::new(),
			rate_limit: RateLimit::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimit {
	pub safety_threshold: u64,
	pub max_wait_secs: u64,
}
impl Default for RateLimit {
	fn default() -> Self {
		Self { safety_threshold: 100, max_wait_secs: 60 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Similarity {
	pub url: String,
	#[serde(default = "default_collection")]
	pub collection: String,
	#[serde(default = "default_vector_dim")]
	pub vector_dim: u32,
	pub vector_name: Option<String>,
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_top_k: u32,
	pub context_lines: u32,
	pub keyword_repo_limit: u32,
	pub keyword_per_repo_limit: u32,
	pub expand_concurrency: u32,
	pub deadline_ms: Option<u64>,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_top_k: 10,
			context_lines: 20,
			keyword_repo_limit: 10,
			keyword_per_repo_limit: 5,
			expand_concurrency: 4,
			deadline_ms: None,
		}
	}
}

fn default_collection() -> String {
	"code_chunks".to_string()
}

fn default_vector_dim() -> u32 {
	384
}
