use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
	#[serde(default)]
	pub domains: Vec<DomainEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub repos: Vec<RepoStub>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStub {
	pub id: String,
	pub metadata_path: PathBuf,
	#[serde(default = "default_priority")]
	pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDescriptor {
	pub id: String,
	pub name: String,
	pub source_url: String,
	pub target_path: String,
	pub domain: String,
	pub tier: RepoTier,
	#[serde(default = "default_priority")]
	pub priority: i64,
	#[serde(default)]
	pub owner: String,
	#[serde(default = "default_license")]
	pub license: String,
	#[serde(default)]
	pub languages: Vec<String>,
	#[serde(default)]
	pub concepts: Vec<String>,
	#[serde(default)]
	pub patterns: Vec<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub why_include: String,
	#[serde(default)]
	pub mirrored: bool,
	#[serde(default)]
	pub indexed: bool,
}
impl RepoDescriptor {
	pub fn has_concept(&self, needle: &str) -> bool {
		contains_ci(&self.concepts, needle)
	}

	pub fn has_pattern(&self, needle: &str) -> bool {
		contains_ci(&self.patterns, needle)
	}
}

/// Descriptor tiers are written either as integers or as labels such as `"T2"` or `"tier-2"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoTier {
	Level(i64),
	Label(String),
}
impl RepoTier {
	pub fn level(&self) -> Option<i64> {
		match self {
			Self::Level(level) => Some(*level),
			Self::Label(label) => {
				let lower = label.trim().to_ascii_lowercase();
				let digits = lower
					.strip_prefix("tier")
					.or_else(|| lower.strip_prefix('t'))
					.unwrap_or(&lower)
					.trim_start_matches(['-', '_', ' ']);

				digits.parse().ok()
			},
		}
	}
}

impl std::fmt::Display for RepoTier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Level(level) => write!(f, "{level}"),
			Self::Label(label) => f.write_str(label),
		}
	}
}

/// The parsed registry: domains in document order plus an id index over every repo stub.
#[derive(Debug, Clone)]
pub struct Registry {
	path: PathBuf,
	data_root: PathBuf,
	document: RegistryDocument,
	stubs: HashMap<String, RepoStub>,
	order: Vec<String>,
}
impl Registry {
	pub fn load(cfg: &coderef_config::Registry) -> Result<Self> {
		let raw = fs::read_to_string(&cfg.path)
			.map_err(|err| Error::ReadFile { path: cfg.path.clone(), source: err })?;
		let document: RegistryDocument = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseFile { path: cfg.path.clone(), source: err })?;
		let registry = Self::from_document(document, cfg.resolved_data_root())?;

		tracing::info!(
			path = %cfg.path.display(),
			domains = registry.document.domains.len(),
			repos = registry.order.len(),
			"Registry loaded."
		);

		Ok(Self { path: cfg.path.clone(), ..registry })
	}

	pub fn from_document(document: RegistryDocument, data_root: PathBuf) -> Result<Self> {
		let mut stubs: HashMap<String, RepoStub> = HashMap::new();
		let mut order = Vec::new();

		for domain in &document.domains {
			if domain.id.trim().is_empty() {
				return Err(Error::InvalidRegistry("domain id must be non-empty".to_string()));
			}

			for stub in &domain.repos {
				if stub.id.trim().is_empty() {
					return Err(Error::InvalidRegistry(format!(
						"repo id must be non-empty; domain={}",
						domain.id
					)));
				}

				match stubs.get(&stub.id) {
					Some(existing) if existing.metadata_path != stub.metadata_path => {
						return Err(Error::InvalidRegistry(format!(
							"repo listed with conflicting metadata paths; repo_id={}",
							stub.id
						)));
					},
					Some(_) => {},
					None => {
						stubs.insert(stub.id.clone(), stub.clone());
						order.push(stub.id.clone());
					},
				}
			}
		}

		Ok(Self { path: PathBuf::new(), data_root, document, stubs, order })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn domains(&self) -> &[DomainEntry] {
		&self.document.domains
	}

	pub fn domain(&self, domain_id: &str) -> Option<&DomainEntry> {
		self.document.domains.iter().find(|domain| domain.id.eq_ignore_ascii_case(domain_id))
	}

	/// Repo stubs of every domain entry whose id matches, case-insensitively.
	pub fn domain_repos<'a>(&'a self, domain_id: &'a str) -> impl Iterator<Item = &'a RepoStub> {
		self.document
			.domains
			.iter()
			.filter(move |domain| domain.id.eq_ignore_ascii_case(domain_id))
			.flat_map(|domain| domain.repos.iter())
	}

	/// Unique repo ids in first-seen document order.
	pub fn repo_ids(&self) -> &[String] {
		&self.order
	}

	pub fn stub(&self, repo_id: &str) -> Option<&RepoStub> {
		self.stubs.get(repo_id)
	}

	pub fn descriptor_path(&self, stub: &RepoStub) -> PathBuf {
		self.data_root.join(&stub.metadata_path)
	}
}

fn contains_ci(values: &[String], needle: &str) -> bool {
	let needle = needle.to_lowercase();

	values.iter().any(|value| value.to_lowercase().contains(&needle))
}

fn default_priority() -> i64 {
	5
}

fn default_license() -> String {
	"Unknown".to_string()
}
