mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use serde_json::{Value, json};

pub const REGISTRY_RELATIVE_PATH: &str = "repos/repo_registry.json";
pub const METADATA_DIR: &str = "repos/metadata";

/// A throwaway data root laid out like a mirrored reference tree:
/// `<root>/repos/repo_registry.json` plus one descriptor per repo under `<root>/repos/metadata/`.
pub struct FixtureRoot {
	root: PathBuf,
	cleaned: bool,
}
impl FixtureRoot {
	pub fn new(prefix: &str) -> Result<Self> {
		static COUNTER: AtomicU64 = AtomicU64::new(0);

		let nanos = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_err(|err| Error::Message(format!("System time is before the epoch: {err}.")))?
			.as_nanos();
		let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
		let root =
			env::temp_dir().join(format!("{prefix}_{nanos}_{}_{ordinal}", std::process::id()));

		fs::create_dir_all(root.join(METADATA_DIR))?;

		Ok(Self { root, cleaned: false })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn registry_path(&self) -> PathBuf {
		self.root.join(REGISTRY_RELATIVE_PATH)
	}

	/// Registry config pointing at this fixture, relying on the grandparent data-root default.
	pub fn registry_config(&self) -> coderef_config::Registry {
		coderef_config::Registry { path: self.registry_path(), data_root: None }
	}

	/// Writes a registry whose domains list the given repo ids, each pointing at
	/// `repos/metadata/<id>.json`.
	pub fn write_registry(&self, domains: &[(&str, &[&str])]) -> Result<PathBuf> {
		let domains = domains
			.iter()
			.map(|(domain_id, repo_ids)| {
				json!({
					"id": domain_id,
					"name": domain_id,
					"repos": repo_ids
						.iter()
						.map(|repo_id| json!({
							"id": repo_id,
							"metadata_path": format!("{METADATA_DIR}/{repo_id}.json"),
							"priority": 5,
						}))
						.collect::<Vec<_>>(),
				})
			})
			.collect::<Vec<_>>();

		self.write_json(REGISTRY_RELATIVE_PATH, &json!({ "version": "1.0", "domains": domains }))
	}

	/// Writes a descriptor to `repos/metadata/<id>.json`, keyed by its own `id` field.
	pub fn write_descriptor(&self, descriptor: &Value) -> Result<PathBuf> {
		let id = descriptor
			.get("id")
			.and_then(Value::as_str)
			.ok_or_else(|| Error::Message("Descriptor fixture needs a string id.".to_string()))?;

		self.write_json(&format!("{METADATA_DIR}/{id}.json"), descriptor)
	}

	pub fn write_json(&self, relative: &str, value: &Value) -> Result<PathBuf> {
		self.write_raw(relative, &serde_json::to_string_pretty(value)?)
	}

	pub fn write_raw(&self, relative: &str, contents: &str) -> Result<PathBuf> {
		let path = self.root.join(relative);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		fs::write(&path, contents)?;

		Ok(path)
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		fs::remove_dir_all(&self.root)?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for FixtureRoot {
	fn drop(&mut self) {
		if let Err(err) = self.cleanup_inner() {
			eprintln!("Fixture cleanup failed: {err}.");
		}
	}
}

/// A mirrored descriptor with every optional field filled in.
pub fn descriptor(id: &str, domain: &str) -> Value {
	json!({
		"id": id,
		"name": id,
		"source_url": format!("https://github.com/example/{id}"),
		"target_path": format!("{domain}/{id}"),
		"domain": domain,
		"tier": 2,
		"priority": 5,
		"owner": "example",
		"license": "MIT",
		"languages": ["python"],
		"concepts": [],
		"patterns": [],
		"tags": [],
		"description": "",
		"why_include": "",
		"mirrored": true,
		"indexed": false,
	})
}

/// Same as [`descriptor`] with the given concepts and patterns.
pub fn descriptor_with(id: &str, domain: &str, concepts: &[&str], patterns: &[&str]) -> Value {
	let mut value = descriptor(id, domain);

	value["concepts"] = json!(concepts);
	value["patterns"] = json!(patterns);

	value
}
