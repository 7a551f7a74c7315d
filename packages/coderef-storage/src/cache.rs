use std::{
	collections::HashMap,
	fs, io,
	sync::{
		Arc, RwLock,
		atomic::{AtomicU64, Ordering},
	},
};

use crate::{
	Error, Result,
	registry::{Registry, RepoDescriptor},
};

/// Lazily loads repo descriptors and memoizes them for the lifetime of the engine.
///
/// Concurrent first loads of the same repo may each read the file; the first stored value wins and
/// later loads reuse it.
#[derive(Debug)]
pub struct MetadataCache {
	registry: Registry,
	entries: RwLock<HashMap<String, Arc<RepoDescriptor>>>,
	loads: AtomicU64,
}
impl MetadataCache {
	pub fn new(registry: Registry) -> Self {
		Self { registry, entries: RwLock::new(HashMap::new()), loads: AtomicU64::new(0) }
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	/// Descriptor for `repo_id`, or `None` when the repo is unknown or its descriptor file is
	/// missing. A descriptor that exists but cannot be parsed is an error.
	pub fn get_or_load(&self, repo_id: &str) -> Result<Option<Arc<RepoDescriptor>>> {
		if let Some(found) = self.entries.read().unwrap_or_else(|err| err.into_inner()).get(repo_id)
		{
			return Ok(Some(found.clone()));
		}

		let Some(stub) = self.registry.stub(repo_id) else {
			return Ok(None);
		};
		let path = self.registry.descriptor_path(stub);

		self.loads.fetch_add(1, Ordering::Relaxed);

		let raw = match fs::read_to_string(&path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				tracing::debug!(repo_id, path = %path.display(), "Repo descriptor missing.");

				return Ok(None);
			},
			Err(err) => return Err(Error::ReadFile { path, source: err }),
		};
		let descriptor: RepoDescriptor = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseFile { path: path.clone(), source: err })?;

		if descriptor.id != repo_id {
			return Err(Error::InvalidRegistry(format!(
				"descriptor id does not match registry; repo_id={repo_id} descriptor_id={} path={}",
				descriptor.id,
				path.display()
			)));
		}

		let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
		let stored = entries.entry(repo_id.to_string()).or_insert_with(|| Arc::new(descriptor));

		Ok(Some(stored.clone()))
	}

	/// Loads every registered descriptor; repos without a descriptor file are skipped.
	pub fn load_all(&self) -> Result<Vec<Arc<RepoDescriptor>>> {
		let mut out = Vec::with_capacity(self.registry.repo_ids().len());

		for repo_id in self.registry.repo_ids() {
			if let Some(descriptor) = self.get_or_load(repo_id)? {
				out.push(descriptor);
			}
		}

		Ok(out)
	}

	/// Repos of the domain whose id equals `domain_id`, ignoring ASCII case. Unlike the concept and
	/// pattern filters this is not a substring match: `backend` does not select `backend-cqrs`.
	pub fn get_repos_for_domain(&self, domain_id: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		let mut out: Vec<Arc<RepoDescriptor>> = Vec::new();

		for stub in self.registry.domain_repos(domain_id) {
			if out.iter().any(|descriptor| descriptor.id == stub.id) {
				continue;
			}
			if let Some(descriptor) = self.get_or_load(&stub.id)? {
				out.push(descriptor);
			}
		}

		Ok(out)
	}

	pub fn get_repos_by_concept(&self, concept: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		Ok(self.load_all()?.into_iter().filter(|repo| repo.has_concept(concept)).collect())
	}

	pub fn get_repos_by_pattern(&self, pattern: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		Ok(self.load_all()?.into_iter().filter(|repo| repo.has_pattern(pattern)).collect())
	}

	/// Number of descriptor file reads performed so far.
	pub fn load_count(&self) -> u64 {
		self.loads.load(Ordering::Relaxed)
	}

	pub fn cached_len(&self) -> usize {
		self.entries.read().unwrap_or_else(|err| err.into_inner()).len()
	}
}
