use serde::Serialize;

use crate::{CodeReferenceEngine, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatistics {
	/// Unique repo ids in the registry, documented or not.
	pub total_repos: usize,
	pub mirrored_repos: usize,
	pub indexed_repos: usize,
	pub domains: usize,
	pub similarity_available: bool,
}

impl CodeReferenceEngine {
	pub fn get_statistics(&self) -> Result<EngineStatistics> {
		let registry = self.metadata().registry();
		let descriptors = self.metadata().load_all()?;

		Ok(EngineStatistics {
			total_repos: registry.repo_ids().len(),
			mirrored_repos: descriptors.iter().filter(|repo| repo.mirrored).count(),
			indexed_repos: descriptors.iter().filter(|repo| repo.indexed).count(),
			domains: registry.domains().len(),
			similarity_available: self.has_similarity_index(),
		})
	}
}
