use std::{collections::HashSet, sync::Arc};

use coderef_storage::{cache::MetadataCache, registry::RepoDescriptor};

use crate::Result;

/// The de-duplicated set of repositories one search may query.
#[derive(Debug, Clone, Default)]
pub struct Scope {
	pub repos: Vec<Arc<RepoDescriptor>>,
	pub domains_searched: Vec<String>,
}
impl Scope {
	pub fn repo_ids(&self) -> Vec<String> {
		self.repos.iter().map(|repo| repo.id.clone()).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.repos.is_empty()
	}
}

/// Domains win over concepts; with neither, every mirrored repo is in scope.
pub fn resolve(cache: &MetadataCache, domains: &[String], concepts: &[String]) -> Result<Scope> {
	let domains = non_blank(domains);
	let concepts = non_blank(concepts);
	let mut candidates = Vec::new();

	if !domains.is_empty() {
		for domain in &domains {
			candidates.extend(cache.get_repos_for_domain(domain)?);
		}
	} else if !concepts.is_empty() {
		for concept in &concepts {
			candidates.extend(cache.get_repos_by_concept(concept)?);
		}
	} else {
		candidates.extend(cache.load_all()?.into_iter().filter(|repo| repo.mirrored));
	}

	let repos = dedup_by_id(candidates);
	let domains_searched = if domains.is_empty() {
		let mut seen = HashSet::new();

		repos
			.iter()
			.filter(|repo| seen.insert(repo.domain.as_str()))
			.map(|repo| repo.domain.clone())
			.collect()
	} else {
		domains.into_iter().map(str::to_string).collect()
	};

	Ok(Scope { repos, domains_searched })
}

/// Keeps the first occurrence of every id, preserving order.
pub fn dedup_by_id(repos: Vec<Arc<RepoDescriptor>>) -> Vec<Arc<RepoDescriptor>> {
	let mut seen = HashSet::new();

	repos.into_iter().filter(|repo| seen.insert(repo.id.clone())).collect()
}

fn non_blank(values: &[String]) -> Vec<&str> {
	values.iter().map(|value| value.trim()).filter(|value| !value.is_empty()).collect()
}
