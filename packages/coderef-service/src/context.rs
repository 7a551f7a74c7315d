use std::sync::{Arc, Weak};

use serde::Serialize;

use coderef_domain::chunk::Chunk;
use coderef_storage::registry::RepoDescriptor;

/// A chunk plus everything needed to cite it.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
	pub chunk: Chunk,
	/// Expanded window around the chunk, when context expansion succeeded.
	pub full_content: Option<String>,
	/// Link reported by the source that produced the chunk.
	pub source_url: Option<String>,
	/// Link built from the citation template, used when the source reported none.
	pub fallback_url: String,
	#[serde(skip)]
	pub repo: Option<Weak<RepoDescriptor>>,
}
impl Reference {
	pub fn new(chunk: Chunk, fallback_url: String) -> Self {
		Self { chunk, full_content: None, source_url: None, fallback_url, repo: None }
	}

	pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
		let url = url.into();

		if !url.trim().is_empty() {
			self.source_url = Some(url);
		}

		self
	}

	pub fn citation(&self) -> &str {
		self.source_url.as_deref().unwrap_or(&self.fallback_url)
	}

	/// Owning repo descriptor, while the engine that produced this reference is alive.
	pub fn repo(&self) -> Option<Arc<RepoDescriptor>> {
		self.repo.as_ref().and_then(Weak::upgrade)
	}

	pub fn content(&self) -> &str {
		self.full_content.as_deref().unwrap_or(&self.chunk.content)
	}

	pub fn render(&self) -> String {
		format!(
			"### {} (lines {}-{})\nSource: {}\n```{}\n{}\n```\n",
			self.chunk.file_path,
			self.chunk.start_line,
			self.chunk.end_line,
			self.citation(),
			self.chunk.language,
			self.content(),
		)
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
	pub query: String,
	pub references: Vec<Reference>,
	pub domains_searched: Vec<String>,
	/// Distinct references found before truncation to the requested cap.
	pub total_chunks_found: usize,
	/// Set when the search deadline cut a stage short.
	pub timed_out: bool,
}
impl SearchResult {
	pub fn to_prompt_context(&self) -> String {
		self.references.iter().map(Reference::render).collect::<Vec<_>>().join("\n")
	}

	pub fn citations(&self) -> Vec<&str> {
		self.references.iter().map(Reference::citation).collect()
	}
}
