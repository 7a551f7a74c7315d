pub mod context;
pub mod scope;
pub mod search;
pub mod similarity;
pub mod stats;

mod error;

pub use context::{Reference, SearchResult};
pub use error::{Error, Result};
pub use search::{SearchRequest, Stage};
pub use stats::EngineStatistics;

use std::{future::Future, pin::Pin, sync::Arc};

use coderef_config::{Config, EmbeddingProviderConfig};
use coderef_domain::chunk::Chunk;
use coderef_providers::{
	citation::CitationTemplate,
	embedding,
	hosting::{CodeHit, DirEntry, HostSession, HostedFile},
};
use coderef_storage::{
	cache::MetadataCache,
	registry::{DomainEntry, Registry, RepoDescriptor},
};
use similarity::QdrantSimilarity;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed_query<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Pre-indexed semantic search over code chunks.
pub trait SimilarityIndex
where
	Self: Send + Sync,
{
	/// Up to `limit` chunks nearest to `query`, restricted to `repo_ids`, best first.
	fn search<'a>(
		&'a self,
		query: &'a str,
		repo_ids: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Chunk>>>;
}

/// On-demand access to the hosted mirror of every catalogued repository.
pub trait CodeSource
where
	Self: Send + Sync,
{
	fn search_code<'a>(
		&'a self,
		query: &'a str,
		path_prefix: Option<&'a str>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CodeHit>>>;

	fn get_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<HostedFile>>>;

	fn get_file_lines<'a>(
		&'a self,
		path: &'a str,
		start_line: u32,
		end_line: u32,
		padding: u32,
	) -> BoxFuture<'a, Result<Option<String>>>;

	fn list_directory<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Vec<DirEntry>>;

	fn citations(&self) -> &CitationTemplate;
}

#[derive(Clone)]
pub struct Sources {
	pub code: Arc<dyn CodeSource>,
	/// `None` when no similarity index is configured; the similarity layer is then skipped.
	pub similarity: Option<Arc<dyn SimilarityIndex>>,
}

/// A file fetched together with the link that cites it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CitedFile {
	pub content: String,
	pub citation: String,
}

pub struct CodeReferenceEngine {
	pub cfg: Config,
	metadata: MetadataCache,
	sources: Sources,
}
impl CodeReferenceEngine {
	/// Loads the registry and opens the hosting session plus, when configured, the similarity
	/// index. Registry problems fail here; descriptor problems fail on first access.
	pub fn open(cfg: Config) -> Result<Self> {
		let registry = Registry::load(&cfg.registry)?;
		let session = HostSession::open(&cfg.hosting)?;
		let similarity = match cfg.similarity.as_ref() {
			Some(similarity_cfg) =>
				match QdrantSimilarity::new(similarity_cfg, Arc::new(DefaultProviders)) {
					Ok(index) => Some(Arc::new(index) as Arc<dyn SimilarityIndex>),
					Err(err) => {
						tracing::warn!(
							error = %err,
							url = %similarity_cfg.url,
							"Similarity index unavailable; continuing without it."
						);

						None
					},
				},
			None => None,
		};

		Ok(Self::from_parts(
			cfg,
			MetadataCache::new(registry),
			Sources { code: Arc::new(session), similarity },
		))
	}

	pub fn with_sources(cfg: Config, sources: Sources) -> Result<Self> {
		let registry = Registry::load(&cfg.registry)?;

		Ok(Self::from_parts(cfg, MetadataCache::new(registry), sources))
	}

	pub fn from_parts(cfg: Config, metadata: MetadataCache, sources: Sources) -> Self {
		Self { cfg, metadata, sources }
	}

	/// Releases the hosting session and similarity client. Dropping the engine has the same
	/// effect.
	pub fn close(self) {
		tracing::debug!(cached_descriptors = self.metadata.cached_len(), "Engine closed.");
	}

	pub fn metadata(&self) -> &MetadataCache {
		&self.metadata
	}

	pub fn has_similarity_index(&self) -> bool {
		self.sources.similarity.is_some()
	}

	pub fn get_metadata(&self, repo_id: &str) -> Result<Option<Arc<RepoDescriptor>>> {
		Ok(self.metadata.get_or_load(repo_id)?)
	}

	pub fn get_repos_for_domain(&self, domain_id: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		Ok(self.metadata.get_repos_for_domain(domain_id)?)
	}

	pub fn get_repos_by_concept(&self, concept: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		Ok(self.metadata.get_repos_by_concept(concept)?)
	}

	pub fn get_repos_by_pattern(&self, pattern: &str) -> Result<Vec<Arc<RepoDescriptor>>> {
		Ok(self.metadata.get_repos_by_pattern(pattern)?)
	}

	pub fn get_all_domains(&self) -> &[DomainEntry] {
		self.metadata.registry().domains()
	}

	pub async fn get_file(&self, path: &str) -> Result<Option<String>> {
		Ok(self.get_file_with_citation(path).await?.map(|file| file.content))
	}

	pub async fn get_file_with_citation(&self, path: &str) -> Result<Option<CitedFile>> {
		let path = path.trim();

		if path.is_empty() {
			return Err(Error::InvalidRequest { message: "path must be non-empty.".to_string() });
		}

		let Some(file) = self.sources.code.get_file(path).await? else {
			return Ok(None);
		};
		let citation = if file.html_url.is_empty() {
			self.sources.code.citations().html_url(&file.path, None, None)
		} else {
			file.html_url
		};

		Ok(Some(CitedFile { content: file.content, citation }))
	}

	pub async fn list_directory(&self, path: &str) -> Vec<DirEntry> {
		self.sources.code.list_directory(path.trim()).await
	}

	pub(crate) fn sources(&self) -> &Sources {
		&self.sources
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed_query<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		query: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(embedding::embed_query(cfg, query).await?) })
	}
}

impl CodeSource for HostSession {
	fn search_code<'a>(
		&'a self,
		query: &'a str,
		path_prefix: Option<&'a str>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CodeHit>>> {
		Box::pin(async move { Ok(self.try_search_code(query, path_prefix, None, limit).await?) })
	}

	fn get_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<HostedFile>>> {
		Box::pin(async move { Ok(HostSession::get_file(self, path, None).await?) })
	}

	fn get_file_lines<'a>(
		&'a self,
		path: &'a str,
		start_line: u32,
		end_line: u32,
		padding: u32,
	) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			Ok(HostSession::get_file_lines(self, path, start_line, end_line, None, padding).await?)
		})
	}

	fn list_directory<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Vec<DirEntry>> {
		Box::pin(HostSession::list_directory(self, path, None))
	}

	fn citations(&self) -> &CitationTemplate {
		HostSession::citations(self)
	}
}
