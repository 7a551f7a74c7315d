use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
	sync::Semaphore,
	task::{JoinError, JoinSet},
	time::Instant,
};

use coderef_domain::chunk::Chunk;
use coderef_providers::hosting::CodeHit;

use crate::{
	CodeReferenceEngine, Error, Reference, Result, SearchResult, SimilarityIndex,
	scope::{self, Scope},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub domains: Vec<String>,
	#[serde(default)]
	pub concepts: Vec<String>,
	/// Result cap; defaults to `search.default_top_k`.
	pub top_k: Option<u32>,
	/// Defaults to `true`.
	pub expand_context: Option<bool>,
	/// Expansion padding; defaults to `search.context_lines`.
	pub context_lines: Option<u32>,
	/// Defaults to `search.deadline_ms`; no deadline when both are unset.
	pub deadline_ms: Option<u64>,
}
impl SearchRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), ..Self::default() }
	}
}

/// Search pipeline states. A failing stage hands over to the next one; an expired deadline jumps
/// straight to `Assemble`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	ScopeResolved,
	LayerA,
	LayerB,
	Expand,
	Assemble,
}

struct Settings {
	top_k: usize,
	expand_context: bool,
	context_lines: u32,
	deadline: Option<Instant>,
}

/// References in arrival order, unique by `(repo_id, file_path, start_line)`.
#[derive(Default)]
struct Collected {
	references: Vec<Reference>,
	seen: HashSet<(String, String, u32)>,
}
impl Collected {
	fn push(&mut self, reference: Reference) {
		let (repo_id, file_path, start_line) = reference.chunk.dedup_key();

		if self.seen.insert((repo_id.to_string(), file_path.to_string(), start_line)) {
			self.references.push(reference);
		}
	}

	fn len(&self) -> usize {
		self.references.len()
	}
}

impl CodeReferenceEngine {
	/// Runs the layered search. Only configuration problems surface as errors; every other
	/// failure shrinks the result instead.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResult> {
		let settings = self.settings(&req);
		let scope = scope::resolve(self.metadata(), &req.domains, &req.concepts)?;
		let scope_ids = scope.repo_ids();
		let mut collected = Collected::default();
		let mut timed_out = false;
		let mut stage = Stage::ScopeResolved;

		loop {
			tracing::debug!(stage = ?stage, references = collected.len(), "Search stage entered.");

			stage = match stage {
				Stage::ScopeResolved => {
					if settings.top_k == 0 || scope.is_empty() || req.query.trim().is_empty() {
						Stage::Assemble
					} else {
						Stage::LayerA
					}
				},
				Stage::LayerA => {
					if let Some(index) = self.sources().similarity.as_deref() {
						let layer = self.similarity_layer(
							index,
							&req.query,
							&scope_ids,
							settings.top_k,
							&mut collected,
						);

						timed_out = !run_until(settings.deadline, layer).await;
					}

					if timed_out {
						Stage::Assemble
					} else if collected.len() < settings.top_k {
						Stage::LayerB
					} else {
						Stage::Expand
					}
				},
				Stage::LayerB => {
					let layer =
						self.keyword_layer(&req.query, &scope, settings.top_k, &mut collected);

					timed_out = !run_until(settings.deadline, layer).await;

					if timed_out { Stage::Assemble } else { Stage::Expand }
				},
				Stage::Expand => {
					if settings.expand_context {
						timed_out = !self
							.expand(&mut collected, settings.context_lines, settings.deadline)
							.await;
					}

					Stage::Assemble
				},
				Stage::Assemble => break,
			};
		}

		if timed_out {
			tracing::warn!(
				query = %req.query,
				references = collected.len(),
				"Search deadline reached; returning partial result."
			);
		}

		let result =
			self.assemble(req.query, scope.domains_searched, collected, &settings, timed_out)?;

		tracing::info!(
			references = result.references.len(),
			total_chunks_found = result.total_chunks_found,
			timed_out = result.timed_out,
			"Search completed."
		);

		Ok(result)
	}

	fn settings(&self, req: &SearchRequest) -> Settings {
		let search_cfg = &self.cfg.search;
		let deadline_ms = req.deadline_ms.or(search_cfg.deadline_ms);

		Settings {
			top_k: req.top_k.unwrap_or(search_cfg.default_top_k) as usize,
			expand_context: req.expand_context.unwrap_or(true),
			context_lines: req.context_lines.unwrap_or(search_cfg.context_lines),
			deadline: deadline_ms.map(|ms| Instant::now() + Duration::from_millis(ms)),
		}
	}

	async fn similarity_layer(
		&self,
		index: &dyn SimilarityIndex,
		query: &str,
		scope_ids: &[String],
		top_k: usize,
		collected: &mut Collected,
	) {
		let limit = u32::try_from(top_k).unwrap_or(u32::MAX);

		match index.search(query, scope_ids, limit).await {
			Ok(chunks) =>
				for chunk in chunks.into_iter().take(top_k) {
					collected.push(self.reference(chunk));
				},
			Err(err) => {
				tracing::warn!(error = %err, "Similarity layer failed; continuing without it.");
			},
		}
	}

	/// Queries scoped repos one at a time, in scope order, until the cap is reached.
	async fn keyword_layer(
		&self,
		query: &str,
		scope: &Scope,
		top_k: usize,
		collected: &mut Collected,
	) {
		let search_cfg = &self.cfg.search;

		for repo in scope.repos.iter().take(search_cfg.keyword_repo_limit as usize) {
			let remaining = top_k.saturating_sub(collected.len());

			if remaining == 0 {
				break;
			}

			let limit = u32::try_from(remaining)
				.unwrap_or(u32::MAX)
				.min(search_cfg.keyword_per_repo_limit);
			let prefix = repo.target_path.trim_matches('/');
			let prefix = (!prefix.is_empty()).then_some(prefix);

			match self.sources().code.search_code(query, prefix, limit).await {
				Ok(hits) =>
					for hit in hits.into_iter().take(limit as usize) {
						if let Some(reference) = self.keyword_reference(&repo.id, hit) {
							collected.push(reference);
						}
					},
				Err(err) => {
					tracing::warn!(
						error = %err,
						repo_id = %repo.id,
						"Keyword search failed for repo; skipping it."
					);
				},
			}
		}
	}

	/// Keyword hits carry no line information, so they span a fixed first window of the file and
	/// cite the hit's own link.
	fn keyword_reference(&self, repo_id: &str, hit: CodeHit) -> Option<Reference> {
		let short_sha = hit.sha.get(..8).unwrap_or(&hit.sha);
		let chunk = match Chunk::new(format!("github:{short_sha}"), repo_id, hit.path, 1, 100) {
			Ok(chunk) => chunk.with_score(hit.score),
			Err(reject) => {
				tracing::warn!(
					repo_id,
					reason = %reject,
					"Dropping keyword hit with invalid path."
				);

				return None;
			},
		};

		Some(self.reference(chunk).with_source_url(hit.html_url))
	}

	fn reference(&self, chunk: Chunk) -> Reference {
		let fallback_url = self.sources().code.citations().html_url(
			&chunk.file_path,
			Some(chunk.start_line),
			Some(chunk.end_line),
		);

		Reference::new(chunk, fallback_url)
	}

	/// Fetches padded windows for references without full content, at most
	/// `search.expand_concurrency` at a time. Returns `false` when the deadline cut it short.
	/// Fetches finished by then are kept; unfinished ones are aborted and their references keep
	/// their original content. Dropping the returned future aborts every fetch.
	async fn expand(
		&self,
		collected: &mut Collected,
		padding: u32,
		deadline: Option<Instant>,
	) -> bool {
		let permits = Arc::new(Semaphore::new(self.cfg.search.expand_concurrency.max(1) as usize));
		let mut tasks = JoinSet::new();

		for (index, reference) in collected.references.iter().enumerate() {
			if reference.full_content.is_some() {
				continue;
			}

			let source = self.sources().code.clone();
			let permits = permits.clone();
			let path = reference.chunk.file_path.clone();
			let (start_line, end_line) = (reference.chunk.start_line, reference.chunk.end_line);

			tasks.spawn(async move {
				let fetched = match permits.acquire_owned().await {
					Ok(_permit) =>
						source.get_file_lines(&path, start_line, end_line, padding).await,
					Err(err) => Err(Error::Provider { message: err.to_string() }),
				};

				(index, fetched)
			});
		}

		loop {
			let joined = match deadline {
				Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
					Ok(joined) => joined,
					Err(_) => {
						while let Some(done) = tasks.try_join_next() {
							apply_expansion(collected, done);
						}

						tasks.abort_all();

						return false;
					},
				},
				None => tasks.join_next().await,
			};
			let Some(done) = joined else {
				return true;
			};

			apply_expansion(collected, done);
		}
	}

	fn assemble(
		&self,
		query: String,
		domains_searched: Vec<String>,
		collected: Collected,
		settings: &Settings,
		timed_out: bool,
	) -> Result<SearchResult> {
		let total_chunks_found = collected.len();
		let mut references = collected.references;

		references.truncate(settings.top_k);

		for reference in &mut references {
			if let Some(descriptor) = self.metadata().get_or_load(&reference.chunk.repo_id)? {
				reference.repo = Some(Arc::downgrade(&descriptor));
			}
		}

		Ok(SearchResult { query, references, domains_searched, total_chunks_found, timed_out })
	}
}

fn apply_expansion(
	collected: &mut Collected,
	done: std::result::Result<(usize, Result<Option<String>>), JoinError>,
) {
	let (index, fetched) = match done {
		Ok(done) => done,
		Err(err) => {
			tracing::warn!(
				error = %err,
				"Context expansion task failed; keeping original content."
			);

			return;
		},
	};
	let Some(reference) = collected.references.get_mut(index) else {
		return;
	};

	match fetched {
		Ok(Some(content)) if !content.is_empty() => {
			reference.full_content = Some(content);
		},
		Ok(_) => {
			tracing::debug!(
				path = %reference.chunk.file_path,
				"Context expansion found no content."
			);
		},
		Err(err) => {
			tracing::warn!(
				error = %err,
				path = %reference.chunk.file_path,
				"Context expansion failed; keeping original content."
			);
		},
	}
}

/// Drives `work` to completion or until `deadline`. Returns `false` on expiry; whatever `work`
/// recorded before expiry is kept.
async fn run_until<F>(deadline: Option<Instant>, work: F) -> bool
where
	F: Future<Output = ()>,
{
	match deadline {
		Some(deadline) => tokio::time::timeout_at(deadline, work).await.is_ok(),
		None => {
			work.await;

			true
		},
	}
}
