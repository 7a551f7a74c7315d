use std::sync::Arc;

use coderef_config::{EmbeddingProviderConfig, Similarity};
use coderef_domain::chunk::Chunk;
use coderef_storage::qdrant::{ChunkPoint, QdrantStore};

use crate::{BoxFuture, EmbeddingProvider, Error, Result, SimilarityIndex};

/// Similarity index backed by a Qdrant collection of embedded code chunks.
pub struct QdrantSimilarity {
	store: QdrantStore,
	embedding: EmbeddingProviderConfig,
	embedder: Arc<dyn EmbeddingProvider>,
}
impl QdrantSimilarity {
	pub fn new(cfg: &Similarity, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
		Ok(Self { store: QdrantStore::new(cfg)?, embedding: cfg.embedding.clone(), embedder })
	}

	async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let vector = self.embedder.embed_query(&self.embedding, query).await?;

		if vector.len() != self.store.vector_dim as usize {
			return Err(Error::Similarity {
				message: format!(
					"Embedding dimension mismatch; expected={} got={}",
					self.store.vector_dim,
					vector.len()
				),
			});
		}

		Ok(vector)
	}

	async fn search_inner(
		&self,
		query: &str,
		repo_ids: &[String],
		limit: u32,
	) -> Result<Vec<Chunk>> {
		if limit == 0 {
			return Ok(Vec::new());
		}

		let vector = self.embed_query(query).await?;
		let points = self.store.search_chunks(vector, repo_ids, u64::from(limit)).await?;

		Ok(points.into_iter().filter_map(into_chunk).collect())
	}
}

impl SimilarityIndex for QdrantSimilarity {
	fn search<'a>(
		&'a self,
		query: &'a str,
		repo_ids: &'a [String],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Chunk>>> {
		Box::pin(self.search_inner(query, repo_ids, limit))
	}
}

/// Converts a stored point, dropping points whose location violates chunk invariants.
pub fn into_chunk(point: ChunkPoint) -> Option<Chunk> {
	let ChunkPoint { chunk_id, repo_id, file_path, start_line, end_line, .. } = point;

	match Chunk::new(chunk_id, repo_id, file_path, start_line, end_line) {
		Ok(chunk) => {
			let chunk = chunk.with_content(point.content).with_score(point.score);

			Some(match point.language {
				Some(language) => chunk.with_language(language),
				None => chunk,
			})
		},
		Err(reject) => {
			tracing::warn!(reason = %reject, "Dropping similarity chunk with invalid location.");

			None
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn point(file_path: &str, start_line: u32, end_line: u32) -> ChunkPoint {
		ChunkPoint {
			chunk_id: "c1".to_string(),
			repo_id: "eventuate".to_string(),
			file_path: file_path.to_string(),
			start_line,
			end_line,
			content: "class OrderSaga {}".to_string(),
			language: None,
			domain: None,
			score: 0.7,
		}
	}

	#[test]
	fn valid_point_becomes_chunk() {
		let chunk = into_chunk(point("saga/OrderSaga.java", 3, 9)).expect("chunk must build");

		assert_eq!(chunk.language, "java");
		assert_eq!(chunk.content, "class OrderSaga {}");
		assert_eq!(chunk.score, 0.7);
	}

	#[test]
	fn reported_language_overrides_extension() {
		let mut stored = point("saga/OrderSaga.java", 3, 9);

		stored.language = Some("kotlin".to_string());

		assert_eq!(into_chunk(stored).expect("chunk must build").language, "kotlin");
	}

	#[test]
	fn invalid_points_are_dropped() {
		assert!(into_chunk(point("", 1, 2)).is_none());
		assert!(into_chunk(point("a.py", 5, 2)).is_none());
	}
}
