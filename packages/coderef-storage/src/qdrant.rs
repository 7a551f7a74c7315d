use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};

use crate::Result;

/// One indexed code chunk as stored in the similarity collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPoint {
	pub chunk_id: String,
	pub repo_id: String,
	pub file_path: String,
	pub start_line: u32,
	pub end_line: u32,
	pub content: String,
	pub language: Option<String>,
	pub domain: Option<String>,
	pub score: f32,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	pub vector_name: Option<String>,
}
impl QdrantStore {
	pub fn new(cfg: &coderef_config::Similarity) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			vector_name: cfg.vector_name.clone(),
		})
	}

	/// Nearest chunks to `vector`, restricted to `repo_ids` when it is non-empty.
	pub async fn search_chunks(
		&self,
		vector: Vec<f32>,
		repo_ids: &[String],
		limit: u64,
	) -> Result<Vec<ChunkPoint>> {
		if limit == 0 {
			return Ok(Vec::new());
		}

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(limit);

		if let Some(filter) = scope_filter(repo_ids) {
			search = search.filter(filter);
		}
		if let Some(name) = self.vector_name.as_deref() {
			search = search.using(name);
		}

		let response = self.client.query(search).await?;
		let points = response.result.iter().filter_map(chunk_point).collect::<Vec<_>>();

		if points.len() < response.result.len() {
			tracing::warn!(
				collection = %self.collection,
				dropped = response.result.len() - points.len(),
				"Similarity points missing required payload fields."
			);
		}

		Ok(points)
	}
}

pub fn scope_filter(repo_ids: &[String]) -> Option<Filter> {
	if repo_ids.is_empty() {
		return None;
	}

	Some(Filter::must([Condition::matches("repo_id", repo_ids.to_vec())]))
}

/// Maps a scored point to a chunk point; points without a repo id or file path are skipped.
///
/// Line spans are reported as stored, so callers still see inverted spans.
pub fn chunk_point(point: &ScoredPoint) -> Option<ChunkPoint> {
	let payload = &point.payload;
	let repo_id = payload_string(payload, "repo_id")?;
	let file_path = payload_string(payload, "file_path")?;
	let start_line = payload_u32(payload, "start_line").unwrap_or(1);
	let end_line = payload_u32(payload, "end_line").unwrap_or(start_line);
	let chunk_id = payload_string(payload, "chunk_id")
		.unwrap_or_else(|| format!("{repo_id}:{file_path}:{start_line}"));

	Some(ChunkPoint {
		chunk_id,
		repo_id,
		file_path,
		start_line,
		end_line,
		content: payload_string(payload, "content").unwrap_or_default(),
		language: payload_string(payload, "language").filter(|value| !value.is_empty()),
		domain: payload_string(payload, "domain").filter(|value| !value.is_empty()),
		score: point.score,
	})
}

pub fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

pub fn payload_u32(payload: &HashMap<String, Value>, key: &str) -> Option<u32> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => u32::try_from(*value).ok(),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 {
				u32::try_from(*value as i64).ok()
			} else {
				None
			},
		Some(Kind::StringValue(text)) => text.trim().parse().ok(),
		_ => None,
	}
}
