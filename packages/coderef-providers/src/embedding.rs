use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use coderef_config::EmbeddingProviderConfig;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	#[serde(default)]
	index: usize,
	embedding: Vec<f32>,
}

/// Embeds one search query with an OpenAI-compatible endpoint.
///
/// The returned vector always has `cfg.dimensions` entries.
pub async fn embed_query(cfg: &EmbeddingProviderConfig, query: &str) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": [query],
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;
	let vector = query_vector(cfg, res.json().await?)?;

	tracing::debug!(
		provider_id = %cfg.provider_id,
		model = %cfg.model,
		dimensions = vector.len(),
		"Query embedded."
	);

	Ok(vector)
}

fn query_vector(cfg: &EmbeddingProviderConfig, res: EmbeddingResponse) -> Result<Vec<f32>> {
	let item = res.data.into_iter().min_by_key(|item| item.index).ok_or_else(|| {
		Error::InvalidResponse {
			message: format!("Embedding provider {} returned no vectors.", cfg.provider_id),
		}
	})?;

	if item.embedding.len() != cfg.dimensions as usize {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding provider {} returned {} dimensions; expected {}.",
				cfg.provider_id,
				item.embedding.len(),
				cfg.dimensions
			),
		});
	}

	Ok(item.embedding)
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;

	fn cfg(dimensions: u32) -> EmbeddingProviderConfig {
		EmbeddingProviderConfig {
			provider_id: "minilm".to_string(),
			api_base: "http://127.0.0.1:8089".to_string(),
			api_key: "key".to_string(),
			path: "/v1/embeddings".to_string(),
			model: "all-MiniLM-L6-v2".to_string(),
			dimensions,
			timeout_ms: 1_000,
			default_headers: Map::new(),
		}
	}

	fn response(json: serde_json::Value) -> EmbeddingResponse {
		serde_json::from_value(json).expect("response must parse")
	}

	#[test]
	fn picks_the_first_indexed_vector() {
		let res = response(serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		}));

		assert_eq!(query_vector(&cfg(2), res).expect("vector must resolve"), vec![0.5, 1.5]);
	}

	#[test]
	fn rejects_empty_and_mismatched_responses() {
		let empty = query_vector(&cfg(2), response(serde_json::json!({ "data": [] })))
			.expect_err("empty data must fail");

		assert!(empty.to_string().contains("minilm returned no vectors"), "Unexpected: {empty}");

		let short = response(serde_json::json!({ "data": [{ "embedding": [1.0] }] }));
		let err = query_vector(&cfg(2), short).expect_err("dimension mismatch must fail");

		assert!(err.to_string().contains("returned 1 dimensions; expected 2"), "Unexpected: {err}");
	}
}
