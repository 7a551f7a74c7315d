use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{body_partial_json, header, method, path},
};

use coderef_config::EmbeddingProviderConfig;

#[test]
fn builds_bearer_auth_header() {
	let headers =
		coderef_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");
	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = coderef_providers::default_headers_map(&defaults)
		.expect_err("Non-string header values must be rejected.");

	assert!(err.to_string().contains("must be strings"), "Unexpected error: {err}");
}

fn embedding_cfg(server: &MockServer) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "minilm".to_string(),
		api_base: server.uri(),
		api_key: "secret".to_string(),
		path: "/v1/embeddings".to_string(),
		model: "all-MiniLM-L6-v2".to_string(),
		dimensions: 3,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[tokio::test]
async fn embeds_a_single_query() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path("/v1/embeddings"))
		.and(header("authorization", "Bearer secret"))
		.and(body_partial_json(serde_json::json!({
			"model": "all-MiniLM-L6-v2",
			"input": ["saga compensation"],
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }]
		})))
		.expect(1)
		.mount(&server)
		.await;

	let cfg = embedding_cfg(&server);
	let vector = coderef_providers::embedding::embed_query(&cfg, "saga compensation")
		.await
		.expect("Embedding failed.");

	assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn wrong_dimension_names_the_provider() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path("/v1/embeddings"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"data": [{ "index": 0, "embedding": [0.1, 0.2] }]
		})))
		.mount(&server)
		.await;

	let err = coderef_providers::embedding::embed_query(&embedding_cfg(&server), "saga")
		.await
		.expect_err("Dimension mismatch must fail.");

	assert!(err.to_string().contains("minilm returned 2 dimensions"), "Unexpected error: {err}");
}
