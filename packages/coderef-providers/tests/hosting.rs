use base64::{Engine as _, engine::general_purpose::STANDARD};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path, query_param},
};

use coderef_config::Hosting;
use coderef_providers::{
	Error,
	hosting::{EntryKind, HostSession},
};

const REPO: &str = "kevin-toles/code-reference-engine";

fn hosting(server: &MockServer) -> Hosting {
	Hosting {
		api_base: server.uri(),
		repo: REPO.to_string(),
		token: Some("secret".to_string()),
		timeout_ms: 5_000,
		..Hosting::default()
	}
}

fn contents_body(path: &str, content: &str) -> serde_json::Value {
	serde_json::json!({
		"path": path,
		"sha": "0123456789abcdef",
		"size": content.len(),
		"encoding": "base64",
		"content": STANDARD.encode(content),
		"download_url": format!("https://raw.githubusercontent.com/{REPO}/main/{path}"),
		"html_url": format!("https://github.com/{REPO}/blob/main/{path}"),
	})
}

#[tokio::test]
async fn get_file_decodes_content_and_sends_auth() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/backend/saga.py")))
		.and(query_param("ref", "main"))
		.and(header("authorization", "Bearer secret"))
		.and(header("x-github-api-version", "2022-11-28"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(contents_body("backend/saga.py", "def compensate():\n    pass\n"))
				.insert_header("x-ratelimit-remaining", "4990")
				.insert_header("x-ratelimit-reset", "1700000000"),
		)
		.expect(1)
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");
	let file = session
		.get_file("backend/saga.py", None)
		.await
		.expect("Request failed.")
		.expect("File must exist.");

	assert_eq!(file.content, "def compensate():\n    pass\n");
	assert_eq!(file.html_url, format!("https://github.com/{REPO}/blob/main/backend/saga.py"));
	assert_eq!(session.rate_limiter().snapshot().remaining, Some(4_990));
	assert_eq!(session.rate_limiter().snapshot().reset_at, Some(1_700_000_000));
	assert_eq!(session.request_count(), 1);

	session.close();
}

#[tokio::test]
async fn missing_file_is_none() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/nope.rs")))
		.respond_with(ResponseTemplate::new(404))
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");

	assert!(session.get_file("nope.rs", None).await.expect("404 is not an error.").is_none());
	assert!(
		session
			.get_file_lines("nope.rs", 1, 5, None, 3)
			.await
			.expect("404 is not an error.")
			.is_none()
	);
}

#[tokio::test]
async fn server_error_propagates_from_get_file() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/boom.rs")))
		.respond_with(ResponseTemplate::new(502))
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");
	let err = session.get_file("boom.rs", None).await.expect_err("502 must surface.");

	assert!(matches!(err, Error::Reqwest(_)), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn get_file_lines_returns_padded_window() {
	let server = MockServer::start().await;
	let content = (1..=30).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");

	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/src/lib.rs")))
		.and(query_param("ref", "v2"))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(contents_body("src/lib.rs", &content)),
		)
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");
	let window = session
		.get_file_lines("src/lib.rs", 10, 12, Some("v2"), 2)
		.await
		.expect("Request failed.")
		.expect("File must exist.");

	assert_eq!(window, "line 8\nline 9\nline 10\nline 11\nline 12\nline 13\nline 14");
}

#[tokio::test]
async fn list_directory_parses_entries_and_tolerates_failures() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/backend")))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
			{ "name": "saga", "path": "backend/saga", "type": "dir", "size": 0 },
			{ "name": "README.md", "path": "backend/README.md", "type": "file", "size": 42 },
			{ "name": "link", "path": "backend/link", "type": "symlink" }
		])))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/broken")))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path(format!("/repos/{REPO}/contents/README.md")))
		.respond_with(ResponseTemplate::new(200).set_body_json(contents_body("README.md", "hi")))
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");
	let entries = session.list_directory("backend", None).await;

	assert_eq!(entries.len(), 3);
	assert_eq!(entries[0].kind, EntryKind::Dir);
	assert_eq!(entries[1].size, 42);
	assert_eq!(entries[2].kind, EntryKind::Other);
	assert!(session.list_directory("broken", None).await.is_empty());
	assert!(session.list_directory("missing", None).await.is_empty());
	assert!(session.list_directory("README.md", None).await.is_empty());
}

#[tokio::test]
async fn search_code_scopes_query_and_caps_page() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/search/code"))
		.and(query_param("q", format!("saga repo:{REPO} path:backend/eventuate extension:java")))
		.and(query_param("per_page", "2"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"total_count": 3,
			"items": [
				{
					"path": "backend/eventuate/OrderSaga.java",
					"name": "OrderSaga.java",
					"sha": "aaaaaaaaaaaa",
					"html_url": "https://github.com/x/blob/main/backend/eventuate/OrderSaga.java",
					"score": 1.5
				},
				{
					"path": "backend/eventuate/Compensation.java",
					"name": "Compensation.java",
					"sha": "bbbbbbbbbbbb",
					"html_url": "https://github.com/x/blob/main/backend/eventuate/Compensation.java"
				},
				{
					"path": "backend/eventuate/Extra.java",
					"name": "Extra.java",
					"sha": "cccccccccccc",
					"html_url": "https://github.com/x/blob/main/backend/eventuate/Extra.java"
				}
			]
		})))
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");
	let hits = session.search_code("saga", Some("backend/eventuate"), Some("java"), 2).await;

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].score, 1.5);
	assert_eq!(hits[1].score, 0.0);
	assert!(session.search_code("saga", None, None, 0).await.is_empty());
}

#[tokio::test]
async fn search_code_failure_is_empty_but_try_variant_errors() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/search/code"))
		.respond_with(ResponseTemplate::new(422).insert_header("x-ratelimit-remaining", "12"))
		.mount(&server)
		.await;

	let session = HostSession::open(&hosting(&server)).expect("Failed to open session.");

	assert!(session.search_code("saga", None, None, 5).await.is_empty());
	assert!(session.try_search_code("saga", None, None, 5).await.is_err());
	assert_eq!(session.rate_limiter().snapshot().remaining, Some(12));
}
