use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use coderef_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn render(value: &Value) -> String {
	toml::to_string(value).expect("Failed to render template config.")
}

fn with_table<F>(section: &str, edit: F) -> String
where
	F: FnOnce(&mut toml::Table),
{
	let mut value = sample_value();
	let root = value.as_table_mut().expect("Template config must be a table.");
	let mut current = root;

	for key in section.split('.') {
		current = current
			.get_mut(key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	edit(current);

	render(&value)
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("coderef_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> coderef_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = coderef_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, expected: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");
	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_and_normalizes() {
	let cfg = load_payload(render(&sample_value())).expect("Sample config must load.");

	assert_eq!(cfg.hosting.api_base, "https://api.github.com");
	assert!(cfg.hosting.token.is_none(), "Blank token must normalize to None.");
	assert_eq!(cfg.search.keyword_repo_limit, 10);

	let similarity = cfg.similarity.expect("Sample config has a similarity section.");

	assert_eq!(similarity.collection, "code_chunks");
	assert!(similarity.vector_name.is_none());
}

#[test]
fn minimal_config_falls_back_to_defaults() {
	let payload = "\
[service]
log_level = \"debug\"

[registry]
path = \"/data/repos/repo_registry.json\"
"
	.to_string();
	let cfg = load_payload(payload).expect("Minimal config must load.");

	assert!(cfg.similarity.is_none());
	assert_eq!(cfg.hosting.repo, "kevin-toles/code-reference-engine");
	assert_eq!(cfg.hosting.default_ref, "main");
	assert_eq!(cfg.hosting.rate_limit.safety_threshold, 100);
	assert_eq!(cfg.hosting.rate_limit.max_wait_secs, 60);
	assert_eq!(cfg.search.default_top_k, 10);
	assert_eq!(cfg.search.context_lines, 20);
	assert_eq!(cfg.registry.resolved_data_root(), PathBuf::from("/data"));
}

#[test]
fn explicit_data_root_wins() {
	let payload = with_table("registry", |registry| {
		registry.insert("data_root".to_string(), Value::String("/srv/coderef".to_string()));
	});
	let cfg = load_payload(payload).expect("Config must load.");

	assert_eq!(cfg.registry.resolved_data_root(), PathBuf::from("/srv/coderef"));
}

#[test]
fn missing_file_is_read_error() {
	let err = coderef_config::load(&PathBuf::from("/nonexistent/coderef.toml"))
		.expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_toml_is_parse_error() {
	let err =
		load_payload("[service\nlog_level = ".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn repo_must_have_owner_and_name() {
	let payload = with_table("hosting", |hosting| {
		hosting.insert("repo".to_string(), Value::String("code-reference-engine".to_string()));
	});

	expect_validation(payload, "hosting.repo must be of the form owner/name.");
}

#[test]
fn rate_limit_wait_ceiling_must_be_positive() {
	let payload = with_table("hosting.rate_limit", |rate_limit| {
		rate_limit.insert("max_wait_secs".to_string(), Value::Integer(0));
	});

	expect_validation(payload, "hosting.rate_limit.max_wait_secs must be greater than zero.");
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = with_table("similarity.embedding", |embedding| {
		embedding.insert("dimensions".to_string(), Value::Integer(768));
	});

	expect_validation(payload, "similarity.embedding.dimensions must match similarity.vector_dim.");
}

#[test]
fn expand_concurrency_must_be_positive() {
	let payload = with_table("search", |search| {
		search.insert("expand_concurrency".to_string(), Value::Integer(0));
	});

	expect_validation(payload, "search.expand_concurrency must be greater than zero.");
}

#[test]
fn deadline_must_be_positive_when_set() {
	let payload = with_table("search", |search| {
		search.insert("deadline_ms".to_string(), Value::Integer(0));
	});

	expect_validation(payload, "search.deadline_ms must be greater than zero.");
}

#[test]
fn default_headers_must_be_strings() {
	let payload = with_table("hosting.default_headers", |headers| {
		headers.insert("X-Trace".to_string(), Value::Integer(1));
	});

	expect_validation(payload, "hosting.default_headers.X-Trace must be a string.");
}
