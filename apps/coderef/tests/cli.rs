use clap::Parser;

use coderef::{Args, Command, classify_path};
use coderef_testkit::FixtureRoot;

#[test]
fn search_flags_parse_into_request_fields() {
	let args = Args::try_parse_from([
		"coderef",
		"-c",
		"coderef.toml",
		"search",
		"saga orchestration",
		"--domain",
		"backend-event-driven",
		"--domain",
		"backend-cqrs",
		"--top-k",
		"4",
		"--no-expand",
	])
	.expect("args must parse");

	assert_eq!(args.config.as_deref(), Some(std::path::Path::new("coderef.toml")));

	let Command::Search { query, domains, concepts, top_k, no_expand, json, .. } = args.command
	else {
		panic!("expected search command");
	};

	assert_eq!(query, "saga orchestration");
	assert_eq!(domains, vec!["backend-event-driven", "backend-cqrs"]);
	assert!(concepts.is_empty());
	assert_eq!(top_k, Some(4));
	assert!(no_expand);
	assert!(!json);
}

#[test]
fn config_is_accepted_after_the_subcommand() {
	let args = Args::try_parse_from(["coderef", "stats", "--config", "coderef.toml"])
		.expect("args must parse");

	assert!(args.config.is_some());
	assert!(matches!(args.command, Command::Stats));
}

#[test]
fn classify_accepts_negative_tiers() {
	let args = Args::try_parse_from(["coderef", "classify", "-1", "2"]).expect("args must parse");

	let Command::Classify { tiers, .. } = args.command else {
		panic!("expected classify command");
	};

	assert_eq!(tiers, vec![-1, 2]);
}

#[test]
fn classify_needs_two_tiers() {
	assert!(Args::try_parse_from(["coderef", "classify", "1"]).is_err());
}

#[test]
fn classified_path_renders_each_hop() {
	let rendered = classify_path(&[1, 2, 3, 1], false).expect("path must classify");

	assert_eq!(rendered, "T1 -[PERPENDICULAR]-> T2 -[PERPENDICULAR]-> T3 -[SKIP_TIER]-> T1");
}

#[test]
fn classified_path_serializes_hops() {
	let rendered = classify_path(&[2, 2], true).expect("path must classify");
	let value: serde_json::Value = serde_json::from_str(&rendered).expect("output must be JSON");

	assert_eq!(value["hops"], 1);
	assert_eq!(value["edge_types"][0], "PARALLEL");
	assert_eq!(value["chapters"][1], "T2");
}

#[tokio::test]
async fn engine_command_runs_against_a_fixture_registry() {
	let fixture = FixtureRoot::new("coderef_cli_test").expect("Failed to create fixture.");

	fixture.write_registry(&[("backend-cqrs", &["axon"])]).expect("Failed to write registry.");
	fixture
		.write_descriptor(&coderef_testkit::descriptor("axon", "backend-cqrs"))
		.expect("Failed to write descriptor.");

	let registry = fixture.registry_path();
	let config = fixture
		.write_raw(
			"coderef.toml",
			&format!(
				"[service]\nlog_level = \"debug\"\n\n[registry]\npath = {:?}\n",
				registry.display().to_string()
			),
		)
		.expect("Failed to write config.");
	let args = Args::try_parse_from([
		"coderef".to_string(),
		"--config".to_string(),
		config.display().to_string(),
		"repo".to_string(),
		"axon".to_string(),
	])
	.expect("args must parse");

	coderef::run(args).await.expect("repo command must succeed");
}
