use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use coderef_domain::tier::PathResult;
use coderef_service::{CodeReferenceEngine, SearchRequest};

#[derive(Debug, Parser)]
#[command(
	version = coderef_cli::VERSION,
	rename_all = "kebab",
	styles = coderef_cli::styles(),
)]
pub struct Args {
	/// Engine configuration. Required by every command that touches the registry or hosting.
	#[arg(long, short = 'c', value_name = "FILE", global = true)]
	pub config: Option<PathBuf>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Search the catalogue and print citable references.
	Search {
		query: String,
		/// Restrict the search to a domain. Repeatable.
		#[arg(long = "domain", value_name = "ID")]
		domains: Vec<String>,
		/// Restrict the search to repos tagged with a concept. Ignored when a domain is given.
		#[arg(long = "concept", value_name = "CONCEPT")]
		concepts: Vec<String>,
		#[arg(long, value_name = "N")]
		top_k: Option<u32>,
		/// Keep each reference's original content instead of fetching a padded window.
		#[arg(long)]
		no_expand: bool,
		#[arg(long, value_name = "N")]
		context_lines: Option<u32>,
		#[arg(long, value_name = "MS")]
		deadline_ms: Option<u64>,
		#[arg(long)]
		json: bool,
	},
	/// Print catalogue statistics.
	Stats,
	/// List every domain in the registry.
	Domains,
	/// Print a repo descriptor.
	Repo { id: String },
	/// Print a mirrored file followed by its citation.
	File { path: String },
	/// List a mirrored directory.
	Ls {
		#[arg(default_value = "")]
		path: String,
	},
	/// Classify the hops of a path through tiered nodes.
	Classify {
		#[arg(num_args = 2.., required = true, allow_negative_numbers = true)]
		tiers: Vec<i64>,
		#[arg(long)]
		json: bool,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = args.config.as_deref().map(coderef_config::load).transpose()?;

	init_tracing(config.as_ref().map(|cfg| cfg.service.log_level.as_str()));

	if let Command::Classify { tiers, json } = &args.command {
		println!("{}", classify_path(tiers, *json)?);

		return Ok(());
	}

	let Some(config) = config else {
		return Err(eyre::eyre!("--config is required for this command."));
	};
	let registry_path = config.registry.path.clone();
	let engine = CodeReferenceEngine::open(config)?;

	tracing::info!(
		registry = %registry_path.display(),
		similarity = engine.has_similarity_index(),
		"Engine opened."
	);

	let outcome = run_command(&engine, args.command).await;

	engine.close();

	if let Err(err) = &outcome {
		tracing::error!(error = %err, "Command failed.");
	}

	outcome
}

async fn run_command(engine: &CodeReferenceEngine, command: Command) -> color_eyre::Result<()> {
	match command {
		Command::Search {
			query,
			domains,
			concepts,
			top_k,
			no_expand,
			context_lines,
			deadline_ms,
			json,
		} => {
			let req = SearchRequest {
				query,
				domains,
				concepts,
				top_k,
				expand_context: Some(!no_expand),
				context_lines,
				deadline_ms,
			};
			let result = engine.search(req).await?;

			if json {
				println!("{}", serde_json::to_string_pretty(&result)?);
			} else if result.references.is_empty() {
				println!("No references found.");
			} else {
				println!("{}", result.to_prompt_context());
			}
		},
		Command::Stats => {
			println!("{}", serde_json::to_string_pretty(&engine.get_statistics()?)?);
		},
		Command::Domains =>
			for domain in engine.get_all_domains() {
				let repos = domain.repos.iter().map(|repo| repo.id.as_str()).collect::<Vec<_>>();

				println!("{}\t{}", domain.id, repos.join(","));
			},
		Command::Repo { id } => match engine.get_metadata(&id)? {
			Some(repo) => println!("{}", serde_json::to_string_pretty(repo.as_ref())?),
			None => return Err(eyre::eyre!("No descriptor for repo {id}.")),
		},
		Command::File { path } => match engine.get_file_with_citation(&path).await? {
			Some(file) => {
				println!("{}", file.content);
				println!("Source: {}", file.citation);
			},
			None => return Err(eyre::eyre!("File not found: {path}.")),
		},
		Command::Ls { path } =>
			for entry in engine.list_directory(&path).await {
				println!("{}", serde_json::to_string(&entry)?);
			},
		Command::Classify { tiers, json } => println!("{}", classify_path(&tiers, json)?),
	}

	Ok(())
}

/// Renders the classified path through nodes `T<tier>`, one node per argument.
pub fn classify_path(tiers: &[i64], json: bool) -> color_eyre::Result<String> {
	let ids = tiers.iter().map(|tier| format!("T{tier}")).collect::<Vec<_>>();
	let nodes = ids.iter().map(String::as_str).zip(tiers.iter().copied()).collect::<Vec<_>>();
	let path = PathResult::from_tiers(&nodes, 0.0).map_err(|reject| eyre::eyre!("{reject}."))?;

	if json {
		return Ok(serde_json::to_string_pretty(&path)?);
	}

	Ok(render_path(&path))
}

pub fn render_path(path: &PathResult) -> String {
	let mut out = path.chapters.first().cloned().unwrap_or_default();

	for (edge_type, chapter) in path.edge_types.iter().zip(path.chapters.iter().skip(1)) {
		out.push_str(&format!(" -[{edge_type}]-> {chapter}"));
	}

	out
}

fn init_tracing(log_level: Option<&str>) {
	let filter = log_level
		.and_then(|level| EnvFilter::try_new(level).ok())
		.unwrap_or_else(|| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
