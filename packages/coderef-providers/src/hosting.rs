//! Source-hosting API client (GitHub contents and code search).

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{
	Client, Response, StatusCode,
	header::{ACCEPT, AUTHORIZATION, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, citation::CitationTemplate, rate_limit::RateLimiter};

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedFile {
	pub path: String,
	pub content: String,
	pub sha: String,
	pub size: u64,
	pub download_url: String,
	pub html_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	File,
	Dir,
	#[serde(other)]
	Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
	pub name: String,
	pub path: String,
	#[serde(rename = "type")]
	pub kind: EntryKind,
	#[serde(default)]
	pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeHit {
	pub path: String,
	pub name: String,
	pub sha: String,
	#[serde(default)]
	pub html_url: String,
	#[serde(default)]
	pub score: f32,
}

#[derive(Debug, Deserialize)]
struct ContentsFile {
	path: String,
	sha: String,
	#[serde(default)]
	size: u64,
	encoding: Option<String>,
	content: Option<String>,
	download_url: Option<String>,
	html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
	#[serde(default)]
	items: Vec<CodeHit>,
}

/// An open connection to the hosting API, scoped to one engine session.
///
/// Clones share the same connection pool and quota tracker. The underlying client is released
/// when the last handle is closed or dropped, which also covers cancelled futures.
#[derive(Debug, Clone)]
pub struct HostSession {
	inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
	client: Client,
	api_base: String,
	repo: String,
	default_ref: String,
	citations: CitationTemplate,
	limiter: RateLimiter,
	requests: AtomicU64,
}

impl Drop for SessionInner {
	fn drop(&mut self) {
		tracing::debug!(
			repo = %self.repo,
			requests = self.requests.load(Ordering::Relaxed),
			"Host session released."
		);
	}
}

impl HostSession {
	pub fn open(cfg: &coderef_config::Hosting) -> Result<Self> {
		let mut headers = crate::default_headers_map(&cfg.default_headers)?;

		headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
		headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
		headers.insert(USER_AGENT, cfg.user_agent.parse()?);

		let token = cfg.token.clone().or_else(|| {
			std::env::var("GITHUB_TOKEN").ok().filter(|token| !token.trim().is_empty())
		});

		if let Some(token) = token {
			let mut value: HeaderValue = format!("Bearer {token}").parse()?;

			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		let client = Client::builder()
			.default_headers(headers)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		tracing::debug!(repo = %cfg.repo, api_base = %cfg.api_base, "Host session opened.");

		Ok(Self {
			inner: Arc::new(SessionInner {
				client,
				api_base: cfg.api_base.trim_end_matches('/').to_string(),
				repo: cfg.repo.clone(),
				default_ref: cfg.default_ref.clone(),
				citations: CitationTemplate::new(cfg),
				limiter: RateLimiter::new(&cfg.rate_limit),
				requests: AtomicU64::new(0),
			}),
		})
	}

	/// Releases this handle. Other clones keep the connection alive until they are dropped.
	pub fn close(self) {
		tracing::debug!(
			repo = %self.inner.repo,
			requests = self.request_count(),
			handles = Arc::strong_count(&self.inner),
			"Host session closed."
		);
	}

	pub fn repo(&self) -> &str {
		&self.inner.repo
	}

	pub fn citations(&self) -> &CitationTemplate {
		&self.inner.citations
	}

	pub fn rate_limiter(&self) -> &RateLimiter {
		&self.inner.limiter
	}

	pub fn request_count(&self) -> u64 {
		self.inner.requests.load(Ordering::Relaxed)
	}

	/// Fetches a file. A missing path, or a path that names a directory, yields `None`.
	pub async fn get_file(&self, path: &str, git_ref: Option<&str>) -> Result<Option<HostedFile>> {
		let response = self.get_contents(path, git_ref).await?;

		if response.status() == StatusCode::NOT_FOUND {
			tracing::warn!(path, "File not found.");

			return Ok(None);
		}

		let json: Value = response.error_for_status()?.json().await?;

		if json.is_array() {
			tracing::warn!(path, "Path is a directory, not a file.");

			return Ok(None);
		}

		let file: ContentsFile = serde_json::from_value(json)?;

		decode_file(file).map(Some)
	}

	/// Fetches the 1-based inclusive window `max(1, start - padding)..=end + padding`, clamped to
	/// the file length.
	pub async fn get_file_lines(
		&self,
		path: &str,
		start_line: u32,
		end_line: u32,
		git_ref: Option<&str>,
		padding: u32,
	) -> Result<Option<String>> {
		let Some(file) = self.get_file(path, git_ref).await? else {
			return Ok(None);
		};

		Ok(Some(slice_lines(&file.content, start_line, end_line, padding)))
	}

	/// Lists a directory. Missing paths, file paths, and transport failures all yield an empty
	/// listing.
	pub async fn list_directory(&self, path: &str, git_ref: Option<&str>) -> Vec<DirEntry> {
		match self.try_list_directory(path, git_ref).await {
			Ok(entries) => entries,
			Err(err) => {
				tracing::error!(error = %err, path, "Failed to list directory.");

				Vec::new()
			},
		}
	}

	pub async fn try_list_directory(
		&self,
		path: &str,
		git_ref: Option<&str>,
	) -> Result<Vec<DirEntry>> {
		let response = self.get_contents(path, git_ref).await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(Vec::new());
		}

		let json: Value = response.error_for_status()?.json().await?;

		if !json.is_array() {
			return Ok(Vec::new());
		}

		Ok(serde_json::from_value(json)?)
	}

	/// Runs the hosting API's code search. Failures are logged and yield no hits.
	pub async fn search_code(
		&self,
		query: &str,
		path_prefix: Option<&str>,
		extension: Option<&str>,
		limit: u32,
	) -> Vec<CodeHit> {
		match self.try_search_code(query, path_prefix, extension, limit).await {
			Ok(hits) => hits,
			Err(err) => {
				tracing::error!(error = %err, query, "Code search failed.");

				Vec::new()
			},
		}
	}

	pub async fn try_search_code(
		&self,
		query: &str,
		path_prefix: Option<&str>,
		extension: Option<&str>,
		limit: u32,
	) -> Result<Vec<CodeHit>> {
		if limit == 0 {
			return Ok(Vec::new());
		}

		let per_page = limit.min(MAX_PER_PAGE);
		let q = build_search_query(query, &self.inner.repo, path_prefix, extension);
		let url = format!("{}/search/code", self.inner.api_base);
		let response = self.send(&url, &[("q", q), ("per_page", per_page.to_string())]).await?;
		let page: SearchPage = response.error_for_status()?.json().await?;
		let mut hits = page.items;

		hits.truncate(per_page as usize);

		Ok(hits)
	}

	async fn get_contents(&self, path: &str, git_ref: Option<&str>) -> Result<Response> {
		let git_ref = git_ref.unwrap_or(&self.inner.default_ref);
		let url = format!(
			"{}/repos/{}/contents/{}",
			self.inner.api_base,
			self.inner.repo,
			path.trim_matches('/')
		);

		self.send(&url, &[("ref", git_ref.to_string())]).await
	}

	async fn send(&self, url: &str, query: &[(&str, String)]) -> Result<Response> {
		self.inner.limiter.throttle().await;

		let response = self.inner.client.get(url).query(query).send().await?;

		self.inner.requests.fetch_add(1, Ordering::Relaxed);
		self.inner.limiter.observe(response.headers());

		Ok(response)
	}
}

pub fn build_search_query(
	query: &str,
	repo: &str,
	path_prefix: Option<&str>,
	extension: Option<&str>,
) -> String {
	let mut q = format!("{query} repo:{repo}");

	if let Some(path) = path_prefix.filter(|path| !path.trim().is_empty()) {
		q.push_str(&format!(" path:{path}"));
	}
	if let Some(extension) = extension.filter(|ext| !ext.trim().is_empty()) {
		q.push_str(&format!(" extension:{}", extension.trim_start_matches('.')));
	}

	q
}

pub fn slice_lines(content: &str, start_line: u32, end_line: u32, padding: u32) -> String {
	let lines = content.lines().collect::<Vec<_>>();
	let start_idx = (start_line.saturating_sub(padding).max(1) - 1) as usize;
	let end_idx = (end_line.saturating_add(padding) as usize).min(lines.len());

	if start_idx >= end_idx {
		return String::new();
	}

	lines[start_idx..end_idx].join("\n")
}

fn decode_file(file: ContentsFile) -> Result<HostedFile> {
	let content = match (file.encoding.as_deref(), file.content.as_deref()) {
		(Some("base64"), Some(raw)) if !raw.is_empty() => {
			let compact = raw.split_whitespace().collect::<String>();
			let bytes = STANDARD
				.decode(compact)
				.map_err(|err| Error::Decode { path: file.path.clone(), source: err })?;

			String::from_utf8_lossy(&bytes).into_owned()
		},
		(None, Some(raw)) => raw.to_string(),
		_ => String::new(),
	};

	Ok(HostedFile {
		path: file.path,
		content,
		sha: file.sha,
		size: file.size,
		download_url: file.download_url.unwrap_or_default(),
		html_url: file.html_url.unwrap_or_default(),
	})
}
