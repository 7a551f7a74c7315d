/// Builds stable links into the mirrored repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationTemplate {
	pub html_base: String,
	pub raw_base: String,
	pub repo: String,
	pub git_ref: String,
}
impl CitationTemplate {
	pub fn new(cfg: &coderef_config::Hosting) -> Self {
		Self {
			html_base: cfg.html_base.trim_end_matches('/').to_string(),
			raw_base: cfg.raw_base.trim_end_matches('/').to_string(),
			repo: cfg.repo.clone(),
			git_ref: cfg.default_ref.clone(),
		}
	}

	/// `{raw_base}/{repo}/{ref}/{path}`
	pub fn raw_url(&self, path: &str, git_ref: Option<&str>) -> String {
		let git_ref = git_ref.unwrap_or(&self.git_ref);

		format!("{}/{}/{}/{}", self.raw_base, self.repo, git_ref, path.trim_start_matches('/'))
	}

	/// `{html_base}/{repo}/blob/{ref}/{path}#L{start}[-L{end}]`
	///
	/// The anchor is omitted without a start line and collapses to `#L{start}` when the range is
	/// a single line.
	pub fn html_url(&self, path: &str, start_line: Option<u32>, end_line: Option<u32>) -> String {
		let mut url = format!(
			"{}/{}/blob/{}/{}",
			self.html_base,
			self.repo,
			self.git_ref,
			path.trim_start_matches('/')
		);

		if let Some(start) = start_line {
			url.push_str(&format!("#L{start}"));

			if let Some(end) = end_line
				&& end != start
			{
				url.push_str(&format!("-L{end}"));
			}
		}

		url
	}
}
