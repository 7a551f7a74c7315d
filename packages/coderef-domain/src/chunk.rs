use serde::{Deserialize, Serialize};

/// A contiguous, 1-based inclusive line range of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
	pub chunk_id: String,
	pub repo_id: String,
	pub file_path: String,
	pub start_line: u32,
	pub end_line: u32,
	pub content: String,
	pub language: String,
	pub score: f32,
}
impl Chunk {
	pub fn new(
		chunk_id: impl Into<String>,
		repo_id: impl Into<String>,
		file_path: impl Into<String>,
		start_line: u32,
		end_line: u32,
	) -> Result<Self, ChunkReject> {
		let file_path = file_path.into();

		if file_path.trim().is_empty() {
			return Err(ChunkReject::RejectEmptyPath);
		}
		if start_line > end_line {
			return Err(ChunkReject::RejectInvertedSpan { start_line, end_line });
		}

		let language = crate::language::from_path(&file_path).unwrap_or_default().to_string();

		Ok(Self {
			chunk_id: chunk_id.into(),
			repo_id: repo_id.into(),
			file_path,
			start_line,
			end_line,
			content: String::new(),
			language,
			score: 0.0,
		})
	}

	pub fn with_content(mut self, content: impl Into<String>) -> Self {
		self.content = content.into();

		self
	}

	/// Overrides the extension-derived language when the source reports one.
	pub fn with_language(mut self, language: impl Into<String>) -> Self {
		let language = language.into();

		if !language.trim().is_empty() {
			self.language = language;
		}

		self
	}

	pub fn with_score(mut self, score: f32) -> Self {
		self.score = score;

		self
	}

	/// Identity used to collapse the same excerpt reported by more than one source.
	pub fn dedup_key(&self) -> (&str, &str, u32) {
		(&self.repo_id, &self.file_path, self.start_line)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkReject {
	RejectEmptyPath,
	RejectInvertedSpan { start_line: u32, end_line: u32 },
}

impl std::fmt::Display for ChunkReject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::RejectEmptyPath => f.write_str("chunk file path is empty"),
			Self::RejectInvertedSpan { start_line, end_line } => {
				write!(f, "chunk start line {start_line} is after end line {end_line}")
			},
		}
	}
}
