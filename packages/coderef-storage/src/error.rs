use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read {path:?}.")]
	ReadFile { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse {path:?}.")]
	ParseFile { path: PathBuf, source: serde_json::Error },
	#[error("Invalid registry: {0}")]
	InvalidRegistry(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
