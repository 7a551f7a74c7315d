pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Similarity error: {message}")]
	Similarity { message: String },
}
impl From<coderef_storage::Error> for Error {
	fn from(err: coderef_storage::Error) -> Self {
		match err {
			coderef_storage::Error::Qdrant(inner) =>
				Self::Similarity { message: inner.to_string() },
			other => Self::Configuration { message: error_chain(&other) },
		}
	}
}

impl From<coderef_providers::Error> for Error {
	fn from(err: coderef_providers::Error) -> Self {
		Self::Provider { message: error_chain(&err) }
	}
}

fn error_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();

	while let Some(inner) = source {
		message.push_str(": ");
		message.push_str(&inner.to_string());

		source = inner.source();
	}

	message
}
