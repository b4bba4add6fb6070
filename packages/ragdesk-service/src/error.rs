pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl From<ragdesk_providers::Error> for Error {
	fn from(err: ragdesk_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<ragdesk_storage::Error> for Error {
	fn from(err: ragdesk_storage::Error) -> Self {
		match err {
			ragdesk_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			ragdesk_storage::Error::InvalidRow(message) => Self::Storage { message },
			ragdesk_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}
