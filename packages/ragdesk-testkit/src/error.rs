pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Test setup failed: {message}")]
	Setup { message: String },
	#[error("Qdrant cleanup failed: {message}")]
	Qdrant { message: String },
	#[error(transparent)]
	Postgres(#[from] sqlx::Error),
}
