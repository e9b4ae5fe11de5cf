#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Malformed store record: {0}")]
	Malformed(String),
}
impl Error {
	/// True when the store could not answer at all, as opposed to answering with data this crate
	/// cannot decode.
	pub fn is_unavailable(&self) -> bool {
		match self {
			Self::Sqlx(err) => !matches!(
				err,
				sqlx::Error::ColumnDecode { .. }
					| sqlx::Error::ColumnNotFound(_)
					| sqlx::Error::ColumnIndexOutOfBounds { .. }
					| sqlx::Error::Decode(_)
					| sqlx::Error::TypeNotFound { .. }
					| sqlx::Error::RowNotFound
			),
			Self::Qdrant(_) => true,
			Self::InvalidArgument(_) | Self::Malformed(_) => false,
		}
	}
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
