use crate::Stage;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Store unavailable during {stage}: {message}")]
	StoreUnavailable { stage: Stage, message: String },
	#[error("Embedding gateway unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Store returned malformed data during {stage}: {message}")]
	StoreDataError { stage: Stage, message: String },
	#[error("Search exceeded its {budget_ms} ms budget during {stage}.")]
	Timeout { stage: Stage, budget_ms: u64 },
}
impl Error {
	pub fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidInput { message: message.into() }
	}

	pub fn malformed(stage: Stage, message: impl Into<String>) -> Self {
		Self::StoreDataError { stage, message: message.into() }
	}

	/// Classifies a driver error raised while `stage` was talking to the store.
	pub fn store(stage: Stage, err: kgr_storage::Error) -> Self {
		match err {
			kgr_storage::Error::InvalidArgument(message) => Self::InvalidInput { message },
			err if err.is_unavailable() =>
				Self::StoreUnavailable { stage, message: err.to_string() },
			err => Self::StoreDataError { stage, message: err.to_string() },
		}
	}

	pub fn stage(&self) -> Option<Stage> {
		match self {
			Self::InvalidInput { .. } => None,
			Self::EmbeddingUnavailable { .. } => Some(Stage::Embed),
			Self::StoreUnavailable { stage, .. }
			| Self::StoreDataError { stage, .. }
			| Self::Timeout { stage, .. } => Some(*stage),
		}
	}

	/// Whether the caller may retry the same request unchanged. Nothing is retried internally.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::StoreUnavailable { .. } | Self::EmbeddingUnavailable { .. } | Self::Timeout { .. }
		)
	}
}
impl From<kgr_providers::Error> for Error {
	fn from(err: kgr_providers::Error) -> Self {
		Self::EmbeddingUnavailable { message: err.to_string() }
	}
}
