/* src/mirror/error.rs */

use thiserror::Error;

use crate::backend::BackendError;
use crate::defaults::DefaultsError;
use crate::path::PathError;
use crate::state::AccessError;

/// Errors returned by the mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
	#[error(transparent)]
	Path(#[from] PathError),

	#[error(transparent)]
	Access(#[from] AccessError),

	#[error("root set requires a mapping value")]
	RootNotMapping,

	#[error("a full replace is already in flight")]
	ReplaceInFlight,

	#[error("Backend error: {0}")]
	Backend(#[from] BackendError),

	#[error("Serde error: {0}")]
	Serde(#[from] serde_json::Error),

	#[error("Defaults error: {0}")]
	Defaults(#[from] DefaultsError),

	#[error("Builder error: {0}")]
	Builder(String),
}

impl MirrorError {
	/// True for a missing path on read-modify operations.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Access(AccessError::NotFound { .. }))
	}
}
