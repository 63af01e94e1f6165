/* src/state/mod.rs */

//!
//! Pure operations over the materialized state: default merging, path
//! access and structural diffing. Nothing in here performs I/O.

mod access;
mod diff;
mod merge;

pub use access::{assign, delete, lookup};
pub use diff::diff_paths;
pub use merge::{Merged, merge_defaults};

use crate::path::Path;

/// Top-level key to nested value.
pub type State = serde_json::Map<String, serde_json::Value>;

/// Local validation failures raised by path access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
	/// A segment on the way to the target exists but is not a mapping.
	#[error("path nesting conflict: `{path}` is not a mapping")]
	NestingConflict { path: Path },
	/// The target (or one of its ancestors) does not exist.
	#[error("path does not exist: `{path}`")]
	NotFound { path: Path },
	/// The operation needs a non-root path.
	#[error("operation requires a non-root path")]
	Root,
}
