/* src/backend/mod.rs */

//!
//! The storage service the mirror synchronizes with.
//!
//! - [`Backend`] - async capability handle injected into the mirror
//! - [`MemoryBackend`] - in-process store, shareable between mirrors
//! - [`FileBackend`] - JSON file persisted store (feature `fs`)

mod error;
mod limits;
mod memory;

#[cfg(feature = "fs")]
mod file;

pub use error::BackendError;
pub use limits::{BytesInUse, Limits};
pub use memory::MemoryBackend;

#[cfg(feature = "fs")]
pub use file::FileBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::State;

/// One top-level key's change as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
	pub key: String,
	pub old_value: Option<Value>,
	/// `None` when the key was removed.
	pub new_value: Option<Value>,
}

impl Change {
	pub fn is_removal(&self) -> bool {
		self.new_value.is_none()
	}
}

/// Receives every batch of changes written to the backend, by any writer.
pub type ChangeListener = Arc<dyn Fn(&[Change]) + Send + Sync>;

/// Handle returned by [`Backend::watch`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
	pub const fn new(id: u64) -> Self {
		Self(id)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

/// Asynchronous key-value storage addressed by top-level key.
///
/// Implementations deliver change batches to every watcher for all writes,
/// including writes made through the same handle. Listeners must not be
/// called while internal locks are held.
#[async_trait]
pub trait Backend: Send + Sync {
	/// Reads the whole store.
	async fn load(&self) -> Result<State, BackendError>;

	/// Stores every entry of `items`, replacing existing values.
	async fn write(&self, items: State) -> Result<(), BackendError>;

	/// Deletes `keys`. Missing keys are ignored.
	async fn remove(&self, keys: &[String]) -> Result<(), BackendError>;

	/// Registers a change listener.
	fn watch(&self, listener: ChangeListener) -> WatchId;

	/// Detaches a listener registered with [`watch`](Backend::watch).
	fn unwatch(&self, id: WatchId);

	/// Bytes used by `key`, or by the whole store when `key` is `None`.
	async fn bytes_in_use(&self, key: Option<&str>) -> Result<u64, BackendError>;

	/// Capacity constants of this storage area.
	fn limits(&self) -> Limits;
}
