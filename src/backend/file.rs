/* src/backend/file.rs */

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::{Backend, BackendError, ChangeListener, Limits, MemoryBackend, WatchId};
use crate::state::State;

/// A backend persisted as a single JSON document on disk.
///
/// The document is read once on [`open`](FileBackend::open); afterwards the
/// in-memory copy is authoritative. A write or removal is flushed with a
/// temp-file + rename first and only reaches the in-memory copy and the
/// listeners once the flush succeeded. Change delivery follows
/// [`MemoryBackend`].
pub struct FileBackend {
	path: PathBuf,
	memory: MemoryBackend,
	flush: Mutex<()>,
}

impl FileBackend {
	/// Opens (or lazily creates) the document at `path`.
	pub async fn open(path: impl Into<PathBuf>, limits: Limits) -> Result<Self, BackendError> {
		let path = path.into();
		let state = match fs::read(&path).await {
			Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => State::new(),
			Ok(bytes) => serde_json::from_slice::<State>(&bytes)?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::new(),
			Err(e) => return Err(BackendError::Io(e)),
		};

		Ok(Self {
			path,
			memory: MemoryBackend::with_limits(limits).with_state(state),
			flush: Mutex::new(()),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Writes `state` to a temp file and renames it over the document.
	/// Callers hold the flush lock.
	async fn persist(&self, state: &State) -> Result<(), BackendError> {
		let bytes = serde_json::to_vec_pretty(state)?;

		let mut tmp = self.path.clone().into_os_string();
		tmp.push(".tmp");
		let tmp = PathBuf::from(tmp);

		fs::write(&tmp, bytes).await?;
		fs::rename(&tmp, &self.path).await?;
		Ok(())
	}
}

#[async_trait]
impl Backend for FileBackend {
	async fn load(&self) -> Result<State, BackendError> {
		self.memory.load().await
	}

	async fn write(&self, items: State) -> Result<(), BackendError> {
		let _guard = self.flush.lock().await;
		let staged = self.memory.stage_write(items)?;
		self.persist(&staged.next).await?;
		self.memory.commit(staged);
		Ok(())
	}

	async fn remove(&self, keys: &[String]) -> Result<(), BackendError> {
		let _guard = self.flush.lock().await;
		let staged = self.memory.stage_remove(keys)?;
		self.persist(&staged.next).await?;
		self.memory.commit(staged);
		Ok(())
	}

	fn watch(&self, listener: ChangeListener) -> WatchId {
		self.memory.watch(listener)
	}

	fn unwatch(&self, id: WatchId) {
		self.memory.unwatch(id);
	}

	async fn bytes_in_use(&self, key: Option<&str>) -> Result<u64, BackendError> {
		self.memory.bytes_in_use(key).await
	}

	fn limits(&self) -> Limits {
		self.memory.limits()
	}
}

impl std::fmt::Debug for FileBackend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FileBackend")
			.field("path", &self.path)
			.field("memory", &self.memory)
			.finish_non_exhaustive()
	}
}
