/* src/backend/memory.rs */

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use super::{Backend, BackendError, Change, ChangeListener, Limits, WatchId};
use crate::state::State;
use crate::sync::lock;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// An in-process backend.
///
/// Clones share the same store and listener list, so two mirrors built over
/// clones of one `MemoryBackend` observe each other's writes the way two
/// execution contexts sharing a storage area would.
#[derive(Clone)]
pub struct MemoryBackend {
	inner: Arc<Inner>,
}

struct Inner {
	data: Mutex<State>,
	listeners: Mutex<Vec<(WatchId, ChangeListener)>>,
	next_watch: AtomicU64,
	writes: Mutex<VecDeque<Instant>>,
	available: AtomicBool,
	limits: Limits,
}

/// A mutation computed against the current store but not yet applied.
pub(crate) struct Staged {
	pub(crate) next: State,
	changes: Vec<Change>,
}

/// Bytes an entry occupies: key length plus its JSON encoding.
fn item_bytes(key: &str, value: &Value) -> u64 {
	let encoded = serde_json::to_vec(value).map_or(0, |bytes| bytes.len());
	(key.len() + encoded) as u64
}

fn total_bytes(state: &State) -> u64 {
	state.iter().map(|(key, value)| item_bytes(key, value)).sum()
}

impl MemoryBackend {
	/// Creates an empty, unlimited store.
	pub fn new() -> Self {
		Self::with_limits(Limits::unlimited())
	}

	/// Creates an empty store enforcing `limits`.
	pub fn with_limits(limits: Limits) -> Self {
		Self {
			inner: Arc::new(Inner {
				data: Mutex::new(State::new()),
				listeners: Mutex::new(Vec::new()),
				next_watch: AtomicU64::new(0),
				writes: Mutex::new(VecDeque::new()),
				available: AtomicBool::new(true),
				limits,
			}),
		}
	}

	/// Replaces the stored data without emitting change events.
	pub fn with_state(self, state: State) -> Self {
		*lock(&self.inner.data) = state;
		self
	}

	/// Returns a copy of everything currently stored.
	pub fn snapshot(&self) -> State {
		lock(&self.inner.data).clone()
	}

	/// Toggles availability; while unavailable every async call fails.
	pub fn set_available(&self, available: bool) {
		self.inner.available.store(available, Ordering::SeqCst);
	}

	/// Number of attached change listeners.
	pub fn watcher_count(&self) -> usize {
		lock(&self.inner.listeners).len()
	}

	fn ensure_available(&self) -> Result<(), BackendError> {
		if self.inner.available.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(BackendError::Unavailable)
		}
	}

	/// Checks the write-rate ceilings and records one write when allowed.
	fn admit_write(&self) -> Result<(), BackendError> {
		let limits = &self.inner.limits;
		if limits.max_write_operations_per_hour.is_none()
			&& limits.max_write_operations_per_minute.is_none()
		{
			return Ok(());
		}

		let now = Instant::now();
		let mut writes = lock(&self.inner.writes);

		while writes
			.front()
			.is_some_and(|at| now.duration_since(*at) >= HOUR)
		{
			writes.pop_front();
		}

		if let Some(max) = limits.max_write_operations_per_hour
			&& writes.len() as u64 >= max
		{
			return Err(BackendError::RateLimited {
				window: "hour",
				max,
			});
		}

		if let Some(max) = limits.max_write_operations_per_minute {
			let recent = writes
				.iter()
				.filter(|at| now.duration_since(**at) < MINUTE)
				.count() as u64;
			if recent >= max {
				return Err(BackendError::RateLimited {
					window: "minute",
					max,
				});
			}
		}

		writes.push_back(now);
		Ok(())
	}

	fn check_quota(&self, next: &State, items: &State) -> Result<(), BackendError> {
		let limits = &self.inner.limits;

		if let Some(quota) = limits.quota_bytes_per_item {
			for (key, value) in items {
				let bytes = item_bytes(key, value);
				if bytes > quota {
					return Err(BackendError::ItemQuota {
						key: key.clone(),
						bytes,
						quota,
					});
				}
			}
		}

		if let Some(max) = limits.max_items {
			let count = next.len() as u64;
			if count > max {
				return Err(BackendError::MaxItems { count, max });
			}
		}

		if let Some(quota) = limits.quota_bytes {
			let bytes = total_bytes(next);
			if bytes > quota {
				return Err(BackendError::Quota { bytes, quota });
			}
		}

		Ok(())
	}

	/// Computes the store after writing `items`, without applying it.
	fn plan_write(&self, data: &State, items: State) -> Result<Staged, BackendError> {
		let mut next = data.clone();
		for (key, value) in &items {
			next.insert(key.clone(), value.clone());
		}
		self.check_quota(&next, &items)?;
		self.admit_write()?;

		let changes = items
			.into_iter()
			.filter_map(|(key, value)| {
				let old_value = data.get(&key).cloned();
				(old_value.as_ref() != Some(&value)).then(|| Change {
					key,
					old_value,
					new_value: Some(value),
				})
			})
			.collect();
		Ok(Staged { next, changes })
	}

	/// Computes the store after removing `keys`, without applying it.
	fn plan_remove(&self, data: &State, keys: &[String]) -> Result<Staged, BackendError> {
		self.admit_write()?;

		let mut next = data.clone();
		let mut changes = Vec::new();
		for key in keys {
			if let Some(old_value) = next.shift_remove(key) {
				changes.push(Change {
					key: key.clone(),
					old_value: Some(old_value),
					new_value: None,
				});
			}
		}
		Ok(Staged { next, changes })
	}

	#[cfg(feature = "fs")]
	pub(crate) fn stage_write(&self, items: State) -> Result<Staged, BackendError> {
		self.ensure_available()?;
		let data = lock(&self.inner.data);
		self.plan_write(&data, items)
	}

	#[cfg(feature = "fs")]
	pub(crate) fn stage_remove(&self, keys: &[String]) -> Result<Staged, BackendError> {
		self.ensure_available()?;
		let data = lock(&self.inner.data);
		self.plan_remove(&data, keys)
	}

	#[cfg(feature = "fs")]
	/// Applies a staged mutation and notifies the listeners.
	///
	/// The caller must ensure nothing else mutated the store since staging.
	pub(crate) fn commit(&self, staged: Staged) {
		let Staged { next, changes } = staged;
		*lock(&self.inner.data) = next;
		self.notify(&changes);
	}

	fn notify(&self, changes: &[Change]) {
		if changes.is_empty() {
			return;
		}
		let listeners: Vec<ChangeListener> = lock(&self.inner.listeners)
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect();
		for listener in listeners {
			listener(changes);
		}
	}
}

impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for MemoryBackend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryBackend")
			.field("items", &lock(&self.inner.data).len())
			.field("watchers", &self.watcher_count())
			.field("limits", &self.inner.limits)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl Backend for MemoryBackend {
	async fn load(&self) -> Result<State, BackendError> {
		self.ensure_available()?;
		Ok(self.snapshot())
	}

	async fn write(&self, items: State) -> Result<(), BackendError> {
		self.ensure_available()?;

		let changes = {
			let mut data = lock(&self.inner.data);
			let Staged { next, changes } = self.plan_write(&data, items)?;
			*data = next;
			changes
		};

		self.notify(&changes);
		Ok(())
	}

	async fn remove(&self, keys: &[String]) -> Result<(), BackendError> {
		self.ensure_available()?;

		let changes = {
			let mut data = lock(&self.inner.data);
			let Staged { next, changes } = self.plan_remove(&data, keys)?;
			*data = next;
			changes
		};

		self.notify(&changes);
		Ok(())
	}

	fn watch(&self, listener: ChangeListener) -> WatchId {
		let id = WatchId::new(self.inner.next_watch.fetch_add(1, Ordering::SeqCst));
		lock(&self.inner.listeners).push((id, listener));
		id
	}

	fn unwatch(&self, id: WatchId) {
		lock(&self.inner.listeners).retain(|(watch, _)| *watch != id);
	}

	async fn bytes_in_use(&self, key: Option<&str>) -> Result<u64, BackendError> {
		self.ensure_available()?;
		let data = lock(&self.inner.data);
		Ok(match key {
			Some(key) => data.get(key).map_or(0, |value| item_bytes(key, value)),
			None => total_bytes(&data),
		})
	}

	fn limits(&self) -> Limits {
		self.inner.limits
	}
}
