/* src/mirror/lifecycle.rs */

//!
//! The unready handle and the first load.

use std::sync::Arc;

use serde_json::Value;

use super::{Mirror, MirrorError, SelfWriteWindow, Shared};
use crate::backend::{BytesInUse, Limits};
use crate::path::IntoPath;
use crate::state::{Merged, State, merge_defaults};
use crate::sync::lock;

#[cfg(feature = "events")]
use super::MirrorEvent;

/// Initialization progress. `Ready` is reached once and never left.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Uninitialized = 0,
	Loading = 1,
	Ready = 2,
}

impl Phase {
	pub(crate) fn from_u8(raw: u8) -> Self {
		match raw {
			0 => Self::Uninitialized,
			1 => Self::Loading,
			_ => Self::Ready,
		}
	}
}

/// A mirror whose first load has not completed.
///
/// Only subscription management and capacity introspection are available;
/// path reads and writes need the [`Mirror`] returned by
/// [`ready`](Pending::ready). Subscriptions registered here carry over.
pub struct Pending {
	pub(crate) shared: Arc<Shared>,
}

impl Pending {
	pub fn phase(&self) -> Phase {
		self.shared.phase()
	}

	pub fn on_update<P, F>(&self, path: P, callback: F) -> Result<&Self, MirrorError>
	where
		P: IntoPath,
		F: Fn(Option<Value>) + Send + Sync + 'static,
	{
		self.shared.subscribe(path, None, callback)?;
		Ok(self)
	}

	pub fn on_update_in<P, F>(
		&self,
		namespace: impl Into<String>,
		path: P,
		callback: F,
	) -> Result<&Self, MirrorError>
	where
		P: IntoPath,
		F: Fn(Option<Value>) + Send + Sync + 'static,
	{
		self.shared.subscribe(path, Some(namespace.into()), callback)?;
		Ok(self)
	}

	pub fn off_update(&self, namespace: &str) -> &Self {
		self.shared.dispatcher.unsubscribe(namespace);
		self
	}

	pub fn off_all(&self) -> &Self {
		self.shared.dispatcher.clear();
		self
	}

	pub fn limits(&self) -> Limits {
		self.shared.backend.limits()
	}

	pub async fn bytes_in_use(&self, key: Option<&str>) -> Result<BytesInUse, MirrorError> {
		self.shared.bytes_in_use(key).await
	}

	#[cfg(feature = "events")]
	pub fn events(&self) -> tokio::sync::broadcast::Receiver<MirrorEvent> {
		self.shared.events.subscribe()
	}

	/// Loads the backend, merges the defaults and opens the gate.
	///
	/// Top-level keys that received defaults are written back (unless
	/// seeding is disabled) inside a self-write window. Changes reported by
	/// the backend while loading are replayed once the merged state is in
	/// place, so nothing that raced the load is lost.
	pub async fn ready(self) -> Result<Mirror, MirrorError> {
		let shared = self.shared;
		shared.set_phase(Phase::Loading);

		let loaded = shared.backend.load().await.map_err(|e| shared.report(e))?;
		let Merged { state, seeded } = merge_defaults(&loaded, &shared.defaults);

		#[cfg(feature = "logging")]
		log::info!(
			"[{}] loaded {} keys, {} seeded from defaults",
			shared.config.area,
			state.len(),
			seeded.len()
		);

		let items: State = seeded
			.iter()
			.filter_map(|key| state.get(key).map(|value| (key.clone(), value.clone())))
			.collect();
		shared.state.store(Arc::new(state));

		if shared.config.seed_defaults && !items.is_empty() {
			let _window = SelfWriteWindow::open(&shared.replacing)?;
			shared
				.backend
				.write(items)
				.await
				.map_err(|e| shared.report(e))?;

			#[cfg(feature = "logging")]
			log::debug!("[{}] seeded keys {:?}", shared.config.area, seeded);

			#[cfg(feature = "events")]
			shared.emit(MirrorEvent::Seeded { keys: seeded });
		}

		shared.open_gate();
		Ok(Mirror { shared })
	}
}

impl Shared {
	/// Replays queued batches and enters `Ready`, atomically with respect
	/// to the change listener.
	fn open_gate(&self) {
		let mut backlog = lock(&self.backlog);
		let queued = backlog.take().unwrap_or_default();
		for changes in &queued {
			self.reconcile(changes);
		}
		self.set_phase(Phase::Ready);
	}
}

impl std::fmt::Debug for Pending {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pending")
			.field("area", &self.shared.config.area)
			.field("phase", &self.phase())
			.finish_non_exhaustive()
	}
}
