/* src/mirror/mod.rs */

//!
//! The synchronizing mirror.
//!
//! - [`MirrorBuilder`] - wires a backend, defaults and configuration
//! - [`Pending`] - handle before the first load (subscriptions, limits)
//! - [`Mirror`] - ready handle exposing path reads and writes

mod builder;
mod config;
mod error;
#[cfg(feature = "events")]
mod event;
mod lifecycle;
mod read;
mod reconcile;
mod replace;
mod write;

pub use builder::MirrorBuilder;
pub use config::{DEFAULT_EVENT_CAPACITY, MirrorConfig};
pub use error::MirrorError;
#[cfg(feature = "events")]
pub use event::MirrorEvent;
pub use lifecycle::{Pending, Phase};

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::backend::{Backend, BackendError, BytesInUse, Change, Limits, WatchId};
use crate::dispatch::Dispatcher;
use crate::path::{IntoPath, Path};
use crate::state::{State, lookup};

#[cfg(feature = "events")]
use tokio::sync::broadcast;

/// Hook invoked with every backend failure before it is returned.
pub type ErrorHook = Arc<dyn Fn(&BackendError) + Send + Sync>;

/// State shared by [`Pending`], [`Mirror`] and the backend change listener.
pub(crate) struct Shared {
	pub(crate) backend: Arc<dyn Backend>,
	pub(crate) config: MirrorConfig,
	pub(crate) defaults: Arc<State>,
	pub(crate) state: ArcSwap<State>,
	pub(crate) phase: AtomicU8,
	/// Open while a seeding or replace-all write is in flight.
	pub(crate) replacing: AtomicBool,
	/// Change batches received before the gate opened; `None` once ready.
	pub(crate) backlog: Mutex<Option<Vec<Vec<Change>>>>,
	pub(crate) dispatcher: Dispatcher,
	pub(crate) watch: OnceLock<WatchId>,
	pub(crate) on_error: Option<ErrorHook>,
	#[cfg(feature = "events")]
	pub(crate) events: broadcast::Sender<MirrorEvent>,
}

impl Shared {
	pub(crate) fn phase(&self) -> Phase {
		Phase::from_u8(self.phase.load(Ordering::SeqCst))
	}

	pub(crate) fn set_phase(&self, phase: Phase) {
		self.phase.store(phase as u8, Ordering::SeqCst);
	}

	pub(crate) fn value_at(&self, path: &Path) -> Option<Value> {
		lookup(&self.state.load(), path)
	}

	/// Logs and forwards a backend failure to the error hook, then wraps it.
	pub(crate) fn report(&self, error: BackendError) -> MirrorError {
		#[cfg(feature = "logging")]
		log::warn!("[{}] backend failure: {}", self.config.area, error);
		if let Some(hook) = &self.on_error {
			hook(&error);
		}
		MirrorError::Backend(error)
	}

	pub(crate) fn subscribe<P, F>(
		&self,
		path: P,
		namespace: Option<String>,
		callback: F,
	) -> Result<(), MirrorError>
	where
		P: IntoPath,
		F: Fn(Option<Value>) + Send + Sync + 'static,
	{
		let path = path.into_path()?;
		self.dispatcher.subscribe(path, namespace, Arc::new(callback));
		Ok(())
	}

	pub(crate) async fn bytes_in_use(&self, key: Option<&str>) -> Result<BytesInUse, MirrorError> {
		let bytes = self
			.backend
			.bytes_in_use(key)
			.await
			.map_err(|e| self.report(e))?;
		let limits = self.backend.limits();
		let quota = match key {
			Some(_) => limits.quota_bytes_per_item,
			None => limits.quota_bytes,
		};
		Ok(BytesInUse { bytes, quota })
	}

	#[cfg(feature = "events")]
	pub(crate) fn emit(&self, event: MirrorEvent) {
		let _ = self.events.send(event);
	}
}

impl Drop for Shared {
	fn drop(&mut self) {
		if let Some(id) = self.watch.get() {
			self.backend.unwatch(*id);
		}
	}
}

/// Closes the self-write window when dropped, whatever the write's outcome.
pub(crate) struct SelfWriteWindow<'a> {
	flag: &'a AtomicBool,
}

impl<'a> SelfWriteWindow<'a> {
	pub(crate) fn open(flag: &'a AtomicBool) -> Result<Self, MirrorError> {
		flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.map_err(|_| MirrorError::ReplaceInFlight)?;
		Ok(Self { flag })
	}
}

impl Drop for SelfWriteWindow<'_> {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::SeqCst);
	}
}

/// A ready mirror of one storage area.
///
/// Clones share the same materialized state and subscriber list. Every
/// value handed out is an owned copy; the only way to change the state is
/// through this handle or through the backend.
#[derive(Clone)]
pub struct Mirror {
	pub(crate) shared: Arc<Shared>,
}

impl Mirror {
	pub fn builder() -> MirrorBuilder {
		MirrorBuilder::new()
	}

	/// Registers `callback` for changes overlapping `path` made by other writers.
	pub fn on_update<P, F>(&self, path: P, callback: F) -> Result<&Self, MirrorError>
	where
		P: IntoPath,
		F: Fn(Option<Value>) + Send + Sync + 'static,
	{
		self.shared.subscribe(path, None, callback)?;
		Ok(self)
	}

	/// Like [`on_update`](Mirror::on_update), tagged with `namespace` so it
	/// can be removed with [`off_update`](Mirror::off_update).
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

	/// Removes the subscriptions registered under `namespace`.
	pub fn off_update(&self, namespace: &str) -> &Self {
		self.shared.dispatcher.unsubscribe(namespace);
		self
	}

	/// Removes every subscription.
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

	pub fn config(&self) -> &MirrorConfig {
		&self.shared.config
	}

	/// Subscribes to mirror events.
	#[cfg(feature = "events")]
	pub fn events(&self) -> broadcast::Receiver<MirrorEvent> {
		self.shared.events.subscribe()
	}
}

impl std::fmt::Debug for Mirror {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mirror")
			.field("area", &self.shared.config.area)
			.field("keys", &self.shared.state.load().len())
			.field("subscriptions", &self.shared.dispatcher.len())
			.finish_non_exhaustive()
	}
}
