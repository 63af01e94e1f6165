/* src/mirror/builder.rs */

use std::sync::atomic::{AtomicBool, AtomicU8};
use std::sync::{Arc, Mutex, OnceLock};

use arc_swap::ArcSwap;

use super::{ErrorHook, Mirror, MirrorConfig, MirrorError, Pending, Phase, Shared};
use crate::backend::{Backend, BackendError, Change, ChangeListener};
use crate::dispatch::Dispatcher;
use crate::state::State;

/// Builder for [`Mirror`].
pub struct MirrorBuilder {
	backend: Option<Arc<dyn Backend>>,
	defaults: State,
	config: MirrorConfig,
	on_error: Option<ErrorHook>,
}

impl MirrorBuilder {
	pub fn new() -> Self {
		Self {
			backend: None,
			defaults: State::new(),
			config: MirrorConfig::default(),
			on_error: None,
		}
	}

	pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
		self.backend = Some(Arc::new(backend));
		self
	}

	/// Uses a backend handle that is also held elsewhere.
	pub fn shared_backend(mut self, backend: Arc<dyn Backend>) -> Self {
		self.backend = Some(backend);
		self
	}

	/// Structural defaults merged into the first load and restored by `reset`.
	pub fn defaults(mut self, defaults: impl Into<State>) -> Self {
		self.defaults = defaults.into();
		self
	}

	pub fn config(mut self, config: MirrorConfig) -> Self {
		self.config = config;
		self
	}

	pub fn area(mut self, area: impl Into<String>) -> Self {
		self.config.area = area.into();
		self
	}

	pub fn seed_defaults(mut self, seed: bool) -> Self {
		self.config.seed_defaults = seed;
		self
	}

	/// Called with every backend failure, before the failing call returns it.
	pub fn on_error<F>(mut self, f: F) -> Self
	where
		F: Fn(&BackendError) + Send + Sync + 'static,
	{
		self.on_error = Some(Arc::new(f));
		self
	}

	/// Creates the unready handle and starts listening for backend changes.
	pub fn build(self) -> Result<Pending, MirrorError> {
		let backend = self
			.backend
			.ok_or_else(|| MirrorError::Builder("backend is required".to_string()))?;

		#[cfg(feature = "events")]
		let events = tokio::sync::broadcast::channel(self.config.event_capacity.max(1)).0;

		let shared = Arc::new(Shared {
			backend,
			config: self.config,
			defaults: Arc::new(self.defaults),
			state: ArcSwap::from_pointee(State::new()),
			phase: AtomicU8::new(Phase::Uninitialized as u8),
			replacing: AtomicBool::new(false),
			backlog: Mutex::new(Some(Vec::new())),
			dispatcher: Dispatcher::new(),
			watch: OnceLock::new(),
			on_error: self.on_error,
			#[cfg(feature = "events")]
			events,
		});

		let weak = Arc::downgrade(&shared);
		let listener: ChangeListener = Arc::new(move |changes: &[Change]| {
			if let Some(shared) = weak.upgrade() {
				shared.on_changes(changes);
			}
		});
		let id = shared.backend.watch(listener);
		let _ = shared.watch.set(id);

		Ok(Pending { shared })
	}

	/// Builds and waits for the first load.
	pub async fn open(self) -> Result<Mirror, MirrorError> {
		self.build()?.ready().await
	}
}

impl Default for MirrorBuilder {
	fn default() -> Self {
		Self::new()
	}
}
