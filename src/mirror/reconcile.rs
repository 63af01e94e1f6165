/* src/mirror/reconcile.rs */

use std::cell::RefCell;
use std::sync::atomic::Ordering;

use super::Shared;
use crate::backend::Change;
use crate::path::Path;
use crate::state::diff_paths;
use crate::sync::lock;

#[cfg(feature = "events")]
use super::MirrorEvent;

impl Shared {
	/// Entry point of the backend change listener.
	///
	/// Batches arriving before the gate opens are queued and replayed by
	/// `open_gate`.
	pub(crate) fn on_changes(&self, changes: &[Change]) {
		{
			let mut backlog = lock(&self.backlog);
			if let Some(queue) = backlog.as_mut() {
				queue.push(changes.to_vec());
				return;
			}
		}
		self.reconcile(changes);
	}

	/// Applies a batch to the state and notifies the subscribers whose
	/// paths overlap what changed. Returns the number of callbacks run.
	///
	/// The batch is always applied. Dispatch is skipped while a self-write
	/// window is open. A removal of a key this mirror no longer holds (the
	/// echo of its own `remove`) reports nothing.
	pub(crate) fn reconcile(&self, changes: &[Change]) -> usize {
		// Capture changed paths inside rcu so they match the stored state.
		let changed: RefCell<Vec<Path>> = RefCell::new(Vec::new());

		self.state.rcu(|current| {
			let mut next = (**current).clone();
			let mut paths = Vec::new();
			for change in changes {
				match &change.new_value {
					None => {
						if next.shift_remove(&change.key).is_some() {
							paths.push(Path::key(&change.key));
						}
					}
					Some(value) => {
						paths.extend(diff_paths(&change.key, next.get(&change.key), value));
						next.insert(change.key.clone(), value.clone());
					}
				}
			}
			*changed.borrow_mut() = paths;
			next
		});

		let changed = changed.into_inner();
		if changed.is_empty() {
			return 0;
		}

		if self.replacing.load(Ordering::SeqCst) {
			#[cfg(feature = "logging")]
			log::debug!(
				"[{}] self-write window open, {} changed paths not dispatched",
				self.config.area,
				changed.len()
			);
			return 0;
		}

		let notified = self
			.dispatcher
			.notify(&changed, |path| self.value_at(path));

		#[cfg(feature = "logging")]
		log::debug!(
			"[{}] {} paths changed, {} subscribers notified",
			self.config.area,
			changed.len(),
			notified
		);

		#[cfg(feature = "events")]
		self.emit(MirrorEvent::Changed {
			paths: changed,
			notified,
		});

		notified
	}
}
