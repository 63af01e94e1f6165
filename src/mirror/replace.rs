/* src/mirror/replace.rs */

use std::sync::Arc;

use super::{Mirror, MirrorError, SelfWriteWindow, Shared};
use crate::state::State;

#[cfg(feature = "events")]
use super::MirrorEvent;

impl Mirror {
	/// Replaces the whole state with the defaults.
	pub async fn reset(&self) -> Result<&Self, MirrorError> {
		let defaults = (*self.shared.defaults).clone();
		self.shared.replace_all(defaults).await?;
		Ok(self)
	}

	/// Removes every key.
	pub async fn clear(&self) -> Result<&Self, MirrorError> {
		self.shared.replace_all(State::new()).await?;
		Ok(self)
	}
}

impl Shared {
	/// Swaps in `next`, removes the top-level keys it lacks from the backend
	/// and writes it in full.
	///
	/// Both round-trips run inside one self-write window: their echoes are
	/// applied but never dispatched, and a second replace started before
	/// the first settles fails with [`MirrorError::ReplaceInFlight`].
	pub(crate) async fn replace_all(&self, next: State) -> Result<(), MirrorError> {
		let _window = SelfWriteWindow::open(&self.replacing)?;

		let next = Arc::new(next);
		let previous = self.state.swap(Arc::clone(&next));
		let removed: Vec<String> = previous
			.keys()
			.filter(|key| !next.contains_key(*key))
			.cloned()
			.collect();

		if !removed.is_empty() {
			self.backend
				.remove(&removed)
				.await
				.map_err(|e| self.report(e))?;
		}
		if !next.is_empty() {
			self.backend
				.write((*next).clone())
				.await
				.map_err(|e| self.report(e))?;
		}

		#[cfg(feature = "logging")]
		log::info!(
			"[{}] replaced state: {} keys written, {} removed",
			self.config.area,
			next.len(),
			removed.len()
		);

		#[cfg(feature = "events")]
		self.emit(MirrorEvent::Replaced { removed });

		Ok(())
	}
}
