/* src/mirror/write.rs */

use std::cell::RefCell;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{Mirror, MirrorError, Shared};
use crate::path::{IntoPath, Path};
use crate::state::{AccessError, State, assign, delete};

impl Mirror {
	/// Stores `value` at `path` and writes the path's top-level key.
	///
	/// Missing intermediate mappings are created. Setting the root replaces
	/// the whole state and requires a mapping. The local state is updated
	/// before the backend call, so it keeps the new value even if the write
	/// fails; the failure is still returned.
	pub async fn set<P: IntoPath>(
		&self,
		path: P,
		value: impl Into<Value>,
	) -> Result<&Self, MirrorError> {
		let path = path.into_path()?;
		let value = value.into();

		let Some(key) = path.top_key().map(str::to_string) else {
			let Value::Object(state) = value else {
				return Err(MirrorError::RootNotMapping);
			};
			self.shared.replace_all(state).await?;
			return Ok(self);
		};

		let entry = self
			.shared
			.mutate(&key, |state| assign(state, &path, value.clone()))?;
		self.shared.persist(key, entry).await?;
		Ok(self)
	}

	/// Serializes `value` and stores it at `path`.
	pub async fn set_serialized<P, T>(&self, path: P, value: &T) -> Result<&Self, MirrorError>
	where
		P: IntoPath,
		T: Serialize + ?Sized,
	{
		let value = serde_json::to_value(value)?;
		self.set(path, value).await
	}

	/// Removes the value at `path`; fails if it does not exist.
	///
	/// Removing a top-level key deletes it from the backend, anything deeper
	/// rewrites the owning top-level key.
	pub async fn remove<P: IntoPath>(&self, path: P) -> Result<&Self, MirrorError> {
		self.remove_path(path.into_path()?, false).await
	}

	/// Like [`remove`](Mirror::remove), but a missing path is a no-op.
	pub async fn remove_if_exists<P: IntoPath>(&self, path: P) -> Result<&Self, MirrorError> {
		self.remove_path(path.into_path()?, true).await
	}

	async fn remove_path(&self, path: Path, skip_missing: bool) -> Result<&Self, MirrorError> {
		let key = path.top_key().ok_or(AccessError::Root)?.to_string();

		match self.shared.mutate(&key, |state| delete(state, &path).map(drop)) {
			Ok(entry) => {
				self.shared.persist(key, entry).await?;
				Ok(self)
			}
			Err(AccessError::NotFound { .. }) if skip_missing => Ok(self),
			Err(e) => Err(e.into()),
		}
	}
}

impl Shared {
	/// Applies `f` to a copy of the state and swaps it in (RCU). Returns the
	/// resulting value of top-level `key`. On error the state is untouched.
	pub(crate) fn mutate<F>(&self, key: &str, mut f: F) -> Result<Option<Value>, AccessError>
	where
		F: FnMut(&mut State) -> Result<(), AccessError>,
	{
		// Capture the outcome inside rcu so it matches the stored state.
		let outcome: RefCell<Result<Option<Value>, AccessError>> = RefCell::new(Ok(None));

		self.state.rcu(|current| {
			let mut next = (**current).clone();
			match f(&mut next) {
				Ok(()) => {
					*outcome.borrow_mut() = Ok(next.get(key).cloned());
					Arc::new(next)
				}
				Err(e) => {
					*outcome.borrow_mut() = Err(e);
					Arc::clone(current)
				}
			}
		});

		outcome.into_inner()
	}

	/// Writes one top-level key, or removes it when `value` is `None`.
	pub(crate) async fn persist(&self, key: String, value: Option<Value>) -> Result<(), MirrorError> {
		let result = match value {
			Some(value) => {
				let mut items = State::new();
				items.insert(key, value);
				self.backend.write(items).await
			}
			None => self.backend.remove(&[key]).await,
		};
		result.map_err(|e| self.report(e))
	}
}
