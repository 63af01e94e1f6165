/* src/mirror/read.rs */

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Mirror, MirrorError};
use crate::path::IntoPath;
use crate::state::{State, lookup};

impl Mirror {
	/// Reads a copy of the value at `path`; `None` when it does not exist.
	///
	/// The root path yields the whole state as a mapping.
	pub fn get<P: IntoPath>(&self, path: P) -> Result<Option<Value>, MirrorError> {
		let path = path.into_path()?;
		Ok(lookup(&self.shared.state.load(), &path))
	}

	/// Returns a copy of the whole state.
	pub fn get_all(&self) -> State {
		(**self.shared.state.load()).clone()
	}

	/// Reads the value at `path` and deserializes it into `T`.
	pub fn get_as<T, P>(&self, path: P) -> Result<Option<T>, MirrorError>
	where
		T: DeserializeOwned,
		P: IntoPath,
	{
		match self.get(path)? {
			Some(value) => Ok(Some(serde_json::from_value(value)?)),
			None => Ok(None),
		}
	}

	/// Returns true if a value exists at `path`.
	pub fn contains<P: IntoPath>(&self, path: P) -> Result<bool, MirrorError> {
		Ok(self.get(path)?.is_some())
	}

	/// Top-level keys currently present.
	pub fn keys(&self) -> Vec<String> {
		self.shared.state.load().keys().cloned().collect()
	}
}
