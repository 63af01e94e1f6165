/* src/state/access.rs */

use serde_json::Value;

use super::{AccessError, State};
use crate::path::Path;

/// Reads the value at `path`, returning an owned copy.
///
/// The root yields the whole state as a mapping. Lists can be indexed by
/// numeric segments on the read side only.
pub fn lookup(state: &State, path: &Path) -> Option<Value> {
	let Some((first, rest)) = path.segments().split_first() else {
		return Some(Value::Object(state.clone()));
	};

	let mut current = state.get(first)?;
	for segment in rest {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current.clone())
}

/// Stores `value` at `path`, creating missing intermediate mappings.
///
/// Fails without touching `state` when an existing intermediate is not a
/// mapping: new mappings are only created below the deepest existing one,
/// so a conflict can never be found after something was inserted.
pub fn assign(state: &mut State, path: &Path, value: Value) -> Result<(), AccessError> {
	let (parent, last) = path.split_last().ok_or(AccessError::Root)?;

	let mut current: &mut State = state;
	for (depth, segment) in parent.iter().enumerate() {
		let slot = current
			.entry(segment.clone())
			.or_insert_with(|| Value::Object(State::new()));
		match slot {
			Value::Object(map) => current = map,
			_ => {
				return Err(AccessError::NestingConflict {
					path: path.prefix(depth + 1),
				});
			}
		}
	}

	current.insert(last.to_string(), value);
	Ok(())
}

/// Removes and returns the value at `path`.
pub fn delete(state: &mut State, path: &Path) -> Result<Value, AccessError> {
	let (parent, last) = path.split_last().ok_or(AccessError::Root)?;

	let mut current: &mut State = state;
	for (depth, segment) in parent.iter().enumerate() {
		match current.get_mut(segment) {
			Some(Value::Object(map)) => current = map,
			Some(_) => {
				return Err(AccessError::NestingConflict {
					path: path.prefix(depth + 1),
				});
			}
			None => return Err(AccessError::NotFound { path: path.clone() }),
		}
	}

	current
		.shift_remove(last)
		.ok_or_else(|| AccessError::NotFound { path: path.clone() })
}
