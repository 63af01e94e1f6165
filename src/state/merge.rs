/* src/state/merge.rs */

use serde_json::Value;

use super::State;

/// Result of merging a loaded snapshot with defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
	/// The loaded snapshot with every missing default filled in.
	pub state: State,
	/// Top-level keys that received at least one default, in defaults order.
	pub seeded: Vec<String>,
}

/// Fills keys missing from `loaded` with the values from `defaults`.
///
/// Mappings present on both sides are merged recursively; any other value
/// already present in `loaded` wins, including `null` and values of a
/// different type than the default. Keys only present in `loaded` are kept.
/// Seeding is tracked per top-level key because that is the unit the
/// backend persists. Neither argument is modified.
pub fn merge_defaults(loaded: &State, defaults: &State) -> Merged {
	let mut state = loaded.clone();
	let mut seeded: Vec<String> = Vec::new();

	for (key, default) in defaults {
		let changed = match state.get_mut(key) {
			None => {
				state.insert(key.clone(), default.clone());
				true
			}
			Some(current) => fill_missing(current, default),
		};
		if changed && !seeded.contains(key) {
			seeded.push(key.clone());
		}
	}

	Merged { state, seeded }
}

fn fill_missing(current: &mut Value, default: &Value) -> bool {
	let (Value::Object(current), Value::Object(default)) = (current, default) else {
		return false;
	};

	let mut changed = false;
	for (key, default) in default {
		match current.get_mut(key) {
			None => {
				current.insert(key.clone(), default.clone());
				changed = true;
			}
			Some(existing) => changed |= fill_missing(existing, default),
		}
	}
	changed
}
