/* src/state/diff.rs */

use serde_json::Value;

use super::State;
use crate::path::Path;

/// Computes the paths that changed when top-level `key` went from `old` to
/// `new`.
///
/// Two mappings are compared member by member and only differing leaves are
/// reported. A non-empty mapping that became empty is reported once at its
/// own path rather than per removed member. Any other replacement, including
/// a change of type, is reported at `key` itself. Lists compare by value.
pub fn diff_paths(key: &str, old: Option<&Value>, new: &Value) -> Vec<Path> {
	let at = Path::key(key);
	let mut out = Vec::new();

	match (old, new) {
		(Some(Value::Object(old)), Value::Object(new)) => walk(&at, old, new, &mut out),
		(Some(old), new) if old == new => {}
		_ => out.push(at),
	}

	out
}

fn walk(at: &Path, old: &State, new: &State, out: &mut Vec<Path>) {
	if new.is_empty() {
		if !old.is_empty() {
			out.push(at.clone());
		}
		return;
	}

	for (key, new_value) in new {
		match (old.get(key), new_value) {
			(Some(Value::Object(old)), Value::Object(new)) => walk(&at.child(key), old, new, out),
			(Some(old), new) if old == new => {}
			_ => out.push(at.child(key)),
		}
	}

	for key in old.keys() {
		if !new.contains_key(key) {
			out.push(at.child(key));
		}
	}
}
