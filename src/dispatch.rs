/* src/dispatch.rs */

//!
//! Path-prefix subscriber registry.

use std::cell::Cell;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::path::Path;

/// Callback invoked with a copy of the value at the subscribed path
/// (`None` when the path no longer exists).
pub type UpdateCallback = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// A registered interest in one path.
#[derive(Clone)]
pub struct Subscription {
	pub path: Path,
	pub namespace: Option<String>,
	callback: UpdateCallback,
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("path", &self.path.to_string())
			.field("namespace", &self.namespace)
			.finish_non_exhaustive()
	}
}

/// Ordered subscriber list.
///
/// Registration and removal swap in a new list (RCU), so a dispatch works
/// on a stable snapshot and callbacks may subscribe or unsubscribe freely;
/// such edits take effect from the next dispatch.
pub struct Dispatcher {
	entries: ArcSwap<Vec<Subscription>>,
}

impl Dispatcher {
	pub fn new() -> Self {
		Self {
			entries: ArcSwap::from_pointee(Vec::new()),
		}
	}

	/// Appends a subscription; registration order is notification order.
	pub fn subscribe(&self, path: Path, namespace: Option<String>, callback: UpdateCallback) {
		let subscription = Subscription {
			path,
			namespace,
			callback,
		};
		self.entries.rcu(|entries| {
			let mut next = (**entries).clone();
			next.push(subscription.clone());
			next
		});
	}

	/// Drops every subscription tagged with `namespace`. Returns how many went.
	pub fn unsubscribe(&self, namespace: &str) -> usize {
		let removed = Cell::new(0);
		self.entries.rcu(|entries| {
			let next: Vec<Subscription> = entries
				.iter()
				.filter(|entry| entry.namespace.as_deref() != Some(namespace))
				.cloned()
				.collect();
			removed.set(entries.len() - next.len());
			next
		});
		removed.get()
	}

	/// Drops every subscription. Returns how many went.
	pub fn clear(&self) -> usize {
		self.entries.swap(Arc::new(Vec::new())).len()
	}

	pub fn len(&self) -> usize {
		self.entries.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.load().is_empty()
	}

	/// Subscriptions overlapping any of `changed`, in registration order.
	pub fn matching(&self, changed: &[Path]) -> Vec<Subscription> {
		if changed.is_empty() {
			return Vec::new();
		}
		self.entries
			.load()
			.iter()
			.filter(|entry| changed.iter().any(|path| entry.path.overlaps(path)))
			.cloned()
			.collect()
	}

	/// Invokes each matching subscriber once with `value_at(its path)`.
	/// Returns the number of callbacks run.
	pub fn notify<F>(&self, changed: &[Path], value_at: F) -> usize
	where
		F: Fn(&Path) -> Option<Value>,
	{
		let matched = self.matching(changed);
		for entry in &matched {
			(entry.callback)(value_at(&entry.path));
		}
		matched.len()
	}
}

impl Default for Dispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("entries", &**self.entries.load())
			.finish()
	}
}
