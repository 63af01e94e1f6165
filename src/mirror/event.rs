/* src/mirror/event.rs */

use crate::path::Path;

/// Events emitted by the mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorEvent {
	/// Defaults were merged in and these top-level keys were written back.
	Seeded { keys: Vec<String> },
	/// Another writer changed these paths; subscribers were notified.
	Changed { paths: Vec<Path>, notified: usize },
	/// A reset/clear/root set finished; `removed` keys left the backend.
	Replaced { removed: Vec<String> },
}
