/* src/mirror/config.rs */

use serde::{Deserialize, Serialize};

/// Configuration for a mirror instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
	/// Storage area label, used in log lines.
	pub area: String,

	/// Write the top-level keys that received defaults back to the backend
	/// after the first load.
	pub seed_defaults: bool,

	/// Capacity of the event broadcast channel.
	///
	/// Slow receivers miss events once the channel fills up.
	pub event_capacity: usize,
}

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

impl Default for MirrorConfig {
	fn default() -> Self {
		Self {
			area: "sync".to_string(),
			seed_defaults: true,
			event_capacity: DEFAULT_EVENT_CAPACITY,
		}
	}
}
