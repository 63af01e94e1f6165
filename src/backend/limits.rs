/* src/backend/limits.rs */

use serde::{Deserialize, Serialize};

/// Capacity constants declared by a storage area. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Limits {
	pub max_items: Option<u64>,
	/// Informational; not enforced by the bundled backends.
	pub max_sustained_write_operations_per_minute: Option<u64>,
	pub max_write_operations_per_hour: Option<u64>,
	pub max_write_operations_per_minute: Option<u64>,
	pub quota_bytes: Option<u64>,
	pub quota_bytes_per_item: Option<u64>,
}

impl Limits {
	/// The small, rate-limited area synchronized across devices.
	pub const fn sync() -> Self {
		Self {
			max_items: Some(512),
			max_sustained_write_operations_per_minute: Some(1_000_000),
			max_write_operations_per_hour: Some(1_800),
			max_write_operations_per_minute: Some(120),
			quota_bytes: Some(102_400),
			quota_bytes_per_item: Some(8_192),
		}
	}

	/// The device-local area: a byte quota and nothing else.
	pub const fn local() -> Self {
		Self {
			max_items: None,
			max_sustained_write_operations_per_minute: None,
			max_write_operations_per_hour: None,
			max_write_operations_per_minute: None,
			quota_bytes: Some(10_485_760),
			quota_bytes_per_item: None,
		}
	}

	pub const fn unlimited() -> Self {
		Self {
			max_items: None,
			max_sustained_write_operations_per_minute: None,
			max_write_operations_per_hour: None,
			max_write_operations_per_minute: None,
			quota_bytes: None,
			quota_bytes_per_item: None,
		}
	}
}

/// Result of a byte-usage query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytesInUse {
	pub bytes: u64,
	/// The per-item quota for a key query, the total quota otherwise.
	pub quota: Option<u64>,
}
