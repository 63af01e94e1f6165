/* src/backend/error.rs */

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	/// The backend cannot currently serve requests.
	#[error("storage backend is unavailable")]
	Unavailable,

	/// A single item would exceed the per-item quota.
	#[error("quota exceeded for item `{key}`: {bytes} bytes > {quota}")]
	ItemQuota { key: String, bytes: u64, quota: u64 },

	/// The whole store would exceed its byte quota.
	#[error("storage quota exceeded: {bytes} bytes > {quota}")]
	Quota { bytes: u64, quota: u64 },

	/// The store would hold more items than allowed.
	#[error("item limit exceeded: {count} items > {max}")]
	MaxItems { count: u64, max: u64 },

	/// Too many write operations within the named window.
	#[error("write rate exceeded: more than {max} writes per {window}")]
	RateLimited { window: &'static str, max: u64 },

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
