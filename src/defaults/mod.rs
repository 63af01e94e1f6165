/* src/defaults/mod.rs */

//!
//! Defaults documents: the structural defaults a mirror seeds on first load
//! and restores on reset. JSON is always available, TOML and YAML behind the
//! `toml` and `yaml` features.

use serde_json::Value;

use crate::state::State;

/// Error type for defaults parsing and loading.
#[derive(Debug, thiserror::Error)]
pub enum DefaultsError {
	#[error("invalid JSON defaults: {0}")]
	Json(#[from] serde_json::Error),

	#[cfg(feature = "toml")]
	#[error("invalid TOML defaults: {0}")]
	Toml(#[from] toml::de::Error),

	#[cfg(feature = "yaml")]
	#[error("invalid YAML defaults: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// The document parsed, but its root is not a mapping.
	#[error("defaults root must be a mapping")]
	NotMapping,

	/// No enabled parser handles this file extension.
	#[error("unsupported defaults document: {0}")]
	UnsupportedFormat(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// A validated defaults mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults(State);

impl Defaults {
	pub fn new(state: State) -> Self {
		Self(state)
	}

	pub fn from_json_str(input: &str) -> Result<Self, DefaultsError> {
		let value: Value = serde_json::from_str(input)?;
		Self::try_from(value)
	}

	#[cfg(feature = "toml")]
	pub fn from_toml_str(input: &str) -> Result<Self, DefaultsError> {
		let value: Value = toml::from_str(input)?;
		Self::try_from(value)
	}

	#[cfg(feature = "yaml")]
	pub fn from_yaml_str(input: &str) -> Result<Self, DefaultsError> {
		let value: Value = serde_yaml::from_str(input)?;
		Self::try_from(value)
	}

	/// Reads a document from disk. The extension (case-insensitive) picks
	/// the parser: `json`, `toml`, `yaml` or `yml`.
	#[cfg(feature = "fs")]
	pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, DefaultsError> {
		let path = path.as_ref();
		let ext = path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(str::to_ascii_lowercase)
			.unwrap_or_default();

		let parse: fn(&str) -> Result<Self, DefaultsError> = match ext.as_str() {
			"json" => Self::from_json_str,
			#[cfg(feature = "toml")]
			"toml" => Self::from_toml_str,
			#[cfg(feature = "yaml")]
			"yaml" | "yml" => Self::from_yaml_str,
			_ => return Err(DefaultsError::UnsupportedFormat(path.display().to_string())),
		};

		let text = tokio::fs::read_to_string(path).await?;
		parse(&text)
	}

	pub fn as_state(&self) -> &State {
		&self.0
	}

	pub fn into_state(self) -> State {
		self.0
	}
}

impl TryFrom<Value> for Defaults {
	type Error = DefaultsError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Object(state) => Ok(Self(state)),
			_ => Err(DefaultsError::NotMapping),
		}
	}
}

impl From<Defaults> for State {
	fn from(defaults: Defaults) -> Self {
		defaults.0
	}
}
