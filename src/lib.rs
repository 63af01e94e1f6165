/* src/lib.rs */

//!
//! A reactive, path-addressable local mirror of an asynchronous key-value
//! backend.
//!
//! This crate integrates the following components:
//!
//! - **state**: Pure default merging, dotted-path access and structural diffing.
//! - **backend**: The injected storage capability (`Backend`) plus in-memory
//!   and file-backed implementations.
//! - **dispatch**: Path-prefix subscriber registry.
//! - **mirror**: The synchronizing engine (`Pending` → `Mirror`).
//! - **defaults**: Defaults documents from JSON, TOML or YAML.
//!
//! ## Feature Flags
//!
//! - `full`: Enables all features.
//! - `events`: Enables the `MirrorEvent` broadcast channel.
//! - `fs`: Enables `FileBackend` and `Defaults::from_file`.
//! - `toml`, `yaml`: Additional defaults document formats.
//! - `logging`: Emits `log` records for loads, replaces and dispatches.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use livemirror::{MemoryBackend, Mirror};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), livemirror::MirrorError> {
//! let defaults = json!({ "theme": { "dark": false } });
//! let pending = Mirror::builder()
//! 	.backend(MemoryBackend::new())
//! 	.defaults(defaults.as_object().cloned().unwrap_or_default())
//! 	.build()?;
//!
//! pending.on_update("theme", |value| println!("theme is now {value:?}"))?;
//!
//! let mirror = pending.ready().await?;
//! mirror.set("theme.dark", true).await?;
//! assert_eq!(mirror.get("theme.dark")?, Some(json!(true)));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod defaults;
pub mod dispatch;
pub mod mirror;
pub mod path;
pub mod state;

mod sync;

pub use backend::{Backend, BackendError, BytesInUse, Change, Limits, MemoryBackend};
pub use defaults::{Defaults, DefaultsError};
pub use mirror::{Mirror, MirrorBuilder, MirrorConfig, MirrorError, Pending, Phase};
pub use path::{IntoPath, Path, PathError};
pub use state::State;

#[cfg(feature = "fs")]
pub use backend::FileBackend;

#[cfg(feature = "events")]
pub use mirror::MirrorEvent;
