/* demos/basic.rs */

//! Example: two mirrors sharing one file-backed store
//!
//! Run with: cargo run --example basic --features full

use livemirror::{Defaults, FileBackend, Limits, Mirror, MirrorEvent};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// 0. Prepare the store and defaults
	let store_path = "example_store.json";
	if std::path::Path::new(store_path).exists() {
		std::fs::remove_file(store_path)?;
	}
	let defaults = Defaults::from_json_str(r#"{ "theme": { "dark": false, "size": 12 } }"#)?;

	// 1. One backend handle, two mirrors
	let backend: Arc<dyn livemirror::Backend> =
		Arc::new(FileBackend::open(store_path, Limits::local()).await?);

	let pending = Mirror::builder()
		.shared_backend(Arc::clone(&backend))
		.defaults(defaults)
		.area("local")
		.on_error(|e| eprintln!("storage failure: {e}"))
		.build()?;
	pending.on_update("theme.dark", |value| println!("dark mode -> {value:?}"))?;
	let mut events = pending.events();
	let settings = pending.ready().await?;

	let other = Mirror::builder().shared_backend(backend).open().await?;

	// 2. A write from the other mirror reaches our subscriber
	other.set("theme.dark", true).await?;
	println!("theme is now {:?}", settings.get("theme")?);

	// 3. Our own writes never echo back
	settings.set("theme.size", 14).await?;

	while let Ok(event) = events.try_recv() {
		match event {
			MirrorEvent::Seeded { keys } => println!("seeded {keys:?}"),
			MirrorEvent::Changed { paths, notified } => {
				println!("{} paths changed, {notified} notified", paths.len())
			}
			MirrorEvent::Replaced { removed } => println!("replaced, removed {removed:?}"),
		}
	}

	let usage = settings.bytes_in_use(None).await?;
	println!("{} of {:?} bytes used", usage.bytes, usage.quota);

	std::fs::remove_file(store_path)?;
	Ok(())
}
