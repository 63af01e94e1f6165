/* tests/mirror_tests.rs */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use livemirror::backend::{ChangeListener, WatchId};
use livemirror::{
	Backend, BackendError, Change, Limits, MemoryBackend, Mirror, MirrorError, Path, Phase,
	State,
};
use tokio::sync::Notify;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

fn state(value: Value) -> State {
	match value {
		Value::Object(map) => map,
		other => panic!("not a mapping: {other}"),
	}
}

type Log = Arc<Mutex<Vec<Option<Value>>>>;

fn recorder(log: &Log) -> impl Fn(Option<Value>) + Send + Sync + 'static {
	let log = Arc::clone(log);
	move |value| log.lock().unwrap().push(value)
}

async fn open(backend: &MemoryBackend, defaults: Value) -> Mirror {
	Mirror::builder()
		.backend(backend.clone())
		.defaults(state(defaults))
		.open()
		.await
		.unwrap()
}

// --- lifecycle ---

#[tokio::test]
async fn test_ready_merges_and_seeds_defaults() {
	let backend = MemoryBackend::new().with_state(state(json!({ "y": {}, "keep": 1 })));

	let pending = Mirror::builder()
		.backend(backend.clone())
		.defaults(state(json!({ "x": 1, "y": { "z": 2 } })))
		.build()
		.unwrap();
	assert_eq!(pending.phase(), Phase::Uninitialized);

	let mirror = pending.ready().await.unwrap();

	assert_eq!(
		Value::Object(mirror.get_all()),
		json!({ "y": { "z": 2 }, "keep": 1, "x": 1 })
	);
	assert_eq!(
		Value::Object(backend.snapshot()),
		json!({ "y": { "z": 2 }, "keep": 1, "x": 1 })
	);
}

#[tokio::test]
async fn test_seeding_can_be_disabled() {
	let backend = MemoryBackend::new();

	let mirror = Mirror::builder()
		.backend(backend.clone())
		.defaults(state(json!({ "x": 1 })))
		.seed_defaults(false)
		.open()
		.await
		.unwrap();

	assert_eq!(mirror.get("x").unwrap(), Some(json!(1)));
	assert!(backend.snapshot().is_empty());
}

#[tokio::test]
async fn test_build_requires_backend() {
	let err = Mirror::builder().build().unwrap_err();
	assert!(matches!(err, MirrorError::Builder(_)));
}

#[tokio::test]
async fn test_load_failure_is_reported() {
	let backend = MemoryBackend::new();
	backend.set_available(false);
	let hook_calls = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&hook_calls);

	let result = Mirror::builder()
		.backend(backend)
		.on_error(move |e| sink.lock().unwrap().push(e.to_string()))
		.open()
		.await;

	assert!(matches!(
		result,
		Err(MirrorError::Backend(BackendError::Unavailable))
	));
	assert_eq!(hook_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dropping_mirror_detaches_listener() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({})).await;
	assert_eq!(backend.watcher_count(), 1);

	let clone = mirror.clone();
	drop(mirror);
	assert_eq!(backend.watcher_count(), 1);
	drop(clone);
	assert_eq!(backend.watcher_count(), 0);
}

// --- path operations ---

#[tokio::test]
async fn test_set_get_round_trip_is_independent() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({})).await;

	let value = json!({ "list": [1, 2], "inner": { "k": "v" } });
	mirror.set("a.b", value.clone()).await.unwrap();

	let mut read = mirror.get("a.b").unwrap().unwrap();
	assert_eq!(read, value);

	read["inner"]["k"] = json!("changed");
	assert_eq!(mirror.get("a.b.inner.k").unwrap(), Some(json!("v")));
	assert_eq!(mirror.get("a.b.list.1").unwrap(), Some(json!(2)));
	assert_eq!(Value::Object(backend.snapshot()), json!({ "a": { "b": value } }));
}

#[tokio::test]
async fn test_get_missing_is_none() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": 1 })).await;

	assert_eq!(mirror.get("missing.deep").unwrap(), None);
	assert_eq!(mirror.get("a.b").unwrap(), None);
	assert!(!mirror.contains("missing").unwrap());
	assert!(matches!(mirror.get("a..b"), Err(MirrorError::Path(_))));
	assert_eq!(mirror.get("").unwrap(), Some(json!({ "a": 1 })));
	assert_eq!(mirror.keys(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_set_writes_only_top_level_key() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": { "x": 1 }, "b": 2 })).await;

	// A foreign copy of `b` that this mirror does not know about.
	backend.clone().with_state(state(json!({ "a": { "x": 1 }, "b": 99 })));

	mirror.set("a.y", 5).await.unwrap();

	assert_eq!(
		Value::Object(backend.snapshot()),
		json!({ "a": { "x": 1, "y": 5 }, "b": 99 })
	);
}

#[tokio::test]
async fn test_set_nesting_conflict_has_no_effect() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": { "b": 5 } })).await;

	let err = mirror.set("a.b.c", 1).await.unwrap_err();

	assert!(matches!(err, MirrorError::Access(_)));
	assert_eq!(mirror.get("a").unwrap(), Some(json!({ "b": 5 })));
}

#[tokio::test]
async fn test_root_set_requires_mapping() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": 1 })).await;

	let err = mirror.set("", 5).await.unwrap_err();
	assert!(matches!(err, MirrorError::RootNotMapping));

	mirror.set(Path::root(), json!({ "b": 2 })).await.unwrap();
	assert_eq!(Value::Object(mirror.get_all()), json!({ "b": 2 }));
	assert_eq!(Value::Object(backend.snapshot()), json!({ "b": 2 }));
}

#[tokio::test]
async fn test_remove() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": { "b": 1, "c": 2 }, "d": 3 })).await;

	let err = mirror.remove("a.x").await.unwrap_err();
	assert!(err.is_not_found());
	mirror.remove_if_exists("a.x").await.unwrap();
	mirror.remove_if_exists("nope.deeper").await.unwrap();

	mirror.remove("a.b").await.unwrap();
	mirror.remove("d").await.unwrap();

	assert_eq!(Value::Object(mirror.get_all()), json!({ "a": { "c": 2 } }));
	assert_eq!(Value::Object(backend.snapshot()), json!({ "a": { "c": 2 } }));

	assert!(matches!(
		mirror.remove("").await,
		Err(MirrorError::Access(_))
	));
}

#[tokio::test]
async fn test_typed_access() {
	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Theme {
		dark: bool,
		size: u32,
	}

	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({})).await;

	let theme = Theme {
		dark: true,
		size: 12,
	};
	mirror.set_serialized("ui.theme", &theme).await.unwrap();

	assert_eq!(mirror.get_as::<Theme, _>("ui.theme").unwrap(), Some(theme));
	assert_eq!(mirror.get_as::<Theme, _>("ui.other").unwrap(), None);
	assert!(matches!(
		mirror.get_as::<u32, _>("ui.theme"),
		Err(MirrorError::Serde(_))
	));
}

// --- reset / clear ---

#[tokio::test]
async fn test_reset_restores_defaults_and_removes_extras() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "count": 0 })).await;
	mirror.set("count", 5).await.unwrap();
	mirror.set("extra", true).await.unwrap();

	let batches: Arc<Mutex<Vec<Vec<Change>>>> = Arc::default();
	let sink = Arc::clone(&batches);
	backend.watch(Arc::new(move |changes: &[Change]| {
		sink.lock().unwrap().push(changes.to_vec());
	}));

	mirror.reset().await.unwrap();

	assert_eq!(Value::Object(mirror.get_all()), json!({ "count": 0 }));
	assert_eq!(Value::Object(backend.snapshot()), json!({ "count": 0 }));
	// `extra` is removed first, then the defaults are written.
	assert_eq!(
		*batches.lock().unwrap(),
		vec![
			vec![Change {
				key: "extra".into(),
				old_value: Some(json!(true)),
				new_value: None,
			}],
			vec![Change {
				key: "count".into(),
				old_value: Some(json!(5)),
				new_value: Some(json!(0)),
			}],
		]
	);
}

/// Parks the first `remove` call until released.
struct PausingBackend {
	inner: MemoryBackend,
	armed: AtomicBool,
	entered: Notify,
	release: Notify,
}

impl PausingBackend {
	fn new(inner: MemoryBackend) -> Self {
		Self {
			inner,
			armed: AtomicBool::new(true),
			entered: Notify::new(),
			release: Notify::new(),
		}
	}
}

#[async_trait]
impl Backend for PausingBackend {
	async fn load(&self) -> Result<State, BackendError> {
		self.inner.load().await
	}

	async fn write(&self, items: State) -> Result<(), BackendError> {
		self.inner.write(items).await
	}

	async fn remove(&self, keys: &[String]) -> Result<(), BackendError> {
		self.inner.remove(keys).await?;
		if self.armed.swap(false, Ordering::SeqCst) {
			self.entered.notify_one();
			self.release.notified().await;
		}
		Ok(())
	}

	fn watch(&self, listener: ChangeListener) -> WatchId {
		self.inner.watch(listener)
	}

	fn unwatch(&self, id: WatchId) {
		self.inner.unwatch(id);
	}

	async fn bytes_in_use(&self, key: Option<&str>) -> Result<u64, BackendError> {
		self.inner.bytes_in_use(key).await
	}

	fn limits(&self) -> Limits {
		self.inner.limits()
	}
}

#[tokio::test]
async fn test_replace_window_spans_both_round_trips() {
	let store = MemoryBackend::new();
	let backend = Arc::new(PausingBackend::new(store.clone()));
	let mirror = Mirror::builder()
		.shared_backend(backend.clone())
		.defaults(state(json!({ "count": 0 })))
		.open()
		.await
		.unwrap();
	mirror.set("extra", true).await.unwrap();

	let log: Log = Arc::default();
	mirror.on_update("other", recorder(&log)).unwrap();
	mirror.on_update("", recorder(&log)).unwrap();

	let resetting = tokio::spawn({
		let mirror = mirror.clone();
		async move { mirror.reset().await.map(|_| ()) }
	});
	// The reset has removed `extra` and is waiting on the backend.
	backend.entered.notified().await;

	// Another writer lands inside the window.
	store.write(state(json!({ "other": 5 }))).await.unwrap();
	assert_eq!(mirror.get("other").unwrap(), Some(json!(5)));

	let err = mirror.clear().await.unwrap_err();
	assert!(matches!(err, MirrorError::ReplaceInFlight));

	backend.release.notify_one();
	resetting.await.unwrap().unwrap();

	assert!(log.lock().unwrap().is_empty());
	assert_eq!(
		Value::Object(store.snapshot()),
		json!({ "count": 0, "other": 5 })
	);

	// The window is closed again.
	mirror.clear().await.unwrap();
	assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_clear_empties_everything() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "a": 1, "b": { "c": 2 } })).await;

	mirror.clear().await.unwrap();

	assert!(mirror.get_all().is_empty());
	assert!(backend.snapshot().is_empty());
}

// --- reconciliation and dispatch ---

#[tokio::test]
async fn test_own_writes_do_not_notify() {
	let backend = MemoryBackend::new();
	let mirror = open(&backend, json!({ "k": 0 })).await;
	let log: Log = Arc::default();
	mirror.on_update("k", recorder(&log)).unwrap();
	mirror.on_update("", recorder(&log)).unwrap();

	mirror.set("k", 1).await.unwrap();
	mirror.set("k", mirror.get("k").unwrap().unwrap()).await.unwrap();
	mirror.remove("k").await.unwrap();
	mirror.set("k", json!({ "deep": true })).await.unwrap();
	mirror.reset().await.unwrap();
	mirror.clear().await.unwrap();

	assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_writes_are_reconciled() {
	let backend = MemoryBackend::new();
	let ours = open(&backend, json!({ "a": { "b": 1 } })).await;
	let theirs = open(&backend, json!({})).await;

	let log: Log = Arc::default();
	ours.on_update("a.b", recorder(&log)).unwrap();

	theirs.set("a.b", 2).await.unwrap();
	assert_eq!(ours.get("a.b").unwrap(), Some(json!(2)));

	theirs.remove("a").await.unwrap();
	assert_eq!(ours.get("a").unwrap(), None);

	assert_eq!(*log.lock().unwrap(), vec![Some(json!(2)), None]);
}

#[tokio::test]
async fn test_prefix_matching_notifies_once() {
	let backend = MemoryBackend::new();
	let ours = open(&backend, json!({ "a": { "b": { "c": 1 }, "d": 1 } })).await;
	let theirs = open(&backend, json!({})).await;

	let ab: Log = Arc::default();
	let abc: Log = Arc::default();
	let other: Log = Arc::default();
	ours.on_update("a.b", recorder(&ab)).unwrap();
	ours.on_update("a.b.c", recorder(&abc)).unwrap();
	ours.on_update("z", recorder(&other)).unwrap();

	// Whole `a` replaced: several leaves under `a.b` change in one batch.
	theirs
		.set("a", json!({ "b": { "c": 2, "e": 3 }, "d": 2 }))
		.await
		.unwrap();

	assert_eq!(*ab.lock().unwrap(), vec![Some(json!({ "c": 2, "e": 3 }))]);
	assert_eq!(*abc.lock().unwrap(), vec![Some(json!(2))]);
	assert!(other.lock().unwrap().is_empty());

	// `a.b` changed as a whole: the deeper subscriber still hears it.
	theirs.set("a.b", 7).await.unwrap();
	assert_eq!(abc.lock().unwrap().last(), Some(&None));
	assert_eq!(ab.lock().unwrap().last(), Some(&Some(json!(7))));
}

#[tokio::test]
async fn test_namespace_isolation() {
	let backend = MemoryBackend::new();
	let ours = open(&backend, json!({})).await;
	let theirs = open(&backend, json!({})).await;

	let ns1: Log = Arc::default();
	let ns2: Log = Arc::default();
	ours.on_update_in("ns1", "k", recorder(&ns1)).unwrap();
	ours.on_update_in("ns2", "k", recorder(&ns2)).unwrap();

	ours.off_update("ns1");
	theirs.set("k", 1).await.unwrap();

	assert!(ns1.lock().unwrap().is_empty());
	assert_eq!(*ns2.lock().unwrap(), vec![Some(json!(1))]);

	ours.off_all();
	theirs.set("k", 2).await.unwrap();
	assert_eq!(ns2.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_subscriptions_before_ready_carry_over() {
	let backend = MemoryBackend::new();
	let pending = Mirror::builder().backend(backend.clone()).build().unwrap();
	let log: Log = Arc::default();
	pending.on_update("k", recorder(&log)).unwrap();

	// Lands before the first load; already part of the loaded snapshot.
	let theirs = open(&backend, json!({ "k": "early" })).await;
	let ours = pending.ready().await.unwrap();
	assert_eq!(ours.get("k").unwrap(), Some(json!("early")));
	assert!(log.lock().unwrap().is_empty());

	theirs.set("k", "late").await.unwrap();
	assert_eq!(*log.lock().unwrap(), vec![Some(json!("late"))]);
}

/// Reports a foreign write while the first load is in flight, after the
/// snapshot was taken.
struct RacingBackend {
	inner: MemoryBackend,
}

#[async_trait]
impl Backend for RacingBackend {
	async fn load(&self) -> Result<State, BackendError> {
		let snapshot = self.inner.load().await?;
		self.inner.write(state(json!({ "k": "raced" }))).await?;
		Ok(snapshot)
	}

	async fn write(&self, items: State) -> Result<(), BackendError> {
		self.inner.write(items).await
	}

	async fn remove(&self, keys: &[String]) -> Result<(), BackendError> {
		self.inner.remove(keys).await
	}

	fn watch(&self, listener: ChangeListener) -> WatchId {
		self.inner.watch(listener)
	}

	fn unwatch(&self, id: WatchId) {
		self.inner.unwatch(id);
	}

	async fn bytes_in_use(&self, key: Option<&str>) -> Result<u64, BackendError> {
		self.inner.bytes_in_use(key).await
	}

	fn limits(&self) -> Limits {
		self.inner.limits()
	}
}

#[tokio::test]
async fn test_changes_during_load_are_replayed() {
	let pending = Mirror::builder()
		.backend(RacingBackend {
			inner: MemoryBackend::new(),
		})
		.defaults(state(json!({ "k": "default" })))
		.seed_defaults(false)
		.build()
		.unwrap();
	let log: Log = Arc::default();
	pending.on_update("k", recorder(&log)).unwrap();

	let mirror = pending.ready().await.unwrap();

	assert_eq!(mirror.get("k").unwrap(), Some(json!("raced")));
	assert_eq!(*log.lock().unwrap(), vec![Some(json!("raced"))]);
}

// --- failures and limits ---

#[tokio::test]
async fn test_backend_failure_is_dual_channel() {
	let backend = MemoryBackend::new();
	let hook_calls = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&hook_calls);
	let mirror = Mirror::builder()
		.backend(backend.clone())
		.on_error(move |e| sink.lock().unwrap().push(e.to_string()))
		.open()
		.await
		.unwrap();

	backend.set_available(false);
	let err = mirror.set("k", 1).await.unwrap_err();

	assert!(matches!(err, MirrorError::Backend(BackendError::Unavailable)));
	assert_eq!(hook_calls.lock().unwrap().len(), 1);
	// The local value is kept even though the write failed.
	assert_eq!(mirror.get("k").unwrap(), Some(json!(1)));
	assert!(backend.snapshot().is_empty());
}

#[tokio::test]
async fn test_quota_errors_surface_through_mirror() {
	let backend = MemoryBackend::with_limits(Limits {
		quota_bytes_per_item: Some(8),
		..Limits::unlimited()
	});
	let mirror = open(&backend, json!({})).await;

	let err = mirror.set("k", "far too long").await.unwrap_err();
	assert!(matches!(
		err,
		MirrorError::Backend(BackendError::ItemQuota { .. })
	));
}

#[tokio::test]
async fn test_limits_and_bytes_in_use() {
	let backend = MemoryBackend::with_limits(Limits::sync());
	let pending = Mirror::builder().backend(backend.clone()).build().unwrap();
	assert_eq!(pending.limits(), Limits::sync());

	let mirror = pending.ready().await.unwrap();
	mirror.set("ab", "xy").await.unwrap();
	mirror.set("n", 10).await.unwrap();

	let item = mirror.bytes_in_use(Some("ab")).await.unwrap();
	assert_eq!(item.bytes, 6);
	assert_eq!(item.quota, Some(8_192));

	let total = mirror.bytes_in_use(None).await.unwrap();
	assert_eq!(total.bytes, 9);
	assert_eq!(total.quota, Some(102_400));
}
