use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use contentwatch::{LifecycleState, WatchOptions, WatchRegistry};
use contentwatch_test_utils::{Recorder, init_tracing, wait_until, write_atomic};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_watch_calls_share_one_watcher() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_atomic(dir.path().join("app.json"), "{}")?;

    // long interval: only the immediate first tick can fire
    let options = WatchOptions::with_poll_interval(Duration::from_secs(3600))?;
    let registry = Arc::new(WatchRegistry::new(dir.path(), options));

    let mut joins = Vec::new();
    for i in 0..16 {
        let registry = Arc::clone(&registry);
        let filter = if i % 2 == 0 { "app.json" } else { "/app.json" };
        joins.push(tokio::spawn(async move { registry.watch(filter) }));
    }

    let mut watchers = Vec::new();
    for join in joins {
        watchers.push(join.await??);
    }

    let first = &watchers[0];
    assert!(watchers.iter().all(|w| Arc::ptr_eq(w, first)));
    assert_eq!(registry.len(), 1);

    wait_until(|| first.stats().polls >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(first.stats().polls, 1, "exactly one polling loop");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rewatch_replaces_and_silences_old_subscribers() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.json");
    write_atomic(&path, "v1")?;

    let registry = WatchRegistry::new(dir.path(), WatchOptions::from_millis(20)?);
    let old = registry.watch("app.json")?;
    let old_recorder = Recorder::new();
    let _old_registration = old.on_change(old_recorder.callback())?;
    wait_until(|| old.fingerprint().is_some()).await;

    let fresh = registry.rewatch("app.json")?;
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_eq!(old.state(), LifecycleState::Disposed);
    assert_eq!(fresh.state(), LifecycleState::Started);

    let fresh_recorder = Recorder::new();
    let _fresh_registration = fresh.on_change(fresh_recorder.callback())?;
    wait_until(|| fresh.fingerprint().is_some()).await;

    write_atomic(&path, "v2")?;
    wait_until(|| fresh_recorder.count() == 1).await;
    assert_eq!(old_recorder.count(), 0);
    assert!(Arc::ptr_eq(&registry.watch("app.json")?, &fresh));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rewatch_picks_up_file_created_later() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let registry = WatchRegistry::new(dir.path(), WatchOptions::from_millis(20)?);

    let inert = registry.watch("late.json")?;
    assert!(inert.is_inert());

    write_atomic(dir.path().join("late.json"), "hello")?;
    // plain watch keeps returning the inert watcher
    assert!(registry.watch("late.json")?.is_inert());

    let live = registry.rewatch("late.json")?;
    assert!(!live.is_inert());
    wait_until(|| live.fingerprint().is_some()).await;
    Ok(())
}

#[tokio::test]
async fn dropping_registry_disposes_watchers() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_atomic(dir.path().join("a.json"), "a")?;

    let registry = WatchRegistry::new(dir.path(), WatchOptions::from_millis(20)?);
    let a = registry.watch("a.json")?;
    let b = registry.watch("b.json")?;
    drop(registry);

    assert!(a.is_disposed());
    assert!(b.is_disposed());
    Ok(())
}

#[test]
fn file_info_passthrough_uses_real_metadata() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_atomic(dir.path().join("app.json"), "12345")?;
    std::fs::create_dir(dir.path().join("conf.d"))?;

    let registry = WatchRegistry::new(dir.path(), WatchOptions::default());

    let info = registry.get_file_info("app.json")?;
    assert!(info.exists);
    assert_eq!(info.length, 5);
    assert!(info.last_modified.is_some());

    let missing = registry.get_file_info("missing.json")?;
    assert!(!missing.exists);
    assert_eq!(missing.name, "missing.json");

    let listing = registry.get_directory_contents("/")?;
    let names: Vec<&str> = listing.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["app.json", "conf.d"]);
    assert!(listing[1].is_directory);

    assert!(registry.get_directory_contents("nope")?.is_empty());
    assert!(registry.is_empty(), "metadata queries never create watchers");
    Ok(())
}
