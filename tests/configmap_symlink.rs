#![cfg(unix)]

use std::error::Error;
use std::path::PathBuf;

use contentwatch::{WatchOptions, WatchRegistry};
use contentwatch_test_utils::{ConfigMapDir, Recorder, init_tracing, wait_until};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detects_configmap_style_symlink_swap() -> TestResult {
    init_tracing();
    let mut cm = ConfigMapDir::new(&[("appsettings.json", r#"{"level":"Error"}"#)])?;
    let visible = cm.root().join("appsettings.json");
    let link_before = std::fs::read_link(&visible)?;

    let registry = WatchRegistry::new(cm.root(), WatchOptions::from_millis(20)?);
    let watcher = registry.watch("appsettings.json")?;
    let recorder = Recorder::new();
    let _registration = watcher.on_change(recorder.callback())?;
    wait_until(|| watcher.fingerprint().is_some()).await;

    cm.update(&[("appsettings.json", r#"{"level":"Debug"}"#)])?;
    wait_until(|| recorder.count() == 1).await;

    // the visible entry is untouched; only the ..data target moved
    assert_eq!(std::fs::read_link(&visible)?, link_before);
    assert_eq!(link_before, PathBuf::from("..data/appsettings.json"));
    assert_eq!(
        std::fs::read_to_string(&visible)?,
        r#"{"level":"Debug"}"#
    );

    cm.update(&[("appsettings.json", r#"{"level":"Debug"}"#)])?;
    let polls = watcher.stats().polls;
    wait_until(|| watcher.stats().polls >= polls + 3).await;
    assert_eq!(recorder.count(), 1, "same content under a new version is not a change");
    Ok(())
}
