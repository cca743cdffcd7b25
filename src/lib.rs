// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, RawConfigFile, default_config_path, load_from_path};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::compute_fingerprint;

pub use crate::errors::{Result as WatchResult, WatchError};
pub use crate::types::{DEFAULT_POLL_INTERVAL, LifecycleState, PollStats, WatchOptions};
pub use crate::watch::{
    ChangeCallback, ChangeRegistration, ChangeSignal, ChangeStream, ChangeWatcher, Fingerprint,
    WatchRegistry, WatchTarget,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - one registry with a watcher per configured file
/// - change reporting (log, optionally print content)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.once {
        print_fingerprints(&cfg);
        return Ok(());
    }

    let registry = WatchRegistry::new(cfg.root().clone(), cfg.options());

    // Callbacks only forward the changed filter; reporting happens here.
    let (change_tx, mut change_rx) = mpsc::unbounded_channel::<String>();
    let mut registrations = Vec::new();
    let mut live = 0usize;

    for file in cfg.files() {
        let watcher = registry.watch(file)?;
        if watcher.is_inert() {
            warn!(file = %file, root = %cfg.root().display(), "file does not exist; it will not be watched");
            continue;
        }
        live += 1;

        let tx = change_tx.clone();
        registrations.push(watcher.register_change_callback(
            move |file: &String| {
                let _ = tx.send(file.clone());
            },
            file.clone(),
        )?);
    }
    drop(change_tx);

    if live == 0 {
        bail!(
            "none of the configured files exist under {}",
            cfg.root().display()
        );
    }

    info!(
        files = live,
        interval_ms = cfg.options().poll_interval().as_millis() as u64,
        "watching for content changes"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!("failed to listen for Ctrl+C: {e}");
                }
                info!("shutdown requested");
                break;
            }
            changed = change_rx.recv() => match changed {
                Some(file) => report_change(&registry, &file, args.print),
                None => break,
            },
        }
    }

    drop(registrations);
    registry.shutdown();
    Ok(())
}

/// Merge the config file (explicit, or `Contentwatch.toml` if present) with
/// CLI overrides and validate the result.
pub fn resolve_config(args: &CliArgs) -> crate::errors::Result<ConfigFile> {
    let raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                load_from_path(&default_path)?
            } else {
                RawConfigFile::default()
            }
        }
    };

    ConfigFile::try_from(raw.with_overrides(
        args.root.clone(),
        args.files.clone(),
        args.poll_interval_ms,
    ))
}

fn report_change(registry: &WatchRegistry, file: &str, print: bool) {
    let fingerprint = registry
        .get(file)
        .and_then(|watcher| watcher.fingerprint())
        .map(|fp| fp.to_hex())
        .unwrap_or_default();
    info!(file = %file, fingerprint = %fingerprint, "content changed");

    if print {
        let path = registry.root().join(file);
        match RealFileSystem.read_to_string(&path) {
            Ok(content) => println!("{content}"),
            Err(e) => warn!(file = %file, "could not read changed file: {e:#}"),
        }
    }
}

/// `--once` output: `<fingerprint>  <file>` per line, like `sha256sum`.
fn print_fingerprints(cfg: &ConfigFile) {
    let fs = RealFileSystem;
    for file in cfg.files() {
        let path = cfg.root().join(file);
        match compute_fingerprint(&fs, &path) {
            Ok(fp) => println!("{fp}  {file}"),
            Err(_) => println!("{:<64}  {file} (missing)", "-"),
        }
    }
}
