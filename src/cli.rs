// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `contentwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "contentwatch",
    version,
    about = "Watch files behind symlinks or mounts and report content changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML).
    ///
    /// Default: `Contentwatch.toml` in the current working directory, if it
    /// exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Root directory the watched files are resolved against.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// File to watch, relative to the root. Repeatable; replaces the
    /// configured list.
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<String>,

    /// Poll interval in milliseconds (default 30000).
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Write the new file content to stdout on every change.
    #[arg(long)]
    pub print: bool,

    /// Print the current fingerprint of every file and exit.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONTENTWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_files_and_overrides() {
        let args = CliArgs::try_parse_from([
            "contentwatch",
            "--root",
            "/etc/config",
            "--file",
            "a.json",
            "--file",
            "b.json",
            "--poll-interval-ms",
            "500",
            "--log-level",
            "debug",
            "--print",
        ])
        .unwrap();

        assert_eq!(args.root, Some(PathBuf::from("/etc/config")));
        assert_eq!(args.files, vec!["a.json", "b.json"]);
        assert_eq!(args.poll_interval_ms, Some(500));
        assert!(args.print);
        assert!(!args.once);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
