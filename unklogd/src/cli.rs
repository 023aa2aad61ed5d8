//! C14 — CLI surface.
//!
//! Grounded on `digitiser-aggregator/src/main.rs`'s `Cli` struct (`clap` derive,
//! `version = digital_muon_common::version!()`) and on `main`'s `getopt` flag set in
//! `daemon.c` (`c:d:fl:n`).

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_CONFIG_PATH: &str = "/etc/unklog.conf";

/// Fans out JSON log messages from a Kafka-shaped source to Elasticsearch-shaped and
/// exec sinks.
#[derive(Debug, Parser)]
#[clap(author, version = digital_muon_common::version!(), about)]
pub struct Cli {
    /// Run in the foreground. Accepted for compatibility with the original daemon's
    /// flag set; this implementation always runs in the foreground regardless (modern
    /// deployment supervises the process rather than self-daemonizing via double-fork).
    #[clap(short = 'f')]
    pub foreground: bool,

    /// Parse the configuration file, print "configuration is valid", and exit 0
    /// without binding any socket or spawning any worker.
    #[clap(short = 'n')]
    pub validate_only: bool,

    /// Path to the configuration file.
    #[clap(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log sink: a file path, or the literal values "stdout"/"stderr". Overrides any
    /// `log` directive in the configuration file when given.
    #[clap(short = 'l', long = "log-file")]
    pub log_file: Option<String>,

    /// Log level: trace|debug|info|warn|error. Overrides any `log` directive in the
    /// configuration file when given.
    #[clap(short = 'd', long = "level")]
    pub level: Option<String>,
}
