//! Entry point: parses arguments, installs the logger, then hands off to the lifecycle
//! coordinator. Mirrors `main` in `daemon.c` (`getopt` parse, `log_init`, `config_parse`,
//! `daemon_run`) with the one-shot logger install split from the later, re-callable
//! reconfiguration the config file's `log` directive can trigger (§12).

mod cli;
mod config;
mod dispatch;
mod driver;
mod drivers;
mod error;
mod input_worker;
mod lifecycle;
mod metrics;
mod output_worker;
mod payload;

use clap::Parser;
use digital_muon_common::logging::{self, LogLevel, LogSink};

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let level = match cli.level.as_deref() {
        Some(raw) => match logging::parse_level(raw) {
            Some(level) => level,
            None => {
                eprintln!("unklogd: main: invalid log level: {raw}");
                std::process::exit(1);
            }
        },
        None => LogLevel::Info,
    };
    let sink = cli
        .log_file
        .as_deref()
        .map(LogSink::parse)
        .unwrap_or(LogSink::Stderr);

    let log_handle = match logging::init(level, &sink) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("unklogd: failed to initialize logging: {e}");
            std::process::exit(1);
        }
    };

    match lifecycle::run(&cli, &log_handle) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!("unklogd: fatal: {e}");
            std::process::exit(1);
        }
    }
}
