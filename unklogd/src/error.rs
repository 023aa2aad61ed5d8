//! Error taxonomy (§7, §11).
//!
//! Two tiers, following `nexus-writer/src/error.rs`'s `NexusWriterError`/
//! `ErrorCodeLocation` shape:
//!
//! - [`DriverError`]: returned by a single [`crate::driver::InputDriver`] or
//!   [`crate::driver::OutputDriver`] call. Whether it is fatal or per-payload-recoverable
//!   depends on *which* call failed, not on the error type itself — `start` failures are
//!   fatal, `payload` failures are not (§7).
//! - [`DaemonError`]: the top-level, `main`-propagated error for anything fatal at
//!   startup (bad config, a driver that failed to start, a socket bind failure).

use std::path::PathBuf;

use strum::Display;
use thiserror::Error;

/// Tags the call site for `DaemonError` variants shared by more than one caller.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCodeLocation {
    #[strum(to_string = "config::parse_line")]
    ConfigParseLine,
    #[strum(to_string = "config::apply_input")]
    ConfigApplyInput,
    #[strum(to_string = "config::apply_output")]
    ConfigApplyOutput,
    #[strum(to_string = "config::apply_log")]
    ConfigApplyLog,
    #[strum(to_string = "lifecycle::start")]
    LifecycleStart,
}

/// An error from a single driver call (`start`, `stop`, or `payload`). Carried as a
/// plain string message plus an optional source, since drivers wrap three unrelated
/// transports (Kafka, HTTP, a child process pipe) whose error types don't share a
/// useful common supertype beyond "this call failed".
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{context}: {message}")]
    Message { context: &'static str, message: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: kafka error: {source}")]
    Kafka {
        context: &'static str,
        #[source]
        source: rdkafka::error::KafkaError,
    },
    #[error("{context}: http error: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl DriverError {
    pub fn message(context: &'static str, message: impl Into<String>) -> Self {
        DriverError::Message {
            context,
            message: message.into(),
        }
    }
}

/// Top-level, fatal-at-init error, propagated with `?` up to `main`. Converted to exit
/// code 1 by the outermost layer (§11); never returned for a per-payload failure.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cannot open config file {path}: {source}")]
    ConfigOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config line {line}: too many tokens (max 10): {text}")]
    ConfigTooManyTokens { line: usize, text: String },
    #[error("config line {line}: unknown directive {directive:?} at {location}")]
    ConfigUnknownDirective {
        line: usize,
        directive: String,
        location: ErrorCodeLocation,
    },
    #[error("config line {line}: directive {directive} requires at least {required} argument(s) at {location}")]
    ConfigMissingArguments {
        line: usize,
        directive: String,
        required: usize,
        location: ErrorCodeLocation,
    },
    #[error("config line {line}: unsupported input kind {kind:?}")]
    ConfigUnsupportedInput { line: usize, kind: String },
    #[error("config line {line}: unsupported output kind {kind:?}")]
    ConfigUnsupportedOutput { line: usize, kind: String },
    #[error("config line {line}: invalid log level {level:?}")]
    ConfigInvalidLogLevel { line: usize, level: String },
    #[error("config line {line}: invalid stats port {port:?}: {source}")]
    ConfigInvalidStatsPort {
        line: usize,
        port: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("driver {name} failed to start at {location}: {source}")]
    DriverStart {
        name: String,
        location: ErrorCodeLocation,
        #[source]
        source: DriverError,
    },
    #[error("cannot bind metrics listener on {addr}: {source}")]
    MetricsBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("logging setup failed: {0}")]
    Logging(#[from] digital_muon_common::error::CommonError),
    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
}
