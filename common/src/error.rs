use std::path::PathBuf;

use strum::Display;
use thiserror::Error;

/// Tags the call site an error variant originated from, for variants shared
/// by more than one caller where the log line needs to disambiguate which.
///
/// Mirrors the `ErrorCodeLocation` pattern used throughout this codebase's
/// `thiserror` enums (see `nexus-writer`'s error module) rather than
/// inventing a fresh convention per crate. This crate's own callers only
/// produce one fallible operation (opening a log sink), so only that variant
/// is carried here; `unklogd::error::ErrorCodeLocation` carries the daemon's
/// own (larger) set of call sites.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCodeLocation {
    #[strum(to_string = "logging::init")]
    LoggingInit,
}

/// Errors raised by the ambient building blocks in this crate (currently just logging
/// setup). Kept separate from `unklogd::DaemonError` since this crate is shared by more
/// than one binary.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("cannot open log sink {path} at {location}: {source}")]
    LogSinkOpen {
        path: PathBuf,
        location: ErrorCodeLocation,
        #[source]
        source: std::io::Error,
    },
    #[error("logger was already initialized")]
    LoggerAlreadyInitialized,
    #[error("logger reload handle is stale, subscriber has shut down")]
    LoggerAlreadyShutDown,
}
