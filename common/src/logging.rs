//! Process-wide, runtime-reconfigurable leveled logger.
//!
//! `tracing` only allows a global subscriber to be installed once per process, but this
//! daemon's config grammar allows a `log <level> <path>` directive to be read *after* the
//! CLI has already parsed `-d`/`-l`, and the original C implementation's `log_init` is a
//! plain, re-callable function that swaps the level and sink in place. We get the same
//! re-callable behavior by wrapping the level filter and the writer in
//! [`tracing_subscriber::reload::Layer`] and installing the subscriber once with those
//! handles; later reconfiguration goes through the handles instead of `set_global_default`.

use std::{
    fs::OpenOptions,
    io,
    path::Path,
    str::FromStr,
    sync::Mutex,
};

use strum::{Display, EnumString};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::MakeWriter,
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
};

use crate::error::{CommonError, ErrorCodeLocation};

/// Log levels accepted by both the CLI `-d` flag and the config file's `log` directive.
///
/// There is exactly one level-name-to-filter mapping, shared by both entry points
/// (the original C daemon mapped `error` to `LOG_WARNING` via its config parser but to
/// `LOG_ERR` via its CLI parser; this implementation treats that divergence as a bug and
/// maps `error -> error` everywhere).
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Where log lines are written: stderr (the default), stdout, or an append-mode file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    Stdout,
    File(std::path::PathBuf),
}

impl LogSink {
    pub fn parse(path: &str) -> LogSink {
        match path.to_ascii_lowercase().as_str() {
            "stderr" => LogSink::Stderr,
            "stdout" => LogSink::Stdout,
            _ => LogSink::File(std::path::PathBuf::from(path)),
        }
    }
}

enum Writer {
    Stderr,
    Stdout,
    File(Mutex<std::fs::File>),
}

impl io::Write for &Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Stderr => io::stderr().write(buf),
            Writer::Stdout => io::stdout().write(buf),
            Writer::File(f) => f.lock().expect("log file mutex poisoned").write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Stderr => io::stderr().flush(),
            Writer::Stdout => io::stdout().flush(),
            Writer::File(f) => f.lock().expect("log file mutex poisoned").flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for Writer {
    type Writer = &'a Writer;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

fn open_sink(sink: &LogSink) -> Result<Writer, CommonError> {
    Ok(match sink {
        LogSink::Stderr => Writer::Stderr,
        LogSink::Stdout => Writer::Stdout,
        LogSink::File(path) => Writer::File(Mutex::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| CommonError::LogSinkOpen {
                    path: path.clone(),
                    source,
                    location: ErrorCodeLocation::LoggingInit,
                })?,
        )),
    })
}

/// Handles returned by [`init`] that let later `log <level> <path>` config directives
/// reconfigure the already-installed subscriber in place.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, tracing_subscriber::Registry>,
    writer: reload::Handle<Writer, tracing_subscriber::Registry>,
}

impl LogHandle {
    /// Re-point the logger at a new level and sink, equivalent to the original's
    /// re-callable `log_init`.
    pub fn reconfigure(&self, level: LogLevel, sink: &LogSink) -> Result<(), CommonError> {
        let writer = open_sink(sink)?;
        self.writer
            .reload(writer)
            .map_err(|_| CommonError::LoggerAlreadyShutDown)?;
        let filter = EnvFilter::from_str(level.as_filter_str())
            .expect("level filter strings are a fixed, known-valid set");
        self.filter
            .reload(filter)
            .map_err(|_| CommonError::LoggerAlreadyShutDown)?;
        Ok(())
    }
}

/// Installs the process-wide subscriber. Must be called exactly once; call
/// [`LogHandle::reconfigure`] afterwards to change level/sink.
pub fn init(level: LogLevel, sink: &LogSink) -> Result<LogHandle, CommonError> {
    let writer = open_sink(sink)?;
    let (writer_layer, writer_handle) = reload::Layer::new(writer);

    let filter = EnvFilter::from_str(level.as_filter_str())
        .expect("level filter strings are a fixed, known-valid set");
    let (filter_layer, filter_handle) = reload::Layer::new(filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer_layer)
        .with_filter(filter_layer);

    tracing_subscriber::registry().with(fmt_layer).try_init().map_err(|_| {
        CommonError::LoggerAlreadyInitialized
    })?;

    Ok(LogHandle {
        filter: filter_handle,
        writer: writer_handle,
    })
}

/// Parses a config-file or CLI log level token, case-insensitively.
pub fn parse_level(token: &str) -> Option<LogLevel> {
    LogLevel::from_str(&token.to_ascii_lowercase()).ok()
}
