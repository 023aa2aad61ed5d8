//! Driver traits: the capability sets `input_impl`/`output_impl` described as function
//! pointer tables in `unklog.h`.
//!
//! The set of driver *instances* is assembled at runtime from the config file, so
//! dispatch has to be dynamic; the set of driver *kinds* is a small closed set matched
//! against string keys by the config loader (`kafka` for inputs, `elasticsearch`/`exec`
//! for outputs). Both are expressed here as `dyn` traits rather than an enum, since a
//! handful of drivers plus the pack's stub test doubles are all that ever implement
//! them — a closed `enum` would only pay for itself if drivers were added at a rate that
//! never happens in practice for this daemon.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::error::DriverError;
use crate::metrics::counter::Counter;

/// A single `key=value` configuration option, order-preserved, duplicates allowed.
///
/// The original's `option` struct caps `key` at 64 bytes and `val` at 512; this
/// implementation does not enforce a hard byte cap (no fixed-size buffer to overflow),
/// but callers that need to reject oversized config should check `Option::key`/`value`
/// lengths explicitly — none of the three shipped drivers need to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOption {
    pub key: String,
    pub value: String,
}

impl DriverOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        DriverOption {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of options for one input or output instance.
pub type DriverOptions = Vec<DriverOption>;

/// Everything an [`InputDriver`] needs to run its poll loop: the flag that tells it to
/// stop, its own per-input counter (incremented by the driver itself, before handing a
/// message to `emit` — mirroring `kafka_handle`'s `metric_inc(&in->count)` ahead of its
/// `fn(...)` call), and the dispatcher entry point.
pub struct InputContext<'a> {
    pub run_flag: Arc<AtomicBool>,
    pub count: Arc<Counter>,
    pub emit: &'a mut dyn FnMut(&[u8]),
}

impl InputContext<'_> {
    pub fn running(&self) -> bool {
        self.run_flag.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Records one received message and hands its bytes to the dispatcher.
    pub fn emit(&mut self, bytes: &[u8]) {
        self.count.increment();
        (self.emit)(bytes);
    }
}

/// A pluggable message source. Implementations are expected to loop inside `start`,
/// polling their upstream and calling `ctx.emit` for each received message, until
/// `ctx.running()` is observed false — then return.
pub trait InputDriver: Send {
    fn start(&mut self, ctx: &mut InputContext<'_>) -> Result<(), DriverError>;

    /// Called by the coordinator to unstick `start` from a blocking poll (e.g. close the
    /// underlying consumer). `run_flag` has already been cleared by the coordinator
    /// before this is called (§4.3, §9 open question resolution).
    fn stop(&mut self) -> Result<(), DriverError>;
}

/// A pluggable message sink. `payload` is called once per delivery by the dedicated
/// output worker thread (C6); a non-`Ok` return increments that output's `errors`
/// counter but never tears down the worker.
pub trait OutputDriver: Send {
    fn start(&mut self) -> Result<(), DriverError>;

    fn payload(&mut self, message_type: &str, bytes: &[u8]) -> Result<(), DriverError>;

    /// Called by the owning worker thread once it observes `run_flag` cleared, strictly
    /// after the last `payload` call returns (never concurrently with one) — see the
    /// ownership note atop `output_worker.rs` for why this is stronger than the
    /// original's queue-lock-held guarantee (§4.2).
    fn stop(&mut self) -> Result<(), DriverError>;
}
