//! C8 — the periodic snapshot collector.
//!
//! Grounded on `metric_flush`/`metric_format*` in `metrics.c`: every 5 seconds the main
//! event loop calls [`Collector::tick`], which rebuilds a frozen list of text lines under
//! `snapshot_lock` and stores it for the metrics server to serve verbatim to the next
//! accepted connection (§4.4, §6).

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metrics::counter::Counter;
use crate::metrics::meter::Meter;

/// One registered input's name and emission counter, as the collector sees it.
pub struct InputSnapshotSource {
    pub name: String,
    pub count: Arc<Counter>,
}

/// One registered output's name and metrics, as the collector sees it.
pub struct OutputSnapshotSource {
    pub name: String,
    pub count: Arc<Counter>,
    pub errors: Arc<Counter>,
    pub meter: Arc<Meter>,
}

/// Rebuilds the textual snapshot on each tick and stores it behind `snapshot_lock`
/// (here, a plain `Mutex<Vec<String>>` — never held across a driver call, only during the
/// tick's rebuild and the server's per-connection copy, per §5).
pub struct Collector {
    /// Unix epoch seconds at construction time, printed verbatim on every tick. Named
    /// `global.uptime` by the wire format (§6) for historical reasons, but it is the
    /// daemon's start timestamp, not an elapsed duration — matching `uk->uptime =
    /// time(NULL)` in `daemon_init`, which is set once and never recomputed.
    started_unix: u64,
    global_count: Arc<Counter>,
    inputs: Vec<InputSnapshotSource>,
    outputs: Vec<OutputSnapshotSource>,
    snapshot: Arc<Mutex<Vec<String>>>,
}

impl Collector {
    pub fn new(
        global_count: Arc<Counter>,
        inputs: Vec<InputSnapshotSource>,
        outputs: Vec<OutputSnapshotSource>,
    ) -> Self {
        let started_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Collector {
            started_unix,
            global_count,
            inputs,
            outputs,
            snapshot: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A clone of the handle the metrics server reads from. Cheap (`Arc` clone); the
    /// server never needs to know about counters or meters, only the frozen text.
    pub fn snapshot_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.snapshot.clone()
    }

    /// Rebuilds the snapshot lines (§6 format) and replaces the stored buffer list.
    pub fn tick(&self) {
        let mut lines = Vec::with_capacity(2 + self.inputs.len() + self.outputs.len() * 4);

        lines.push(format!("global.uptime {}\n", self.started_unix));
        lines.push(format!("global.count {}\n", self.global_count.get()));

        for input in &self.inputs {
            lines.push(format!("in.{}.count {}\n", input.name, input.count.get()));
        }

        let global_count = self.global_count.get();
        for output in &self.outputs {
            let out_count = output.count.get();
            let lag = global_count.saturating_sub(out_count);
            lines.push(format!("out.{}.count {}\n", output.name, out_count));
            lines.push(format!("out.{}.errs {}\n", output.name, output.errors.get()));
            lines.push(format!("out.{}.lag {}\n", output.name, lag));

            let slots = output.meter.slots();
            let slot_text = slots
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!(
                "out.{}.meter {} max:{}\n",
                output.name,
                slot_text,
                output.meter.max_ms()
            ));
        }

        let mut guard = self.snapshot.lock().expect("snapshot mutex poisoned");
        *guard = lines;
    }
}
