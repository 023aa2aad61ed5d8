//! C6 — the output worker: owns one queue + condition, dequeues, invokes the driver,
//! samples latency.
//!
//! Grounded on `output_pop`/`output_create`/`output_stop` in `output.c`. One deviation
//! from the literal C sequencing, noted here and in DESIGN.md: the original calls
//! `out->impl->stop(out)` from the *coordinator* thread while holding the queue lock,
//! racing (in principle) against the worker thread's in-flight `impl->payload` call —
//! the queue lock is held around `stop` but not around `payload`, so it only serializes
//! stop against enqueue/dequeue, not against delivery. Rust ownership makes the race
//! impossible to express safely (the driver would need to be shared behind a second
//! lock for no benefit), so here the driver is owned outright by the worker thread and
//! `stop` is invoked by that same thread immediately after it observes `run_flag`
//! cleared — strictly *after* the flag clear, as required, and never concurrently with
//! `payload`, which is strictly stronger than the original's guarantee.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use tracing::{info, trace, warn};

use crate::driver::OutputDriver;
use crate::error::DriverError;
use crate::metrics::counter::Counter;
use crate::metrics::meter::Meter;
use crate::payload::Payload;

/// A single output's FIFO, guarded by a mutex + condition variable (not an
/// `mpsc::channel`): the stop sequence needs to wait on the same predicate
/// (`empty && running`) that normal dequeue uses, which a channel receiver can't
/// express as directly as an explicit condvar wait-with-predicate (§9).
pub struct OutputQueue {
    inner: Mutex<VecDeque<Payload>>,
    cond: Condvar,
}

impl Default for OutputQueue {
    fn default() -> Self {
        OutputQueue::new()
    }
}

impl OutputQueue {
    pub fn new() -> Self {
        OutputQueue {
            inner: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    /// Enqueues a payload at the tail and wakes one waiter. Called by the dispatcher.
    pub fn push(&self, payload: Payload) {
        let mut guard = self.inner.lock().expect("output queue mutex poisoned");
        guard.push_back(payload);
        self.cond.notify_one();
    }

    /// Blocks until either a payload is available or `run_flag` clears, matching
    /// `output_pop`'s `while (STAILQ_EMPTY(...) && (out->flags & OUTPUT_RUN))` wait.
    /// Returns `None` to signal teardown; any payloads still queued at that point are
    /// dropped (invariant 7).
    pub fn pop_blocking(&self, run_flag: &AtomicBool) -> Option<Payload> {
        let mut guard = self.inner.lock().expect("output queue mutex poisoned");
        while guard.is_empty() && run_flag.load(Ordering::SeqCst) {
            guard = self.cond.wait(guard).expect("output queue mutex poisoned");
        }
        if !run_flag.load(Ordering::SeqCst) {
            return None;
        }
        guard.pop_front()
    }

    /// Wakes every waiter without changing queue contents, used by `stop_output` to
    /// unstick a worker blocked in `pop_blocking`.
    pub fn notify_all(&self) {
        let _guard = self.inner.lock().expect("output queue mutex poisoned");
        self.cond.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("output queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the worker loop needs: the queue to drain, the run flag to observe, the
/// three metrics it owns (count, errors, meter), and the driver to invoke.
pub struct OutputWorker {
    pub name: String,
    pub queue: Arc<OutputQueue>,
    pub run_flag: Arc<AtomicBool>,
    pub count: Arc<Counter>,
    pub errors: Arc<Counter>,
    pub meter: Arc<Meter>,
    pub driver: Box<dyn OutputDriver>,
}

impl OutputWorker {
    /// The worker loop (§4.2). Runs until `pop_blocking` returns `None`, then tears
    /// down by calling `driver.stop()`.
    pub fn run(mut self) {
        trace!(output = %self.name, "output_pop: enter");
        info!(output = %self.name, "output_pop: starting worker thread");

        while let Some(payload) = self.queue.pop_blocking(&self.run_flag) {
            self.count.increment();
            let start = Instant::now();

            if let Err(e) = self.driver.payload(&payload.message_type, &payload.bytes) {
                self.errors.increment();
                warn!(output = %self.name, error = %e, "output_pop: could not process payload");
            }

            self.meter.record(start.elapsed());
        }

        if let Err(e) = self.driver.stop() {
            warn!(output = %self.name, error = %e, "output_pop: driver stop failed, shutdown proceeds");
        }
        info!(output = %self.name, "output_pop: leaving");
    }
}

/// Sets `run_flag` false and wakes the worker out of `pop_blocking`. The worker itself
/// invokes `driver.stop()` once it observes the cleared flag (see module docs for why).
pub fn stop_output(run_flag: &AtomicBool, queue: &OutputQueue) {
    run_flag.store(false, Ordering::SeqCst);
    queue.notify_all();
}

/// Errors a stub test-double output can return from `payload` to exercise S3.
pub fn always_fails() -> DriverError {
    DriverError::message("stub", "configured to always fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::thread;
    use std::time::Duration;

    struct RecordingOutput {
        received: Arc<StdMutex<Vec<(String, Vec<u8>)>>>,
        fail: bool,
    }

    impl OutputDriver for RecordingOutput {
        fn start(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        fn payload(&mut self, message_type: &str, bytes: &[u8]) -> Result<(), DriverError> {
            self.received
                .lock()
                .expect("test mutex poisoned")
                .push((message_type.to_string(), bytes.to_vec()));
            if self.fail {
                Err(always_fails())
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn delivers_payloads_in_fifo_order_then_stops_cleanly() {
        let queue = Arc::new(OutputQueue::new());
        let run_flag = Arc::new(AtomicBool::new(true));
        let count = Arc::new(Counter::new());
        let errors = Arc::new(Counter::new());
        let meter = Arc::new(Meter::new());
        let received = Arc::new(StdMutex::new(Vec::new()));

        for i in 0..5 {
            queue.push(Payload::new("t", format!("{{\"n\":{i}}}")));
        }

        let worker = OutputWorker {
            name: "o".to_string(),
            queue: queue.clone(),
            run_flag: run_flag.clone(),
            count: count.clone(),
            errors: errors.clone(),
            meter: meter.clone(),
            driver: Box::new(RecordingOutput {
                received: received.clone(),
                fail: false,
            }),
        };

        let handle = thread::spawn(move || worker.run());

        // Give the worker a moment to drain, then stop it.
        thread::sleep(Duration::from_millis(50));
        stop_output(&run_flag, &queue);
        handle.join().expect("worker thread panicked");

        assert_eq!(count.get(), 5);
        assert_eq!(errors.get(), 0);
        assert_eq!(meter.sample_count(), 5);
        let received = received.lock().expect("test mutex poisoned");
        let bodies: Vec<String> = received
            .iter()
            .map(|(_, b)| String::from_utf8(b.clone()).expect("utf8"))
            .collect();
        assert_eq!(
            bodies,
            vec!["{\"n\":0}", "{\"n\":1}", "{\"n\":2}", "{\"n\":3}", "{\"n\":4}"]
        );
    }

    #[test]
    fn failing_driver_increments_errors_without_killing_the_worker() {
        let queue = Arc::new(OutputQueue::new());
        let run_flag = Arc::new(AtomicBool::new(true));
        let count = Arc::new(Counter::new());
        let errors = Arc::new(Counter::new());
        let meter = Arc::new(Meter::new());
        let received = Arc::new(StdMutex::new(Vec::new()));

        for _ in 0..5 {
            queue.push(Payload::new("t", "{}"));
        }

        let worker = OutputWorker {
            name: "o".to_string(),
            queue: queue.clone(),
            run_flag: run_flag.clone(),
            count: count.clone(),
            errors: errors.clone(),
            meter: meter.clone(),
            driver: Box::new(RecordingOutput {
                received,
                fail: true,
            }),
        };

        let handle = thread::spawn(move || worker.run());
        thread::sleep(Duration::from_millis(50));
        stop_output(&run_flag, &queue);
        handle.join().expect("worker thread panicked");

        assert_eq!(count.get(), 5);
        assert_eq!(errors.get(), 5);
        assert_eq!(meter.sample_count(), 5);
    }

    #[test]
    fn stop_discards_any_payloads_still_queued() {
        let queue = Arc::new(OutputQueue::new());
        let run_flag = Arc::new(AtomicBool::new(true));

        // Stop before the worker ever runs — queue still has items afterwards.
        queue.push(Payload::new("t", "{}"));
        stop_output(&run_flag, &queue);

        assert!(!run_flag.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 1);
    }
}
