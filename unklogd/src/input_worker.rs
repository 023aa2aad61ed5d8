//! C7 — the input worker: hosts one driver on its own thread, emitting via the shared
//! dispatcher.
//!
//! Grounded on `input_run`/`input_create`/`input_stop` in `input.c`. Same ownership
//! deviation as [`crate::output_worker`]: every shipped driver bounds its poll interval
//! (the Kafka driver polls with a 300ms timeout, §4.7), so there is no case among the
//! drivers this daemon ships where `stop` needs to interrupt a longer blocking call from
//! another thread — `start` always returns within one poll interval of `run_flag`
//! clearing. `stop` is therefore invoked by the same worker thread immediately after
//! `start` returns (mirroring `kafka_start`'s own internal unsubscribe-before-return,
//! followed by the externally-invoked `kafka_stop`'s close+wait), rather than requiring
//! the driver to be shared across threads for no benefit to any driver actually shipped.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::driver::{InputContext, InputDriver};
use crate::metrics::counter::Counter;

pub struct InputWorker {
    pub name: String,
    pub run_flag: Arc<AtomicBool>,
    pub count: Arc<Counter>,
    pub dispatcher: Arc<Dispatcher>,
    pub driver: Box<dyn InputDriver>,
}

impl InputWorker {
    pub fn run(mut self) {
        trace!(input = %self.name, "input_start: enter");

        let dispatcher = self.dispatcher.clone();
        let mut emit = move |bytes: &[u8]| {
            let _ = dispatcher.dispatch(bytes);
        };
        let mut ctx = InputContext {
            run_flag: self.run_flag.clone(),
            count: self.count.clone(),
            emit: &mut emit,
        };

        if let Err(e) = self.driver.start(&mut ctx) {
            warn!(input = %self.name, error = %e, "input_start: driver exited with an error");
        }

        if let Err(e) = self.driver.stop() {
            warn!(input = %self.name, error = %e, "input_stop: driver stop failed, shutdown proceeds");
        }

        info!(input = %self.name, "input_start: leave");
    }
}

/// Clears `run_flag`. The worker thread observes this inside its driver's poll loop and
/// returns within one poll interval (§5 cancellation semantics).
pub fn stop_input(run_flag: &AtomicBool) {
    run_flag.store(false, std::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchTarget;
    use crate::driver::InputContext as _InputContext;
    use crate::error::DriverError;
    use crate::output_worker::OutputQueue;
    use std::thread;
    use std::time::Duration;

    /// Emits a fixed sequence of byte messages, one per loop iteration, checking
    /// `ctx.running()` between each — the synthetic input test double described in
    /// SPEC_FULL.md §13.
    struct SyntheticInput {
        messages: Vec<Vec<u8>>,
    }

    impl InputDriver for SyntheticInput {
        fn start(&mut self, ctx: &mut InputContext<'_>) -> Result<(), DriverError> {
            for m in &self.messages {
                if !ctx.running() {
                    break;
                }
                ctx.emit(m);
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    #[test]
    fn emits_reach_the_dispatcher_and_bump_the_input_count() {
        let queue = Arc::new(OutputQueue::new());
        let global_count = Arc::new(Counter::new());
        let dispatcher = Arc::new(Dispatcher::new(
            vec![DispatchTarget {
                name: "o".to_string(),
                queue: queue.clone(),
            }],
            global_count.clone(),
        ));

        let run_flag = Arc::new(AtomicBool::new(true));
        let count = Arc::new(Counter::new());

        let worker = InputWorker {
            name: "synthetic".to_string(),
            run_flag: run_flag.clone(),
            count: count.clone(),
            dispatcher,
            driver: Box::new(SyntheticInput {
                messages: vec![
                    br#"{"type":"a"}"#.to_vec(),
                    br#"{"type":"b"}"#.to_vec(),
                    br#"{"type":"c"}"#.to_vec(),
                ],
            }),
        };

        let handle = thread::spawn(move || worker.run());
        handle.join().expect("worker thread panicked");

        assert_eq!(count.get(), 3);
        assert_eq!(global_count.get(), 3);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn stop_input_is_observed_by_a_long_running_driver() {
        struct LoopingInput;
        impl InputDriver for LoopingInput {
            fn start(&mut self, ctx: &mut InputContext<'_>) -> Result<(), DriverError> {
                while ctx.running() {
                    ctx.emit(br#"{"type":"tick"}"#);
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            }

            fn stop(&mut self) -> Result<(), DriverError> {
                Ok(())
            }
        }

        let queue = Arc::new(OutputQueue::new());
        let global_count = Arc::new(Counter::new());
        let dispatcher = Arc::new(Dispatcher::new(
            vec![DispatchTarget {
                name: "o".to_string(),
                queue,
            }],
            global_count.clone(),
        ));
        let run_flag = Arc::new(AtomicBool::new(true));
        let count = Arc::new(Counter::new());

        let worker = InputWorker {
            name: "looping".to_string(),
            run_flag: run_flag.clone(),
            count,
            dispatcher,
            driver: Box::new(LoopingInput),
        };

        let handle = thread::spawn(move || worker.run());
        thread::sleep(Duration::from_millis(30));
        stop_input(&run_flag);
        handle.join().expect("worker thread panicked");

        assert!(global_count.get() > 0);
    }
}
