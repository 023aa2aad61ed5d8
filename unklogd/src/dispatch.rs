//! C5 — the dispatcher: the classifier+fan-out stage shared by every input worker.
//!
//! Grounded on `dispatch_payload` in `dispatch.c`, with the count-on-success
//! reordering described in SPEC_FULL.md §4.1/§9: `global_count` is only incremented
//! once both JSON parsing and `type` extraction have succeeded, so invariant 2
//! (`global_count` counts successfully parsed messages only) and property P2 hold
//! without qualification.

use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};

use crate::metrics::counter::Counter;
use crate::output_worker::OutputQueue;
use crate::payload::Payload;

/// One registered output's enqueue target, as seen by the dispatcher. The dispatcher
/// never touches an output's driver, run flag, or worker thread — only its queue.
pub struct DispatchTarget {
    pub name: String,
    pub queue: Arc<OutputQueue>,
}

/// Outcome of one `dispatch` call, matching the C contract `ok | parse_error | no_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ok,
    ParseError,
    NoType,
}

/// Parses incoming bytes, extracts `type`, duplicates and enqueues a `Payload` to every
/// registered output's queue, in registration order. Reentrant: any number of input
/// threads may call `dispatch` concurrently — the only shared state it touches is
/// `global_count` (a single atomic) and each output's own mutex-guarded queue.
pub struct Dispatcher {
    targets: Vec<DispatchTarget>,
    global_count: Arc<Counter>,
}

impl Dispatcher {
    pub fn new(targets: Vec<DispatchTarget>, global_count: Arc<Counter>) -> Self {
        Dispatcher {
            targets,
            global_count,
        }
    }

    pub fn dispatch(&self, bytes: &[u8]) -> DispatchOutcome {
        trace!("dispatch: enter");

        let node: Value = match serde_json::from_slice(bytes) {
            Ok(node) => node,
            Err(e) => {
                warn!("dispatch: bad message: {e}");
                return DispatchOutcome::ParseError;
            }
        };

        let message_type = match node.get("type").and_then(Value::as_str) {
            Some(t) => t,
            None => {
                warn!("dispatch: no type in message");
                return DispatchOutcome::NoType;
            }
        };

        self.global_count.increment();

        for target in &self.targets {
            let payload = Payload::new(message_type, bytes);
            target.queue.push(payload);
        }

        trace!("dispatch: success");
        DispatchOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str) -> (DispatchTarget, Arc<OutputQueue>) {
        let queue = Arc::new(OutputQueue::new());
        (
            DispatchTarget {
                name: name.to_string(),
                queue: queue.clone(),
            },
            queue,
        )
    }

    #[test]
    fn malformed_json_is_rejected_without_incrementing_global_count() {
        let (t, _q) = target("o");
        let count = Arc::new(Counter::new());
        let d = Dispatcher::new(vec![t], count.clone());

        assert_eq!(d.dispatch(b"not json"), DispatchOutcome::ParseError);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn missing_type_is_rejected_without_incrementing_global_count() {
        let (t, _q) = target("o");
        let count = Arc::new(Counter::new());
        let d = Dispatcher::new(vec![t], count.clone());

        assert_eq!(d.dispatch(br#"{"x":1}"#), DispatchOutcome::NoType);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn successful_dispatch_enqueues_a_copy_per_output_in_order() {
        let (t1, q1) = target("a");
        let (t2, q2) = target("b");
        let count = Arc::new(Counter::new());
        let d = Dispatcher::new(vec![t1, t2], count.clone());

        for _ in 0..3 {
            assert_eq!(
                d.dispatch(br#"{"type":"x","n":1}"#),
                DispatchOutcome::Ok
            );
        }

        assert_eq!(count.get(), 3);
        assert_eq!(q1.len(), 3);
        assert_eq!(q2.len(), 3);
    }

    #[test]
    fn zero_outputs_still_returns_ok_and_counts() {
        let count = Arc::new(Counter::new());
        let d = Dispatcher::new(vec![], count.clone());

        assert_eq!(d.dispatch(br#"{"type":"x"}"#), DispatchOutcome::Ok);
        assert_eq!(count.get(), 1);
    }
}
