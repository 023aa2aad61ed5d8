//! C1 — the monotonic counter primitive.
//!
//! Grounded on `struct metric_counter` / `metric_inc` in `metrics.c`: a single `u64`
//! incremented by exactly one writer (the owning worker), read by the collector without
//! holding any lock beyond the atomicity of the load itself.

use std::sync::atomic::{AtomicU64, Ordering};

/// A 64-bit monotonic counter. Single-writer (the owning worker thread), multi-reader
/// (the metrics collector), so increments use `Ordering::Relaxed` — the only
/// cross-thread observer is a plain snapshot read, not a value this counter's writer
/// ever needs to synchronize against.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Counter(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_increments_by_one() {
        let c = Counter::new();
        assert_eq!(c.get(), 0);
        c.increment();
        c.increment();
        assert_eq!(c.get(), 2);
    }
}
