//! C1 — the fixed-bucket latency histogram (`struct metric_meter` / `metric_meter` in
//! `metrics.c`).
//!
//! Thirteen half-open millisecond buckets plus a running maximum. Single-writer
//! (the owning output worker, once per delivered payload), multi-reader (the collector),
//! same atomicity story as [`super::counter::Counter`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

pub const SLOT_COUNT: usize = 13;

/// Upper bound (inclusive, in milliseconds) of each bucket; the last bucket has no
/// upper bound and catches everything above `10_000`.
const BUCKET_UPPER_BOUNDS_MS: [u64; SLOT_COUNT - 1] =
    [2, 5, 10, 20, 50, 100, 200, 500, 1000, 2000, 5000, 10000];

/// A latency histogram: 13 fixed buckets plus a running max, recorded once per
/// delivered payload.
#[derive(Debug)]
pub struct Meter {
    max_ms: AtomicU64,
    slots: [AtomicU32; SLOT_COUNT],
}

impl Default for Meter {
    fn default() -> Self {
        Meter::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        Meter {
            max_ms: AtomicU64::new(0),
            slots: Default::default(),
        }
    }

    fn bucket_for(duration_ms: u64) -> usize {
        BUCKET_UPPER_BOUNDS_MS
            .iter()
            .position(|&upper| duration_ms <= upper)
            .unwrap_or(SLOT_COUNT - 1)
    }

    /// Records one delivery's duration. Durations that round to zero or below land in
    /// bucket 0, matching the original's `duration <= 2.0` catch-all for the first slot.
    pub fn record(&self, duration: Duration) {
        let duration_ms = duration.as_millis().min(u128::from(u64::MAX)) as u64;
        if duration_ms > self.max_ms.load(Ordering::Relaxed) {
            self.max_ms.store(duration_ms, Ordering::Relaxed);
        }
        let bucket = Self::bucket_for(duration_ms);
        self.slots
            .get(bucket)
            .expect("bucket_for returns an index within SLOT_COUNT")
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms.load(Ordering::Relaxed)
    }

    pub fn slots(&self) -> [u32; SLOT_COUNT] {
        let mut out = [0u32; SLOT_COUNT];
        for (slot, value) in self.slots.iter().zip(out.iter_mut()) {
            *value = slot.load(Ordering::Relaxed);
        }
        out
    }

    /// Total number of samples recorded, used by P6 (`meter buckets sum to count`).
    pub fn sample_count(&self) -> u64 {
        self.slots().iter().map(|&s| u64::from(s)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_lands_in_first_bucket() {
        let m = Meter::new();
        m.record(Duration::from_millis(0));
        assert_eq!(m.slots().first().copied(), Some(1));
        assert_eq!(m.max_ms(), 0);
    }

    #[test]
    fn boundary_values_fall_in_the_lower_bucket() {
        let m = Meter::new();
        m.record(Duration::from_millis(2));
        m.record(Duration::from_millis(3));
        let [first, second, ..] = m.slots();
        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[test]
    fn above_ten_seconds_lands_in_the_overflow_bucket() {
        let m = Meter::new();
        m.record(Duration::from_millis(50_000));
        assert_eq!(m.slots().last().copied(), Some(1));
        assert_eq!(m.max_ms(), 50_000);
    }

    #[test]
    fn max_tracks_the_largest_sample_seen() {
        let m = Meter::new();
        m.record(Duration::from_millis(100));
        m.record(Duration::from_millis(5));
        assert_eq!(m.max_ms(), 100);
    }

    #[test]
    fn sample_count_matches_number_of_records() {
        let m = Meter::new();
        for ms in [0, 1, 3, 30, 300, 3000, 30000] {
            m.record(Duration::from_millis(ms));
        }
        assert_eq!(m.sample_count(), 7);
    }
}
