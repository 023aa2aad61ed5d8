//! C1, C8, C9 — metric primitives, the periodic collector, and the TCP snapshot server.

pub mod collector;
pub mod counter;
pub mod meter;
pub mod server;
