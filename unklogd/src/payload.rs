//! The owned message object passed across per-output queues.
//!
//! Mirrors `struct payload` in `unklog.h`: a `type` string plus the raw bytes. In the
//! original C each output's queue entry is a `calloc`'d copy, freed by the worker after
//! delivery; here the same ownership shape is expressed as a plain owned `Vec<u8>` that
//! is dropped once the worker is done with it, duplicated per output by `Clone` at
//! dispatch time (C5 §4.1 step 4a).

/// One inbound message, classified by its `type` field, headed for exactly one output's
/// queue. Each output owns its own copy — no payload is ever shared across outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub message_type: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn new(message_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Payload {
            message_type: message_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
