//! The three concrete drivers the config loader can select by name: `kafka` (input),
//! `elasticsearch` and `exec` (output).

pub mod elasticsearch;
pub mod exec;
pub mod kafka;
