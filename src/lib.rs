//! execlog - Bazel execution log analyzer
//!
//! Decodes execution logs written by `--execution_log_binary_file`,
//! `--execution_log_compact_file` or `--execution_log_json_file` into [`record::SpawnExec`] values and derives
//! summary statistics: slowest actions, per-mnemonic totals and remote cache
//! throughput, plus optional phase, size, memory and retry breakdowns.

pub mod analyze;
pub mod binary_log;
pub mod cache_perf;
pub mod cli;
pub mod compact_log;
pub mod error;
pub mod json_log;
pub mod json_output;
pub mod phases;
pub mod ranking;
pub mod record;
pub mod report;
pub mod stats;

pub use error::{DecodeError, Result};
pub use record::SpawnExec;
