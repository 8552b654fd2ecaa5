//! Shared utilities: bin width parsing and trace discovery.

pub mod discovery;
pub mod duration;

pub use discovery::{discover_traces, trial_number, TRACE_EXTENSION};
pub use duration::parse_bin_width;
