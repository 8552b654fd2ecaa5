//! Flow analysis for NS2 simulation traces.
//!
//! This module turns trace files into per-flow throughput series and the
//! summary metrics built on them: goodput, packet loss, Jain fairness,
//! coefficient of variation and cross-trial confidence bands.

pub mod types;
pub mod error;
pub mod trace_parser;
pub mod flow;
pub mod metrics;
pub mod trials;
pub mod comparison;
pub mod report;
pub mod chart;

pub use types::*;
pub use error::{AnalysisError, AnalysisResult};
pub use trace_parser::{analyze_all_traces, analyze_reader, analyze_trace_file, TraceInput, TraceReader};
pub use flow::FlowAggregator;
pub use comparison::{compare_traces, ComparisonTables};
pub use trials::{analyze_trials, combine_trials};
pub use report::{generate_json_report, generate_text_report, write_csv};
