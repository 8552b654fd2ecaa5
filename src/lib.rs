//! # ns2flow - Flow metrics for NS2 simulation traces
//!
//! This library turns NS2 event traces into per-flow throughput series and
//! the summary statistics used to compare congestion-control variants and
//! queueing disciplines.
//!
//! ## Overview
//!
//! A trace is read once, offline. Every send, receive and drop line is
//! attributed to a flow (packet-type tag plus flow id), receive events are
//! binned into a fixed-width throughput series, and the finished series feed
//! the metrics.
//!
//! ## Key Features
//!
//! - **Configurable Dialects**: Queue traces (`+`/`-`/`r`/`d`) and agent traces
//!   (`s`/`r`/`d`) with configurable column positions
//! - **Per-Flow Metrics**: Goodput (Mbps) and packet loss rate (%)
//! - **Fairness**: Jain index over the steady-state tail of each flow
//! - **Stability**: Coefficient of variation of the aggregate throughput
//! - **Repeated Runs**: Mean throughput with a 95% confidence band across trials
//! - **Batch Processing**: Independent traces parsed in parallel
//!
//! ## Architecture
//!
//! - `analysis::trace_parser`: Line classification and streaming trace reader
//! - `analysis::flow`: Per-flow counters and throughput binning
//! - `analysis::metrics`: Goodput, PLR, Jain fairness, coefficient of variation
//! - `analysis::trials`: Cross-trial mean and confidence band
//! - `analysis::comparison`: Variant comparison tables
//! - `analysis::report` / `analysis::chart`: JSON, CSV, text and SVG output
//! - `config` / `config_loader`: YAML configuration and CLI overrides
//! - `utils`: Bin width parsing and trace discovery
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ns2flow::{analysis, config::AnalysisConfig};
//!
//! let config = AnalysisConfig::default();
//! let trace = analysis::analyze_trace_file(Path::new("cubic.tr"), "cubic", &config)?;
//!
//! for row in analysis::metrics::data_flow_metrics(&trace, &config) {
//!     println!("{}: {:.3} Mbps, {:.2}% loss", row.flow, row.goodput_mbps, row.plr_pct);
//! }
//! println!("Jain: {:.4}", analysis::metrics::trace_fairness(&trace, &config));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! bin_width: 200ms
//! dialect: queue          # or agent, or a full field mapping
//! data_tags: [tcp, ack, cbr]
//! length_policy: truncate # truncate / zero_pad / reject
//! ```
//!
//! ## Error Handling
//!
//! The analysis core returns [`analysis::AnalysisError`]; malformed trace
//! lines are skipped and degenerate metrics resolve to fixed values. Report
//! writers and configuration loading use `color_eyre` with file context.

pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod utils;
