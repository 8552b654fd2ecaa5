//! Core data types for trace flow analysis.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Simulation timestamp in seconds since the start of the trace
pub type SimTime = f64;

/// Kind of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Packet handed to the link (`+` or `s`)
    Send,
    /// Packet delivered at the far end (`r`)
    Receive,
    /// Packet dropped by a queue (`d`)
    Drop,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Send => write!(f, "send"),
            EventKind::Receive => write!(f, "receive"),
            EventKind::Drop => write!(f, "drop"),
        }
    }
}

/// Flow identity: packet-type tag plus flow/connection id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub tag: String,
    pub flow_id: String,
}

impl FlowKey {
    /// Marker used when a line carries no tag or flow id
    pub const PLACEHOLDER: &'static str = "-";

    pub fn new(tag: impl Into<String>, flow_id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            flow_id: flow_id.into(),
        }
    }

    pub fn placeholder() -> Self {
        Self::new(Self::PLACEHOLDER, Self::PLACEHOLDER)
    }

    pub fn is_placeholder(&self) -> bool {
        self.tag == Self::PLACEHOLDER && self.flow_id == Self::PLACEHOLDER
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tag, self.flow_id)
    }
}

/// A single parsed trace line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub timestamp: SimTime,
    pub size: u64,
    pub flow: FlowKey,
}

/// Line accounting for one trace file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    /// Lines read from the file
    pub total: u64,
    /// Blank and comment lines
    pub comments: u64,
    /// Lines that failed tokenization or numeric parsing
    pub malformed: u64,
    /// Well-formed lines whose event symbol is not tracked (e.g. `-` dequeue)
    pub ignored: u64,
    /// Lines turned into events
    pub events: u64,
}

/// Accumulated counters for a single flow while a trace is consumed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub received_packets: u64,
    pub received_bytes: u64,
    pub dropped_packets: u64,
    /// (timestamp, size) of every receive event, in trace order
    pub receives: Vec<(SimTime, u64)>,
}

/// Fixed-width binned throughput series in Mbps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSeries {
    pub bin_width: f64,
    pub values: Vec<f64>,
}

impl ThroughputSeries {
    pub fn zeros(bin_width: f64, bins: usize) -> Self {
        Self {
            bin_width,
            values: vec![0.0; bins],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total bytes represented by the series (inverse of the binning)
    pub fn total_bytes(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.bin_width * 1e6 / 8.0
    }
}

/// Finalized flow: counters plus its throughput series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub key: FlowKey,
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub received_packets: u64,
    pub received_bytes: u64,
    pub dropped_packets: u64,
    pub series: ThroughputSeries,
}

/// Per-flow scalar metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    pub flow: FlowKey,
    pub goodput_mbps: f64,
    pub plr_pct: f64,
}

/// Everything derived from one trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAnalysis {
    pub label: String,
    pub path: String,
    pub duration: SimTime,
    pub bin_width: f64,
    pub lines: LineStats,
    pub flows: BTreeMap<FlowKey, FlowSummary>,
}

impl TraceAnalysis {
    pub fn bin_count(&self) -> usize {
        self.flows
            .values()
            .next()
            .map(|f| f.series.len())
            .unwrap_or(0)
    }
}

/// Row of the per-flow metrics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetricsRow {
    pub variant: String,
    pub queue: Option<String>,
    pub flow: String,
    pub goodput_mbps: f64,
    pub plr_pct: f64,
    pub dropped_packets: u64,
}

/// Row of the fairness table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessRow {
    pub variant: String,
    pub queue: Option<String>,
    pub jain_index: f64,
}

/// Row of the stability table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityRow {
    pub variant: String,
    pub queue: Option<String>,
    pub cov: f64,
}

/// One time bin of a cross-trial band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRow {
    pub bin: usize,
    pub time_s: f64,
    pub mean_mbps: f64,
    pub std_mbps: f64,
    pub ci95_mbps: f64,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_timestamp: String,
    pub bin_width_s: f64,
    pub dialect: String,
    pub traces: Vec<String>,
}

/// Variant comparison results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub metadata: AnalysisMetadata,
    /// Whole-trace goodput/PLR over data-bearing flows, one row per trace
    pub totals: Vec<FlowMetricsRow>,
    pub flows: Vec<FlowMetricsRow>,
    pub fairness: Vec<FairnessRow>,
    pub stability: Vec<StabilityRow>,
    /// Traces that could not be read
    pub failed: Vec<String>,
}

/// Cross-trial band results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    pub metadata: AnalysisMetadata,
    pub label: String,
    pub trials: usize,
    pub band: Vec<BandRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_key_display() {
        assert_eq!(FlowKey::new("tcp", "1").to_string(), "tcp/1");
        assert!(FlowKey::placeholder().is_placeholder());
        assert!(!FlowKey::new("tcp", "-").is_placeholder());
    }

    #[test]
    fn test_series_total_bytes() {
        let series = ThroughputSeries {
            bin_width: 0.1,
            values: vec![0.08, 0.0],
        };
        assert!((series.total_bytes() - 1000.0).abs() < 1e-6);
        assert!(ThroughputSeries::zeros(0.2, 0).is_empty());
    }
}
