//! Variant comparison: per-flow, fairness and stability tables across traces.

use super::metrics::{data_flow_metrics, trace_fairness, trace_stability, trace_totals};
use super::trace_parser::{analyze_all_traces, TraceInput};
use super::types::*;
use crate::config::AnalysisConfig;

/// Tables derived from a batch of traces
#[derive(Debug, Clone, Default)]
pub struct ComparisonTables {
    pub totals: Vec<FlowMetricsRow>,
    pub flows: Vec<FlowMetricsRow>,
    pub fairness: Vec<FairnessRow>,
    pub stability: Vec<StabilityRow>,
}

impl ComparisonTables {
    /// Append the rows of one finished trace
    pub fn push_trace(&mut self, input: &TraceInput, analysis: &TraceAnalysis, config: &AnalysisConfig) {
        let totals = trace_totals(analysis, config);
        let dropped: u64 = analysis.flows.values().map(|f| f.dropped_packets).sum();
        self.totals.push(FlowMetricsRow {
            variant: input.label.clone(),
            queue: input.queue.clone(),
            flow: totals.flow.to_string(),
            goodput_mbps: totals.goodput_mbps,
            plr_pct: totals.plr_pct,
            dropped_packets: dropped,
        });

        for metrics in data_flow_metrics(analysis, config) {
            let dropped_packets = analysis
                .flows
                .get(&metrics.flow)
                .map(|f| f.dropped_packets)
                .unwrap_or(0);
            self.flows.push(FlowMetricsRow {
                variant: input.label.clone(),
                queue: input.queue.clone(),
                flow: metrics.flow.to_string(),
                goodput_mbps: metrics.goodput_mbps,
                plr_pct: metrics.plr_pct,
                dropped_packets,
            });
        }

        self.fairness.push(FairnessRow {
            variant: input.label.clone(),
            queue: input.queue.clone(),
            jain_index: trace_fairness(analysis, config),
        });

        self.stability.push(StabilityRow {
            variant: input.label.clone(),
            queue: input.queue.clone(),
            cov: trace_stability(analysis),
        });
    }
}

/// Analyze every trace and build the comparison tables.
///
/// Returns the tables plus the paths of traces that could not be read;
/// unreadable traces contribute no rows.
pub fn compare_traces(inputs: &[TraceInput], config: &AnalysisConfig) -> (ComparisonTables, Vec<String>) {
    let mut tables = ComparisonTables::default();
    let mut failed = Vec::new();

    // Results come back in input order
    for (input, result) in analyze_all_traces(inputs, config) {
        match result {
            Ok(analysis) => tables.push_trace(&input, &analysis, config),
            Err(e) => failed.push(format!("{}: {}", input.path.display(), e)),
        }
    }

    (tables, failed)
}
