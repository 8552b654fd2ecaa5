//! Flow metrics: goodput, packet loss, Jain fairness and throughput stability.
//!
//! Every degenerate input has a fixed answer instead of an error:
//!
//! | input | result |
//! |---|---|
//! | no sent packets | PLR 0 % |
//! | empty fairness set | Jain 1.0 |
//! | all-zero fairness set | Jain 0.0 |
//! | zero-mean aggregate | CoV 0.0 |

use super::types::*;
use crate::config::AnalysisConfig;

/// Goodput in Mbps over the whole trace
pub fn goodput_mbps(received_bytes: u64, duration: SimTime) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    received_bytes as f64 * 8.0 / duration / 1e6
}

/// Packet loss rate in percent
pub fn packet_loss_pct(sent_packets: u64, received_packets: u64) -> f64 {
    if sent_packets == 0 {
        return 0.0;
    }
    (1.0 - received_packets as f64 / sent_packets as f64) * 100.0
}

pub fn flow_metrics(flow: &FlowSummary, duration: SimTime) -> FlowMetrics {
    FlowMetrics {
        flow: flow.key.clone(),
        goodput_mbps: goodput_mbps(flow.received_bytes, duration),
        plr_pct: packet_loss_pct(flow.sent_packets, flow.received_packets),
    }
}

/// Whether a flow gets a row in the metrics table
pub fn is_data_flow(key: &FlowKey, config: &AnalysisConfig) -> bool {
    key.is_placeholder() || config.is_data_tag(&key.tag)
}

fn is_fairness_flow(key: &FlowKey, config: &AnalysisConfig) -> bool {
    key.is_placeholder() || config.is_fairness_tag(&key.tag)
}

/// Metrics for every data-bearing flow, in flow-key order
pub fn data_flow_metrics(analysis: &TraceAnalysis, config: &AnalysisConfig) -> Vec<FlowMetrics> {
    analysis
        .flows
        .values()
        .filter(|f| is_data_flow(&f.key, config))
        .map(|f| flow_metrics(f, analysis.duration))
        .collect()
}

/// Goodput and PLR of all data-bearing flows taken together
pub fn trace_totals(analysis: &TraceAnalysis, config: &AnalysisConfig) -> FlowMetrics {
    let (mut sent, mut received, mut bytes) = (0u64, 0u64, 0u64);
    for flow in analysis.flows.values().filter(|f| is_data_flow(&f.key, config)) {
        sent += flow.sent_packets;
        received += flow.received_packets;
        bytes += flow.received_bytes;
    }

    FlowMetrics {
        flow: FlowKey::new("all", "*"),
        goodput_mbps: goodput_mbps(bytes, analysis.duration),
        plr_pct: packet_loss_pct(sent, received),
    }
}

/// Start index of the trailing third of a series of length `n`
pub fn tail_window_start(n: usize) -> usize {
    n * 2 / 3
}

/// Mean of the trailing third; the full-series mean when that window is empty
pub fn tail_window_mean(values: &[f64]) -> f64 {
    let tail = &values[tail_window_start(values.len())..];
    let window = if tail.is_empty() { values } else { tail };
    if window.is_empty() {
        0.0
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

/// Jain fairness index `(Σx)² / (N·Σx²)`
pub fn jain_index(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }

    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|x| x * x).sum();
    let denominator = values.len() as f64 * sum_sq;
    if denominator == 0.0 {
        return 0.0;
    }

    (sum * sum / denominator).clamp(0.0, 1.0)
}

/// Jain fairness across the tail-window means of a trace's fairness flows
pub fn trace_fairness(analysis: &TraceAnalysis, config: &AnalysisConfig) -> f64 {
    let means: Vec<f64> = analysis
        .flows
        .values()
        .filter(|f| is_fairness_flow(&f.key, config))
        .map(|f| tail_window_mean(&f.series.values))
        .collect();
    jain_index(&means)
}

/// Element-wise sum of several series; shorter inputs count as zero past their end
pub fn aggregate_series<'a, I>(series: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut total: Vec<f64> = Vec::new();
    for values in series {
        if values.len() > total.len() {
            total.resize(values.len(), 0.0);
        }
        for (acc, v) in total.iter_mut().zip(values) {
            *acc += v;
        }
    }
    total
}

/// Aggregate throughput series of one trace (all flows)
pub fn trace_aggregate(analysis: &TraceAnalysis) -> Vec<f64> {
    aggregate_series(analysis.flows.values().map(|f| f.series.values.as_slice()))
}

/// Population standard deviation over mean
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean.abs()
}

/// Stability of the aggregate throughput of a trace
pub fn trace_stability(analysis: &TraceAnalysis) -> f64 {
    coefficient_of_variation(&trace_aggregate(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn flow(tag: &str, id: &str, sent: u64, received: u64, values: Vec<f64>) -> FlowSummary {
        FlowSummary {
            key: FlowKey::new(tag, id),
            sent_packets: sent,
            sent_bytes: sent * 1000,
            received_packets: received,
            received_bytes: received * 1000,
            dropped_packets: 0,
            series: ThroughputSeries {
                bin_width: 0.1,
                values,
            },
        }
    }

    fn analysis(flows: Vec<FlowSummary>) -> TraceAnalysis {
        let flows: BTreeMap<FlowKey, FlowSummary> =
            flows.into_iter().map(|f| (f.key.clone(), f)).collect();
        TraceAnalysis {
            label: "test".to_string(),
            path: "test.tr".to_string(),
            duration: 0.3,
            bin_width: 0.1,
            lines: LineStats::default(),
            flows,
        }
    }

    #[test]
    fn test_single_packet_goodput() {
        assert!((goodput_mbps(1000, 0.1) - 0.08).abs() < 1e-12);
        assert_eq!(packet_loss_pct(1, 1), 0.0);
    }

    #[test]
    fn test_packet_loss() {
        assert_eq!(packet_loss_pct(0, 0), 0.0);
        assert_eq!(packet_loss_pct(4, 3), 25.0);
        assert_eq!(packet_loss_pct(4, 0), 100.0);
    }

    #[test]
    fn test_tail_window_mean() {
        assert_eq!(tail_window_start(9), 6);
        assert_eq!(tail_window_mean(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 3.0, 6.0]), 4.0);
        assert_eq!(tail_window_mean(&[5.0]), 5.0);
        assert_eq!(tail_window_mean(&[]), 0.0);
    }

    #[test]
    fn test_jain_degenerate_inputs() {
        assert_eq!(jain_index(&[]), 1.0);
        assert_eq!(jain_index(&[0.0, 0.0]), 0.0);
        assert_eq!(jain_index(&[3.0, 3.0, 3.0]), 1.0);
        assert!((jain_index(&[1.0, 0.0, 0.0, 0.0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_equal_flows_are_fair_and_stable() {
        let trace = analysis(vec![
            flow("tcp", "1", 3, 3, vec![2.0, 2.0, 2.0]),
            flow("tcp", "2", 3, 3, vec![2.0, 2.0, 2.0]),
        ]);
        let config = AnalysisConfig::default();

        assert_eq!(trace_aggregate(&trace), vec![4.0, 4.0, 4.0]);
        assert_eq!(trace_stability(&trace), 0.0);
        assert_eq!(trace_fairness(&trace, &config), 1.0);
    }

    #[test]
    fn test_ack_stream_is_not_a_competing_flow() {
        let trace = analysis(vec![
            flow("tcp", "1", 3, 3, vec![8.0, 8.0, 8.0]),
            flow("ack", "1", 3, 3, vec![0.3, 0.3, 0.3]),
        ]);
        let config = AnalysisConfig::default();

        assert_eq!(data_flow_metrics(&trace, &config).len(), 2);
        assert_eq!(trace_fairness(&trace, &config), 1.0);
    }

    #[test]
    fn test_control_flows_excluded_from_table() {
        let trace = analysis(vec![
            flow("tcp", "1", 4, 3, vec![1.0, 1.0, 1.0]),
            flow("rtProtoDV", "9", 2, 2, vec![0.5, 0.0, 0.0]),
        ]);
        let config = AnalysisConfig::default();

        let rows = data_flow_metrics(&trace, &config);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].flow, FlowKey::new("tcp", "1"));
        assert_eq!(rows[0].plr_pct, 25.0);
        assert!((rows[0].goodput_mbps - 3000.0 * 8.0 / 0.3 / 1e6).abs() < 1e-12);

        // Stability still sees every flow
        assert_eq!(trace_aggregate(&trace), vec![1.5, 1.0, 1.0]);

        let totals = trace_totals(&trace, &config);
        assert_eq!(totals.plr_pct, 25.0);
    }

    #[test]
    fn test_aggregate_series_uneven_lengths() {
        let a = [1.0, 2.0];
        let b = [1.0, 1.0, 1.0];
        assert_eq!(aggregate_series([&a[..], &b[..]]), vec![2.0, 3.0, 1.0]);
        assert!(aggregate_series(Vec::<&[f64]>::new()).is_empty());
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[2.0, 2.0, 2.0]), 0.0);
        // mean 2, population std 1
        assert!((coefficient_of_variation(&[1.0, 3.0]) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_jain_is_bounded(values in prop::collection::vec(0.0f64..1e4, 0..32)) {
            let j = jain_index(&values);
            prop_assert!((0.0..=1.0).contains(&j));
        }

        #[test]
        fn prop_jain_equal_values(value in 1e-3f64..1e4, n in 1usize..32) {
            let j = jain_index(&vec![value; n]);
            prop_assert!((j - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_cov_non_negative(values in prop::collection::vec(0.0f64..1e4, 0..64)) {
            prop_assert!(coefficient_of_variation(&values) >= 0.0);
        }

        #[test]
        fn prop_plr_in_range(sent in 0u64..10_000, frac in 0.0f64..=1.0) {
            let received = (sent as f64 * frac) as u64;
            let plr = packet_loss_pct(sent, received);
            prop_assert!((0.0..=100.0).contains(&plr));
        }
    }
}
