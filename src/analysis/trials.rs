//! Cross-trial statistics: mean throughput with a 95% confidence band.

use super::error::{AnalysisError, AnalysisResult};
use super::metrics::trace_aggregate;
use super::trace_parser::{analyze_all_traces, TraceInput};
use super::types::*;
use crate::config::{AnalysisConfig, LengthPolicy};

/// z-score of the two-sided 95% normal interval
pub const Z_95: f64 = 1.96;

/// Bring every series to a common length according to `policy`
pub fn reconcile_lengths(
    series: Vec<(String, Vec<f64>)>,
    policy: LengthPolicy,
) -> AnalysisResult<Vec<Vec<f64>>> {
    let shortest = series.iter().map(|(_, s)| s.len()).min().unwrap_or(0);
    let longest = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0);

    if shortest != longest {
        log::debug!(
            "Trial series lengths differ ({} to {} bins), applying {:?}",
            shortest,
            longest,
            policy
        );
    }

    match policy {
        LengthPolicy::Truncate => Ok(series
            .into_iter()
            .map(|(_, mut s)| {
                s.truncate(shortest);
                s
            })
            .collect()),
        LengthPolicy::ZeroPad => Ok(series
            .into_iter()
            .map(|(_, mut s)| {
                s.resize(longest, 0.0);
                s
            })
            .collect()),
        LengthPolicy::Reject => {
            let expected = series.first().map(|(_, s)| s.len()).unwrap_or(0);
            if let Some((trial, s)) = series.iter().find(|(_, s)| s.len() != expected) {
                return Err(AnalysisError::InconsistentSeriesLength {
                    trial: trial.clone(),
                    expected,
                    found: s.len(),
                });
            }
            Ok(series.into_iter().map(|(_, s)| s).collect())
        }
    }
}

/// Per-bin mean, Bessel-corrected std and 95% half-width.
///
/// Every series must have the length of the first one; see [`reconcile_lengths`].
pub fn confidence_band(series: &[Vec<f64>], bin_width: f64) -> AnalysisResult<Vec<BandRow>> {
    if series.is_empty() {
        return Err(AnalysisError::EmptyTrialSet);
    }

    let n = series.len() as f64;
    let bins = series[0].len();
    if let Some((i, s)) = series.iter().enumerate().find(|(_, s)| s.len() != bins) {
        return Err(AnalysisError::InconsistentSeriesLength {
            trial: format!("#{}", i),
            expected: bins,
            found: s.len(),
        });
    }

    let band = (0..bins)
        .map(|bin| {
            let column: Vec<f64> = series.iter().map(|s| s[bin]).collect();
            let mean = column.iter().sum::<f64>() / n;
            let std = if series.len() > 1 {
                let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                variance.sqrt()
            } else {
                0.0
            };

            BandRow {
                bin,
                time_s: bin as f64 * bin_width,
                mean_mbps: mean,
                std_mbps: std,
                ci95_mbps: Z_95 * std / n.sqrt(),
            }
        })
        .collect();

    Ok(band)
}

/// Combine finished per-trial analyses into a band
pub fn combine_trials(trials: &[TraceAnalysis], policy: LengthPolicy) -> AnalysisResult<Vec<BandRow>> {
    let first = trials.first().ok_or(AnalysisError::EmptyTrialSet)?;
    let bin_width = first.bin_width;

    let series: Vec<(String, Vec<f64>)> = trials
        .iter()
        .map(|t| (t.label.clone(), trace_aggregate(t)))
        .collect();

    let series = reconcile_lengths(series, policy)?;
    confidence_band(&series, bin_width)
}

/// Parse every trial trace and build the band. Any unreadable trial aborts
/// the band, naming the file.
pub fn analyze_trials(inputs: &[TraceInput], config: &AnalysisConfig) -> AnalysisResult<Vec<BandRow>> {
    if inputs.is_empty() {
        return Err(AnalysisError::EmptyTrialSet);
    }

    let mut trials = Vec::with_capacity(inputs.len());
    for (_, result) in analyze_all_traces(inputs, config) {
        trials.push(result?);
    }

    log::info!("Combining {} trials", trials.len());
    combine_trials(&trials, config.length_policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(series: Vec<Vec<f64>>) -> Vec<(String, Vec<f64>)> {
        series
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("trial_{}", i), s))
            .collect()
    }

    #[test]
    fn test_identical_trials_have_zero_band() {
        let series = vec![vec![1.0, 1.0, 1.0]; 3];
        let band = confidence_band(&series, 0.2).unwrap();

        assert_eq!(band.len(), 3);
        for row in &band {
            assert_eq!(row.mean_mbps, 1.0);
            assert_eq!(row.std_mbps, 0.0);
            assert_eq!(row.ci95_mbps, 0.0);
        }
        assert!((band[2].time_s - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_band_uses_sample_std() {
        let series = vec![vec![1.0], vec![3.0]];
        let band = confidence_band(&series, 0.1).unwrap();

        assert_eq!(band[0].mean_mbps, 2.0);
        // sqrt(((1-2)^2 + (3-2)^2) / 1)
        assert!((band[0].std_mbps - 2f64.sqrt()).abs() < 1e-12);
        assert!((band[0].ci95_mbps - 1.96).abs() < 1e-12);
    }

    #[test]
    fn test_single_trial() {
        let band = confidence_band(&[vec![4.0, 2.0]], 0.1).unwrap();
        assert_eq!(band[1].mean_mbps, 2.0);
        assert_eq!(band[1].ci95_mbps, 0.0);
    }

    #[test]
    fn test_empty_trial_set() {
        assert!(matches!(confidence_band(&[], 0.1), Err(AnalysisError::EmptyTrialSet)));
        assert!(matches!(
            combine_trials(&[], LengthPolicy::Truncate),
            Err(AnalysisError::EmptyTrialSet)
        ));
    }

    #[test]
    fn test_band_rejects_ragged_series() {
        match confidence_band(&[vec![1.0, 2.0], vec![1.0]], 0.1) {
            Err(AnalysisError::InconsistentSeriesLength { trial, expected, found }) => {
                assert_eq!(trial, "#1");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_length_policies() {
        let input = named(vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]]);

        let truncated = reconcile_lengths(input.clone(), LengthPolicy::Truncate).unwrap();
        assert_eq!(truncated, vec![vec![1.0, 2.0], vec![1.0, 2.0]]);

        let padded = reconcile_lengths(input.clone(), LengthPolicy::ZeroPad).unwrap();
        assert_eq!(padded, vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 0.0]]);

        match reconcile_lengths(input, LengthPolicy::Reject) {
            Err(AnalysisError::InconsistentSeriesLength { trial, expected, found }) => {
                assert_eq!(trial, "trial_1");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        let equal = named(vec![vec![1.0], vec![2.0]]);
        assert!(reconcile_lengths(equal, LengthPolicy::Reject).is_ok());
    }
}
