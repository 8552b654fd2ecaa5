//! Errors raised by the trace analysis pipeline.

use std::path::PathBuf;

/// Failures that abort the analysis of a trace or a trial set.
///
/// Malformed lines and zero-denominator metrics never surface here; they are
/// skipped or resolved to fixed fallback values.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to read trace file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trial {trial} has {found} bins, expected {expected}")]
    InconsistentSeriesLength {
        trial: String,
        expected: usize,
        found: usize,
    },

    #[error("No trials to combine")]
    EmptyTrialSet,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
