//! Trace parsing for NS2 event logs.
//!
//! Reads trace files line by line, classifies each line through a
//! [`TraceDialect`] and feeds the resulting events to a [`FlowAggregator`].
//! Batches of traces are parsed in parallel, one file per worker.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::error::{AnalysisError, AnalysisResult};
use super::flow::FlowAggregator;
use super::types::*;
use crate::config::{AnalysisConfig, TraceDialect};

/// Outcome of classifying one line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Event(TraceEvent),
    /// Blank or comment line
    Comment,
    /// Well-formed line with an untracked event symbol
    Ignored,
    /// Too few fields or non-numeric timestamp/size
    Malformed,
}

/// Map an event symbol to its kind
fn classify_symbol(dialect: &TraceDialect, symbol: &str) -> Option<EventKind> {
    if dialect.send_symbols.iter().any(|s| s == symbol) {
        Some(EventKind::Send)
    } else if dialect.receive_symbols.iter().any(|s| s == symbol) {
        Some(EventKind::Receive)
    } else if dialect.drop_symbols.iter().any(|s| s == symbol) {
        Some(EventKind::Drop)
    } else {
        None
    }
}

/// Parse a single trace line
pub fn parse_line(dialect: &TraceDialect, line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(dialect.comment_prefix.as_str()) {
        return ParsedLine::Comment;
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < dialect.min_fields() {
        return ParsedLine::Malformed;
    }

    let timestamp: SimTime = match fields[dialect.time_field].parse() {
        Ok(t) if f64::is_finite(t) && t >= 0.0 => t,
        _ => return ParsedLine::Malformed,
    };
    let size: u64 = match fields[dialect.size_field].parse() {
        Ok(s) => s,
        Err(_) => return ParsedLine::Malformed,
    };

    let kind = match classify_symbol(dialect, fields[dialect.event_field]) {
        Some(kind) => kind,
        None => return ParsedLine::Ignored,
    };

    let flow = match (fields.get(dialect.tag_field), fields.get(dialect.flow_field)) {
        (Some(tag), Some(flow_id)) => FlowKey::new(*tag, *flow_id),
        _ => FlowKey::placeholder(),
    };

    ParsedLine::Event(TraceEvent {
        kind,
        timestamp,
        size,
        flow,
    })
}

/// Streaming reader over one trace file.
///
/// Line-level problems are counted and skipped. A read failure ends the
/// iteration and is kept for [`TraceReader::take_error`].
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    dialect: TraceDialect,
    stats: LineStats,
    max_timestamp: SimTime,
    error: Option<std::io::Error>,
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file
    pub fn open(path: &Path, dialect: &TraceDialect) -> AnalysisResult<Self> {
        let file = File::open(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file), dialect))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R, dialect: &TraceDialect) -> Self {
        Self {
            lines: reader.lines(),
            dialect: dialect.clone(),
            stats: LineStats::default(),
            max_timestamp: 0.0,
            error: None,
        }
    }

    /// Line counters so far
    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Largest timestamp among events yielded so far
    pub fn max_timestamp(&self) -> SimTime {
        self.max_timestamp
    }

    /// The read error that stopped the iteration, if any
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = TraceEvent;

    fn next(&mut self) -> Option<TraceEvent> {
        if self.error.is_some() {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    self.stats.total += 1;
                    self.stats.malformed += 1;
                    continue;
                }
                Err(e) => {
                    log::debug!("Read failed after {} lines: {}", self.stats.total, e);
                    self.error = Some(e);
                    return None;
                }
            };
            self.stats.total += 1;

            match parse_line(&self.dialect, &line) {
                ParsedLine::Event(event) => {
                    self.stats.events += 1;
                    self.max_timestamp = self.max_timestamp.max(event.timestamp);
                    return Some(event);
                }
                ParsedLine::Comment => self.stats.comments += 1,
                ParsedLine::Ignored => self.stats.ignored += 1,
                ParsedLine::Malformed => self.stats.malformed += 1,
            }
        }
    }
}

fn analyze_events<R: BufRead>(
    mut events: TraceReader<R>,
    label: &str,
    path: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<TraceAnalysis> {
    let mut aggregator = FlowAggregator::new();
    for event in events.by_ref() {
        aggregator.record(&event);
    }

    if let Some(source) = events.take_error() {
        return Err(AnalysisError::Io {
            path: PathBuf::from(path),
            source,
        });
    }

    let stats = events.stats();
    let analysis = aggregator.finish(label, path, stats, events.max_timestamp(), config);

    log::debug!(
        "Parsed {}: {} events, {} malformed, {} ignored, {} flows, duration {:.3}s",
        label,
        stats.events,
        stats.malformed,
        stats.ignored,
        analysis.flows.len(),
        analysis.duration
    );

    Ok(analysis)
}

/// Run the whole pipeline for events coming from any buffered reader;
/// `path` names the source in errors and reports
pub fn analyze_reader<R: BufRead>(
    reader: R,
    label: &str,
    path: &str,
    config: &AnalysisConfig,
) -> AnalysisResult<TraceAnalysis> {
    let dialect = config.dialect.resolve();
    analyze_events(TraceReader::new(reader, &dialect), label, path, config)
}

/// Parse and aggregate a single trace file
pub fn analyze_trace_file(path: &Path, label: &str, config: &AnalysisConfig) -> AnalysisResult<TraceAnalysis> {
    let dialect = config.dialect.resolve();
    let events = TraceReader::open(path, &dialect)?;
    analyze_events(events, label, &path.display().to_string(), config)
}

/// A labelled trace to analyze
#[derive(Debug, Clone, PartialEq)]
pub struct TraceInput {
    pub label: String,
    pub queue: Option<String>,
    pub path: PathBuf,
}

impl TraceInput {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            queue: None,
            path: path.into(),
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }
}

/// Parse all traces in parallel; each entry keeps its own result so one
/// unreadable file does not abort the others
pub fn analyze_all_traces(
    inputs: &[TraceInput],
    config: &AnalysisConfig,
) -> Vec<(TraceInput, AnalysisResult<TraceAnalysis>)> {
    log::info!("Parsing {} traces in parallel...", inputs.len());

    let results: Vec<(TraceInput, AnalysisResult<TraceAnalysis>)> = inputs
        .par_iter()
        .map(|input| {
            let result = analyze_trace_file(&input.path, &input.label, config);
            if let Err(e) = &result {
                log::warn!("Failed to parse {}: {}", input.path.display(), e);
            }
            (input.clone(), result)
        })
        .collect();

    let parsed = results.iter().filter(|(_, r)| r.is_ok()).count();
    log::info!("Parsed {} of {} traces", parsed, inputs.len());

    results
}
