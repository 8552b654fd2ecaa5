//! Analysis configuration: trace dialect, binning and cross-trial policy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default throughput bin width (200 ms)
pub const DEFAULT_BIN_WIDTH: Duration = Duration::from_millis(200);

/// Built-in trace layouts
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialectPreset {
    /// NS2 wired queue trace: `+` enqueue, `-` dequeue, `r` receive, `d` drop
    Queue,
    /// Agent-level trace: `s` send, `r` receive, `d` drop
    Agent,
}

impl fmt::Display for DialectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectPreset::Queue => write!(f, "queue"),
            DialectPreset::Agent => write!(f, "agent"),
        }
    }
}

impl std::str::FromStr for DialectPreset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queue" | "ns2" => Ok(DialectPreset::Queue),
            "agent" => Ok(DialectPreset::Agent),
            other => Err(ValidationError::InvalidDialect(format!(
                "unknown dialect preset '{}'",
                other
            ))),
        }
    }
}

/// Column layout and event symbols of a trace file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TraceDialect {
    pub event_field: usize,
    pub time_field: usize,
    pub tag_field: usize,
    pub size_field: usize,
    pub flow_field: usize,
    pub send_symbols: Vec<String>,
    pub receive_symbols: Vec<String>,
    #[serde(default)]
    pub drop_symbols: Vec<String>,
    #[serde(default = "default_comment_prefix")]
    pub comment_prefix: String,
}

fn default_comment_prefix() -> String {
    "#".to_string()
}

impl TraceDialect {
    pub fn preset(preset: DialectPreset) -> Self {
        let send = match preset {
            DialectPreset::Queue => "+",
            DialectPreset::Agent => "s",
        };
        Self {
            event_field: 0,
            time_field: 1,
            tag_field: 4,
            size_field: 5,
            flow_field: 7,
            send_symbols: vec![send.to_string()],
            receive_symbols: vec!["r".to_string()],
            drop_symbols: vec!["d".to_string()],
            comment_prefix: default_comment_prefix(),
        }
    }

    /// Fields needed to read event type, timestamp and size
    pub fn min_fields(&self) -> usize {
        self.event_field.max(self.time_field).max(self.size_field) + 1
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.send_symbols.is_empty() || self.receive_symbols.is_empty() {
            return Err(ValidationError::InvalidDialect(
                "send_symbols and receive_symbols cannot be empty".to_string(),
            ));
        }

        let mut seen: Vec<&str> = Vec::new();
        for symbol in self
            .send_symbols
            .iter()
            .chain(&self.receive_symbols)
            .chain(&self.drop_symbols)
        {
            if symbol.is_empty() || symbol.contains(char::is_whitespace) {
                return Err(ValidationError::InvalidDialect(format!(
                    "event symbol '{}' must be a non-empty token",
                    symbol
                )));
            }
            if seen.contains(&symbol.as_str()) {
                return Err(ValidationError::InvalidDialect(format!(
                    "event symbol '{}' is mapped to more than one event kind",
                    symbol
                )));
            }
            seen.push(symbol);
        }

        let columns = [self.event_field, self.time_field, self.size_field];
        if columns[0] == columns[1] || columns[0] == columns[2] || columns[1] == columns[2] {
            return Err(ValidationError::InvalidDialect(
                "event, time and size fields must be distinct".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for TraceDialect {
    fn default() -> Self {
        Self::preset(DialectPreset::Queue)
    }
}

/// Dialect as written in the configuration file: a preset name or a full mapping
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DialectSpec {
    Preset(DialectPreset),
    Custom(TraceDialect),
}

impl DialectSpec {
    pub fn resolve(&self) -> TraceDialect {
        match self {
            DialectSpec::Preset(preset) => TraceDialect::preset(*preset),
            DialectSpec::Custom(dialect) => dialect.clone(),
        }
    }
}

impl fmt::Display for DialectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectSpec::Preset(preset) => write!(f, "{}", preset),
            DialectSpec::Custom(_) => write!(f, "custom"),
        }
    }
}

impl Default for DialectSpec {
    fn default() -> Self {
        DialectSpec::Preset(DialectPreset::Queue)
    }
}

/// How cross-trial series of different bin counts are reconciled
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Cut every series to the shortest one
    #[default]
    Truncate,
    /// Extend shorter series with zero throughput
    ZeroPad,
    /// Fail on any mismatch
    Reject,
}

impl std::str::FromStr for LengthPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "truncate" => Ok(LengthPolicy::Truncate),
            "zero_pad" | "pad" => Ok(LengthPolicy::ZeroPad),
            "reject" => Ok(LengthPolicy::Reject),
            other => Err(ValidationError::InvalidGeneral(format!(
                "unknown length policy '{}'",
                other
            ))),
        }
    }
}

/// Top-level analysis configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    #[serde(with = "humantime_serde", default = "default_bin_width")]
    pub bin_width: Duration,
    /// Fixed trace duration; derived from the trace when absent
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub dialect: DialectSpec,
    /// Packet-type tags that get a row in the metrics table
    #[serde(default = "default_data_tags")]
    pub data_tags: Vec<String>,
    /// Forward-path tags whose flows compete for fairness
    #[serde(default = "default_fairness_tags")]
    pub fairness_tags: Vec<String>,
    #[serde(default)]
    pub length_policy: LengthPolicy,
}

fn default_bin_width() -> Duration {
    DEFAULT_BIN_WIDTH
}

fn default_data_tags() -> Vec<String> {
    vec!["tcp".to_string(), "ack".to_string(), "cbr".to_string()]
}

/// Forward data tags only; `ack` flows are never competitors
fn default_fairness_tags() -> Vec<String> {
    vec!["tcp".to_string(), "cbr".to_string()]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            duration: None,
            dialect: DialectSpec::default(),
            data_tags: default_data_tags(),
            fairness_tags: default_fairness_tags(),
            length_policy: LengthPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bin_width.is_zero() {
            return Err(ValidationError::InvalidGeneral(
                "bin_width must be greater than zero".to_string(),
            ));
        }

        if let Some(duration) = self.duration {
            if duration.is_zero() {
                return Err(ValidationError::InvalidGeneral(
                    "duration must be greater than zero when set".to_string(),
                ));
            }
        }

        if self.data_tags.is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "data_tags cannot be an empty list".to_string(),
            ));
        }

        if self.fairness_tags.is_empty() {
            return Err(ValidationError::InvalidGeneral(
                "fairness_tags cannot be an empty list".to_string(),
            ));
        }

        self.dialect.resolve().validate()
    }

    pub fn bin_width_secs(&self) -> f64 {
        self.bin_width.as_secs_f64()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }

    pub fn is_data_tag(&self, tag: &str) -> bool {
        self.data_tags.iter().any(|t| t == tag)
    }

    pub fn is_fairness_tag(&self, tag: &str) -> bool {
        self.fairness_tags.iter().any(|t| t == tag)
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid trace dialect: {0}")]
    InvalidDialect(String),
}
