//! Bin width parsing utilities.
//!
//! This module parses bin width strings from the command line
//! (e.g., "0.2", "200ms", "0.2s") into seconds.

/// Parse a bin width string to seconds
///
/// Supports:
/// - Raw seconds: "0.2"
/// - Seconds: "0.2s", "0.2sec", "0.2secs"
/// - Milliseconds: "200ms", "200msec"
///
/// The result must be a finite value greater than zero.
///
/// # Examples
/// ```
/// use ns2flow::utils::duration::parse_bin_width;
///
/// assert_eq!(parse_bin_width("0.2"), Ok(0.2));
/// assert_eq!(parse_bin_width("200ms"), Ok(0.2));
/// assert_eq!(parse_bin_width("1.5s"), Ok(1.5));
/// assert!(parse_bin_width("fast").is_err());
/// ```
pub fn parse_bin_width(width: &str) -> Result<f64, String> {
    let width = width.trim();

    // Milliseconds before seconds: "ms" also ends with "s"
    let (number, divisor) = if let Some(n) = strip_any_suffix(width, &["msec", "ms"]) {
        (n, 1000.0)
    } else if let Some(n) = strip_any_suffix(width, &["secs", "sec", "s"]) {
        (n, 1.0)
    } else {
        (width, 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value / divisor),
        _ => Err(format!("Invalid bin width: {}", width)),
    }
}

fn strip_any_suffix<'a>(s: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| s.strip_suffix(suffix))
}
