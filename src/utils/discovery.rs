//! Trace file discovery.
//!
//! Finds trace files in a directory by variant (and optionally queue
//! discipline) name, ordering repeated runs by their trailing trial number.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use color_eyre::eyre::{Context, Result};
use regex::Regex;

/// Default trace file extension
pub const TRACE_EXTENSION: &str = "tr";

/// Match the trailing run number of a file stem: "cubic_red_3" -> 3
static TRIAL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("Invalid trial number regex"));

/// Match stem tokens separated by `_`, `-` or `.`
static STEM_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^_\-.]+").expect("Invalid stem token regex"));

/// Trailing trial number of a trace stem, if any
pub fn trial_number(stem: &str) -> Option<u64> {
    TRIAL_NUMBER
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether `token` appears as a whole token of `stem` (case-insensitive)
pub fn stem_has_token(stem: &str, token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    STEM_TOKENS
        .find_iter(&stem.to_ascii_lowercase())
        .any(|m| m.as_str() == token || m.as_str().trim_end_matches(|c: char| c.is_ascii_digit()) == token)
}

/// List trace files in `dir` whose stem contains every token in `tokens`,
/// sorted by trial number, then by name
pub fn discover_traces(dir: &Path, tokens: &[&str], extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read trace directory: {}", dir.display()))?;

    let mut found: Vec<(Option<u64>, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list trace directory: {}", dir.display()))?
            .path();

        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };

        if tokens.iter().all(|t| stem_has_token(&stem, t)) {
            found.push((trial_number(&stem), path));
        }
    }

    found.sort_by(|(a_num, a_path), (b_num, b_path)| a_num.cmp(b_num).then_with(|| a_path.cmp(b_path)));
    log::debug!("Found {} traces in {} matching {:?}", found.len(), dir.display(), tokens);

    Ok(found.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_trial_number() {
        assert_eq!(trial_number("cubic_red_3"), Some(3));
        assert_eq!(trial_number("cubic12"), Some(12));
        assert_eq!(trial_number("cubic"), None);
    }

    #[test]
    fn test_stem_has_token() {
        assert!(stem_has_token("cubic_red_1", "cubic"));
        assert!(stem_has_token("Cubic-RED", "red"));
        assert!(stem_has_token("vegas2", "vegas"));
        assert!(!stem_has_token("cubic_red_1", "reno"));
        // "red" must not match inside another word
        assert!(!stem_has_token("shared_cubic", "red"));
    }

    #[test]
    fn test_discover_traces() {
        let dir = tempdir().unwrap();
        for name in [
            "cubic_red_10.tr",
            "cubic_red_2.tr",
            "cubic_droptail_1.tr",
            "reno_red_1.tr",
            "cubic_red_1.csv",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let traces = discover_traces(dir.path(), &["cubic", "red"], TRACE_EXTENSION).unwrap();
        let names: Vec<String> = traces
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cubic_red_2.tr", "cubic_red_10.tr"]);

        let all_cubic = discover_traces(dir.path(), &["cubic"], TRACE_EXTENSION).unwrap();
        assert_eq!(all_cubic.len(), 3);
    }

    #[test]
    fn test_discover_missing_dir() {
        assert!(discover_traces(Path::new("/nonexistent/traces"), &["cubic"], TRACE_EXTENSION).is_err());
    }
}
