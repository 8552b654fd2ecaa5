//! Report generation for trace analysis.
//!
//! Generates JSON, CSV and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use super::types::*;

/// Generate JSON report
pub fn generate_json_report<T: Serialize>(report: &T, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Write a table as CSV, one record per row
pub fn write_csv<T: Serialize>(rows: &[T], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create CSV file {}", output_path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write CSV row to {}", output_path.display()))?;
    }
    writer.flush()?;

    log::info!("CSV table written to {}", output_path.display());
    Ok(())
}

fn group_label(variant: &str, queue: &Option<String>) -> String {
    match queue {
        Some(q) => format!("{} ({})", variant, q),
        None => variant.to_string(),
    }
}

fn header(lines: &mut Vec<String>, title: &str) {
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", title));
    lines.push("=".repeat(80));
    lines.push(String::new());
}

fn metrics_table(lines: &mut Vec<String>, rows: &[FlowMetricsRow]) {
    lines.push(format!(
        "  {:<28} {:<10} {:>14} {:>10} {:>8}",
        "Variant", "Flow", "Goodput(Mbps)", "PLR(%)", "Drops"
    ));
    for row in rows {
        lines.push(format!(
            "  {:<28} {:<10} {:>14.3} {:>10.3} {:>8}",
            group_label(&row.variant, &row.queue),
            row.flow,
            row.goodput_mbps,
            row.plr_pct,
            row.dropped_packets
        ));
    }
    lines.push(String::new());
}

/// Render the comparison report as text lines
pub fn comparison_text(report: &ComparisonReport) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    header(&mut lines, "NS2 TRACE FLOW COMPARISON");

    lines.push(format!("Analysis Date: {}", report.metadata.analysis_timestamp));
    lines.push(format!("Bin Width: {}s", report.metadata.bin_width_s));
    lines.push(format!("Trace Dialect: {}", report.metadata.dialect));
    lines.push(format!("Traces: {}", report.metadata.traces.len()));
    lines.push(String::new());

    header(&mut lines, "PER-TRACE METRICS");
    metrics_table(&mut lines, &report.totals);

    if !report.flows.is_empty() {
        header(&mut lines, "PER-FLOW METRICS");
        metrics_table(&mut lines, &report.flows);
    }

    header(&mut lines, "FAIRNESS AND STABILITY");
    lines.push("Jain Fairness (last 1/3):".to_string());
    for row in &report.fairness {
        lines.push(format!("  {:<28} {:.4}", group_label(&row.variant, &row.queue), row.jain_index));
    }
    lines.push(String::new());

    lines.push("Throughput Coefficient of Variation (CoV):".to_string());
    for row in &report.stability {
        lines.push(format!("  {:<28} {:.4}", group_label(&row.variant, &row.queue), row.cov));
    }
    lines.push(String::new());

    if !report.failed.is_empty() {
        lines.push("Unreadable traces:".to_string());
        for failure in &report.failed {
            lines.push(format!("  {}", failure));
        }
        lines.push(String::new());
    }

    lines
}

/// Render the cross-trial report as text lines
pub fn trials_text(report: &TrialReport) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    header(&mut lines, "CROSS-TRIAL THROUGHPUT");

    lines.push(format!("Analysis Date: {}", report.metadata.analysis_timestamp));
    lines.push(format!("Scenario: {}", report.label));
    lines.push(format!("Trials: {}", report.trials));
    lines.push(format!("Bins: {}", report.band.len()));
    lines.push(String::new());

    lines.push(format!(
        "  {:>6} {:>10} {:>12} {:>12}",
        "Bin", "Time(s)", "Mean(Mbps)", "CI95(Mbps)"
    ));
    for row in &report.band {
        lines.push(format!(
            "  {:>6} {:>10.2} {:>12.4} {:>12.4}",
            row.bin, row.time_s, row.mean_mbps, row.ci95_mbps
        ));
    }
    lines.push(String::new());

    lines
}

/// Write text lines to a file
pub fn generate_text_report(lines: &[String], output_path: &Path) -> Result<()> {
    fs::write(output_path, lines.join("\n"))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print the headline numbers of a comparison to stdout
pub fn print_summary(report: &ComparisonReport) {
    println!("\n===== Per-trace metrics =====");
    for row in &report.totals {
        println!(
            "  {:<28} goodput {:>9.3} Mbps   plr {:>7.3} %",
            group_label(&row.variant, &row.queue),
            row.goodput_mbps,
            row.plr_pct
        );
    }

    println!("\nJain Fairness (last 1/3):");
    for row in &report.fairness {
        println!("  {:<28} {:.4}", group_label(&row.variant, &row.queue), row.jain_index);
    }

    println!("\nThroughput Coefficient of Variation (CoV):");
    for row in &report.stability {
        println!("  {:<28} {:.4}", group_label(&row.variant, &row.queue), row.cov);
    }

    if !report.failed.is_empty() {
        println!("\n{} trace(s) could not be read", report.failed.len());
    }
    println!();
}
