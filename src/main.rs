//! Flow analysis CLI for NS2 simulation traces.
//!
//! Compares congestion-control variants (goodput, loss, fairness, stability)
//! and combines repeated runs into confidence bands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Context, Result};
use env_logger::Env;
use log::info;

use ns2flow::analysis::{
    self, chart, metrics,
    types::{AnalysisMetadata, ComparisonReport, TrialReport},
    TraceInput,
};
use ns2flow::config::{AnalysisConfig, DialectPreset, LengthPolicy};
use ns2flow::config_loader::{self, CliOverrides};
use ns2flow::utils::{discover_traces, parse_bin_width, TRACE_EXTENSION};

#[derive(Parser, Debug)]
#[command(name = "ns2flow")]
#[command(about = "Flow throughput, loss, fairness and stability analysis for NS2 traces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML analysis configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Throughput bin width (e.g. 0.2, 200ms, 0.2s)
    #[arg(long, global = true, value_parser = parse_bin_width)]
    bin_width: Option<f64>,

    /// Fixed trace duration in seconds (default: last event time)
    #[arg(long, global = true)]
    duration: Option<f64>,

    /// Trace dialect preset (queue, agent)
    #[arg(long, global = true)]
    dialect: Option<DialectPreset>,

    /// Cross-trial length policy (truncate, zero_pad, reject)
    #[arg(long, global = true)]
    length_policy: Option<LengthPolicy>,

    /// Output directory for reports and charts
    #[arg(short, long, global = true, default_value = "analysis_output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare variants: per-flow metrics, fairness and stability
    Compare {
        /// Traces as `label=path` or plain paths (label = file stem)
        traces: Vec<String>,

        /// Directory to search for traces by variant name
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Variant names to look for in --dir
        #[arg(long, value_delimiter = ',')]
        variant: Vec<String>,

        /// Queue disciplines to group by in --dir
        #[arg(long, value_delimiter = ',')]
        queue: Vec<String>,

        /// Write reports even if some traces cannot be read
        #[arg(long)]
        keep_going: bool,

        /// Skip SVG chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Combine repeated runs into a mean throughput band
    Trials {
        /// Scenario label used in outputs
        #[arg(long, default_value = "trials")]
        label: String,

        /// Trial trace files
        traces: Vec<PathBuf>,

        /// Directory to search for trial traces
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Variant name to look for in --dir
        #[arg(long)]
        variant: Option<String>,

        /// Queue discipline to look for in --dir
        #[arg(long)]
        queue: Option<String>,

        /// Skip SVG chart rendering
        #[arg(long)]
        no_charts: bool,
    },

    /// Show per-flow counters of a single trace
    Summary {
        /// Trace file
        trace: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    // Set thread pool size
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = load_effective_config(&cli)?;
    info!(
        "Bin width {}s, dialect {}, length policy {:?}",
        config.bin_width_secs(),
        config.dialect,
        config.length_policy
    );

    match &cli.command {
        Commands::Compare {
            traces,
            dir,
            variant,
            queue,
            keep_going,
            no_charts,
        } => {
            let inputs = if let Some(dir) = dir {
                discover_comparison_inputs(dir, variant, queue)?
            } else {
                traces.iter().map(|t| parse_trace_arg(t)).collect()
            };
            run_comparison(&cli.output, &config, &inputs, *keep_going, !*no_charts)?;
        }
        Commands::Trials {
            label,
            traces,
            dir,
            variant,
            queue,
            no_charts,
        } => {
            let paths = if let Some(dir) = dir {
                let mut tokens: Vec<&str> = Vec::new();
                tokens.extend(variant.as_deref());
                tokens.extend(queue.as_deref());
                discover_traces(dir, &tokens, TRACE_EXTENSION)?
            } else {
                traces.clone()
            };
            let inputs: Vec<TraceInput> = paths
                .into_iter()
                .map(|p| TraceInput::new(file_label(&p), p))
                .collect();
            run_trials(&cli.output, &config, label, &inputs, !*no_charts)?;
        }
        Commands::Summary { trace } => {
            let analysis = analysis::analyze_trace_file(trace, &file_label(trace), &config)?;
            print_trace_summary(&analysis, &config);
        }
    }

    Ok(())
}

fn load_effective_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => config_loader::load_config(path)?,
        None => AnalysisConfig::default(),
    };

    let overrides = CliOverrides {
        bin_width: cli.bin_width,
        duration: cli.duration,
        dialect: cli.dialect,
        length_policy: cli.length_policy,
    };
    config_loader::apply_overrides(&mut config, &overrides)?;

    Ok(config)
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `label=path` or a bare path
fn parse_trace_arg(arg: &str) -> TraceInput {
    match arg.split_once('=') {
        Some((label, path)) if !label.is_empty() => TraceInput::new(label, path),
        _ => TraceInput::new(file_label(Path::new(arg)), arg),
    }
}

fn discover_comparison_inputs(dir: &Path, variants: &[String], queues: &[String]) -> Result<Vec<TraceInput>> {
    if variants.is_empty() {
        bail!("--variant is required with --dir");
    }

    let mut inputs = Vec::new();
    let queue_groups: Vec<Option<&String>> = if queues.is_empty() {
        vec![None]
    } else {
        queues.iter().map(Some).collect()
    };

    for queue in queue_groups {
        for variant in variants {
            let mut tokens = vec![variant.as_str()];
            tokens.extend(queue.map(|q| q.as_str()));

            let found = discover_traces(dir, &tokens, TRACE_EXTENSION)?;
            if found.is_empty() {
                log::warn!("No traces for {:?} in {}", tokens, dir.display());
            }

            let single = found.len() == 1;
            for path in found {
                let label = if single { variant.clone() } else { file_label(&path) };
                let mut input = TraceInput::new(label, path);
                input.queue = queue.cloned();
                inputs.push(input);
            }
        }
    }

    Ok(inputs)
}

fn create_metadata(config: &AnalysisConfig, inputs: &[TraceInput]) -> AnalysisMetadata {
    AnalysisMetadata {
        analysis_timestamp: chrono::Utc::now().to_rfc3339(),
        bin_width_s: config.bin_width_secs(),
        dialect: config.dialect.to_string(),
        traces: inputs.iter().map(|i| i.path.display().to_string()).collect(),
    }
}

fn bar_label(variant: &str, queue: &Option<String>) -> String {
    match queue {
        Some(q) => format!("{}/{}", variant, q),
        None => variant.to_string(),
    }
}

fn run_comparison(
    output_dir: &Path,
    config: &AnalysisConfig,
    inputs: &[TraceInput],
    keep_going: bool,
    charts: bool,
) -> Result<()> {
    if inputs.is_empty() {
        bail!("No traces to compare");
    }

    let (tables, failed) = analysis::compare_traces(inputs, config);

    if !failed.is_empty() && (!keep_going || tables.totals.is_empty()) {
        bail!("Could not read {} trace(s):\n  {}", failed.len(), failed.join("\n  "));
    }

    let report = ComparisonReport {
        metadata: create_metadata(config, inputs),
        totals: tables.totals,
        flows: tables.flows,
        fairness: tables.fairness,
        stability: tables.stability,
        failed,
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    analysis::generate_json_report(&report, &output_dir.join("comparison.json"))?;
    analysis::generate_text_report(&analysis::report::comparison_text(&report), &output_dir.join("comparison.txt"))?;
    analysis::write_csv(&report.totals, &output_dir.join("totals.csv"))?;
    analysis::write_csv(&report.flows, &output_dir.join("flows.csv"))?;
    analysis::write_csv(&report.fairness, &output_dir.join("fairness.csv"))?;
    analysis::write_csv(&report.stability, &output_dir.join("stability.csv"))?;

    if charts {
        let goodput: Vec<(String, f64)> = report
            .totals
            .iter()
            .map(|r| (bar_label(&r.variant, &r.queue), r.goodput_mbps))
            .collect();
        let plr: Vec<(String, f64)> = report
            .totals
            .iter()
            .map(|r| (bar_label(&r.variant, &r.queue), r.plr_pct))
            .collect();
        let jain: Vec<(String, f64)> = report
            .fairness
            .iter()
            .map(|r| (bar_label(&r.variant, &r.queue), r.jain_index))
            .collect();
        let cov: Vec<(String, f64)> = report
            .stability
            .iter()
            .map(|r| (bar_label(&r.variant, &r.queue), r.cov))
            .collect();

        chart::plot_bars(&output_dir.join("goodput.svg"), "Goodput (Mbps)", "Mbps", &goodput)?;
        chart::plot_bars(&output_dir.join("plr.svg"), "Packet Loss Rate (%)", "%", &plr)?;
        chart::plot_bars(&output_dir.join("fairness.svg"), "Jain Fairness (last 1/3)", "Jain index", &jain)?;
        chart::plot_bars(&output_dir.join("stability.svg"), "Throughput CoV", "CoV", &cov)?;
    }

    analysis::report::print_summary(&report);
    info!("Comparison complete. Reports written to {}", output_dir.display());

    Ok(())
}

fn run_trials(
    output_dir: &Path,
    config: &AnalysisConfig,
    label: &str,
    inputs: &[TraceInput],
    charts: bool,
) -> Result<()> {
    if inputs.is_empty() {
        bail!("No trial traces given");
    }

    let band = analysis::analyze_trials(inputs, config)
        .with_context(|| format!("Cross-trial analysis for '{}' failed", label))?;

    let report = TrialReport {
        metadata: create_metadata(config, inputs),
        label: label.to_string(),
        trials: inputs.len(),
        band,
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let stem = label.replace(char::is_whitespace, "_");
    analysis::generate_json_report(&report, &output_dir.join(format!("{}_band.json", stem)))?;
    analysis::generate_text_report(
        &analysis::report::trials_text(&report),
        &output_dir.join(format!("{}_band.txt", stem)),
    )?;
    analysis::write_csv(&report.band, &output_dir.join(format!("{}_band.csv", stem)))?;

    if charts {
        let title = format!("{}: mean throughput over {} trials (95% CI)", label, report.trials);
        chart::plot_band(&output_dir.join(format!("{}_band.svg", stem)), &title, &report.band)?;
    }

    println!(
        "\n{}: {} trials, {} bins, mean throughput {:.3} Mbps\n",
        label,
        report.trials,
        report.band.len(),
        report.band.iter().map(|r| r.mean_mbps).sum::<f64>() / report.band.len().max(1) as f64
    );
    info!("Cross-trial analysis complete. Reports written to {}", output_dir.display());

    Ok(())
}

fn print_trace_summary(analysis: &analysis::TraceAnalysis, config: &AnalysisConfig) {
    println!("\n=== TRACE SUMMARY ===\n");
    println!("Trace: {}", analysis.path);
    println!(
        "Lines: {} total, {} events, {} comments, {} ignored, {} malformed",
        analysis.lines.total,
        analysis.lines.events,
        analysis.lines.comments,
        analysis.lines.ignored,
        analysis.lines.malformed
    );
    println!("Duration: {:.3}s ({} bins of {}s)", analysis.duration, analysis.bin_count(), analysis.bin_width);
    println!();

    println!(
        "  {:<16} {:>8} {:>12} {:>8} {:>12} {:>7} {:>14} {:>8}",
        "Flow", "Sent", "Sent(B)", "Recv", "Recv(B)", "Drops", "Goodput(Mbps)", "PLR(%)"
    );
    for flow in analysis.flows.values() {
        let m = metrics::flow_metrics(flow, analysis.duration);
        let marker = if metrics::is_data_flow(&flow.key, config) { "" } else { " (control)" };
        println!(
            "  {:<16} {:>8} {:>12} {:>8} {:>12} {:>7} {:>14.3} {:>8.3}{}",
            flow.key.to_string(),
            flow.sent_packets,
            flow.sent_bytes,
            flow.received_packets,
            flow.received_bytes,
            flow.dropped_packets,
            m.goodput_mbps,
            m.plr_pct,
            marker
        );
    }
    println!();
    println!("Jain Fairness (last 1/3): {:.4}", metrics::trace_fairness(analysis, config));
    println!("Throughput CoV: {:.4}", metrics::trace_stability(analysis));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "ns2flow",
            "--bin-width",
            "100ms",
            "compare",
            "cubic=traces/cubic.tr",
            "traces/reno.tr",
        ]);

        assert_eq!(cli.bin_width, Some(0.1));
        assert_eq!(cli.output, PathBuf::from("analysis_output"));
        match cli.command {
            Commands::Compare { traces, .. } => assert_eq!(traces.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trials_args() {
        let cli = Cli::parse_from([
            "ns2flow",
            "trials",
            "--dir",
            "traces",
            "--variant",
            "cubic",
            "--length-policy",
            "reject",
        ]);

        assert_eq!(cli.length_policy, Some(LengthPolicy::Reject));
        match cli.command {
            Commands::Trials { dir, variant, .. } => {
                assert_eq!(dir, Some(PathBuf::from("traces")));
                assert_eq!(variant.as_deref(), Some("cubic"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_trace_arg() {
        let input = parse_trace_arg("cubic=runs/a.tr");
        assert_eq!(input.label, "cubic");
        assert_eq!(input.path, PathBuf::from("runs/a.tr"));

        let input = parse_trace_arg("runs/vegas.tr");
        assert_eq!(input.label, "vegas");
    }
}
