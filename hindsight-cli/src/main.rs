//! Hindsight CLI - PCTL runtime verification over partial-order traces

#![warn(missing_docs)]

use std::fs;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use hindsight_monitor::monitor::{MetricsSummary, MonitorReport};
use hindsight_monitor::{Monitor, OutputLevel, RunConfig, Verdict};

#[derive(Parser)]
#[command(name = "hindsight")]
#[command(about = "Verify a past-time CTL property against a distributed-system trace")]
#[command(version)]
struct Cli {
    /// Property file containing one PCTL formula
    #[arg(short, long)]
    property: PathBuf,

    /// Trace file (JSON)
    #[arg(short, long)]
    trace: PathBuf,

    /// Prune disabled frontiers as the run progresses
    #[arg(short, long)]
    reduce: bool,

    /// Per-event debug logging plus a full frontier dump
    #[arg(short, long)]
    debug: bool,

    /// Benchmark mode: totals and per-event timing only
    #[arg(short, long)]
    experiment: bool,

    /// Report the frontier matching the monitor's clock cut after every event
    #[arg(short, long)]
    max_state: bool,

    /// Suppress all report output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn output_level(&self) -> OutputLevel {
        if self.debug {
            OutputLevel::Debug
        } else if self.max_state {
            OutputLevel::MaxState
        } else if self.experiment {
            OutputLevel::Experiment
        } else if self.quiet {
            OutputLevel::Nothing
        } else {
            OutputLevel::Default
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RunConfig::new(cli.reduce, cli.output_level());

    let log_level = if config.is_debug() {
        tracing::Level::DEBUG
    } else if config.is_max_state() {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if config.show_banner() {
        println!("{}", "hindsight".bold());
        println!("past-time CTL runtime verification over partial-order traces\n");
    }

    // Setup failures are the only fatal ones: a property that does not parse
    // or a trace that does not load leaves nothing to monitor.
    let property_text = fs::read_to_string(&cli.property)
        .with_context(|| format!("cannot read property file {}", cli.property.display()))?;
    let formula = hindsight_parser::parse(property_text.trim())
        .map_err(anyhow::Error::from)
        .with_context(|| format!("cannot parse property '{}'", property_text.trim()))?;

    if !config.is_quiet() {
        println!("Property: {}", property_text.trim());
        println!("Compiled: {formula}\n");
    }

    let trace_file = fs::File::open(&cli.trace)
        .with_context(|| format!("cannot read trace file {}", cli.trace.display()))?;
    let trace = hindsight_core::TraceDoc::from_reader(BufReader::new(trace_file))
        .with_context(|| format!("cannot decode trace file {}", cli.trace.display()))?;

    let mut monitor = Monitor::new(&formula, trace, config.clone());
    let report = monitor.run();
    print_report(&report, &config);

    // The verdict is a result, not an error: UNDETERMINED still exits 0.
    Ok(())
}

fn print_report(report: &MonitorReport, config: &RunConfig) {
    match config.output_level {
        OutputLevel::Nothing => {}
        OutputLevel::Experiment => {
            println!("total events: {}", report.rows_seen);
            println!("total states: {}", report.frontier_count);
            if let Some(metrics) = &report.metrics {
                print_metrics(metrics);
            }
            print_verdict(report);
        }
        OutputLevel::MaxState => {
            for line in &report.tracker_history {
                println!("{line}");
            }
            print_verdict(report);
        }
        OutputLevel::Default | OutputLevel::Debug => {
            if config.is_debug() {
                println!("=== ALL FINAL STATES ===");
                for frontier in &report.frontiers {
                    let status = if frontier.enabled { "enabled" } else { "disabled" };
                    println!(
                        "[{}] {} value={} components={} propositions=({})",
                        frontier.name,
                        status,
                        frontier.value,
                        frontier.components,
                        frontier.propositions.join(", ")
                    );
                    for transition in &frontier.transitions {
                        println!("    {transition}");
                    }
                }
                println!();
            } else {
                println!(
                    "{} events processed ({} admitted, {} skipped), {} frontiers",
                    report.rows_seen,
                    report.events_admitted,
                    report.rows_skipped,
                    report.frontier_count
                );
            }
            if !report.pending.is_empty() {
                println!(
                    "{} events still held at end of trace: {}",
                    "warning:".yellow().bold(),
                    report.pending.join(", ")
                );
            }
            print_verdict(report);
        }
    }
}

fn print_verdict(report: &MonitorReport) {
    let rendered = match report.verdict {
        Verdict::True => report.verdict.to_string().green().bold(),
        Verdict::False => report.verdict.to_string().red().bold(),
        Verdict::Undetermined => report.verdict.to_string().yellow().bold(),
    };
    match &report.verdict_frontier {
        Some(name) => println!("[FINAL VERDICT]: {rendered} (frontier {name})"),
        None => println!("[FINAL VERDICT]: {rendered}"),
    }
}

fn print_metrics(metrics: &MetricsSummary) {
    println!(
        "slowest event: {} ({:?})",
        metrics.slowest.0, metrics.slowest.1
    );
    println!(
        "fastest event: {} ({:?})",
        metrics.fastest.0, metrics.fastest.1
    );
    println!("mean per-event time: {:?}", metrics.mean);
}
