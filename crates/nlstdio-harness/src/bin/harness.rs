//! CLI entrypoint for the nlstdio conformance harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nlstdio_harness::fixtures;
use nlstdio_harness::{ConformanceReport, TestRunner, VerificationSummary};

/// Conformance tooling for nlstdio.
#[derive(Debug, Parser)]
#[command(name = "nlstdio-harness", version)]
#[command(about = "Fixture-driven conformance checks for the nlstdio core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every fixture set in a directory against the core.
    Verify {
        /// Directory holding `*.json` fixture sets.
        #[arg(long)]
        fixture: PathBuf,
        /// Write a report here (`.json` for JSON, markdown otherwise).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Only run cases for this function.
        #[arg(long)]
        function: Option<String>,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Verify {
            fixture,
            report,
            function,
        } => verify(&fixture, report, function),
    }
}

fn verify(
    dir: &std::path::Path,
    report_path: Option<PathBuf>,
    function: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let runner = match function {
        Some(name) => TestRunner::only(name),
        None => TestRunner::new(),
    };
    let sets = fixtures::load_dir(dir)?;
    if sets.is_empty() {
        return Err(format!("no fixture sets in {}", dir.display()).into());
    }

    let mut results = Vec::new();
    let mut sources = Vec::with_capacity(sets.len());
    for (path, set) in &sets {
        let set_results = runner.run(set);
        let passed = set_results.iter().filter(|r| r.passed).count();
        println!(
            "{}: {}/{} passed ({})",
            set.family,
            passed,
            set_results.len(),
            path.display()
        );
        results.extend(set_results);
        sources.push(path.display().to_string());
    }

    let summary = VerificationSummary::from_results(results);
    for failure in summary.failures() {
        eprintln!(
            "FAIL {}: {}",
            failure.trace_id,
            failure.diff.as_deref().unwrap_or("mismatch")
        );
    }
    println!(
        "total {} passed {} failed {}",
        summary.total, summary.passed, summary.failed
    );

    let ok = summary.all_passed();
    if let Some(path) = report_path {
        let report = ConformanceReport {
            title: "nlstdio conformance".to_string(),
            sources,
            summary,
        };
        report.write_to(&path)?;
        println!("report written to {}", path.display());
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
