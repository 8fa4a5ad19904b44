//! Console summary of a spike test report

use colored::Colorize;
use std::fmt::Write;
use surge_engine::{PhaseResult, ReportStatus, SpikeTestReport, StabilityRating};

fn phase_row(out: &mut String, result: &PhaseResult) {
    let error_rate = match result.observed_error_rate() {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "no requests".to_string(),
    };

    let _ = writeln!(
        out,
        "  {:<9} {:>9} {:>10.1} {:>9.1} {:>9.1} {:>9.1} {:>12} {:>5}",
        result.phase.as_str(),
        result.total_requests,
        result.throughput_req_per_sec,
        result.latency.p50,
        result.latency.p95,
        result.latency.p99,
        error_rate,
        result.peak_concurrency,
    );
}

fn signed_pct(value: f64) -> String {
    format!("{:+.1}%", value)
}

/// Render the human-readable summary
pub fn render_summary(report: &SpikeTestReport) -> String {
    let mut out = String::new();

    let status = match report.status {
        ReportStatus::Completed => "completed".green().bold(),
        ReportStatus::AnalysisFailed => "analysis failed".yellow().bold(),
        ReportStatus::Interrupted => "interrupted".yellow().bold(),
        ReportStatus::Failed => "failed".red().bold(),
    };

    let _ = writeln!(out, "\n{} {}", "Spike test".bold(), report.run_id);
    let _ = writeln!(out, "  target: {}", report.target);
    let _ = writeln!(out, "  status: {}", status);
    let _ = writeln!(
        out,
        "  load:   {} -> {} -> {} users, {:.0}s per phase\n",
        report.plan.baseline_concurrency,
        report.plan.spike_concurrency,
        report.plan.recovery_concurrency,
        report.plan.duration_secs
    );

    let _ = writeln!(
        out,
        "  {:<9} {:>9} {:>10} {:>9} {:>9} {:>9} {:>12} {:>5}",
        "phase", "requests", "req/s", "p50 ms", "p95 ms", "p99 ms", "errors", "peak"
    );
    for result in report.phases() {
        phase_row(&mut out, result);
    }

    if let Some(analysis) = &report.analysis {
        let impact = &analysis.spike_impact;
        let recovery = &analysis.recovery_analysis;
        let rating = match recovery.stability_rating {
            StabilityRating::Excellent => recovery.stability_rating.to_string().green(),
            StabilityRating::Acceptable => recovery.stability_rating.to_string().yellow(),
            StabilityRating::Poor => recovery.stability_rating.to_string().red(),
        };

        let _ = writeln!(out, "\n  {}", "Spike impact".bold());
        let _ = writeln!(out, "    throughput: {}", signed_pct(impact.throughput_change_pct));
        let _ = writeln!(out, "    p95 latency: {}", signed_pct(impact.latency_change_pct));
        let _ = writeln!(out, "    error rate: {:+.2} pts", impact.error_rate_change_pct);
        let _ = writeln!(out, "\n  {}", "Recovery".bold());
        let _ = writeln!(out, "    throughput: {:.1}% of baseline", recovery.throughput_recovery_pct);
        let _ = writeln!(out, "    p95 latency: {:.1}% of baseline speed", recovery.latency_recovery_pct);
        let _ = writeln!(
            out,
            "    stability: {} (error rate {:.2}%)",
            rating,
            recovery.stability_recovery * 100.0
        );
    }

    if let Some(error) = &report.error {
        let _ = writeln!(out, "\n  {} {}", "error:".red().bold(), error);
    }

    out
}

pub fn print_summary(report: &SpikeTestReport) {
    println!("{}", render_summary(report));
}
