//! Comparison of spike and recovery phases against the baseline

use crate::error::AnalysisError;
use crate::metrics::PhaseResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recovery error rate below which the target is rated excellent
pub const EXCELLENT_ERROR_RATE: f64 = 0.05;
/// Recovery error rate below which the target is rated acceptable
pub const ACCEPTABLE_ERROR_RATE: f64 = 0.10;

/// Baseline-to-spike change, in signed percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeImpact {
    pub throughput_change_pct: f64,
    pub latency_change_pct: f64,
    /// Percentage-point change of the error rate
    pub error_rate_change_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityRating {
    Excellent,
    Acceptable,
    Poor,
}

impl StabilityRating {
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate < EXCELLENT_ERROR_RATE {
            StabilityRating::Excellent
        } else if error_rate < ACCEPTABLE_ERROR_RATE {
            StabilityRating::Acceptable
        } else {
            StabilityRating::Poor
        }
    }
}

impl fmt::Display for StabilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StabilityRating::Excellent => "excellent",
            StabilityRating::Acceptable => "acceptable",
            StabilityRating::Poor => "poor",
        })
    }
}

/// How close the recovery phase came back to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAnalysis {
    pub throughput_recovery_pct: f64,
    /// Above 100 means recovery was faster than baseline
    pub latency_recovery_pct: f64,
    /// Recovery error rate, lower is better
    pub stability_recovery: f64,
    pub stability_rating: StabilityRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeAnalysis {
    pub spike_impact: SpikeImpact,
    pub recovery_analysis: RecoveryAnalysis,
}

/// Compare the three phases. Pure and deterministic.
pub fn analyze(
    baseline: &PhaseResult,
    spike: &PhaseResult,
    recovery: &PhaseResult,
) -> Result<SpikeAnalysis, AnalysisError> {
    let base_throughput = baseline.throughput_req_per_sec;
    let base_p95 = baseline.latency.p95;

    if base_throughput == 0.0 || !base_throughput.is_finite() {
        return Err(AnalysisError::DegenerateBaseline { metric: "throughput" });
    }
    if base_p95 == 0.0 || !base_p95.is_finite() {
        return Err(AnalysisError::DegenerateBaseline { metric: "p95 latency" });
    }
    if recovery.latency.p95 == 0.0 {
        return Err(AnalysisError::DegenerateRecovery);
    }

    let spike_impact = SpikeImpact {
        throughput_change_pct: (spike.throughput_req_per_sec - base_throughput) * 100.0 / base_throughput,
        latency_change_pct: (spike.latency.p95 - base_p95) * 100.0 / base_p95,
        error_rate_change_pct: (spike.error_rate - baseline.error_rate) * 100.0,
    };

    let recovery_analysis = RecoveryAnalysis {
        throughput_recovery_pct: recovery.throughput_req_per_sec * 100.0 / base_throughput,
        latency_recovery_pct: base_p95 * 100.0 / recovery.latency.p95,
        stability_recovery: recovery.error_rate,
        stability_rating: StabilityRating::from_error_rate(recovery.error_rate),
    };

    Ok(SpikeAnalysis {
        spike_impact,
        recovery_analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LatencyStats;
    use crate::phase::PhaseKind;
    use std::collections::BTreeMap;

    fn phase(kind: PhaseKind, throughput: f64, p95: f64, error_rate: f64) -> PhaseResult {
        PhaseResult {
            phase: kind,
            total_requests: (throughput * 60.0) as u64,
            successful_requests: 0,
            failed_requests: 0,
            throughput_req_per_sec: throughput,
            latency: LatencyStats {
                p50: p95 / 2.0,
                p95,
                p99: p95 * 1.5,
                mean: p95 / 2.0,
                min: 1.0,
                max: p95 * 2.0,
            },
            error_rate,
            empty: throughput == 0.0,
            duration_secs: 60.0,
            elapsed_ms: 60_000,
            peak_concurrency: 10,
            bytes_received: 0,
            status_codes: BTreeMap::new(),
            error_kinds: BTreeMap::new(),
            scenarios: BTreeMap::new(),
        }
    }

    #[test]
    fn test_throughput_drop_during_spike() {
        let baseline = phase(PhaseKind::Baseline, 100.0, 50.0, 0.0);
        let spike = phase(PhaseKind::Spike, 40.0, 400.0, 0.2);
        let recovery = phase(PhaseKind::Recovery, 95.0, 55.0, 0.01);

        let analysis = analyze(&baseline, &spike, &recovery).unwrap();

        assert_eq!(analysis.spike_impact.throughput_change_pct, -60.0);
        assert_eq!(analysis.spike_impact.latency_change_pct, 700.0);
        assert!((analysis.spike_impact.error_rate_change_pct - 20.0).abs() < 1e-9);
        assert_eq!(analysis.recovery_analysis.throughput_recovery_pct, 95.0);
        assert_eq!(analysis.recovery_analysis.stability_rating, StabilityRating::Excellent);
    }

    #[test]
    fn test_recovery_faster_than_baseline() {
        let baseline = phase(PhaseKind::Baseline, 100.0, 50.0, 0.0);
        let spike = phase(PhaseKind::Spike, 80.0, 120.0, 0.0);
        let recovery = phase(PhaseKind::Recovery, 100.0, 45.0, 0.07);

        let analysis = analyze(&baseline, &spike, &recovery).unwrap();

        assert!((analysis.recovery_analysis.latency_recovery_pct - 111.1).abs() < 0.05);
        assert_eq!(analysis.recovery_analysis.stability_recovery, 0.07);
        assert_eq!(analysis.recovery_analysis.stability_rating, StabilityRating::Acceptable);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let baseline = phase(PhaseKind::Baseline, 123.456, 78.9, 0.013);
        let spike = phase(PhaseKind::Spike, 61.7, 301.2, 0.27);
        let recovery = phase(PhaseKind::Recovery, 119.0, 80.1, 0.04);

        let first = analyze(&baseline, &spike, &recovery).unwrap();
        let second = analyze(&baseline, &spike, &recovery).unwrap();

        assert_eq!(
            first.spike_impact.throughput_change_pct.to_bits(),
            second.spike_impact.throughput_change_pct.to_bits()
        );
        assert_eq!(
            first.recovery_analysis.latency_recovery_pct.to_bits(),
            second.recovery_analysis.latency_recovery_pct.to_bits()
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_baseline() {
        let spike = phase(PhaseKind::Spike, 40.0, 400.0, 0.2);
        let recovery = phase(PhaseKind::Recovery, 95.0, 55.0, 0.01);

        let idle = phase(PhaseKind::Baseline, 0.0, 50.0, 0.0);
        assert_eq!(
            analyze(&idle, &spike, &recovery),
            Err(AnalysisError::DegenerateBaseline { metric: "throughput" })
        );

        let instant = phase(PhaseKind::Baseline, 100.0, 0.0, 0.0);
        assert_eq!(
            analyze(&instant, &spike, &recovery),
            Err(AnalysisError::DegenerateBaseline { metric: "p95 latency" })
        );
    }

    #[test]
    fn test_degenerate_recovery() {
        let baseline = phase(PhaseKind::Baseline, 100.0, 50.0, 0.0);
        let spike = phase(PhaseKind::Spike, 40.0, 400.0, 0.2);
        let silent = phase(PhaseKind::Recovery, 0.0, 0.0, 0.0);

        assert_eq!(analyze(&baseline, &spike, &silent), Err(AnalysisError::DegenerateRecovery));
    }

    #[test]
    fn test_stability_thresholds() {
        assert_eq!(StabilityRating::from_error_rate(0.0), StabilityRating::Excellent);
        assert_eq!(StabilityRating::from_error_rate(0.0499), StabilityRating::Excellent);
        assert_eq!(StabilityRating::from_error_rate(0.05), StabilityRating::Acceptable);
        assert_eq!(StabilityRating::from_error_rate(0.0999), StabilityRating::Acceptable);
        assert_eq!(StabilityRating::from_error_rate(0.10), StabilityRating::Poor);
        assert_eq!(StabilityRating::Poor.to_string(), "poor");
    }
}
