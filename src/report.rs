use anyhow::{Context as _, Result};
use std::path::Path;

use crate::models::{rating, EndpointResult, MonitorRun, RunSummary};

/// An empty store yields a defined zero summary, never NaN.
pub fn summarize(results: &[EndpointResult]) -> RunSummary {
    let total_attempts = results.len();
    let success_count = results.iter().filter(|r| r.success).count();
    let failure_count = total_attempts - success_count;

    let (success_rate_percent, average_latency_ms) = if total_attempts == 0 {
        (0.0, 0.0)
    } else {
        let rate = 100.0 * success_count as f64 / total_attempts as f64;
        let avg = results.iter().map(|r| r.latency_ms).sum::<f64>() / total_attempts as f64;
        (rate, avg)
    };

    RunSummary {
        total_attempts,
        success_count,
        failure_count,
        success_rate_percent,
        average_latency_ms,
        rating: rating(success_rate_percent).to_string(),
    }
}

pub fn summary_lines(label: &str, summary: &RunSummary) -> Vec<String> {
    vec![
        "============================================================".to_string(),
        format!("MONITORING SUMMARY: {label}"),
        "============================================================".to_string(),
        format!("Total attempts: {}", summary.total_attempts),
        format!("Successful: {}", summary.success_count),
        format!("Failed: {}", summary.failure_count),
        format!("Success rate: {:.1}%", summary.success_rate_percent),
        format!("Average latency: {:.2}ms", summary.average_latency_ms),
        format!("System status: {}", summary.rating),
    ]
}

pub fn worst_success_rate(runs: &[MonitorRun]) -> Option<f64> {
    runs.iter()
        .map(|r| r.summary.success_rate_percent)
        .min_by(f64::total_cmp)
}

/// Judged by the minimum rate across targets; zero runs fails outright.
pub fn meets_threshold(runs: &[MonitorRun], fail_threshold: f64) -> bool {
    worst_success_rate(runs).is_some_and(|worst| worst >= fail_threshold)
}

/// Full report as pretty JSON; timestamps serialize as RFC 3339 strings.
pub fn export(path: &Path, runs: &[MonitorRun]) -> Result<()> {
    let json = serde_json::to_string_pretty(runs).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(success: bool, latency_ms: f64) -> EndpointResult {
        EndpointResult {
            target: "http://localhost:8080".into(),
            spec_name: "Train metrics".into(),
            path: "/api/train/metrics".into(),
            status_code: if success { 200 } else { 500 },
            latency_ms,
            success,
            payload: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn run_with_rate(rate: f64) -> MonitorRun {
        let summary = RunSummary {
            total_attempts: 100,
            success_count: rate as usize,
            failure_count: 100 - rate as usize,
            success_rate_percent: rate,
            average_latency_ms: 12.0,
            rating: rating(rate).to_string(),
        };
        MonitorRun {
            base_url: "http://localhost:8080".into(),
            label: "test".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            context: Default::default(),
            summary,
            log_lines: Vec::new(),
            results: Vec::new(),
        }
    }

    #[test]
    fn empty_store_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_attempts, 0);
        assert_eq!(summary.success_rate_percent, 0.0);
        assert_eq!(summary.average_latency_ms, 0.0);
        assert_eq!(summary.rating, "CRITICAL ISSUES");
    }

    #[test]
    fn average_latency_is_arithmetic_mean() {
        let results = vec![result(true, 10.0), result(true, 20.0), result(true, 30.0)];
        let summary = summarize(&results);
        assert_eq!(summary.average_latency_ms, 20.0);
        assert_eq!(summary.success_rate_percent, 100.0);
    }

    #[test]
    fn success_rate_counts_all_attempts() {
        let results = vec![
            result(true, 5.0),
            result(true, 5.0),
            result(true, 5.0),
            result(false, 5.0),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failure_count, 1);
        assert_eq!(summary.success_rate_percent, 75.0);
        assert_eq!(summary.rating, "GOOD");
    }

    #[test]
    fn verdict_follows_the_minimum_not_the_average() {
        let runs = vec![run_with_rate(95.0), run_with_rate(40.0)];
        assert_eq!(worst_success_rate(&runs), Some(40.0));
        assert!(!meets_threshold(&runs, 50.0));
        assert!(meets_threshold(&runs, 40.0));
    }

    #[test]
    fn no_runs_is_a_failed_verdict() {
        assert!(worst_success_rate(&[]).is_none());
        assert!(!meets_threshold(&[], 0.0));
    }

    #[test]
    fn export_round_trips_through_json() {
        let dir = std::env::temp_dir().join("routepulse-report-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        let runs = vec![run_with_rate(90.0)];
        export(&path, &runs).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<MonitorRun> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].summary.rating, "EXCELLENT");
    }
}
