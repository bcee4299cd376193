use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TARGET: &str = "http://localhost:8080";

/// Black-box endpoint monitor for transit journey-planning backends.
#[derive(Debug, Parser)]
#[command(name = "routepulse", version, about)]
pub struct Cli {
    /// Base URL of a target to test (repeatable).
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Friendly name for a target, paired positionally with --target.
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 15)]
    pub timeout: u64,

    /// Additional attempts after the first failure.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Backoff between retry attempts, in milliseconds.
    #[arg(long = "retry-backoff-ms", default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Worker pool width for the concurrent load phase.
    #[arg(long = "concurrent-threads", default_value_t = 5)]
    pub concurrent_threads: usize,

    /// Repeats per probed endpoint in the concurrent load phase.
    #[arg(long = "concurrent-iterations", default_value_t = 3)]
    pub concurrent_iterations: usize,

    /// Write the full JSON report (array of runs) to this path.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Minimum acceptable worst-case success rate, in percent.
    #[arg(long = "fail-threshold", default_value_t = 50.0)]
    pub fail_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub base_url: String,
    pub label: String,
}

/// Resolved run configuration shared by every target.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub targets: Vec<Target>,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub concurrent_threads: usize,
    pub concurrent_iterations: usize,
    pub export: Option<PathBuf>,
    pub fail_threshold: f64,
}

impl From<Cli> for MonitorConfig {
    fn from(cli: Cli) -> Self {
        let urls = if cli.targets.is_empty() {
            vec![DEFAULT_TARGET.to_string()]
        } else {
            cli.targets
        };

        let targets = urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| {
                let label = cli
                    .labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("target-{}", i + 1));
                Target {
                    base_url: url.trim_end_matches('/').to_string(),
                    label,
                }
            })
            .collect();

        Self {
            targets,
            timeout: Duration::from_secs(cli.timeout),
            retries: cli.retries,
            retry_backoff: Duration::from_millis(cli.retry_backoff_ms),
            concurrent_threads: cli.concurrent_threads.max(1),
            concurrent_iterations: cli.concurrent_iterations.max(1),
            export: cli.export,
            fail_threshold: cli.fail_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_builtin_target() {
        let cli = Cli::parse_from(["routepulse"]);
        let config = MonitorConfig::from(cli);
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].base_url, DEFAULT_TARGET);
    }

    #[test]
    fn labels_pair_positionally_and_trailing_slash_is_stripped() {
        let cli = Cli::parse_from([
            "routepulse",
            "--target",
            "http://a.example/",
            "--target",
            "http://b.example",
            "--label",
            "staging",
        ]);
        let config = MonitorConfig::from(cli);
        assert_eq!(config.targets[0].base_url, "http://a.example");
        assert_eq!(config.targets[0].label, "staging");
        assert_eq!(config.targets[1].label, "target-2");
    }
}
