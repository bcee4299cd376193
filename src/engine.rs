use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info, warn};

use crate::config::{MonitorConfig, Target};
use crate::models::{
    truncate, Context, Coordinates, EndpointResult, EndpointSpec, Method, ModeSamples, MonitorRun,
    Payload,
};
use crate::plan::{self, PlanGroup};
use crate::report;

const SEED_GRAPH: &str = "/api/graph/stops";
const SEED_TRAIN: &str = "/api/train/stops";
const SEED_MYCITI: &str = "/api/myciti/stops";
const SEED_GA: &str = "/api/GA/stops";
const SEED_TAXI: &str = "/api/taxi/all-stops";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Append-only run state; all mutation goes through the single mutex.
#[derive(Debug, Default)]
pub struct RunState {
    pub results: Vec<EndpointResult>,
    pub log_lines: Vec<String>,
    pub context: Context,
}

pub struct Monitor {
    config: MonitorConfig,
    target: Target,
    client: reqwest::Client,
    started_at: DateTime<Utc>,
    pub state: Arc<Mutex<RunState>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, target: Target) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            target,
            client,
            started_at: Utc::now(),
            state: Arc::new(Mutex::new(RunState::default())),
        })
    }

    async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        let line = format!(
            "[{}] {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            level.as_str(),
            message
        );
        self.state.lock().await.log_lines.push(line);
    }

    /// One HTTP call. Transport failures become status 0; successful bodies
    /// parse as JSON with a truncated-text fallback.
    async fn attempt(&self, spec: &EndpointSpec) -> EndpointResult {
        let url = format!("{}{}", self.target.base_url, spec.path);
        let timestamp = Utc::now();
        let started = Instant::now();

        let mut request = match spec.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let success = status_code == spec.expected_status;
                let body = response.text().await.unwrap_or_default();
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let (payload, error) = if success {
                    (Some(Payload::from_body(&body)), None)
                } else {
                    (None, Some(truncate(&body)))
                };
                EndpointResult {
                    target: self.target.base_url.clone(),
                    spec_name: spec.name.clone(),
                    path: spec.path.clone(),
                    status_code,
                    latency_ms,
                    success,
                    payload,
                    error,
                    timestamp,
                }
            }
            Err(e) => EndpointResult {
                target: self.target.base_url.clone(),
                spec_name: spec.name.clone(),
                path: spec.path.clone(),
                status_code: 0,
                latency_ms: started.elapsed().as_secs_f64() * 1000.0,
                success: false,
                payload: None,
                error: Some(e.to_string()),
                timestamp,
            },
        }
    }

    /// Single attempt, recorded. `quiet` skips the transcript and demotes
    /// failures to a tracing warn; the result is stored either way.
    pub async fn execute_once(&self, spec: &EndpointSpec, quiet: bool) -> EndpointResult {
        let result = self.attempt(spec).await;
        self.state.lock().await.results.push(result.clone());

        if quiet {
            if !result.success {
                warn!(
                    "{} under load: HTTP {} (expected {})",
                    spec.name, result.status_code, spec.expected_status
                );
            }
            return result;
        }

        if result.success {
            self.log(
                LogLevel::Info,
                format!(
                    "{} ({} {}): {:.2}ms",
                    spec.name, spec.method, spec.path, result.latency_ms
                ),
            )
            .await;
        } else if spec.degraded_statuses.contains(&result.status_code) {
            self.log(
                LogLevel::Warn,
                format!(
                    "{}: target degraded (HTTP {})",
                    spec.name, result.status_code
                ),
            )
            .await;
        } else if result.status_code == 0 {
            self.log(
                LogLevel::Error,
                format!(
                    "{}: connection error - {}",
                    spec.name,
                    result.error.as_deref().unwrap_or("unknown")
                ),
            )
            .await;
        } else {
            self.log(
                LogLevel::Error,
                format!(
                    "{}: HTTP {} (expected {})",
                    spec.name, result.status_code, spec.expected_status
                ),
            )
            .await;
        }
        result
    }

    /// Retries with a fixed backoff up to the configured budget; every
    /// attempt appends its own record and the final one is returned.
    pub async fn execute(&self, spec: &EndpointSpec) -> EndpointResult {
        let mut attempt_no: u32 = 1;
        let mut result = self.execute_once(spec, false).await;
        while !result.success && attempt_no <= self.config.retries {
            tokio::time::sleep(self.config.retry_backoff).await;
            attempt_no += 1;
            self.log(
                LogLevel::Warn,
                format!(
                    "{}: retrying (attempt {}/{})",
                    spec.name,
                    attempt_no,
                    self.config.retries + 1
                ),
            )
            .await;
            result = self.execute_once(spec, false).await;
        }
        result
    }

    async fn fetch_entities(&self, path: &str) -> Option<Vec<Value>> {
        let url = format!("{}{}", self.target.base_url, path);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Bootstrap fetch {path} failed: {e}");
                return None;
            }
        };
        if response.status().as_u16() != 200 {
            warn!("Bootstrap fetch {path}: HTTP {}", response.status().as_u16());
            return None;
        }
        match response.json::<Value>().await {
            Ok(Value::Array(items)) => Some(items),
            Ok(_) => {
                warn!("Bootstrap fetch {path}: expected a JSON list");
                None
            }
            Err(e) => {
                warn!("Bootstrap fetch {path}: body was not JSON ({e})");
                None
            }
        }
    }

    async fn seed(&self, path: &str) -> (ModeSamples, Option<Coordinates>) {
        match self.fetch_entities(path).await {
            Some(entities) => (extract_samples(&entities), extract_coordinates(&entities)),
            None => (ModeSamples::default(), None),
        }
    }

    /// Single best-effort pass over the seed endpoints; gaps silently shrink
    /// the plan downstream.
    pub async fn bootstrap(&self) -> Context {
        self.log(LogLevel::Info, "Discovering sample data from target").await;
        let mut ctx = Context::default();

        let (graph, coords) = self.seed(SEED_GRAPH).await;
        ctx.graph = graph;
        ctx.coordinates = coords;

        let (train, coords) = self.seed(SEED_TRAIN).await;
        ctx.train = train;
        ctx.coordinates = ctx.coordinates.or(coords);

        let (myciti, coords) = self.seed(SEED_MYCITI).await;
        ctx.myciti = myciti;
        ctx.coordinates = ctx.coordinates.or(coords);

        let (ga, coords) = self.seed(SEED_GA).await;
        ctx.ga = ga;
        ctx.coordinates = ctx.coordinates.or(coords);

        let (taxi, coords) = self.seed(SEED_TAXI).await;
        ctx.taxi = taxi;
        ctx.coordinates = ctx.coordinates.or(coords);

        let sampled = [&ctx.graph, &ctx.train, &ctx.myciti, &ctx.ga, &ctx.taxi]
            .iter()
            .filter(|s| s.primary.is_some())
            .count();
        self.log(
            LogLevel::Info,
            format!(
                "Bootstrap complete: samples for {sampled}/5 modes, coordinates {}",
                if ctx.coordinates.is_some() { "found" } else { "absent" }
            ),
        )
        .await;

        self.state.lock().await.context = ctx.clone();
        ctx
    }

    pub async fn run_group(&self, group: &PlanGroup) {
        self.log(
            LogLevel::Info,
            format!("--- Testing {} endpoints ({} specs) ---", group.name, group.specs.len()),
        )
        .await;
        let mut successes = 0usize;
        for spec in &group.specs {
            if self.execute(spec).await.success {
                successes += 1;
            }
        }
        self.log(
            LogLevel::Info,
            format!("Group {}: {}/{} successful", group.name, successes, group.specs.len()),
        )
        .await;
    }

    /// Load phase: one task per probed endpoint looping `iterations` single
    /// attempts, pool bounded by a semaphore of `threads` permits. Record
    /// count is exactly endpoints x iterations.
    pub async fn probe_concurrent(self: &Arc<Self>) {
        let specs = plan::load_test_specs();
        let iterations = self.config.concurrent_iterations;
        let threads = self.config.concurrent_threads;
        self.log(
            LogLevel::Info,
            format!(
                "Starting load phase: {} endpoints x {} iterations across {} workers",
                specs.len(),
                iterations,
                threads
            ),
        )
        .await;

        let limiter = Arc::new(Semaphore::new(threads));
        let started = Instant::now();
        let mut tasks = FuturesUnordered::new();

        for spec in specs {
            let monitor = Arc::clone(self);
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await.ok();
                let mut successes = 0usize;
                let mut latency_sum = 0.0f64;
                let mut latency_max = 0.0f64;
                for _ in 0..iterations {
                    let result = monitor.execute_once(&spec, true).await;
                    if result.success {
                        successes += 1;
                    }
                    latency_sum += result.latency_ms;
                    latency_max = latency_max.max(result.latency_ms);
                }
                (successes, latency_sum, latency_max)
            }));
        }

        let mut total = 0usize;
        let mut successes = 0usize;
        let mut latency_sum = 0.0f64;
        let mut latency_max = 0.0f64;
        while let Some(joined) = tasks.next().await {
            if let Ok((ok, sum, max)) = joined {
                total += iterations;
                successes += ok;
                latency_sum += sum;
                latency_max = latency_max.max(max);
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        let avg = if total > 0 { latency_sum / total as f64 } else { 0.0 };
        self.log(
            LogLevel::Info,
            format!(
                "Load phase completed {total} probes in {elapsed:.2}s: {successes}/{total} successful, avg {avg:.2}ms, max {latency_max:.2}ms"
            ),
        )
        .await;
    }

    /// Snapshot of everything collected so far as a `MonitorRun`. Also used
    /// on operator abort, so an interrupted run still yields a partial
    /// report instead of losing its results.
    pub async fn snapshot(&self) -> MonitorRun {
        let state = self.state.lock().await;
        let summary = report::summarize(&state.results);
        MonitorRun {
            base_url: self.target.base_url.clone(),
            label: self.target.label.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            context: state.context.clone(),
            summary,
            log_lines: state.log_lines.clone(),
            results: state.results.clone(),
        }
    }

    pub async fn run(self: Arc<Self>) -> MonitorRun {
        self.log(
            LogLevel::Info,
            format!(
                "Starting monitoring run for {} ({})",
                self.target.label, self.target.base_url
            ),
        )
        .await;

        let context = self.bootstrap().await;
        let groups = plan::build_plan(&context);
        let planned: usize = groups.iter().map(|g| g.specs.len()).sum();
        self.log(
            LogLevel::Info,
            format!("Test plan: {} specs across {} groups", planned, groups.len()),
        )
        .await;

        for group in &groups {
            self.run_group(group).await;
        }
        self.probe_concurrent().await;

        let summary = {
            let state = self.state.lock().await;
            report::summarize(&state.results)
        };
        for line in report::summary_lines(&self.target.label, &summary) {
            self.log(LogLevel::Info, line).await;
        }

        self.snapshot().await
    }
}

fn extract_samples(entities: &[Value]) -> ModeSamples {
    let name_of = |v: &Value| v.get("name").and_then(Value::as_str).map(str::to_string);
    ModeSamples {
        primary: entities.first().and_then(name_of),
        secondary: entities.get(1).and_then(name_of),
    }
}

// Only the first two elements are consulted, same as the name sampling, and
// a pair is kept only when both fields are numeric.
fn extract_coordinates(entities: &[Value]) -> Option<Coordinates> {
    entities.iter().take(2).find_map(|e| {
        let latitude = e.get("latitude")?.as_f64()?;
        let longitude = e.get("longitude")?.as_f64()?;
        Some(Coordinates { latitude, longitude })
    })
}
