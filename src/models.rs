use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response bodies longer than this are stored truncated.
pub const PAYLOAD_TRUNCATE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub name: String,
    pub path: String,
    pub method: Method,
    pub expected_status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Statuses a health endpoint may return while degraded; still failures
    /// for the success rate, but logged as warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_statuses: Vec<u16>,
}

impl EndpointSpec {
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method: Method::Get,
            expected_status: 200,
            query: Vec::new(),
            body: None,
            degraded_statuses: Vec::new(),
        }
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(name, path)
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn degraded(mut self, statuses: &[u16]) -> Self {
        self.degraded_statuses = statuses.to_vec();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(v) => Payload::Json(v),
            Err(_) => Payload::Text(truncate(body)),
        }
    }
}

pub fn truncate(text: &str) -> String {
    text.chars().take(PAYLOAD_TRUNCATE_CHARS).collect()
}

/// One record per attempt; retries append their own. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointResult {
    pub target: String,
    pub spec_name: String,
    pub path: String,
    /// 0 signals a transport-level failure (no response received).
    pub status_code: u16,
    pub latency_ms: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeSamples {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl ModeSamples {
    /// Journey planning needs two distinct named entities.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.primary.as_deref(), self.secondary.as_deref()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}

/// Samples harvested during bootstrap; read-only after.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    pub graph: ModeSamples,
    pub train: ModeSamples,
    pub myciti: ModeSamples,
    pub ga: ModeSamples,
    pub taxi: ModeSamples,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_attempts: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub success_rate_percent: f64,
    pub average_latency_ms: f64,
    pub rating: String,
}

/// Inclusive thresholds; deployment pipelines branch on these exact strings.
pub fn rating(success_rate_percent: f64) -> &'static str {
    if success_rate_percent >= 90.0 {
        "EXCELLENT"
    } else if success_rate_percent >= 75.0 {
        "GOOD"
    } else if success_rate_percent >= 50.0 {
        "NEEDS ATTENTION"
    } else {
        "CRITICAL ISSUES"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorRun {
    pub base_url: String,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub context: Context,
    pub summary: RunSummary,
    pub log_lines: Vec<String>,
    pub results: Vec<EndpointResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_boundaries_are_inclusive() {
        assert_eq!(rating(100.0), "EXCELLENT");
        assert_eq!(rating(90.0), "EXCELLENT");
        assert_eq!(rating(89.9), "GOOD");
        assert_eq!(rating(75.0), "GOOD");
        assert_eq!(rating(74.9), "NEEDS ATTENTION");
        assert_eq!(rating(50.0), "NEEDS ATTENTION");
        assert_eq!(rating(49.9), "CRITICAL ISSUES");
        assert_eq!(rating(0.0), "CRITICAL ISSUES");
    }

    #[test]
    fn payload_falls_back_to_truncated_text() {
        let long = "x".repeat(800);
        match Payload::from_body(&long) {
            Payload::Text(t) => assert_eq!(t.chars().count(), PAYLOAD_TRUNCATE_CHARS),
            Payload::Json(_) => panic!("non-JSON body parsed as JSON"),
        }
    }

    #[test]
    fn payload_keeps_json_intact() {
        match Payload::from_body(r#"{"stops": [1, 2, 3]}"#) {
            Payload::Json(v) => assert_eq!(v["stops"][2], 3),
            Payload::Text(_) => panic!("JSON body stored as text"),
        }
    }

    #[test]
    fn mode_samples_pair_requires_both() {
        let mut samples = ModeSamples::default();
        assert!(samples.pair().is_none());
        samples.primary = Some("Cape Town".into());
        assert!(samples.pair().is_none());
        samples.secondary = Some("Bellville".into());
        assert_eq!(samples.pair(), Some(("Cape Town", "Bellville")));
    }
}
