use serde_json::json;

use crate::models::{Context, EndpointSpec};

#[derive(Debug, Clone)]
pub struct PlanGroup {
    pub name: &'static str,
    pub specs: Vec<EndpointSpec>,
}

/// Readiness-style endpoints may answer 503 while a graph is still loading;
/// that is a degraded target, not a harness defect.
const DEGRADED_HEALTH: &[u16] = &[503];

/// Static specs are always present; parameterized specs are omitted when the
/// samples they need were not discovered, so missing data never manufactures
/// guaranteed failures.
pub fn build_plan(ctx: &Context) -> Vec<PlanGroup> {
    vec![
        admin_group(),
        graph_group(ctx),
        train_group(ctx),
        myciti_group(ctx),
        ga_group(ctx),
        taxi_group(ctx),
        monitoring_group(),
    ]
}

/// Fixed context-free subset re-run under concurrent load.
pub fn load_test_specs() -> Vec<EndpointSpec> {
    vec![
        EndpointSpec::get("System metrics", "/api/admin/systemMetrics"),
        EndpointSpec::get("GA Bus metrics", "/api/GA/metrics"),
        EndpointSpec::get("Graph metrics", "/api/graph/metrics"),
        EndpointSpec::get("MyCiti metrics", "/api/myciti/metrics"),
        EndpointSpec::get("System health", "/api/monitor/health").degraded(DEGRADED_HEALTH),
        EndpointSpec::get("Taxi metrics", "/api/taxi/metrics"),
        EndpointSpec::get("Train metrics", "/api/train/metrics"),
    ]
}

fn admin_group() -> PlanGroup {
    PlanGroup {
        name: "admin",
        specs: vec![
            EndpointSpec::get("List data files", "/api/admin/list"),
            EndpointSpec::get("System metrics", "/api/admin/systemMetrics"),
            EndpointSpec::get("Files in use", "/api/admin/GetFileInUse"),
            EndpointSpec::get("Recent API calls", "/api/admin/MostRecentCall"),
            EndpointSpec::get("System logs", "/api/admin/systemLogs").query("limit", 10),
        ],
    }
}

fn graph_group(ctx: &Context) -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("Multimodal stops", "/api/graph/stops"),
        EndpointSpec::get("Graph metrics", "/api/graph/metrics"),
    ];
    if let Some(coords) = ctx.coordinates {
        specs.push(
            EndpointSpec::get("Nearest multimodal stop", "/api/graph/stops/nearest")
                .query("lat", coords.latitude)
                .query("lon", coords.longitude),
        );
    }
    if let Some((from, to)) = ctx.graph.pair() {
        specs.push(
            EndpointSpec::get("Multimodal journey", "/api/graph/journey")
                .query("from", from)
                .query("to", to)
                .query("time", "08:00")
                .query("modes", "TRAIN,MYCITI,WALKING"),
        );
    }
    PlanGroup { name: "graph", specs }
}

fn train_group(ctx: &Context) -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("Train metrics", "/api/train/metrics"),
        EndpointSpec::get("Train stops", "/api/train/stops"),
        EndpointSpec::get("Train routes", "/api/train/routes"),
        EndpointSpec::get("Available railway routes", "/api/train/routes/available"),
    ];
    if let Some(coords) = ctx.coordinates {
        specs.push(
            EndpointSpec::get("Nearest train stop", "/api/train/nearest")
                .query("lat", coords.latitude)
                .query("lon", coords.longitude),
        );
    }
    if let Some((from, to)) = ctx.train.pair() {
        specs.push(
            EndpointSpec::get("Train journey", "/api/train/journey")
                .query("from", from)
                .query("to", to)
                .query("time", "08:00"),
        );
        specs.push(
            EndpointSpec::get("Train journey with coordinates", "/api/train/journey/with-coordinates")
                .query("from", from)
                .query("to", to)
                .query("time", "08:00"),
        );
    }
    PlanGroup { name: "train", specs }
}

fn myciti_group(ctx: &Context) -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("MyCiti metrics", "/api/myciti/metrics"),
        EndpointSpec::get("MyCiti stops", "/api/myciti/stops"),
        EndpointSpec::get("MyCiti trips", "/api/myciti/trips"),
        EndpointSpec::get("MyCiti logs", "/api/myciti/logs"),
    ];
    if let Some((source, target)) = ctx.myciti.pair() {
        specs.push(
            EndpointSpec::get("MyCiti journey", "/api/myciti/journey")
                .query("source", source)
                .query("target", target)
                .query("departure", "09:00")
                .query("maxRounds", 4),
        );
    }
    PlanGroup { name: "myciti", specs }
}

fn ga_group(ctx: &Context) -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("GA Bus metrics", "/api/GA/metrics"),
        EndpointSpec::get("GA Bus stops", "/api/GA/stops"),
        EndpointSpec::get("GA Bus trips", "/api/GA/trips"),
    ];
    if let Some((source, target)) = ctx.ga.pair() {
        specs.push(
            EndpointSpec::get("GA Bus journey", "/api/GA/journey")
                .query("source", source)
                .query("target", target)
                .query("departure", "10:00")
                .query("maxRounds", 4),
        );
    }
    PlanGroup { name: "ga", specs }
}

fn taxi_group(ctx: &Context) -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("Taxi metrics", "/api/taxi/metrics"),
        EndpointSpec::get("Taxi stops", "/api/taxi/all-stops"),
        EndpointSpec::get("Taxi trips", "/api/taxi/all-trips"),
    ];
    if let Some(coords) = ctx.coordinates {
        specs.push(
            EndpointSpec::post("Nearest taxi stops", "/api/taxi/nearest-stops").body(json!({
                "location": {
                    "latitude": coords.latitude,
                    "longitude": coords.longitude,
                },
                "max": 5,
            })),
        );
    }
    PlanGroup { name: "taxi", specs }
}

fn monitoring_group() -> PlanGroup {
    let mut specs = vec![
        EndpointSpec::get("System health", "/api/monitor/health").degraded(DEGRADED_HEALTH),
        EndpointSpec::get("System summary", "/api/monitor/summary"),
        EndpointSpec::get("System readiness", "/api/monitor/ready").degraded(DEGRADED_HEALTH),
        EndpointSpec::get("Active alerts", "/api/monitor/alerts"),
        EndpointSpec::get("All alerts", "/api/monitor/alerts/all"),
        EndpointSpec::get("Monitoring statistics", "/api/monitor/stats"),
        EndpointSpec::get("Performance metrics", "/api/monitor/performance"),
    ];
    for graph in ["train", "myciti", "ga", "taxi"] {
        specs.push(EndpointSpec::get(
            format!("{graph} graph status"),
            format!("/api/monitor/graph/{graph}"),
        ));
        specs.push(
            EndpointSpec::get(
                format!("{graph} graph readiness"),
                format!("/api/monitor/graph/{graph}/ready"),
            )
            .degraded(DEGRADED_HEALTH),
        );
    }
    specs.push(
        EndpointSpec::post("Forced health check", "/api/monitor/health/check")
            .degraded(DEGRADED_HEALTH),
    );
    PlanGroup { name: "monitoring", specs }
}
