use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::task::{self, JoinError};
use tracing::{error, info, warn};

use crate::core::{HeirStrategy, Projection, SimulationParameters, Summary, YearRecord, simulate};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliHeirStrategy {
    LumpSumYear0,
    RmdBased,
}

impl From<CliHeirStrategy> for HeirStrategy {
    fn from(value: CliHeirStrategy) -> Self {
        match value {
            CliHeirStrategy::LumpSumYear0 => HeirStrategy::LumpSumYear0,
            CliHeirStrategy::RmdBased => HeirStrategy::RmdBased,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "nestegg run",
    about = "Deterministic retirement projection with tax, IRMAA and heir-value modelling"
)]
struct Cli {
    #[arg(long, help = "JSON parameter file; built-in defaults when omitted")]
    params: Option<PathBuf>,
    #[arg(long, help = "JSON object whose top-level keys replace the parameters'")]
    overrides: Option<String>,
    #[arg(long)]
    start_year: Option<i32>,
    #[arg(long)]
    end_year: Option<i32>,
    #[arg(long)]
    birth_year: Option<i32>,
    #[arg(long, value_enum)]
    heir_strategy: Option<CliHeirStrategy>,
    #[arg(long, help = "Heir-value discount rate in percent, e.g. 3 for 3%")]
    discount_rate: Option<f64>,
    #[arg(long)]
    max_iterations: Option<u32>,
    #[arg(long, help = "Single withdrawal/tax pass per year")]
    no_iterate: bool,
    #[arg(long)]
    summary_only: bool,
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ViewQuery {
    summary_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OverridePayload {
    baseline: SimulationParameters,
    #[serde(alias = "scenario")]
    overrides: Value,
}

impl Default for OverridePayload {
    fn default() -> Self {
        Self {
            baseline: SimulationParameters::default(),
            overrides: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    years: Option<Vec<YearRecord>>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ComparisonDelta {
    total_tax: f64,
    total_irmaa: f64,
    ending_balance: f64,
    final_heir_normalized: f64,
    shortfall_years: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonResponse {
    baseline: SimulateResponse,
    scenario: SimulateResponse,
    delta: ComparisonDelta,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_parameters(cli: &Cli) -> Result<SimulationParameters, String> {
    let mut params = match &cli.params {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("--params: cannot read {}: {e}", path.display()))?;
            serde_json::from_str::<SimulationParameters>(&raw)
                .map_err(|e| format!("--params: invalid JSON in {}: {e}", path.display()))?
        }
        None => SimulationParameters::default(),
    };

    if let Some(raw) = &cli.overrides {
        let patch: Value = serde_json::from_str(raw)
            .map_err(|e| format!("--overrides must be a JSON object: {e}"))?;
        params = params
            .with_overrides(&patch)
            .map_err(|e| format!("--overrides: {e}"))?;
    }

    if let Some(year) = cli.start_year {
        params.timeline.start_year = year;
    }
    if let Some(year) = cli.end_year {
        params.timeline.end_year = year;
    }
    if let Some(year) = cli.birth_year {
        params.timeline.birth_year = year;
    }
    if let Some(strategy) = cli.heir_strategy {
        params.heir_strategy = strategy.into();
    }
    if let Some(rate) = cli.discount_rate {
        if !(-100.0 < rate && rate <= 100.0) {
            return Err("--discount-rate must be > -100 and <= 100".to_string());
        }
        params.discount_rate = rate / 100.0;
    }
    if let Some(iterations) = cli.max_iterations {
        if iterations == 0 {
            return Err("--max-iterations must be > 0".to_string());
        }
        params.solver.max_iterations = iterations;
    }
    if cli.no_iterate {
        params.solver.iterative = false;
    }

    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

fn build_simulate_response(projection: Projection, summary_only: bool) -> SimulateResponse {
    SimulateResponse {
        summary: projection.summary,
        years: (!summary_only).then_some(projection.years),
    }
}

fn run_projection(
    params: &SimulationParameters,
    summary_only: bool,
) -> Result<SimulateResponse, String> {
    simulate(params)
        .map(|projection| build_simulate_response(projection, summary_only))
        .map_err(|e| e.to_string())
}

fn compare_summaries(baseline: &Summary, scenario: &Summary) -> ComparisonDelta {
    ComparisonDelta {
        total_tax: scenario.total_tax - baseline.total_tax,
        total_irmaa: scenario.total_irmaa - baseline.total_irmaa,
        ending_balance: scenario.ending_balances.total() - baseline.ending_balances.total(),
        final_heir_normalized: scenario.final_heir_normalized - baseline.final_heir_normalized,
        shortfall_years: scenario.shortfall_years.len() as i64
            - baseline.shortfall_years.len() as i64,
    }
}

fn run_comparison(
    payload: OverridePayload,
    summary_only: bool,
) -> Result<ComparisonResponse, String> {
    let scenario_params = payload
        .baseline
        .with_overrides(&payload.overrides)
        .map_err(|e| e.to_string())?;
    let baseline = run_projection(&payload.baseline, summary_only)
        .map_err(|e| format!("baseline: {e}"))?;
    let scenario =
        run_projection(&scenario_params, summary_only).map_err(|e| format!("scenario: {e}"))?;
    let delta = compare_summaries(&baseline.summary, &scenario.summary);
    Ok(ComparisonResponse {
        baseline,
        scenario,
        delta,
    })
}

pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let params = build_parameters(&cli)?;
    let response = run_projection(&params, cli.summary_only)?;
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    rendered.map_err(|e| format!("failed to encode projection: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Projection HTTP API listening");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_handler))
        .route("/api/simulate/overrides", post(simulate_overrides_handler))
        .route("/api/defaults", get(defaults_handler))
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, SimulationParameters::default())
}

async fn simulate_handler(
    Query(view): Query<ViewQuery>,
    Json(params): Json<SimulationParameters>,
) -> Response {
    let summary_only = view.summary_only;
    let result = task::spawn_blocking(move || run_projection(&params, summary_only)).await;
    blocking_response(result, "Rejected simulation request")
}

async fn simulate_overrides_handler(
    Query(view): Query<ViewQuery>,
    Json(payload): Json<OverridePayload>,
) -> Response {
    let summary_only = view.summary_only;
    let result = task::spawn_blocking(move || run_comparison(payload, summary_only)).await;
    blocking_response(result, "Rejected override request")
}

fn blocking_response<T: Serialize>(
    result: Result<Result<T, String>, JoinError>,
    rejection: &str,
) -> Response {
    match result {
        Ok(Ok(body)) => json_response(StatusCode::OK, body),
        Ok(Err(msg)) => {
            warn!(error = %msg, "{rejection}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
        Err(e) => {
            error!(error = %e, "Projection task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Projection failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
