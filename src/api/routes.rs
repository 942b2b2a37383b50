use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::latency::LatencyStats;
use crate::cache::DrawCache;
use crate::error::AppError;
use crate::eval::BatchRunner;
use crate::types::{BatchEntry, CacheStats, CombinationInput, RawDraw, TestOptions, TestResult};

#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<DrawCache>,
    pub runner: Arc<BatchRunner>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/cache/build", post(post_cache_build))
        .route("/cache/refresh", post(post_cache_refresh))
        .route("/cache/stats", get(get_cache_stats))
        .route("/cache/years", get(get_cache_years))
        .route("/backtest", post(post_backtest))
        .route("/backtest/batch", post(post_backtest_batch))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub numbers: Vec<u8>,
    pub complementary: u8,
    pub max_draws: Option<usize>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBacktestRequest {
    pub combinations: Vec<CombinationInput>,
    pub max_draws: Option<usize>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Optional bound on total batch latency; slots not started in time
    /// come back as error entries.
    pub timeout_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_ready: bool,
    pub total_draws: u64,
    pub version: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let stats = state.cache.stats().ok();
    Json(HealthResponse {
        status: "ok",
        cache_ready: state.cache.is_ready(),
        total_draws: stats.as_ref().map(|s| s.total_draws).unwrap_or(0),
        version: stats.map(|s| s.version).unwrap_or(0),
    })
}

async fn post_cache_build(
    State(state): State<ApiState>,
    Json(draws): Json<Vec<RawDraw>>,
) -> Json<CacheStats> {
    info!(records = draws.len(), "Cache build requested with {} records", draws.len());
    Json(state.cache.build(&draws))
}

async fn post_cache_refresh(
    State(state): State<ApiState>,
    Json(draws): Json<Vec<RawDraw>>,
) -> Json<CacheStats> {
    info!(records = draws.len(), "Cache refresh requested with {} records", draws.len());
    Json(state.cache.refresh(&draws))
}

async fn get_cache_stats(
    State(state): State<ApiState>,
) -> Result<Json<CacheStats>, AppError> {
    Ok(Json(state.cache.stats()?))
}

async fn get_cache_years(
    State(state): State<ApiState>,
) -> Result<Json<BTreeMap<i32, u64>>, AppError> {
    Ok(Json(state.cache.snapshot()?.year_counts()))
}

async fn post_backtest(
    State(state): State<ApiState>,
    Json(req): Json<BacktestRequest>,
) -> Result<Json<TestResult>, AppError> {
    let combination = CombinationInput {
        numbers: req.numbers,
        complementary: req.complementary,
    }
    .validate()?;
    let opts = TestOptions {
        max_draws: req.max_draws,
        start_date: req.start_date,
        end_date: req.end_date,
        deadline: None,
    };
    Ok(Json(state.runner.test_combination(&combination, &opts)?))
}

async fn post_backtest_batch(
    State(state): State<ApiState>,
    Json(req): Json<BatchBacktestRequest>,
) -> Json<Vec<BatchEntry>> {
    let opts = TestOptions {
        max_draws: req.max_draws,
        start_date: req.start_date,
        end_date: req.end_date,
        deadline: req.timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms)),
    };
    Json(state.runner.test_multiple(&req.combinations, &opts).await)
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50_us, p95_us, p99_us) = state.latency.percentiles();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_us,
        p95_us,
        p99_us,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
