//! HTTP handlers for the report endpoints
//!
//! Every failure kind of the report pipeline maps to a single 404 outcome
//! with a human-readable detail message. The service never deliberately
//! answers 5xx: from the caller's perspective a report either exists or it
//! does not.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use usagestats_core::{DateRange, SourceType, StatsResult, TimeUnit};

use crate::AppState;

type ReportResponse = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn default_source() -> String {
    "*".to_string()
}

fn default_start_date() -> String {
    "now-1y".to_string()
}

fn default_end_date() -> String {
    "now".to_string()
}

/// Parameters of the item time-series endpoint
#[derive(Debug, Deserialize)]
pub struct ItemWidgetParams {
    pub identifier: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

/// Parameters of the item by-country endpoint
#[derive(Debug, Deserialize)]
pub struct ItemWidgetByCountryParams {
    pub identifier: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    pub limit: Option<usize>,
}

/// Parameters of the source-keyed time-series endpoints
#[derive(Debug, Deserialize)]
pub struct SourceWidgetParams {
    pub source_id: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

/// Parameters of the source-keyed by-country endpoints
#[derive(Debug, Deserialize)]
pub struct SourceWidgetByCountryParams {
    pub source_id: String,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    pub limit: Option<usize>,
}

/// Parameters of the level/action/time endpoint
#[derive(Debug, Deserialize)]
pub struct LevelActionTimeParams {
    pub identifier: Option<String>,
    pub source: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

/// Health check endpoint
pub async fn health_handler() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "usagestats-api",
        "version": usagestats_core::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    Ok(state.orchestrator.metrics().prometheus_format())
}

/// Item usage over time
pub async fn item_widget_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemWidgetParams>,
) -> ReportResponse {
    debug!("Received item widget request: {:?}", params);

    let result = async {
        let range = DateRange::new(params.start_date.clone(), params.end_date.clone())?;
        state
            .orchestrator
            .item_widget(
                params.identifier.as_deref(),
                &params.source,
                range,
                params.time_unit,
            )
            .await
    }
    .await;

    respond(&state, result)
}

/// Item usage by country
pub async fn item_widget_by_country_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemWidgetByCountryParams>,
) -> ReportResponse {
    debug!("Received item by-country request: {:?}", params);

    let limit = effective_limit(&state, params.limit);
    let result = async {
        let range = DateRange::new(params.start_date.clone(), params.end_date.clone())?;
        state
            .orchestrator
            .item_widget_by_country(params.identifier.as_deref(), &params.source, range, limit)
            .await
    }
    .await;

    respond(&state, result)
}

/// Repository usage over time. Dispatches on the source's actual type, so
/// aggregator ids resolve their whole subtree here.
pub async fn repository_widget_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetParams>,
) -> ReportResponse {
    debug!("Received repository widget request: {:?}", params);
    source_widget(state, params, None).await
}

/// Repository usage by country
pub async fn repository_widget_by_country_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetByCountryParams>,
) -> ReportResponse {
    debug!("Received repository by-country request: {:?}", params);
    source_widget_by_country(state, params, None).await
}

/// National aggregator usage over time
pub async fn national_widget_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetParams>,
) -> ReportResponse {
    debug!("Received national widget request: {:?}", params);
    source_widget(state, params, Some(SourceType::National)).await
}

/// National aggregator usage by country
pub async fn national_widget_by_country_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetByCountryParams>,
) -> ReportResponse {
    debug!("Received national by-country request: {:?}", params);
    source_widget_by_country(state, params, Some(SourceType::National)).await
}

/// Regional aggregator usage over time
pub async fn regional_widget_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetParams>,
) -> ReportResponse {
    debug!("Received regional widget request: {:?}", params);
    source_widget(state, params, Some(SourceType::Regional)).await
}

/// Regional aggregator usage by country
pub async fn regional_widget_by_country_handler(
    State(state): State<AppState>,
    Query(params): Query<SourceWidgetByCountryParams>,
) -> ReportResponse {
    debug!("Received regional by-country request: {:?}", params);
    source_widget_by_country(state, params, Some(SourceType::Regional)).await
}

/// Usage broken down by level and time, addressed by raw index tokens
pub async fn level_action_time_handler(
    State(state): State<AppState>,
    Query(params): Query<LevelActionTimeParams>,
) -> ReportResponse {
    debug!("Received level/action/time request: {:?}", params);

    let result = async {
        let range = DateRange::new(params.start_date.clone(), params.end_date.clone())?;
        state
            .orchestrator
            .level_action_time(
                params.identifier.as_deref(),
                params.source.as_deref(),
                params.country.as_deref(),
                params.year.as_deref(),
                range,
                params.time_unit,
            )
            .await
    }
    .await;

    respond(&state, result)
}

async fn source_widget(
    state: AppState,
    params: SourceWidgetParams,
    expected: Option<SourceType>,
) -> ReportResponse {
    let result = async {
        let range = DateRange::new(params.start_date.clone(), params.end_date.clone())?;
        state
            .orchestrator
            .source_widget(&params.source_id, expected, range, params.time_unit)
            .await
    }
    .await;

    respond(&state, result)
}

async fn source_widget_by_country(
    state: AppState,
    params: SourceWidgetByCountryParams,
    expected: Option<SourceType>,
) -> ReportResponse {
    let limit = effective_limit(&state, params.limit);
    let result = async {
        let range = DateRange::new(params.start_date.clone(), params.end_date.clone())?;
        state
            .orchestrator
            .source_widget_by_country(&params.source_id, expected, range, limit)
            .await
    }
    .await;

    respond(&state, result)
}

/// Clamp the caller-supplied country limit to the configured bounds
fn effective_limit(state: &AppState, limit: Option<usize>) -> usize {
    limit
        .unwrap_or(state.config.report.default_limit)
        .clamp(1, state.config.report.max_limit)
}

/// Map a report outcome to the uniform HTTP contract: the raw aggregations
/// on success, 404 with a descriptive message on any failure.
fn respond(state: &AppState, result: StatsResult<Value>) -> ReportResponse {
    let metrics = state.orchestrator.metrics();
    match result {
        Ok(aggregations) => {
            metrics.record_report();
            Ok(Json(aggregations))
        }
        Err(err) => {
            metrics.record_error();
            warn!("Report failed ({}): {}", err.category(), err);
            Err((
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Report not found",
                    "message": err.to_string(),
                    "category": err.category()
                })),
            ))
        }
    }
}
