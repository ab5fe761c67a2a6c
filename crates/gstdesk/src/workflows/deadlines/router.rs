use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use serde_json::json;

use super::clock::{Clock, DayBoundary};
use super::engine::{ComplianceEngine, EngineError};
use super::repository::{EntityStore, ReportingWindow, StoreError};

/// Router state: the engine plus the clock that supplies "now" per request.
pub struct ComplianceApi<S> {
    engine: Arc<ComplianceEngine<S>>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for ComplianceApi<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> ComplianceApi<S>
where
    S: EntityStore + 'static,
{
    pub fn new(engine: Arc<ComplianceEngine<S>>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    fn resolve_now(&self, requested: Option<DateTime<Utc>>) -> DateTime<Utc> {
        requested.unwrap_or_else(|| self.clock.now())
    }

    fn current_year(&self, now: DateTime<Utc>) -> i32 {
        DayBoundary::new(self.engine.config().timezone)
            .today(now)
            .year()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplianceQuery {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    #[serde(default)]
    pub months: Option<u32>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    #[serde(default)]
    pub year: Option<i32>,
}

/// HTTP endpoints for scanning and reporting.
pub fn compliance_router<S>(api: ComplianceApi<S>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/api/v1/deadlines/scan", post(scan_handler::<S>))
        .route("/api/v1/reports/compliance", get(compliance_handler::<S>))
        .route("/api/v1/reports/trend", get(trend_handler::<S>))
        .route("/api/v1/reports/revenue", get(revenue_handler::<S>))
        .with_state(api)
}

pub(crate) async fn scan_handler<S>(
    State(api): State<ComplianceApi<S>>,
    Query(query): Query<ScanQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let now = api.resolve_now(query.now);
    match api.engine.scan_and_notify(now) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compliance_handler<S>(
    State(api): State<ComplianceApi<S>>,
    Query(query): Query<ComplianceQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let now = api.resolve_now(query.now);
    let window = ReportingWindow {
        year: query.year.unwrap_or_else(|| api.current_year(now)),
        month: query.month,
    };

    match api.engine.compute_compliance_report(window, now) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn trend_handler<S>(
    State(api): State<ComplianceApi<S>>,
    Query(query): Query<TrendQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let months = query
        .months
        .unwrap_or(api.engine.config().trend_months);

    let now = api.resolve_now(query.now);
    match api.engine.compute_monthly_metrics(months, now) {
        Ok(metrics) => (StatusCode::OK, Json(metrics)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn revenue_handler<S>(
    State(api): State<ComplianceApi<S>>,
    Query(query): Query<RevenueQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let year = query
        .year
        .unwrap_or_else(|| api.current_year(api.clock.now()));

    match api.engine.compute_revenue_trend(year) {
        Ok(trend) => (StatusCode::OK, Json(trend)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_status(error: &EngineError) -> StatusCode {
    match error {
        EngineError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Store(StoreError::Rejected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
        EngineError::UnknownClient(_) => StatusCode::NOT_FOUND,
    }
}

fn error_response(error: EngineError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (error_status(&error), Json(payload)).into_response()
}
