use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::pages::StatusPage;
use crate::monitor::{AlertOutcome, CycleReport, CycleSummary, Monitor};
use crate::ticketing::{ScanError, TicketSummary, View};

/// Application state shared across handlers
pub struct AppState {
    pub primary: Arc<Monitor>,
    pub financial: Option<Arc<Monitor>>,
}

impl AppState {
    fn financial(&self) -> Result<&Arc<Monitor>, ApiError> {
        self.financial
            .as_ref()
            .ok_or_else(|| ApiError::NotFound("Financial views are not configured".to_string()))
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Status Pages
// ============================================================================

pub async fn status_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render_page(&state.primary, "Support Queue Monitor", "/scan").await
}

pub async fn financial_page(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let monitor = state.financial()?;
    Ok(render_page(monitor, "Financial Products Support", "/scan/financial").await)
}

async fn render_page(monitor: &Monitor, title: &str, scan_path: &str) -> (StatusCode, Html<String>) {
    let polled = monitor.poll().await;
    let failure = polled.as_ref().err().map(log_scan_error);
    let last_cycle = monitor.last_cycle();

    let page = StatusPage {
        title,
        scan_path,
        threshold: monitor.thresholds().high_volume_cutoff,
        checked_at: Utc::now(),
        last_cycle: last_cycle.as_ref(),
        views: match (&polled, &failure) {
            (Ok(views), _) => Ok(views.as_slice()),
            (Err(_), Some(message)) => Err(message.as_str()),
            (Err(_), None) => Err("scan failed"),
        },
    };

    let status = if polled.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Html(page.render()))
}

// ============================================================================
// Scan
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub group: String,
    /// Ticket count by view title
    pub view_counts: BTreeMap<String, usize>,
    /// One entry per scanned view, in configured order
    pub views: Vec<ViewCount>,
    pub has_office_down: bool,
    pub office_down_tickets: Vec<TicketSummary>,
    pub alerts: Vec<AlertOutcome>,
    pub notifications_sent: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCount {
    pub view_id: String,
    pub view_name: String,
    pub ticket_count: usize,
}

impl From<CycleReport> for ScanResponse {
    fn from(report: CycleReport) -> Self {
        let notifications_sent = report.notifications_sent();
        let view_counts = report
            .views
            .iter()
            .map(|v| (v.view_name.clone(), v.ticket_count))
            .collect();
        let views = report
            .views
            .iter()
            .map(|v| ViewCount {
                view_id: v.view_id.clone(),
                view_name: v.view_name.clone(),
                ticket_count: v.ticket_count,
            })
            .collect();
        let office_down_tickets: Vec<TicketSummary> = report
            .views
            .iter()
            .flat_map(|v| v.office_down_tickets.iter().cloned())
            .collect();

        Self {
            success: true,
            group: report.group,
            view_counts,
            views,
            has_office_down: !office_down_tickets.is_empty(),
            office_down_tickets,
            alerts: report.alerts,
            notifications_sent,
            timestamp: report.finished_at,
        }
    }
}

pub async fn scan(State(state): State<Arc<AppState>>) -> Result<Json<ScanResponse>, ApiError> {
    run_scan(&state.primary).await
}

pub async fn scan_financial(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanResponse>, ApiError> {
    run_scan(state.financial()?).await
}

async fn run_scan(monitor: &Monitor) -> Result<Json<ScanResponse>, ApiError> {
    tracing::info!(group = %monitor.name(), "Manual scan started");
    let report = monitor.run_cycle().await?;
    tracing::info!(
        group = %monitor.name(),
        alerts = report.alerts.len(),
        notifications_sent = report.notifications_sent(),
        "Manual scan completed"
    );
    Ok(Json(report.into()))
}

// ============================================================================
// Machine-readable Status
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub view_results: Vec<View>,
    pub last_cycle: Option<CycleSummary>,
    pub last_checked: DateTime<Utc>,
}

pub async fn api_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let view_results = state.primary.poll().await?;
    Ok(Json(StatusResponse {
        view_results,
        last_cycle: state.primary.last_cycle(),
        last_checked: Utc::now(),
    }))
}

// ============================================================================
// Diagnostics
// ============================================================================

pub async fn test_telegram(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.primary.send_test().await;

    if report.delivered() {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Test notification sent successfully",
                "channels": report,
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "success": false,
                "message": "Failed to send test notification",
                "channels": report,
            })),
        )
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

fn log_scan_error(e: &ScanError) -> String {
    // The underlying cause stays in the server log
    tracing::error!(view_id = %e.view_id, error = %e, cause = ?e.source, "Scan failed");
    e.to_string()
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        ApiError::Internal(log_scan_error(&e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
            "timestamp": Utc::now(),
        });

        (status, Json(body)).into_response()
    }
}
