use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    api_status, financial_page, health_check, scan, scan_financial, status_page, test_telegram,
    AppState,
};
use crate::alerts::email::build_transport;
use crate::config::Config;
use crate::monitor::Monitor;
use crate::scheduler::SchedulerWorker;
use crate::ticketing::{TicketSource, ZendeskClient};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(status_page))
        .route("/financial", get(financial_page))
        // Health check
        .route("/health", get(health_check))
        // Scans
        .route("/scan", post(scan))
        .route("/scan/financial", post(scan_financial))
        .route("/api/status", get(api_status))
        // Diagnostics
        .route("/test-telegram", get(test_telegram))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Construct every client and monitor group from configuration
pub fn build_state(config: &Config) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    let source: Arc<dyn TicketSource> =
        Arc::new(ZendeskClient::new(&config.zendesk, config.http_timeout)?);

    let transport = match &config.smtp {
        Some(smtp) => Some(build_transport(smtp)?),
        None => {
            tracing::warn!("SMTP_SERVER not set, email notifications disabled");
            None
        }
    };

    let primary = Arc::new(Monitor::from_config(
        config,
        &config.primary,
        Arc::clone(&source),
        transport.as_ref(),
    )?);

    let financial = match &config.financial {
        Some(group) => Some(Arc::new(Monitor::from_config(
            config,
            group,
            Arc::clone(&source),
            transport.as_ref(),
        )?)),
        None => None,
    };

    Ok(Arc::new(AppState { primary, financial }))
}

/// Run the HTTP server and the scheduler
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config)?;

    // Start the scheduler over every configured group
    let mut monitors = vec![Arc::clone(&state.primary)];
    monitors.extend(state.financial.iter().cloned());
    let mut scheduler = SchedulerWorker::new(config.schedule.clone(), monitors);
    let scheduler_handle = scheduler.start();

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting queuewatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    if let Err(e) = scheduler_handle.await {
        tracing::warn!(error = %e, "Scheduler task ended abnormally");
    }

    tracing::info!("queuewatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping...");
}
