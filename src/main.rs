//! Queuewatch Server
//!
//! Run with: cargo run
//!
//! Settings are read from the environment, after loading an optional `.env`
//! file from the working directory.
//!
//! Required:
//! - ZENDESK_SUBDOMAIN, ZENDESK_EMAIL, ZENDESK_API_TOKEN
//!
//! Common:
//! - ZENDESK_VIEW_IDS: Comma-separated view ids to monitor
//! - HIGH_VOLUME_THRESHOLD: Ticket count that triggers an alert (default: 35)
//! - SMTP_SERVER, SMTP_PORT, SMTP_USERNAME, SMTP_PASSWORD, NOTIFICATION_EMAIL
//! - TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID
//! - FINANCIAL_VIEW_IDS plus FINANCIAL_* overrides for the secondary group
//! - SCHEDULE_EVERY_MINUTES, SCHEDULE_START_HOUR, SCHEDULE_END_HOUR, SCHEDULE_DAYS (UTC)
//! - ALERT_COOLDOWN_SECS: Suppress repeated alerts (default: 0, disabled)
//! - HOST (default: 0.0.0.0), PORT (default: 3000)
//! - RUST_LOG: Log level (default: info)

use queuewatch::api::run_server;
use queuewatch::config::GroupConfig;
use queuewatch::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queuewatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Queuewatch configuration:");
    tracing::info!("  Listen: {}:{}", config.host, config.port);
    tracing::info!("  Zendesk: {} as {}", config.zendesk.base_url, config.zendesk.email);
    match &config.smtp {
        Some(smtp) => tracing::info!("  SMTP relay: {}:{} as {}", smtp.host, smtp.port, smtp.username),
        None => tracing::info!("  SMTP relay: DISABLED"),
    }
    tracing::info!(
        "  Schedule: every {} min, {:02}:00-{:02}:59 UTC, days {:?}",
        config.schedule.every_minutes,
        config.schedule.start_hour,
        config.schedule.end_hour,
        config.schedule.days
    );
    if config.alert_cooldown.is_zero() {
        tracing::info!("  Alert cooldown: DISABLED (alerts repeat every check)");
    } else {
        tracing::info!("  Alert cooldown: {:?}", config.alert_cooldown);
    }
    log_group(&config.primary);
    if let Some(group) = &config.financial {
        log_group(group);
    }

    run_server(config).await
}

fn log_group(group: &GroupConfig) {
    tracing::info!("  Group '{}':", group.name);
    tracing::info!("    Views: {:?}", group.view_ids);
    tracing::info!(
        "    High-volume threshold: {}",
        group.thresholds.high_volume_cutoff
    );
    match group.thresholds.office_down_field_id {
        Some(id) => tracing::info!("    Office-down field: {}", id),
        None => tracing::info!("    Office-down field: DISABLED"),
    }
    tracing::info!(
        "    Email recipient: {}",
        group.recipient.as_deref().unwrap_or("none")
    );
    tracing::info!(
        "    Telegram chat: {}",
        group
            .telegram
            .as_ref()
            .map(|t| t.chat_id.as_str())
            .unwrap_or("none")
    );
}
