//! Poll → evaluate → notify cycle for one group of views

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::alerts::email::SmtpTransport;
use crate::alerts::{
    collect_alerts, AlertCooldown, AlertKind, DispatchReport, Dispatcher, EmailChannel,
    Notification, NotifierError, NotifyChannel, TelegramChannel, Thresholds,
};
use crate::config::{Config, GroupConfig};
use crate::ticketing::{scan_views, ScanError, ScanOptions, TicketSource, View};

/// A named set of views with its thresholds and notification channels
pub struct Monitor {
    name: String,
    view_ids: Vec<String>,
    thresholds: Thresholds,
    scan_options: ScanOptions,
    source: Arc<dyn TicketSource>,
    dispatcher: Dispatcher,
    cooldown: AlertCooldown,
    last_cycle: RwLock<Option<CycleSummary>>,
}

/// What happened to one alert during a cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    pub kind: AlertKind,
    pub view_id: String,
    pub view_name: String,
    /// Skipped because the same alert fired within the cooldown window
    pub suppressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchReport>,
}

impl AlertOutcome {
    pub fn delivered(&self) -> bool {
        self.dispatch.as_ref().is_some_and(DispatchReport::delivered)
    }
}

/// Full result of one cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub group: String,
    pub views: Vec<View>,
    pub alerts: Vec<AlertOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn notifications_sent(&self) -> bool {
        self.alerts.iter().any(AlertOutcome::delivered)
    }
}

/// Condensed record of the most recent cycle, kept for status reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub finished_at: DateTime<Utc>,
    pub views_scanned: usize,
    pub alerts_raised: usize,
    pub alerts_delivered: usize,
    pub error: Option<String>,
}

impl Monitor {
    pub fn new(
        name: impl Into<String>,
        view_ids: Vec<String>,
        thresholds: Thresholds,
        agent_base_url: impl Into<String>,
        source: Arc<dyn TicketSource>,
        dispatcher: Dispatcher,
        cooldown: AlertCooldown,
    ) -> Self {
        let scan_options = ScanOptions {
            office_down_field_id: thresholds.office_down_field_id,
            agent_base_url: agent_base_url.into(),
        };
        Self {
            name: name.into(),
            view_ids,
            thresholds,
            scan_options,
            source,
            dispatcher,
            cooldown,
            last_cycle: RwLock::new(None),
        }
    }

    /// Wire a group's channels from configuration
    pub fn from_config(
        config: &Config,
        group: &GroupConfig,
        source: Arc<dyn TicketSource>,
        transport: Option<&SmtpTransport>,
    ) -> Result<Self, NotifierError> {
        let email: Option<Arc<dyn NotifyChannel>> =
            match (transport, &config.smtp, &group.recipient) {
                (Some(transport), Some(smtp), Some(recipient)) => Some(Arc::new(
                    EmailChannel::new(transport.clone(), &smtp.from, recipient)?,
                )),
                _ => {
                    tracing::warn!(group = %group.name, "Email channel disabled");
                    None
                }
            };

        let chat: Option<Arc<dyn NotifyChannel>> = match &group.telegram {
            Some(telegram) => Some(Arc::new(TelegramChannel::new(
                telegram,
                &config.telegram_api_url,
                config.http_timeout,
            )?)),
            None => {
                tracing::warn!(group = %group.name, "Telegram channel disabled");
                None
            }
        };

        Ok(Self::new(
            group.name.clone(),
            group.view_ids.clone(),
            group.thresholds.clone(),
            config.zendesk.base_url.clone(),
            source,
            Dispatcher::new(email, chat),
            AlertCooldown::new(config.alert_cooldown),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn last_cycle(&self) -> Option<CycleSummary> {
        self.last_cycle.read().clone()
    }

    /// Scan every view without evaluating or notifying
    pub async fn poll(&self) -> Result<Vec<View>, ScanError> {
        scan_views(self.source.as_ref(), &self.view_ids, &self.scan_options).await
    }

    /// Run a full cycle: scan, evaluate, then dispatch each admitted alert.
    ///
    /// A scan failure aborts the cycle before anything is sent.
    pub async fn run_cycle(&self) -> Result<CycleReport, ScanError> {
        let started_at = Utc::now();
        tracing::info!(group = %self.name, views = self.view_ids.len(), "Running check");

        let views = match self.poll().await {
            Ok(views) => views,
            Err(e) => {
                tracing::error!(group = %self.name, error = %e, cause = %e.source, "Check failed");
                *self.last_cycle.write() = Some(CycleSummary {
                    finished_at: Utc::now(),
                    views_scanned: 0,
                    alerts_raised: 0,
                    alerts_delivered: 0,
                    error: Some(e.to_string()),
                });
                return Err(e);
            }
        };

        let mut outcomes = Vec::new();
        for alert in collect_alerts(&views, &self.thresholds) {
            let now = Utc::now();
            if !self.cooldown.admits(&alert, now) {
                tracing::debug!(
                    group = %self.name,
                    view_id = %alert.view_id,
                    kind = %alert.kind,
                    "Alert suppressed by cooldown"
                );
                outcomes.push(AlertOutcome {
                    kind: alert.kind,
                    view_id: alert.view_id,
                    view_name: alert.view_name,
                    suppressed: true,
                    dispatch: None,
                });
                continue;
            }

            tracing::info!(
                group = %self.name,
                view_id = %alert.view_id,
                view_name = %alert.view_name,
                kind = %alert.kind,
                "Alert condition active, sending notifications"
            );
            let report = self.dispatcher.dispatch(&alert.notification).await;
            if report.delivered() {
                self.cooldown.record(&alert, now);
            }

            outcomes.push(AlertOutcome {
                kind: alert.kind,
                view_id: alert.view_id,
                view_name: alert.view_name,
                suppressed: false,
                dispatch: Some(report),
            });
        }

        let report = CycleReport {
            group: self.name.clone(),
            views,
            alerts: outcomes,
            started_at,
            finished_at: Utc::now(),
        };

        *self.last_cycle.write() = Some(CycleSummary {
            finished_at: report.finished_at,
            views_scanned: report.views.len(),
            alerts_raised: report.alerts.len(),
            alerts_delivered: report.alerts.iter().filter(|a| a.delivered()).count(),
            error: None,
        });

        Ok(report)
    }

    /// Send a fixed message through every channel to verify configuration
    pub async fn send_test(&self) -> DispatchReport {
        let body = format!(
            "Testing ticket link format:\n- Test Office Down Ticket\n  {}",
            self.scan_options.ticket_url(615595)
        );
        self.dispatcher
            .dispatch(&Notification::new("Test Alert", body))
            .await
    }
}
