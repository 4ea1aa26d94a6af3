//! Turn raw view tickets into per-view scan records

use super::client::{TicketSource, TicketingError};
use super::model::{Ticket, TicketSummary, View};

/// Settings shared by every view scanned in one pass
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Custom field marking an office-down ticket; `None` skips detection
    pub office_down_field_id: Option<u64>,
    /// Base of agent-facing ticket links, e.g. `https://acme.zendesk.com`
    pub agent_base_url: String,
}

impl ScanOptions {
    pub fn ticket_url(&self, ticket_id: u64) -> String {
        format!("{}/agent/tickets/{}", self.agent_base_url, ticket_id)
    }

    pub fn view_url(&self, view_id: &str) -> String {
        format!("{}/agent/filters/{}", self.agent_base_url, view_id)
    }
}

/// Scan a single view.
///
/// A failed ticket fetch fails the view. A failed title fetch only costs the
/// display name, which falls back to `View {id}`.
pub async fn scan_view(
    source: &dyn TicketSource,
    view_id: &str,
    options: &ScanOptions,
) -> Result<View, TicketingError> {
    let tickets = source.view_tickets(view_id).await?;

    let view_name = match source.view_title(view_id).await {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!(
                view_id = %view_id,
                error = %e,
                "Could not fetch view title, using default name"
            );
            View::default_name(view_id)
        }
    };

    let office_down_tickets = match options.office_down_field_id {
        Some(field_id) => office_down_tickets(&tickets, field_id, options),
        None => Vec::new(),
    };

    tracing::debug!(
        view_id = %view_id,
        view_name = %view_name,
        ticket_count = tickets.len(),
        office_down = office_down_tickets.len(),
        "Scanned view"
    );

    Ok(View {
        view_id: view_id.to_string(),
        view_name,
        ticket_count: tickets.len(),
        has_office_down: !office_down_tickets.is_empty(),
        office_down_tickets,
        queue_url: Some(options.view_url(view_id)),
    })
}

/// Scan views one after another.
///
/// The first ticket fetch failure aborts the whole scan; no partial result
/// is returned.
pub async fn scan_views(
    source: &dyn TicketSource,
    view_ids: &[String],
    options: &ScanOptions,
) -> Result<Vec<View>, ScanError> {
    let mut views = Vec::with_capacity(view_ids.len());

    for view_id in view_ids {
        let view = scan_view(source, view_id, options)
            .await
            .map_err(|e| ScanError {
                view_id: view_id.clone(),
                source: e,
            })?;
        views.push(view);
    }

    Ok(views)
}

fn office_down_tickets(tickets: &[Ticket], field_id: u64, options: &ScanOptions) -> Vec<TicketSummary> {
    tickets
        .iter()
        .filter(|t| t.is_flagged(field_id))
        .map(|t| TicketSummary {
            id: t.id,
            subject: t.subject.clone().unwrap_or_default(),
            url: Some(options.ticket_url(t.id)),
        })
        .collect()
}

/// A view could not be scanned
#[derive(Debug, thiserror::Error)]
#[error("Failed to scan view {view_id}")]
pub struct ScanError {
    pub view_id: String,
    #[source]
    pub source: TicketingError,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;

    pub const FIELD: u64 = 31823557691671;

    /// In-memory ticket source keyed by view id
    #[derive(Default)]
    pub struct FakeSource {
        pub tickets: HashMap<String, Vec<Ticket>>,
        pub titles: HashMap<String, String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        pub fn with_view(mut self, id: &str, title: Option<&str>, tickets: Vec<Ticket>) -> Self {
            self.tickets.insert(id.to_string(), tickets);
            if let Some(title) = title {
                self.titles.insert(id.to_string(), title.to_string());
            }
            self
        }
    }

    #[async_trait]
    impl TicketSource for FakeSource {
        async fn view_tickets(&self, view_id: &str) -> Result<Vec<Ticket>, TicketingError> {
            self.calls.lock().push(format!("tickets:{}", view_id));
            self.tickets
                .get(view_id)
                .cloned()
                .ok_or_else(|| TicketingError::Status {
                    view_id: view_id.to_string(),
                    status: 503,
                })
        }

        async fn view_title(&self, view_id: &str) -> Result<String, TicketingError> {
            self.calls.lock().push(format!("title:{}", view_id));
            self.titles
                .get(view_id)
                .cloned()
                .ok_or_else(|| TicketingError::Status {
                    view_id: view_id.to_string(),
                    status: 404,
                })
        }
    }

    pub fn ticket(id: u64, subject: &str, office_down: serde_json::Value) -> Ticket {
        serde_json::from_value(json!({
            "id": id,
            "subject": subject,
            "custom_fields": [
                {"id": 360000000001u64, "value": "unrelated"},
                {"id": FIELD, "value": office_down},
            ],
        }))
        .unwrap()
    }

    pub fn options() -> ScanOptions {
        ScanOptions {
            office_down_field_id: Some(FIELD),
            agent_base_url: "https://acme.zendesk.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_office_down_detection() {
        let source = FakeSource::default().with_view(
            "1",
            Some("Tier 1"),
            vec![
                ticket(10, "Internet slow", json!(false)),
                ticket(11, "Office is down", json!(true)),
                ticket(12, "String true", json!("true")),
                ticket(13, "Numeric one", json!(1)),
            ],
        );

        let view = scan_view(&source, "1", &options()).await.unwrap();
        assert_eq!(view.view_name, "Tier 1");
        assert_eq!(view.ticket_count, 4);
        assert_eq!(
            view.queue_url.as_deref(),
            Some("https://acme.zendesk.com/agent/filters/1")
        );
        assert!(view.has_office_down);
        assert_eq!(
            view.office_down_tickets,
            vec![TicketSummary {
                id: 11,
                subject: "Office is down".to_string(),
                url: Some("https://acme.zendesk.com/agent/tickets/11".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_truthy_values_do_not_flag() {
        let source = FakeSource::default().with_view(
            "1",
            Some("Tier 1"),
            vec![
                ticket(12, "String true", json!("true")),
                ticket(13, "Numeric one", json!(1)),
            ],
        );
        let view = scan_view(&source, "1", &options()).await.unwrap();
        assert!(!view.has_office_down);
        assert!(view.office_down_tickets.is_empty());
    }

    #[tokio::test]
    async fn test_detection_disabled() {
        let source = FakeSource::default().with_view(
            "1",
            Some("Tier 1"),
            vec![ticket(11, "Office is down", json!(true))],
        );
        let opts = ScanOptions {
            office_down_field_id: None,
            ..options()
        };
        let view = scan_view(&source, "1", &opts).await.unwrap();
        assert!(!view.has_office_down);
    }

    #[tokio::test]
    async fn test_title_failure_falls_back() {
        let source = FakeSource::default().with_view("77", None, vec![]);
        let view = scan_view(&source, "77", &options()).await.unwrap();
        assert_eq!(view.view_name, "View 77");
        assert_eq!(view.ticket_count, 0);
    }

    #[tokio::test]
    async fn test_ticket_failure_fails_scan() {
        let source = FakeSource::default().with_view("1", Some("Tier 1"), vec![]);
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

        let err = scan_views(&source, &ids, &options()).await.unwrap_err();
        assert_eq!(err.view_id, "2");
        // The scan stops at the failed view
        assert!(!source.calls.lock().contains(&"tickets:3".to_string()));
    }

    #[tokio::test]
    async fn test_empty_view_list() {
        let source = FakeSource::default();
        let views = scan_views(&source, &[], &options()).await.unwrap();
        assert!(views.is_empty());
        assert!(source.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_order() {
        let source = FakeSource::default()
            .with_view("1", Some("A"), vec![])
            .with_view("2", Some("B"), vec![]);
        let ids = vec!["1".to_string(), "2".to_string()];
        let views = scan_views(&source, &ids, &options()).await.unwrap();

        let names: Vec<&str> = views.iter().map(|v| v.view_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(
            *source.calls.lock(),
            vec!["tickets:1", "title:1", "tickets:2", "title:2"]
        );
    }
}
