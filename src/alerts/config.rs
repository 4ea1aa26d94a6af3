//! Alert configuration and message types

use serde::{Deserialize, Serialize};

use crate::ticketing::View;

/// Static thresholds applied to every view of a monitor group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Fire a high-volume alert when the ticket count reaches this value
    pub high_volume_cutoff: usize,
    /// Custom field that marks an office-down ticket
    pub office_down_field_id: Option<u64>,
}

/// Condition an alert was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighVolume,
    OfficeDown,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::HighVolume => write!(f, "high_volume"),
            AlertKind::OfficeDown => write!(f, "office_down"),
        }
    }
}

/// Subject and body of an outgoing message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// An active condition on one view, ready to be dispatched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub view_id: String,
    pub view_name: String,
    pub notification: Notification,
}

impl Alert {
    /// Build the alert message for a view
    pub fn for_view(kind: AlertKind, view: &View) -> Self {
        let notification = match kind {
            AlertKind::HighVolume => {
                let mut body = format!(
                    "Alert: The view \"{}\" currently has {} tickets.",
                    view.view_name, view.ticket_count
                );
                if let Some(url) = &view.queue_url {
                    body.push_str(&format!("\n- Open the queue\n  {}", url));
                }
                Notification::new(
                    format!("Zendesk Queue Alert: High Ticket Volume in {}", view.view_name),
                    body,
                )
            }
            AlertKind::OfficeDown => {
                let mut body = format!(
                    "Alert: A ticket with \"Is Your Office Down?\" field checked has been detected in view \"{}\".\n",
                    view.view_name
                );
                for ticket in &view.office_down_tickets {
                    body.push_str(&format!("- {}\n", ticket.subject));
                    if let Some(url) = &ticket.url {
                        body.push_str(&format!("  {}\n", url));
                    }
                }
                Notification::new(
                    format!(
                        "Zendesk Queue Alert: Office Down Ticket Detected in {}",
                        view.view_name
                    ),
                    body.trim_end().to_string(),
                )
            }
        };

        Self {
            kind,
            view_id: view.view_id.clone(),
            view_name: view.view_name.clone(),
            notification,
        }
    }
}
