//! Ticketing wire types and the per-view scan record

use serde::{Deserialize, Serialize};

/// Ticket as returned by the views API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_fields: Vec<CustomField>,
}

impl Ticket {
    /// Look up a custom field value by field id
    pub fn custom_field(&self, field_id: u64) -> Option<&serde_json::Value> {
        self.custom_fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| &f.value)
    }

    /// True only when the field exists and holds the JSON boolean `true`
    pub fn is_flagged(&self, field_id: u64) -> bool {
        matches!(self.custom_field(field_id), Some(serde_json::Value::Bool(true)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,
    #[serde(default)]
    pub value: serde_json::Value,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CustomField>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CustomField>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of `GET /api/v2/views/{id}/tickets.json`
#[derive(Debug, Deserialize)]
pub struct TicketPage {
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Body of `GET /api/v2/views/{id}.json`
#[derive(Debug, Deserialize)]
pub struct ViewEnvelope {
    pub view: ViewMeta,
}

#[derive(Debug, Deserialize)]
pub struct ViewMeta {
    pub title: String,
}

/// Ticket reference carried by a view result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: u64,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Result of scanning one view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub view_id: String,
    pub view_name: String,
    pub ticket_count: usize,
    pub has_office_down: bool,
    pub office_down_tickets: Vec<TicketSummary>,
    /// Agent link to the view's ticket list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_url: Option<String>,
}

impl View {
    /// Display name used when the view title cannot be fetched
    pub fn default_name(view_id: &str) -> String {
        format!("View {}", view_id)
    }
}
