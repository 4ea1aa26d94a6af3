//! HTTP client for the helpdesk views API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::model::{Ticket, TicketPage, ViewEnvelope};
use crate::config::ZendeskConfig;

/// Read access to ticket views
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Fetch every ticket currently matching a view
    async fn view_tickets(&self, view_id: &str) -> Result<Vec<Ticket>, TicketingError>;

    /// Fetch the display title of a view
    async fn view_title(&self, view_id: &str) -> Result<String, TicketingError>;
}

/// Zendesk REST client using API-token basic auth
#[derive(Clone)]
pub struct ZendeskClient {
    http_client: reqwest::Client,
    base_url: String,
    origin: reqwest::Url,
    username: String,
    api_token: String,
    max_pages: usize,
}

impl ZendeskClient {
    pub fn new(config: &ZendeskConfig, timeout: Duration) -> Result<Self, TicketingError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TicketingError::Client(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let origin = reqwest::Url::parse(&base_url)
            .map_err(|e| TicketingError::Client(format!("invalid base URL: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            origin,
            username: format!("{}/token", config.email),
            api_token: config.api_token.clone(),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Whether a server-supplied link stays on the configured API host
    fn same_origin(&self, url: &str) -> bool {
        reqwest::Url::parse(url)
            .map(|u| u.origin() == self.origin.origin())
            .unwrap_or(false)
    }

    async fn get_json<T>(&self, url: &str, view_id: &str) -> Result<T, TicketingError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.username, Some(&self.api_token))
            .send()
            .await
            .map_err(|e| TicketingError::Request {
                view_id: view_id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TicketingError::Unauthorized {
                    view_id: view_id.to_string(),
                },
                StatusCode::TOO_MANY_REQUESTS => TicketingError::RateLimited {
                    view_id: view_id.to_string(),
                },
                _ => TicketingError::Status {
                    view_id: view_id.to_string(),
                    status: status.as_u16(),
                },
            });
        }

        response.json().await.map_err(|e| TicketingError::Decode {
            view_id: view_id.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl TicketSource for ZendeskClient {
    async fn view_tickets(&self, view_id: &str) -> Result<Vec<Ticket>, TicketingError> {
        let mut url = format!("{}/api/v2/views/{}/tickets.json", self.base_url, view_id);
        let mut tickets = Vec::new();

        for page in 1..=self.max_pages {
            let body: TicketPage = self.get_json(&url, view_id).await?;
            tickets.extend(body.tickets);

            match body.next_page {
                // Credentials go with every request, so never leave the API host
                Some(next) if !self.same_origin(&next) => {
                    return Err(TicketingError::ForeignPage {
                        view_id: view_id.to_string(),
                    });
                }
                Some(next) if page < self.max_pages => url = next,
                Some(_) => {
                    tracing::warn!(
                        view_id = %view_id,
                        max_pages = self.max_pages,
                        "View has more pages than the configured limit, count is truncated"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(tickets)
    }

    async fn view_title(&self, view_id: &str) -> Result<String, TicketingError> {
        let url = format!("{}/api/v2/views/{}.json", self.base_url, view_id);
        let body: ViewEnvelope = self.get_json(&url, view_id).await?;
        Ok(body.view.title)
    }
}

/// Ticketing API errors
#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request for view {view_id} failed: {message}")]
    Request { view_id: String, message: String },

    #[error("Authentication rejected for view {view_id}")]
    Unauthorized { view_id: String },

    #[error("Rate limited while fetching view {view_id}")]
    RateLimited { view_id: String },

    #[error("View {view_id} returned status {status}")]
    Status { view_id: String, status: u16 },

    #[error("Pagination link for view {view_id} points outside the API host")]
    ForeignPage { view_id: String },

    #[error("Invalid response for view {view_id}: {message}")]
    Decode { view_id: String, message: String },
}
