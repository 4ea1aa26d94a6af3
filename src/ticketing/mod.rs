//! Helpdesk ticketing API access
//!
//! Fetches the tickets behind each configured view and reduces them to a
//! `View` record: ticket count plus any tickets flagged as office-down.

pub mod client;
pub mod model;
pub mod scan;

pub use client::{TicketSource, TicketingError, ZendeskClient};
pub use model::{Ticket, TicketSummary, View};
pub use scan::{scan_view, scan_views, ScanError, ScanOptions};
