//! Queuewatch: Helpdesk Queue Monitor
//!
//! Polls helpdesk ticket views on a business-hours schedule, raises alerts
//! when a queue grows past its threshold or an office-down ticket appears,
//! and notifies over email and Telegram.
//!
//! # Features
//!
//! - **View Scanning**: Ticket counts and office-down detection per view
//! - **Threshold Alerts**: High-volume and office-down conditions per view
//! - **Dual Channels**: SMTP email and Telegram bot, delivered independently
//! - **Alert Cooldown**: Optional suppression of repeated alerts
//! - **Scheduler**: Minute-aligned checks inside an hour/weekday window
//! - **HTTP Surface**: Status page, manual scans and JSON status
//!
//! # Example
//!
//! ```no_run
//! use queuewatch::api::build_state;
//! use queuewatch::Config;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let state = build_state(&config)?;
//!
//! let report = state.primary.run_cycle().await?;
//! println!("{} alerts raised", report.alerts.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod monitor;
pub mod scheduler;
pub mod ticketing;

// Re-export commonly used types
pub use alerts::{Alert, AlertKind, Dispatcher, Notification, Thresholds};
pub use config::{Config, ConfigError};
pub use monitor::{CycleReport, Monitor};
pub use scheduler::{Schedule, SchedulerWorker};
pub use ticketing::{TicketSource, View, ZendeskClient};
