//! Threshold alerting and notification delivery
//!
//! Evaluates scanned views against static thresholds and sends the
//! resulting alerts over email and Telegram.

pub mod checker;
pub mod config;
pub mod email;
pub mod notifier;
pub mod telegram;

pub use checker::{collect_alerts, evaluate, AlertCooldown};
pub use config::{Alert, AlertKind, Notification, Thresholds};
pub use email::EmailChannel;
pub use notifier::{ChannelOutcome, DispatchReport, Dispatcher, NotifierError, NotifyChannel};
pub use telegram::TelegramChannel;
