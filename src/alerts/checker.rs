//! Threshold evaluation and repeat-alert suppression

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::config::{Alert, AlertKind, Thresholds};
use crate::ticketing::View;

/// Evaluate the thresholds against one view.
///
/// Conditions are independent; a view can raise none, one or both.
pub fn evaluate(view: &View, thresholds: &Thresholds) -> Vec<AlertKind> {
    let mut kinds = Vec::with_capacity(2);

    if view.ticket_count >= thresholds.high_volume_cutoff {
        kinds.push(AlertKind::HighVolume);
    }
    if view.has_office_down {
        kinds.push(AlertKind::OfficeDown);
    }

    kinds
}

/// Build the alerts for every active condition across views
pub fn collect_alerts(views: &[View], thresholds: &Thresholds) -> Vec<Alert> {
    views
        .iter()
        .flat_map(|view| {
            evaluate(view, thresholds)
                .into_iter()
                .map(move |kind| Alert::for_view(kind, view))
        })
        .collect()
}

/// Last delivery time per (view, condition).
///
/// A zero window admits every alert, so each cycle re-fires for as long as
/// a condition holds.
pub struct AlertCooldown {
    window: Duration,
    last_alerted: Mutex<HashMap<(String, AlertKind), DateTime<Utc>>>,
}

impl AlertCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_alerted: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Whether an alert may be sent at `now`
    pub fn admits(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let last_alerted = self.last_alerted.lock();
        match last_alerted.get(&(alert.view_id.clone(), alert.kind)) {
            Some(last) => match chrono::Duration::from_std(self.window) {
                Ok(window) => now - *last >= window,
                Err(_) => false,
            },
            None => true,
        }
    }

    /// Record a delivered alert
    pub fn record(&self, alert: &Alert, now: DateTime<Utc>) {
        if self.window.is_zero() {
            return;
        }
        self.last_alerted
            .lock()
            .insert((alert.view_id.clone(), alert.kind), now);
    }
}

impl Default for AlertCooldown {
    fn default() -> Self {
        Self::disabled()
    }
}
