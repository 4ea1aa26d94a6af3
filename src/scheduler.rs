//! Business-hours scheduler for recurring checks

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, DurationRound, Timelike, Utc, Weekday};
use tokio::sync::mpsc;

use crate::monitor::Monitor;

/// Minute-aligned cadence restricted to an hour window and a set of weekdays.
///
/// All times are UTC. The window is inclusive on both ends and wraps past
/// midnight when `start_hour > end_hour`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub every_minutes: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    pub days: Vec<Weekday>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            every_minutes: 5,
            start_hour: 14,
            end_hour: 23,
            days: Self::all_days(),
        }
    }
}

impl Schedule {
    pub fn all_days() -> Vec<Weekday> {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.every_minutes == 0 || self.every_minutes > 60 {
            return Err(format!("every_minutes must be 1..=60, got {}", self.every_minutes));
        }
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(format!(
                "hours must be 0..=23, got {}..={}",
                self.start_hour, self.end_hour
            ));
        }
        if self.days.is_empty() {
            return Err("at least one weekday is required".to_string());
        }
        Ok(())
    }

    fn in_window(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..=self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }

    /// Whether a run is due at this minute
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        at.minute() % self.every_minutes.max(1) == 0
            && self.in_window(at.hour())
            && self.days.contains(&at.weekday())
    }

    /// Next matching minute strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let minute = ChronoDuration::minutes(1);
        let mut candidate = now.duration_trunc(minute).ok()? + minute;

        // One week plus a day covers every weekday/hour combination
        for _ in 0..(8 * 24 * 60) {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += minute;
        }
        None
    }
}

/// Background worker that runs every monitor's cycle on a schedule
pub struct SchedulerWorker {
    schedule: Schedule,
    monitors: Vec<Arc<Monitor>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl SchedulerWorker {
    pub fn new(schedule: Schedule, monitors: Vec<Arc<Monitor>>) -> Self {
        Self {
            schedule,
            monitors,
            shutdown_tx: None,
        }
    }

    /// Start the background loop.
    ///
    /// Each tick awaits every monitor in turn before the next run is
    /// computed, so scheduled cycles never overlap one another.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let schedule = self.schedule.clone();
        let monitors = self.monitors.clone();

        tokio::spawn(async move {
            tracing::info!(
                every_minutes = schedule.every_minutes,
                start_hour = schedule.start_hour,
                end_hour = schedule.end_hour,
                "Scheduler started"
            );

            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_run_after(now) else {
                    tracing::error!("Schedule never matches, scheduler stopping");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tracing::debug!(next_run = %next, "Waiting for next scheduled check");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        run_all(&monitors).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background loop
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

/// Run one cycle per monitor, logging failures
pub async fn run_all(monitors: &[Arc<Monitor>]) {
    for monitor in monitors {
        match monitor.run_cycle().await {
            Ok(report) => tracing::info!(
                group = %monitor.name(),
                views = report.views.len(),
                alerts = report.alerts.len(),
                notifications_sent = report.notifications_sent(),
                "Scheduled check complete"
            ),
            Err(e) => tracing::error!(
                group = %monitor.name(),
                error = %e,
                "Scheduled check failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_next_run_inside_window() {
        let schedule = Schedule::default();
        // 2024-06-03 is a Monday
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 3, 15, 2, 30)),
            Some(at(2024, 6, 3, 15, 5, 0))
        );
        // Strictly after an exact match
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 3, 15, 5, 0)),
            Some(at(2024, 6, 3, 15, 10, 0))
        );
    }

    #[test]
    fn test_next_run_before_and_after_window() {
        let schedule = Schedule::default();
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 3, 8, 0, 0)),
            Some(at(2024, 6, 3, 14, 0, 0))
        );
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 3, 23, 56, 0)),
            Some(at(2024, 6, 4, 14, 0, 0))
        );
    }

    #[test]
    fn test_weekday_filter() {
        let schedule = Schedule {
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            ..Schedule::default()
        };
        // Friday evening rolls over to Monday
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 7, 23, 58, 0)),
            Some(at(2024, 6, 10, 14, 0, 0))
        );
    }

    #[test]
    fn test_window_wraps_midnight() {
        let schedule = Schedule {
            every_minutes: 15,
            start_hour: 22,
            end_hour: 2,
            days: Schedule::all_days(),
        };
        assert!(schedule.matches(at(2024, 6, 3, 23, 45, 0)));
        assert!(schedule.matches(at(2024, 6, 4, 1, 0, 0)));
        assert!(!schedule.matches(at(2024, 6, 4, 3, 0, 0)));
        assert_eq!(
            schedule.next_run_after(at(2024, 6, 4, 2, 50, 0)),
            Some(at(2024, 6, 4, 22, 0, 0))
        );
    }

    #[test]
    fn test_validate() {
        assert!(Schedule::default().validate().is_ok());
        assert!(Schedule { every_minutes: 0, ..Schedule::default() }.validate().is_err());
        assert!(Schedule { end_hour: 24, ..Schedule::default() }.validate().is_err());
        assert!(Schedule { days: vec![], ..Schedule::default() }.validate().is_err());
    }

    #[tokio::test]
    async fn test_worker_stops() {
        let mut worker = SchedulerWorker::new(Schedule::default(), vec![]);
        let handle = worker.start();
        worker.stop().await;
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
