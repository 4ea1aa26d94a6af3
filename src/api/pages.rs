//! Server-rendered status page

use chrono::{DateTime, Utc};

use crate::alerts::notifier::escape_html;
use crate::monitor::CycleSummary;
use crate::ticketing::View;

// Embed the page shell at compile time
const STATUS_HTML: &str = include_str!("../ui/status.html");

/// Inputs for one render of the status page
pub struct StatusPage<'a> {
    pub title: &'a str,
    pub scan_path: &'a str,
    pub threshold: usize,
    pub checked_at: DateTime<Utc>,
    pub last_cycle: Option<&'a CycleSummary>,
    /// Scan results, or the safe error message when the poll failed
    pub views: Result<&'a [View], &'a str>,
}

impl StatusPage<'_> {
    pub fn render(&self) -> String {
        let (rows, banner) = match self.views {
            Ok(views) if views.is_empty() => (
                r#"<tr><td colspan="3">No views configured</td></tr>"#.to_string(),
                String::new(),
            ),
            Ok(views) => (
                views
                    .iter()
                    .map(|v| self.render_row(v))
                    .collect::<Vec<_>>()
                    .join("\n      "),
                String::new(),
            ),
            Err(message) => (
                String::new(),
                format!(
                    r#"<div class="banner">Failed to fetch views: {}</div>"#,
                    escape_html(message)
                ),
            ),
        };

        let last_cycle = match self.last_cycle {
            Some(summary) => match &summary.error {
                Some(error) => format!(
                    "{} (failed: {})",
                    summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    escape_html(error)
                ),
                None => format!(
                    "{} ({} alerts, {} delivered)",
                    summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    summary.alerts_raised,
                    summary.alerts_delivered
                ),
            },
            None => "never".to_string(),
        };

        STATUS_HTML
            .replace("{{title}}", &escape_html(self.title))
            .replace(
                "{{checked_at}}",
                &self.checked_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            )
            .replace("{{threshold}}", &self.threshold.to_string())
            .replace("{{last_cycle}}", &last_cycle)
            .replace("{{scan_path}}", self.scan_path)
            .replace("{{banner}}", &banner)
            .replace("{{rows}}", &rows)
    }

    fn render_row(&self, view: &View) -> String {
        let count_class = if view.ticket_count >= self.threshold {
            "alert"
        } else {
            "ok"
        };

        let office_down = if view.has_office_down {
            let links: Vec<String> = view
                .office_down_tickets
                .iter()
                .map(|t| match &t.url {
                    Some(url) => format!(
                        r#"<a href="{}">#{} {}</a>"#,
                        escape_html(url),
                        t.id,
                        escape_html(&t.subject)
                    ),
                    None => format!("#{} {}", t.id, escape_html(&t.subject)),
                })
                .collect();
            format!(r#"<span class="alert">Yes</span><br>{}"#, links.join("<br>"))
        } else {
            r#"<span class="ok">No</span>"#.to_string()
        };

        format!(
            r#"<tr><td>{}</td><td class="{}">{}</td><td>{}</td></tr>"#,
            escape_html(&view.view_name),
            count_class,
            view.ticket_count,
            office_down
        )
    }
}
