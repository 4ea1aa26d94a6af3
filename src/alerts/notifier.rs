//! Notification dispatch over email and chat channels

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::config::Notification;

/// A delivery channel for alert notifications
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Short channel name used in logs
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// Outcome of one channel attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Disabled,
    Sent,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, ChannelOutcome::Sent)
    }
}

/// Per-channel results of a dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub email: ChannelOutcome,
    pub chat: ChannelOutcome,
}

impl DispatchReport {
    /// Email is the channel of record. Chat only decides delivery when no
    /// email channel is configured.
    pub fn delivered(&self) -> bool {
        match &self.email {
            ChannelOutcome::Sent => true,
            ChannelOutcome::Failed(_) => false,
            ChannelOutcome::Disabled => self.chat.is_sent(),
        }
    }
}

/// Sends each notification on every configured channel
#[derive(Clone, Default)]
pub struct Dispatcher {
    email: Option<Arc<dyn NotifyChannel>>,
    chat: Option<Arc<dyn NotifyChannel>>,
}

impl Dispatcher {
    pub fn new(
        email: Option<Arc<dyn NotifyChannel>>,
        chat: Option<Arc<dyn NotifyChannel>>,
    ) -> Self {
        Self { email, chat }
    }

    /// Attempt delivery on every channel.
    ///
    /// Channels are independent: a failure is logged and recorded in the
    /// report, never returned to the caller.
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let report = DispatchReport {
            email: Self::attempt(self.email.as_deref(), notification).await,
            chat: Self::attempt(self.chat.as_deref(), notification).await,
        };

        if !report.delivered() {
            tracing::error!(
                subject = %notification.subject,
                email = ?report.email,
                chat = ?report.chat,
                "Notification was not delivered"
            );
        }

        report
    }

    async fn attempt(
        channel: Option<&dyn NotifyChannel>,
        notification: &Notification,
    ) -> ChannelOutcome {
        let Some(channel) = channel else {
            return ChannelOutcome::Disabled;
        };

        match channel.send(notification).await {
            Ok(()) => {
                tracing::info!(
                    channel = channel.name(),
                    subject = %notification.subject,
                    "Notification sent"
                );
                ChannelOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(
                    channel = channel.name(),
                    subject = %notification.subject,
                    error = %e,
                    "Notification channel failed"
                );
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Render a plain body as Telegram legacy Markdown.
///
/// `- subject\n  url` pairs become `- [subject](url)` links. Everything else
/// has the entity markers `_`, `*`, `` ` `` and `[` escaped.
pub fn markdown_links(body: &str) -> String {
    static LINK_PAIR: OnceLock<Regex> = OnceLock::new();
    let re = LINK_PAIR.get_or_init(|| {
        Regex::new(r"(?m)^- ([^\n]*)\n  (https?://\S+)$").expect("valid link pattern")
    });

    let mut out = String::with_capacity(body.len() + 16);
    let mut last = 0;
    for caps in re.captures_iter(body) {
        let (Some(whole), Some(label), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        out.push_str(&escape_markdown(&body[last..whole.start()]));
        out.push_str(&format!("- [{}]({})", link_label(label.as_str()), url.as_str()));
        last = whole.end();
    }
    out.push_str(&escape_markdown(&body[last..]));
    out
}

/// Backslash-escape legacy Markdown entity markers in plain text
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bold a line of text.
///
/// Escapes are not honoured inside an entity, so a literal `*` closes the
/// bold run and is emitted escaped between runs.
pub fn markdown_bold(text: &str) -> String {
    text.split('*')
        .map(|part| {
            if part.is_empty() {
                String::new()
            } else {
                format!("*{}*", part)
            }
        })
        .collect::<Vec<_>>()
        .join("\\*")
}

// Link text ends at the first `]` and cannot carry escapes
fn link_label(text: &str) -> String {
    text.replace('[', "(").replace(']', ")")
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render a plain-text body as a single HTML paragraph with line breaks
pub fn html_body(body: &str) -> String {
    format!("<p>{}</p>", escape_html(body).replace('\n', "<br>"))
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Invalid channel configuration: {0}")]
    Config(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Channel that records what it was asked to send
    pub struct RecordingChannel {
        pub name: &'static str,
        pub fail: bool,
        pub sent: Mutex<Vec<Notification>>,
    }

    impl RecordingChannel {
        pub fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, notification: &Notification) -> Result<(), NotifierError> {
            self.sent.lock().push(notification.clone());
            if self.fail {
                Err(NotifierError::Telegram("bot unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn note() -> Notification {
        Notification::new("Test Alert", "body")
    }

    #[tokio::test]
    async fn test_chat_failure_does_not_fail_dispatch() {
        let email = RecordingChannel::new("email", false);
        let chat = RecordingChannel::new("telegram", true);
        let dispatcher = Dispatcher::new(Some(email.clone()), Some(chat.clone()));

        let report = dispatcher.dispatch(&note()).await;
        assert!(report.delivered());
        assert_eq!(report.email, ChannelOutcome::Sent);
        assert!(matches!(report.chat, ChannelOutcome::Failed(_)));
        assert_eq!(email.sent.lock().len(), 1);
        assert_eq!(chat.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_email_failure_still_attempts_chat() {
        let email = RecordingChannel::new("email", true);
        let chat = RecordingChannel::new("telegram", false);
        let dispatcher = Dispatcher::new(Some(email), Some(chat.clone()));

        let report = dispatcher.dispatch(&note()).await;
        assert!(!report.delivered());
        assert_eq!(report.chat, ChannelOutcome::Sent);
        assert_eq!(chat.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_only_dispatcher() {
        let chat = RecordingChannel::new("telegram", false);
        let dispatcher = Dispatcher::new(None, Some(chat));
        let report = dispatcher.dispatch(&note()).await;
        assert_eq!(report.email, ChannelOutcome::Disabled);
        assert!(report.delivered());

        let report = Dispatcher::default().dispatch(&note()).await;
        assert!(!report.delivered());
    }

    #[test]
    fn test_markdown_links() {
        let body = "Office Down Alert:\n- Foo\n  https://x/y\n- Bar baz\n  https://acme.zendesk.com/agent/tickets/2\n";
        let out = markdown_links(body);
        assert!(out.contains("- [Foo](https://x/y)"));
        assert!(out.contains("- [Bar baz](https://acme.zendesk.com/agent/tickets/2)"));
        assert!(out.starts_with("Office Down Alert:\n"));
    }

    #[test]
    fn test_markdown_escapes_entity_markers() {
        let body = "Alert in view \"LTS_Tier1\".\n- Printer_down [urgent]\n  https://acme.zendesk.com/agent/tickets/9";
        assert_eq!(
            markdown_links(body),
            "Alert in view \"LTS\\_Tier1\".\n- [Printer_down (urgent)](https://acme.zendesk.com/agent/tickets/9)"
        );
        assert_eq!(escape_markdown("a*b`c[d"), "a\\*b\\`c\\[d");
    }

    #[test]
    fn test_markdown_bold_splits_on_asterisk() {
        assert_eq!(markdown_bold("Queue LTS_Tier1"), "*Queue LTS_Tier1*");
        assert_eq!(markdown_bold("High *priority*"), "*High *\\**priority*\\*");
    }

    #[test]
    fn test_markdown_leaves_plain_lines() {
        let body = "High volume alert:\n- Tier 1: 40 tickets\n";
        assert_eq!(markdown_links(body), body);
    }

    #[test]
    fn test_html_body() {
        assert_eq!(
            html_body("a <b> & c\nnext"),
            "<p>a &lt;b&gt; &amp; c<br>next</p>"
        );
    }
}
