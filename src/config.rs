//! Process configuration loaded from the environment
//!
//! Every setting is read once at startup. `Config::from_lookup` takes an
//! arbitrary lookup function so configuration can be built in tests without
//! touching the process environment.

use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;

use crate::alerts::Thresholds;
use crate::scheduler::Schedule;

/// Field id of the "Is your office down?" checkbox on the support form
pub const DEFAULT_OFFICE_DOWN_FIELD_ID: u64 = 31823557691671;
pub const DEFAULT_HIGH_VOLUME_THRESHOLD: usize = 35;
pub const DEFAULT_FINANCIAL_HIGH_VOLUME_THRESHOLD: usize = 11;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub zendesk: ZendeskConfig,
    pub smtp: Option<SmtpConfig>,
    pub telegram_api_url: String,
    /// Outbound HTTP timeout for ticketing and chat calls
    pub http_timeout: Duration,
    pub alert_cooldown: Duration,
    pub schedule: Schedule,
    /// Primary (support queue) group
    pub primary: GroupConfig,
    /// Secondary group, only present when its view list is non-empty
    pub financial: Option<GroupConfig>,
}

#[derive(Clone)]
pub struct ZendeskConfig {
    pub subdomain: String,
    pub email: String,
    pub api_token: String,
    pub base_url: String,
    pub max_pages: usize,
}

impl std::fmt::Debug for ZendeskConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZendeskConfig")
            .field("subdomain", &self.subdomain)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// One monitored set of views with its own thresholds and audience
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub name: String,
    pub view_ids: Vec<String>,
    pub thresholds: Thresholds,
    /// Email recipient; `None` disables the email channel for this group
    pub recipient: Option<String>,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&'static str> = ["ZENDESK_SUBDOMAIN", "ZENDESK_EMAIL", "ZENDESK_API_TOKEN"]
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing.join(", ")));
        }

        let subdomain = get("ZENDESK_SUBDOMAIN").unwrap_or_default();
        let zendesk = ZendeskConfig {
            base_url: get("ZENDESK_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("https://{}.zendesk.com", subdomain)),
            email: get("ZENDESK_EMAIL").unwrap_or_default(),
            api_token: get("ZENDESK_API_TOKEN").unwrap_or_default(),
            max_pages: parse_or(&get, "ZENDESK_MAX_PAGES", 10)?,
            subdomain,
        };

        let smtp = match get("SMTP_SERVER") {
            Some(host) => {
                let username = get("SMTP_USERNAME").unwrap_or_default();
                Some(SmtpConfig {
                    host,
                    port: parse_or(&get, "SMTP_PORT", 587)?,
                    from: get("SMTP_FROM").unwrap_or_else(|| username.clone()),
                    username,
                    password: get("SMTP_PASSWORD").unwrap_or_default(),
                })
            }
            None => None,
        };

        let notification_email = get("NOTIFICATION_EMAIL");
        if smtp.is_some() && notification_email.is_none() {
            return Err(ConfigError::Missing("NOTIFICATION_EMAIL".to_string()));
        }

        let office_down_field_id = match get("OFFICE_DOWN_FIELD_ID") {
            Some(raw) if raw.eq_ignore_ascii_case("none") => None,
            Some(raw) => Some(parse_value("OFFICE_DOWN_FIELD_ID", &raw)?),
            None => Some(DEFAULT_OFFICE_DOWN_FIELD_ID),
        };

        let primary = GroupConfig {
            name: "support".to_string(),
            view_ids: split_list(get("ZENDESK_VIEW_IDS").as_deref()),
            thresholds: Thresholds {
                high_volume_cutoff: parse_or(
                    &get,
                    "HIGH_VOLUME_THRESHOLD",
                    DEFAULT_HIGH_VOLUME_THRESHOLD,
                )?,
                office_down_field_id,
            },
            recipient: notification_email.clone(),
            telegram: telegram_pair(&get, "TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"),
        };

        let financial_views = split_list(get("FINANCIAL_VIEW_IDS").as_deref());
        let financial = if financial_views.is_empty() {
            None
        } else {
            Some(GroupConfig {
                name: "financial".to_string(),
                view_ids: financial_views,
                thresholds: Thresholds {
                    high_volume_cutoff: parse_or(
                        &get,
                        "FINANCIAL_HIGH_VOLUME_THRESHOLD",
                        DEFAULT_FINANCIAL_HIGH_VOLUME_THRESHOLD,
                    )?,
                    office_down_field_id: None,
                },
                recipient: get("FINANCIAL_NOTIFICATION_EMAIL").or(notification_email),
                telegram: telegram_pair(
                    &get,
                    "FINANCIAL_TELEGRAM_BOT_TOKEN",
                    "FINANCIAL_TELEGRAM_CHAT_ID",
                ),
            })
        };

        let schedule = Schedule {
            every_minutes: parse_or(&get, "SCHEDULE_EVERY_MINUTES", 5)?,
            start_hour: parse_or(&get, "SCHEDULE_START_HOUR", 14)?,
            end_hour: parse_or(&get, "SCHEDULE_END_HOUR", 23)?,
            days: match get("SCHEDULE_DAYS") {
                Some(raw) => parse_days(&raw)?,
                None => Schedule::all_days(),
            },
        };
        schedule.validate().map_err(|reason| ConfigError::Invalid {
            key: "SCHEDULE_*".to_string(),
            reason,
        })?;

        let http_timeout_secs: u64 = parse_or(&get, "HTTP_TIMEOUT_SECS", 30)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            zendesk,
            smtp,
            telegram_api_url: get("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            alert_cooldown: Duration::from_secs(parse_or(&get, "ALERT_COOLDOWN_SECS", 0)?),
            schedule,
            primary,
            financial,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        reason: format!("cannot parse '{}'", raw),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn telegram_pair<G>(get: &G, token_key: &str, chat_key: &str) -> Option<TelegramConfig>
where
    G: Fn(&str) -> Option<String>,
{
    match (get(token_key), get(chat_key)) {
        (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
        _ => None,
    }
}

/// Split a comma-separated list, dropping blank entries
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_days(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    split_list(Some(raw))
        .iter()
        .map(|day| {
            day.parse::<Weekday>().map_err(|_| ConfigError::Invalid {
                key: "SCHEDULE_DAYS".to_string(),
                reason: format!("unknown weekday '{}'", day),
            })
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("ZENDESK_SUBDOMAIN", "acme"),
        ("ZENDESK_EMAIL", "ops@acme.test"),
        ("ZENDESK_API_TOKEN", "secret"),
    ];

    #[test]
    fn test_missing_vars_reported_together() {
        let err = Config::from_lookup(lookup(&[("ZENDESK_EMAIL", "ops@acme.test")])).unwrap_err();
        match err {
            ConfigError::Missing(vars) => {
                assert!(vars.contains("ZENDESK_SUBDOMAIN"));
                assert!(vars.contains("ZENDESK_API_TOKEN"));
                assert!(!vars.contains("ZENDESK_EMAIL"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.zendesk.base_url, "https://acme.zendesk.com");
        assert_eq!(config.port, 3000);
        assert!(config.smtp.is_none());
        assert!(config.financial.is_none());
        assert!(config.primary.view_ids.is_empty());
        assert!(config.primary.telegram.is_none());
        assert_eq!(config.primary.thresholds.high_volume_cutoff, 35);
        assert_eq!(
            config.primary.thresholds.office_down_field_id,
            Some(DEFAULT_OFFICE_DOWN_FIELD_ID)
        );
        assert_eq!(config.alert_cooldown, Duration::ZERO);
        assert_eq!(config.schedule.every_minutes, 5);
        assert_eq!(config.schedule.days.len(), 7);
    }

    #[test]
    fn test_view_ids_trimmed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ZENDESK_VIEW_IDS", " 101, 102 ,,103 "));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.primary.view_ids, vec!["101", "102", "103"]);
    }

    #[test]
    fn test_smtp_requires_recipient() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SMTP_SERVER", "smtp.acme.test"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(v) if v == "NOTIFICATION_EMAIL"));

        pairs.push(("NOTIFICATION_EMAIL", "alerts@acme.test"));
        pairs.push(("SMTP_USERNAME", "bot@acme.test"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from, "bot@acme.test");
    }

    #[test]
    fn test_financial_group() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("NOTIFICATION_EMAIL", "alerts@acme.test"));
        pairs.push(("FINANCIAL_VIEW_IDS", "900"));
        pairs.push(("FINANCIAL_TELEGRAM_BOT_TOKEN", "tok"));
        pairs.push(("FINANCIAL_TELEGRAM_CHAT_ID", "-42"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        let financial = config.financial.unwrap();
        assert_eq!(financial.view_ids, vec!["900"]);
        assert_eq!(financial.thresholds.high_volume_cutoff, 11);
        assert_eq!(financial.thresholds.office_down_field_id, None);
        assert_eq!(financial.recipient.as_deref(), Some("alerts@acme.test"));
        assert_eq!(financial.telegram.unwrap().chat_id, "-42");
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HIGH_VOLUME_THRESHOLD", "lots"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "HIGH_VOLUME_THRESHOLD"));
    }

    #[test]
    fn test_schedule_days() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCHEDULE_DAYS", "mon,tue,wed,thu,fri"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.schedule.days.len(), 5);
        assert!(!config.schedule.days.contains(&Weekday::Sat));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SCHEDULE_DAYS", "mon,someday"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_zero_http_timeout_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "0"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "HTTP_TIMEOUT_SECS"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "5"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config.zendesk);
        assert!(!rendered.contains("secret"));
    }
}
