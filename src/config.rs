use crate::controller::{ControllerConfig, DEFAULT_TIMEOUT, OverlapPolicy};
use crate::csrf::token_from_cookies;
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub csrf_token: String,
    pub controller: ControllerConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            csrf_token: String::new(),
            controller: ControllerConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("NEWSDESK_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let csrf_token = lookup("NEWSDESK_COOKIE")
            .map(|cookies| token_from_cookies(&cookies))
            .unwrap_or_default();

        let timeout = lookup("NEWSDESK_TIMEOUT_MS")
            .and_then(|value| match value.parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(err) => {
                    warn!("ignoring NEWSDESK_TIMEOUT_MS={value}: {err}");
                    None
                }
            })
            .unwrap_or(DEFAULT_TIMEOUT);

        let policy = match lookup("NEWSDESK_OVERLAP").as_deref().map(str::trim) {
            None | Some("supersede") => OverlapPolicy::Supersede,
            Some("reject") => OverlapPolicy::Reject,
            Some(other) => {
                warn!("unknown NEWSDESK_OVERLAP={other}, using supersede");
                OverlapPolicy::Supersede
            }
        };

        Self {
            base_url,
            csrf_token,
            controller: ControllerConfig { policy, timeout },
        }
    }
}
