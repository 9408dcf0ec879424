use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tracing::{info, warn};

pub const ALERT_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Danger,
    Warning,
    Info,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Success => "success",
            AlertLevel::Danger => "danger",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: u64,
    pub message: String,
    pub level: AlertLevel,
}

/// Container the dashboard appends notifications to. Cloning shares the same
/// container.
#[derive(Debug, Clone)]
pub struct AlertCenter {
    alerts: Arc<Mutex<Vec<Alert>>>,
    next_id: Arc<AtomicU64>,
    lifetime: Duration,
}

impl Default for AlertCenter {
    fn default() -> Self {
        Self::new(ALERT_LIFETIME)
    }
}

impl AlertCenter {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            alerts: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            lifetime,
        }
    }

    /// Appends an alert and schedules its removal. Must be called from within
    /// a tokio runtime.
    pub fn show(&self, message: impl Into<String>, level: AlertLevel) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let alert = Alert {
            id,
            message: message.into(),
            level,
        };

        match level {
            AlertLevel::Danger | AlertLevel::Warning => {
                warn!(id, level = level.as_str(), "{}", alert.message)
            }
            AlertLevel::Success | AlertLevel::Info => {
                info!(id, level = level.as_str(), "{}", alert.message)
            }
        }

        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert);
        }

        let center = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(center.lifetime).await;
            center.dismiss(id);
        });

        id
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let Ok(mut alerts) = self.alerts.lock() else {
            return false;
        };
        let before = alerts.len();
        alerts.retain(|alert| alert.id != id);
        alerts.len() != before
    }

    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<Alert> {
        self.alerts
            .lock()
            .ok()
            .and_then(|alerts| alerts.last().cloned())
    }
}
