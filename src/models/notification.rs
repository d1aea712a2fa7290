use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

/// Transient, auto-dismissing message shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub life_ms: u64,
}

/// Builds notifications with the configured lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Notifier {
    life_ms: u64,
}

impl Notifier {
    pub fn new(life_ms: u64) -> Self {
        Self { life_ms }
    }

    pub fn notify(&self, severity: Severity, detail: impl Into<String>) -> Notification {
        let summary = match severity {
            Severity::Success => "Success",
            Severity::Info => "Information",
            Severity::Warn => "Warning",
            Severity::Error => "Error",
        };
        Notification {
            severity,
            summary: summary.to_string(),
            detail: detail.into(),
            life_ms: self.life_ms,
        }
    }

    pub fn success(&self, detail: impl Into<String>) -> Notification {
        self.notify(Severity::Success, detail)
    }

    pub fn error(&self, detail: impl Into<String>) -> Notification {
        self.notify(Severity::Error, detail)
    }
}
