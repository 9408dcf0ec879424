use crate::errors::ConsoleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of the entity a control changes (an article, a ticket, a user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ConsoleError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ConsoleError::EmptySubject);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    BreakingFlag,
    TicketStatus,
}

/// One interactive control on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlKey {
    pub kind: ControlKind,
    pub subject: SubjectId,
}

impl ControlKey {
    pub fn new(kind: ControlKind, subject: SubjectId) -> Self {
        Self { kind, subject }
    }
}

impl fmt::Display for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ControlKind::BreakingFlag => "breaking",
            ControlKind::TicketStatus => "ticket-status",
        };
        write!(f, "{kind}:{}", self.subject)
    }
}

/// Value held by a checkbox or a select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ControlValue {
    Flag(bool),
    Choice(String),
}

impl ControlValue {
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ControlValue::Flag(_) => None,
            ControlValue::Choice(choice) => Some(choice),
        }
    }
}

/// Remote operation confirming a control change: where to post and which body
/// field carries the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub field: &'static str,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, field: &'static str) -> Self {
        Self {
            path: path.into(),
            field,
        }
    }

    pub fn body(&self, value: &ControlValue) -> Value {
        let mut body = serde_json::Map::new();
        body.insert(
            self.field.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        Value::Object(body)
    }
}

/// The `{"success": bool}` answer every mutating endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActionEnvelope {
    pub success: bool,
}

impl ActionEnvelope {
    pub fn from_value(value: Value) -> Result<Self, ConsoleError> {
        match value.get("success") {
            Some(Value::Bool(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(ConsoleError::malformed(format!(
                "`success` is not a boolean: {other}"
            ))),
            None => Err(ConsoleError::malformed("missing `success` field")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UserCountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "open" => Some(TicketStatus::Open),
            "in_progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

/// Which dashboard a breaking-news toggle lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Staff,
}

impl Scope {
    pub fn prefix(self) -> &'static str {
        match self {
            Scope::Admin => "/admin",
            Scope::Staff => "/staff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Publish,
    Unpublish,
}

impl PublishAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishAction::Publish => "publish",
            PublishAction::Unpublish => "unpublish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastDraft {
    pub title: String,
    pub message: String,
    pub countries: String,
}
