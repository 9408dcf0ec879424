use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("subject id must not be empty")]
    EmptySubject,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {0}")]
    Status(StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("{0} is already running")]
    Busy(String),

    #[error("{0} is not on the page")]
    UnknownControl(String),
}

impl ConsoleError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Client-side rejection raised before any request is sent. The display text
/// is the alert shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter both title and message")]
    MissingTitleOrMessage,

    #[error("Message is too long (maximum {max} characters)")]
    MessageTooLong { max: usize },

    #[error("Please enter a message")]
    MissingMessage,

    #[error("Please enter a search term")]
    EmptySearch,
}

/// Why a confirmation ended in a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Rejected,
    Status(u16),
    Malformed(String),
    Transport(String),
    TimedOut,
}

impl Failure {
    /// Rejections come from the server's business logic; everything else means
    /// the exchange itself broke.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Failure::Rejected)
    }
}

impl From<ConsoleError> for Failure {
    fn from(err: ConsoleError) -> Self {
        match err {
            ConsoleError::Status(status) => Failure::Status(status.as_u16()),
            ConsoleError::Malformed(message) => Failure::Malformed(message),
            ConsoleError::Timeout(_) => Failure::TimedOut,
            other => Failure::Transport(other.to_string()),
        }
    }
}
