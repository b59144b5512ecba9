use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for the client core.
///
/// Precondition failures (`EmptyMessage`, `NoConversation`, `UnknownPost`,
/// `AuthRequired`) are detected locally and never issue a request. Transport
/// and non-2xx outcomes are deliberately not distinguished any further by the
/// rollback logic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("message body is empty after trimming")]
    EmptyMessage,

    #[error("conversation {0} is not loaded")]
    NoConversation(String),

    #[error("post {0} is not in the local cache")]
    UnknownPost(String),

    #[error("no bearer token available")]
    AuthRequired,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status} for {path}")]
    Status { status: StatusCode, path: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
