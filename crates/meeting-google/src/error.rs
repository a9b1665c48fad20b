//! Errors raised while talking to the Google Calendar API.

use meeting_engine::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoogleError {
    #[error("no access token: set {0}")]
    MissingToken(&'static str),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("not an event id: {0:?}")]
    InvalidEventId(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response parsed but did not describe a usable event.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<GoogleError> for ProviderError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Status { status, body } => match status {
                404 | 410 => ProviderError::NotFound(body),
                409 => ProviderError::Conflict(body),
                401 | 429 => ProviderError::Unavailable(format!("HTTP {status}: {body}")),
                s if s >= 500 => ProviderError::Unavailable(format!("HTTP {status}: {body}")),
                _ => ProviderError::Rejected(format!("HTTP {status}: {body}")),
            },
            GoogleError::InvalidEventId(id) => {
                ProviderError::Rejected(format!("not an event id: {id:?}"))
            }
            GoogleError::Transport(e) => ProviderError::Unavailable(e.to_string()),
            GoogleError::MissingToken(var) => {
                ProviderError::Unavailable(format!("no access token: set {var}"))
            }
            GoogleError::Malformed(msg) => ProviderError::Rejected(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, GoogleError>;
