use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered and refused the request.
    #[error("{message}")]
    Api { status: u16, code: ErrorCode, message: String },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid backend payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("realtime channel error: {0}")]
    Realtime(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("selection store failure: {0}")]
    Store(String),
}

impl BackendError {
    pub fn from_response(status: u16, body: &str) -> Self {
        let ApiError { code, message } = ApiError::from_response(status, body);
        Self::Api {
            status,
            code,
            message,
        }
    }

    /// True when the backend itself rejected the request, as opposed to the
    /// request never completing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::NotAuthenticated)
    }

    /// Text suitable for showing to the user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
