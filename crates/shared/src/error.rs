use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            400 | 422 => Self::Validation,
            429 => Self::RateLimited,
            _ => Self::Internal,
        }
    }
}

/// Error reported by the backend in a response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds an error from a failed response. The table API answers with
    /// `{"message": ..}`, the auth API with `error_description` or `msg`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let code = ErrorCode::from_status(status);
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error_description", "msg", "error"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
            })
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    trimmed.to_string()
                }
            });
        Self { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_table_api_message() {
        let err = ApiError::from_response(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null}"#,
        );
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(
            err.message,
            "duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn reads_auth_error_description() {
        let err = ApiError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Invalid login credentials");
    }

    #[test]
    fn falls_back_to_raw_body_or_status() {
        assert_eq!(ApiError::from_response(502, "bad gateway").message, "bad gateway");
        assert_eq!(
            ApiError::from_response(500, "").message,
            "request failed with status 500"
        );
    }
}
