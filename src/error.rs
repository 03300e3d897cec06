use std::fmt;

/// Stable numeric error codes.
///
/// Codes never change meaning between releases; new causes get new codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    InvalidEmail,
    MissingField,
    AttachmentTooLarge,
    InvalidAttachment,
    InvalidArgument,
    Timeout,
    Connection,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Unprocessable,
    RateLimited,
    ServerError,
    ApiOther,
    Unexpected,
}

impl ErrorCode {
    /// Returns the numeric code.
    pub fn as_u16(self) -> u16 {
        match self {
            Self::InvalidEmail => 1001,
            Self::MissingField => 1002,
            Self::AttachmentTooLarge => 1003,
            Self::InvalidAttachment => 1004,
            Self::InvalidArgument => 1005,
            Self::Timeout => 2001,
            Self::Connection => 2002,
            Self::BadRequest => 3400,
            Self::Unauthorized => 3401,
            Self::Forbidden => 3403,
            Self::NotFound => 3404,
            Self::Conflict => 3409,
            Self::Unprocessable => 3422,
            Self::RateLimited => 3429,
            Self::ServerError => 3500,
            Self::ApiOther => 3000,
            Self::Unexpected => 9000,
        }
    }

    fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::Unprocessable,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::ApiOther,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Input rejected before any request was made.
    #[error("validation error {code}: {message}")]
    Validation { code: ErrorCode, message: String },
    /// No response was received (timeout, refused connection, DNS).
    #[error("network error {code}: {message}")]
    Network { code: ErrorCode, message: String },
    /// A response was received with a non-success status.
    #[error("api error {code} (http {status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
        /// Parsed error body, when the server sent one.
        data: Option<serde_json::Value>,
    },
    /// Anything that fits none of the above.
    #[error("unexpected error {code}: {message}")]
    Unexpected { code: ErrorCode, message: String },
}

impl MailError {
    pub(crate) fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            code: ErrorCode::Unexpected,
            message: message.into(),
        }
    }

    /// Returns the cause code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. }
            | Self::Network { code, .. }
            | Self::Api { code, .. }
            | Self::Unexpected { code, .. } => *code,
        }
    }

    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for errors raised before any request was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Failure reported by a [`Transport`](crate::Transport) for a single attempt.
///
/// A missing `status` means no response was received at all.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpFailure {
    pub status: Option<u16>,
    pub data: Option<serde_json::Value>,
    pub message: String,
    /// Set when the transport gave up waiting for a response.
    pub timed_out: bool,
}

impl HttpFailure {
    /// Failure with a response status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            data: None,
            message: message.into(),
            timed_out: false,
        }
    }

    /// Failure without a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            data: None,
            message: message.into(),
            timed_out: false,
        }
    }

    /// Failure caused by the per-attempt timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timed_out: true,
            ..Self::network(message)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Auth, server and network failures. Every other status is retried as well.
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(status) => status == 401 || status == 403 || status >= 500,
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "http {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for HttpFailure {}

impl From<HttpFailure> for MailError {
    fn from(failure: HttpFailure) -> Self {
        match failure.status {
            None => Self::Network {
                code: if failure.timed_out {
                    ErrorCode::Timeout
                } else {
                    ErrorCode::Connection
                },
                message: failure.message,
            },
            Some(status) => Self::Api {
                code: ErrorCode::from_status(status),
                status,
                message: failure.message,
                data: failure.data,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ErrorCode, HttpFailure, MailError};

    #[test]
    fn network_failure_without_status() {
        let err: MailError = HttpFailure::network("connection refused").into();
        assert!(matches!(err, MailError::Network { .. }));
        assert_eq!(err.code(), ErrorCode::Connection);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn timeout_failure_gets_timeout_code() {
        let err: MailError = HttpFailure::timeout("deadline elapsed").into();
        assert_eq!(err.code().as_u16(), 2001);
    }

    #[test]
    fn api_failure_keeps_status_and_body() {
        let failure = HttpFailure::status(422, "bad recipients")
            .with_data(json!({"message": "bad recipients"}));
        let err: MailError = failure.into();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.code(), ErrorCode::Unprocessable);
        match err {
            MailError::Api { data, message, .. } => {
                assert_eq!(message, "bad recipients");
                assert_eq!(data, Some(json!({"message": "bad recipients"})));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn status_codes_map_to_stable_codes() {
        let code = |status| MailError::from(HttpFailure::status(status, "x")).code();
        assert_eq!(code(429), ErrorCode::RateLimited);
        assert_eq!(code(503), ErrorCode::ServerError);
        assert_eq!(code(418), ErrorCode::ApiOther);
        assert_eq!(code(401).as_u16(), 3401);
    }

    #[test]
    fn transient_classification() {
        assert!(HttpFailure::network("dns").is_transient());
        assert!(HttpFailure::status(401, "auth").is_transient());
        assert!(HttpFailure::status(502, "gateway").is_transient());
        assert!(!HttpFailure::status(404, "missing").is_transient());
        assert!(!HttpFailure::status(429, "slow down").is_transient());
    }
}
