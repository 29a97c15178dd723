//! Error types for the OMS gateway.
//!
//! [`OmsError`] covers what can go wrong in a single exchange with the OMS:
//! a non-success HTTP status, a refusal in the body, an undecodable body,
//! or a failure below HTTP.

use thiserror::Error;

/// Errors returned by [`OmsGateway`](super::OmsGateway) operations.
#[derive(Debug, Error)]
pub enum OmsError {
    /// Any non-2xx status, with the response body as the message.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The server answered with `status: false` or without a token.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The body did not match the expected JSON shape.
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// DNS, connection or timeout failure from `reqwest`.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = OmsError::ApiError {
            status: 401,
            message: "invalid token".into(),
        };
        assert_eq!(err.to_string(), "API error (status 401): invalid token");
    }

    #[test]
    fn decode_error_display_names_context() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = OmsError::Decode {
            context: "pending page".into(),
            source,
        };
        assert!(err.to_string().starts_with("failed to decode pending page: "));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OmsError>();
    }
}
