//! Application error taxonomy.
//!
//! Every error a request handler can hand to
//! [`ExecutionContext::log_error`](crate::context::ExecutionContext::log_error)
//! falls into one of these variants. The variant decides severity and which
//! diagnostic fields are logged.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;

use thiserror::Error;

/// Boxed error for anything outside the taxonomy.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Caller input failed validation. Keyed by field name.
    #[error("validation failed for {} field(s)", .errors.len())]
    Validation { errors: BTreeMap<String, String> },

    /// A named resource does not exist.
    #[error("{resource_name} '{resource_value}' not found")]
    ResourceNotFound {
        key: String,
        resource_name: String,
        resource_value: String,
    },

    /// A call to another service failed.
    #[error("call to {url} failed: {message}")]
    ApiClient {
        code: String,
        message: String,
        url: String,
        stack: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Internal failure with a code and captured stack.
    #[error("{message}")]
    Unexpected {
        code: String,
        message: String,
        stack: String,
    },

    #[error(transparent)]
    Other(BoxError),
}

impl AppError {
    pub fn validation<I, K, V>(errors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        AppError::Validation {
            errors: errors
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn not_found(
        key: impl Into<String>,
        resource_name: impl Into<String>,
        resource_value: impl Into<String>,
    ) -> Self {
        AppError::ResourceNotFound {
            key: key.into(),
            resource_name: resource_name.into(),
            resource_value: resource_value.into(),
        }
    }

    /// Upstream call failure. Status and body are optional because transport
    /// errors never produce a response.
    pub fn api_client(
        code: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
        status: Option<u16>,
        body: Option<String>,
    ) -> Self {
        AppError::ApiClient {
            code: code.into(),
            message: message.into(),
            url: url.into(),
            stack: capture_stack(),
            status,
            body,
        }
    }

    pub fn unexpected(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Unexpected {
            code: code.into(),
            message: message.into(),
            stack: capture_stack(),
        }
    }

    pub fn other<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        AppError::Other(err.into())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(Box::new(err))
    }
}

fn capture_stack() -> String {
    Backtrace::force_capture().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = AppError::not_found("TENANT_NOT_FOUND", "tenant", "acme");
        assert_eq!(err.to_string(), "tenant 'acme' not found");

        let err = AppError::validation([("name", "required"), ("age", "must be positive")]);
        assert_eq!(err.to_string(), "validation failed for 2 field(s)");

        let err = AppError::api_client("UPSTREAM", "timeout", "http://users/api", None, None);
        assert_eq!(err.to_string(), "call to http://users/api failed: timeout");
    }

    #[test]
    fn stack_is_captured_for_unexpected() {
        match AppError::unexpected("DB_FAILURE", "lost connection") {
            AppError::Unexpected { stack, .. } => assert!(!stack.is_empty()),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn json_errors_are_unclassified() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(AppError::from(parse), AppError::Other(_)));
    }
}
