//! Request correlation.
//!
//! # Responsibilities
//! - Name the correlation header shared by ingress, handlers and outbound calls
//! - Read the correlation ID back out of a request
//!
//! # Design Decisions
//! - The ingress middleware writes the header before any handler runs, so
//!   handlers read a stable value instead of generating their own

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Correlation header name (lowercase, as stored by `http`).
pub const X_CORRELATION_ID: &str = "x-correlation-id";

/// Header identifying the calling client, logged as `caller`.
pub const X_CLIENT: &str = "x-client";

/// Correlation ID from the headers, if present and non-empty.
pub fn correlation_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

/// Extractor yielding the request's correlation ID.
///
/// Empty when the ingress middleware is not installed;
/// [`ExecutionContext::new`](crate::context::ExecutionContext::new) then
/// generates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CorrelationId(
            correlation_id_from_headers(&parts.headers)
                .unwrap_or_default()
                .to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blank_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(correlation_id_from_headers(&headers), None);

        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("  "));
        assert_eq!(correlation_id_from_headers(&headers), None);

        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("abc"));
        assert_eq!(correlation_id_from_headers(&headers), Some("abc"));
    }
}
