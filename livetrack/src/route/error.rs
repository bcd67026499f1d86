//! Error taxonomy for the routing dependency.

use thiserror::Error;

/// Errors from the external directions API.
///
/// Only [`RouteError::NotFound`] is retryable; every other class aborts the
/// retry loop immediately. Callers of
/// [`RouteProvider::generate_path`](super::RouteProvider::generate_path)
/// never see these - they are absorbed by the synthetic fallback.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    /// The API could not route between the sampled coordinates (HTTP 404).
    #[error("no route found between the requested coordinates")]
    NotFound,

    /// The API returned a non-2xx status other than 404.
    #[error("directions API returned HTTP {0}")]
    Status(u16),

    /// The request failed before an HTTP status was received.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be parsed as a directions GeoJSON.
    #[error("malformed directions response: {0}")]
    Malformed(String),
}

impl RouteError {
    /// Whether the retry policy allows another attempt with a fresh
    /// coordinate pair.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_retryable() {
        assert!(RouteError::NotFound.is_retryable());
        assert!(!RouteError::Status(500).is_retryable());
        assert!(!RouteError::Network("timeout".into()).is_retryable());
        assert!(!RouteError::Malformed("no features".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert!(RouteError::Status(502).to_string().contains("502"));
        assert!(RouteError::Network("refused".into())
            .to_string()
            .contains("refused"));
    }
}
