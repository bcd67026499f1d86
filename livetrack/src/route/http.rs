//! HTTP client abstraction for the directions API.
//!
//! The trait boundary exists for dependency injection: production code uses
//! [`ReqwestRouteClient`], tests swap in a scripted mock without touching the
//! network.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::error::RouteError;

/// A single directions request ready to send.
#[derive(Debug, Clone)]
pub struct DirectionsRequest {
    /// Endpoint URL.
    pub url: String,
    /// Credential sent as the `Authorization` header, if configured.
    pub api_key: Option<String>,
    /// JSON request body.
    pub body: serde_json::Value,
}

/// Trait for posting directions requests.
///
/// Methods return boxed futures so the trait stays object-safe and mockable.
pub trait RouteHttpClient: Send + Sync {
    /// Performs an HTTP POST with a JSON body.
    ///
    /// Returns the raw response body on 2xx. A 404 maps to
    /// [`RouteError::NotFound`]; any other non-2xx maps to
    /// [`RouteError::Status`].
    fn post_json(
        &self,
        request: DirectionsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RouteError>> + Send + '_>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestRouteClient {
    client: reqwest::Client,
}

impl ReqwestRouteClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new() -> Result<Self, RouteError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RouteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl RouteHttpClient for ReqwestRouteClient {
    fn post_json(
        &self,
        request: DirectionsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, RouteError>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client.post(&request.url).json(&request.body);
            if let Some(ref key) = request.api_key {
                builder = builder.header(reqwest::header::AUTHORIZATION, key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| RouteError::Network(format!("request failed: {}", e)))?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(RouteError::NotFound);
            }
            if !status.is_success() {
                return Err(RouteError::Status(status.as_u16()));
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| RouteError::Network(format!("failed to read response: {}", e)))
        })
    }
}
