//! Route acquisition for simulated trackers.
//!
//! This module owns everything between "a tracker needs somewhere to go" and
//! "here is a usable path": the HTTP client abstraction, the
//! OpenRouteService binding, and the retry/fallback policy.
//!
//! # Layers
//!
//! - [`RouteHttpClient`] / [`ReqwestRouteClient`] - transport, mockable
//! - [`OrsDirectionsApi`] - request building and GeoJSON parsing
//! - [`RouteProvider`] - retry policy and synthetic fallback; the only type
//!   the rest of the engine talks to

mod error;
mod http;
mod ors;
mod provider;

pub use error::RouteError;
pub use http::{DirectionsRequest, ReqwestRouteClient, RouteHttpClient};
pub use ors::{DirectionsRoute, OrsDirectionsApi};
pub use provider::{RouteProvider, RouteProviderConfig, MAX_ROUTE_ATTEMPTS};

#[cfg(test)]
pub use http::tests::MockRouteClient;
