//! OpenRouteService directions API binding.
//!
//! Speaks the GeoJSON flavor of the driving-car directions endpoint: the
//! request carries `[lng, lat]` coordinate pairs, the response is a feature
//! collection whose first feature holds the route geometry and an optional
//! distance/duration summary.

use serde::Deserialize;

use super::error::RouteError;
use super::http::{DirectionsRequest, RouteHttpClient};
use crate::coord::GeoPoint;

/// A parsed route from the directions API.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRoute {
    /// Ordered route geometry.
    pub points: Vec<GeoPoint>,
    /// Route length in meters, when the API reported a summary.
    pub distance_meters: Option<f64>,
    /// Estimated travel time in seconds, when reported.
    pub duration_seconds: Option<f64>,
}

/// Binding to the OpenRouteService directions endpoint.
#[derive(Debug, Clone)]
pub struct OrsDirectionsApi {
    endpoint: String,
    api_key: Option<String>,
}

impl OrsDirectionsApi {
    /// Create a binding for the given endpoint and credential.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Request a route between two points.
    pub async fn fetch_route(
        &self,
        client: &dyn RouteHttpClient,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<DirectionsRoute, RouteError> {
        // ORS expects [lng, lat] ordering
        let body = serde_json::json!({
            "coordinates": [
                [origin.lng, origin.lat],
                [destination.lng, destination.lat],
            ],
        });

        let bytes = client
            .post_json(DirectionsRequest {
                url: self.endpoint.clone(),
                api_key: self.api_key.clone(),
                body,
            })
            .await?;

        parse_geojson(&bytes)
    }
}

#[derive(Deserialize)]
struct GeoJsonResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(default)]
    summary: Option<Summary>,
}

#[derive(Deserialize)]
struct Summary {
    distance: Option<f64>,
    duration: Option<f64>,
}

/// Parse a directions GeoJSON body into a route.
fn parse_geojson(bytes: &[u8]) -> Result<DirectionsRoute, RouteError> {
    let response: GeoJsonResponse = serde_json::from_slice(bytes)
        .map_err(|e| RouteError::Malformed(format!("invalid JSON: {}", e)))?;

    let feature = response
        .features
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::Malformed("response contains no features".into()))?;

    if feature.geometry.coordinates.is_empty() {
        return Err(RouteError::Malformed("route geometry is empty".into()));
    }

    let points = feature
        .geometry
        .coordinates
        .iter()
        .map(|&[lng, lat]| GeoPoint::new(lat, lng))
        .collect();

    let (distance_meters, duration_seconds) = match feature.properties.summary {
        Some(summary) => (summary.distance, summary.duration),
        None => (None, None),
    };

    Ok(DirectionsRoute {
        points,
        distance_meters,
        duration_seconds,
    })
}
