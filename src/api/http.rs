//! HTTP implementation of the lookup and publish calls
//!
//! Both endpoints take and return JSON:
//! - `POST {base}/location/check` with `{"location": {"lat", "lon"}}`. A 200
//!   carries a restaurant record; 204 or 404 means no match.
//! - `POST {base}/snitches` with a [`SnitchReport`] body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::api::client::{ApiError, RestaurantLookup, SnitchPublisher};
use crate::domain::{LatLon, Restaurant, SnitchReport};

const CHECK_LOCATION_PATH: &str = "/location/check";
const PUBLISH_SNITCH_PATH: &str = "/snitches";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// reqwest-backed API client
pub struct HttpApiClient {
    client: Client,
    config: HttpApiConfig,
}

impl HttpApiClient {
    pub fn new(config: HttpApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn check_location_body(coords: LatLon) -> Value {
        json!({ "location": coords })
    }

    /// Turn a non-success response into an error carrying the body text
    async fn error_for(response: Response) -> ApiError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ApiError::Status { status, message }
    }

    fn parse_restaurant(body: Value) -> Result<Option<Restaurant>, ApiError> {
        let is_empty = match &body {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            other => {
                return Err(ApiError::InvalidResponse(format!(
                    "expected restaurant object, got {}",
                    other
                )));
            }
        };
        if is_empty {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(body)?))
    }
}

#[async_trait]
impl RestaurantLookup for HttpApiClient {
    async fn check_location(&self, coords: LatLon) -> Result<Option<Restaurant>, ApiError> {
        let response = self
            .client
            .post(self.url(CHECK_LOCATION_PATH))
            .json(&Self::check_location_body(coords))
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: Value = response.json().await?;
                Self::parse_restaurant(body)
            }
            _ => Err(Self::error_for(response).await),
        }
    }
}

#[async_trait]
impl SnitchPublisher for HttpApiClient {
    async fn publish_snitch(&self, report: SnitchReport) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(PUBLISH_SNITCH_PATH))
            .json(&report)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
