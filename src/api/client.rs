//! Core API traits and error type

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{LatLon, Restaurant, SnitchReport};

/// Asks the backend whether a coordinate pair sits inside a known establishment
#[async_trait]
pub trait RestaurantLookup: Send + Sync {
    /// `Ok(None)` means the backend found no match
    async fn check_location(&self, coords: LatLon) -> Result<Option<Restaurant>, ApiError>;
}

/// Submits finalized reports
#[async_trait]
pub trait SnitchPublisher: Send + Sync {
    async fn publish_snitch(&self, report: SnitchReport) -> Result<(), ApiError>;
}

/// Errors that can occur during API calls
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether a retry could plausibly succeed. The loop never retries; this
    /// only feeds the log line.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Network(_) => true,
            ApiError::InvalidResponse(_) => false,
            ApiError::Json(_) => false,
        }
    }
}

/// Scripted API for tests: lookups pop queued answers, publishes are recorded
#[derive(Default)]
pub struct MockApi {
    lookups: Mutex<VecDeque<Result<Option<Restaurant>, ApiError>>>,
    lookup_calls: Mutex<Vec<LatLon>>,
    published: Mutex<Vec<SnitchReport>>,
    fail_publish: bool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish call fails with a 500
    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    /// Queue the answer for the next lookup. Once the queue is empty lookups
    /// return no match.
    pub fn push_lookup(&self, answer: Result<Option<Restaurant>, ApiError>) {
        self.lookups.lock().unwrap_or_else(|e| e.into_inner()).push_back(answer);
    }

    pub fn push_match(&self, restaurant: Restaurant) {
        self.push_lookup(Ok(Some(restaurant)));
    }

    pub fn lookup_calls(&self) -> Vec<LatLon> {
        self.lookup_calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn published(&self) -> Vec<SnitchReport> {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RestaurantLookup for MockApi {
    async fn check_location(&self, coords: LatLon) -> Result<Option<Restaurant>, ApiError> {
        self.lookup_calls.lock().unwrap_or_else(|e| e.into_inner()).push(coords);
        self.lookups.lock().unwrap_or_else(|e| e.into_inner()).pop_front().unwrap_or(Ok(None))
    }
}

#[async_trait]
impl SnitchPublisher for MockApi {
    async fn publish_snitch(&self, report: SnitchReport) -> Result<(), ApiError> {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).push(report);
        if self.fail_publish {
            return Err(ApiError::Status {
                status: 500,
                message: "publish rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_is_retryable() {
        assert!(
            ApiError::Status {
                status: 503,
                message: "down".to_string()
            }
            .is_retryable()
        );
        assert!(
            ApiError::Status {
                status: 429,
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(
            !ApiError::Status {
                status: 400,
                message: "bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!ApiError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_mock_lookup_pops_answers_in_order() {
        let api = MockApi::new();
        api.push_match(Restaurant::new("Diner", "d-1"));
        api.push_lookup(Err(ApiError::InvalidResponse("boom".to_string())));

        let coords = LatLon { lat: 1.0, lon: 2.0 };
        let first = api.check_location(coords).await.unwrap();
        assert_eq!(first.map(|r| r.name), Some("Diner".to_string()));
        assert!(api.check_location(coords).await.is_err());
        assert!(api.check_location(coords).await.unwrap().is_none());
        assert_eq!(api.lookup_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_publish_records_reports() {
        let api = MockApi::failing_publish();
        let report = SnitchReport {
            user_id: "u".to_string(),
            origin_coords: LatLon { lat: 0.0, lon: 0.0 },
            restaurant_data: Restaurant::new("Diner", "d-1"),
        };
        assert!(api.publish_snitch(report.clone()).await.is_err());
        assert_eq!(api.published(), vec![report]);
    }
}
