//! Remote API boundary - restaurant lookup and report publishing
//!
//! This module provides:
//! - RestaurantLookup / SnitchPublisher traits for API abstraction
//! - HttpApiClient implementation over reqwest
//! - MockApi for tests and offline runs

pub mod client;
pub mod http;

pub use client::{ApiError, MockApi, RestaurantLookup, SnitchPublisher};
pub use http::{HttpApiClient, HttpApiConfig};
