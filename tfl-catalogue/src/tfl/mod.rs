//! TfL Unified API client.
//!
//! This module provides an HTTP client for the Transport for London
//! Unified API, which serves line, route and stop-point data.
//!
//! Key characteristics of the TfL API:
//! - Authentication is two plain request headers, `app_id` and `app_key`
//! - A registered key is budgeted 500 requests per minute, but responses
//!   carry **no** rate-limit headers, so throttling must be enforced on
//!   the client side (see [`RateLimited`])
//! - `/Line/{id}/Route/Sequence/{direction}` embeds the stop points the
//!   route calls at, avoiding separate stop-point requests

mod client;
mod error;
pub mod mock;
mod ratelimit;

pub use client::{TflClient, TflConfig};
pub use error::TflError;
pub use ratelimit::{Clock, RateLimitConfig, RateLimited, Sleeper, SystemClock, TokioSleeper};

/// A transport that can execute a GET against the TfL API and return the
/// raw response body.
///
/// Implemented by [`TflClient`] (real HTTP), [`RateLimited`] (throttling
/// wrapper around any other transport) and [`mock::MockTransport`]
/// (scripted responses for tests).
pub trait Transport {
    /// Fetch `endpoint` (a path relative to the API base URL) and return
    /// the response body on a 2xx status.
    fn get(&self, endpoint: &str) -> impl Future<Output = Result<String, TflError>>;
}
