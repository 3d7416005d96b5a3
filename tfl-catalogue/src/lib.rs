//! TfL line/route/stop-point catalogue fetcher.
//!
//! Builds a local catalogue of every line, its per-direction route
//! sequences, and the stop points those routes call at, from the
//! Transport for London Unified API. Fetches are rate limited on the
//! client side (TfL publishes a requests-per-minute budget but no
//! rate-limit headers) and crash safe: an aborted run checkpoints its
//! partial progress and the next run resumes from where it stopped.

pub mod catalogue;
pub mod model;
pub mod store;
pub mod tfl;
