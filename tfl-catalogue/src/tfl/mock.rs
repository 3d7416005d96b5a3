//! Mock transport for testing without API access.
//!
//! Serves canned JSON bodies keyed by endpoint, with scriptable
//! failures, and records every request it receives so tests can assert
//! exactly which endpoints were hit and in what order.

use std::collections::HashMap;
use std::sync::Mutex;

use super::Transport;
use super::error::TflError;

/// Scripted transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, String>,
    failures: HashMap<String, u16>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `endpoint`.
    pub fn respond(mut self, endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(endpoint.into(), body.into());
        self
    }

    /// Fail `endpoint` with the given HTTP status instead of a body.
    pub fn fail(mut self, endpoint: impl Into<String>, status: u16) -> Self {
        self.failures.insert(endpoint.into(), status);
        self
    }

    /// Endpoints requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn get(&self, endpoint: &str) -> Result<String, TflError> {
        self.requests.lock().unwrap().push(endpoint.to_string());

        if let Some(&status) = self.failures.get(endpoint) {
            return Err(TflError::Status {
                status,
                endpoint: endpoint.to_string(),
                message: "scripted failure".to_string(),
            });
        }

        match self.responses.get(endpoint) {
            Some(body) => Ok(body.clone()),
            None => Err(TflError::Status {
                status: 404,
                endpoint: endpoint.to_string(),
                message: "no scripted response".to_string(),
            }),
        }
    }
}
