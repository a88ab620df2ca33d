//! HTTP transport behind the directory client.
//!
//! The failover logic in [`super::client`] is transport-agnostic: it talks to
//! a [`DirectoryTransport`] and never sees reqwest directly, so tests can
//! script per-endpoint outcomes without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::DirectoryError;

/// Default timeout for a single endpoint request.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User-Agent sent to the directory mirrors.
pub const USER_AGENT: &str = concat!("rhythmee/", env!("CARGO_PKG_VERSION"));

/// One HTTP GET against one endpoint.
#[async_trait]
pub trait DirectoryTransport: Send + Sync {
    /// Issues a GET to `url` with the given query pairs and returns the
    /// response body on a 2xx status.
    async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, DirectoryError>;
}

// ============================================================================
// ReqwestTransport
// ============================================================================

/// Production transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates the transport with the crate's User-Agent and a per-request
    /// timeout.
    pub fn new() -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DirectoryError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing reqwest client (shared connection pool).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectoryTransport for ReqwestTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, DirectoryError> {
        debug!(url, "Directory request");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Http {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// Scripted transport for tests.
///
/// Outcomes are keyed by URL prefix (normally the mirror base URL); every
/// call is recorded so tests can assert on attempt counts and ordering.
#[derive(Debug, Default)]
pub struct MockTransport {
    outcomes: Mutex<HashMap<String, Result<String, String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful body for URLs starting with `prefix`.
    pub fn succeed_for(&self, prefix: impl Into<String>, body: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(prefix.into(), Ok(body.into()));
    }

    /// Scripts a network failure for URLs starting with `prefix`.
    pub fn fail_for(&self, prefix: impl Into<String>, message: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(prefix.into(), Err(message.into()));
    }

    /// Returns the number of requests issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns the requested URLs in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryTransport for MockTransport {
    async fn get_json(
        &self,
        url: &str,
        _query: &[(String, String)],
    ) -> Result<String, DirectoryError> {
        self.calls.lock().unwrap().push(url.to_string());

        let outcomes = self.outcomes.lock().unwrap();
        let outcome = outcomes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, outcome)| outcome.clone());

        match outcome {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(DirectoryError::Network(message)),
            None => Err(DirectoryError::Network(format!(
                "no scripted response for {url}"
            ))),
        }
    }
}
