//! Endpoint connector with per-attempt timeout and round-robin failover

use super::client::{ChainConnector, ChainOptions};
use crate::config::{ChainConfig, ConnectorConfig};
use crate::error::{AttemptFailure, XchainError, XchainResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Ordered, non-empty list of endpoints for one logical chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet(Vec<String>);

impl EndpointSet {
    pub fn new(endpoints: Vec<String>) -> XchainResult<Self> {
        if endpoints.is_empty() {
            return Err(XchainError::NoEndpointsProvided);
        }
        Ok(Self(endpoints))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, cursor: RoundRobinCursor) -> &str {
        &self.0[cursor.position()]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Cursor positioned at the first endpoint
    pub fn cursor(&self) -> RoundRobinCursor {
        RoundRobinCursor {
            position: 0,
            len: self.0.len(),
        }
    }
}

/// Position in an [`EndpointSet`]. Lives only for the duration of one connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRobinCursor {
    position: usize,
    len: usize,
}

impl RoundRobinCursor {
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to the next endpoint, wrapping after the last one
    pub fn advance(&mut self) {
        self.position = (self.position + 1) % self.len;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Error,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::Error => "error",
        }
    }
}

/// Diagnostic record of one connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAttempt {
    pub endpoint: String,
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// An established connection and how it was reached
#[derive(Debug)]
pub struct Connection<H> {
    pub handle: H,
    pub chosen_endpoint: String,
    /// Every attempt in order, the successful one last
    pub attempts: Vec<ConnectionAttempt>,
}

impl<H> Connection<H> {
    pub fn into_handle(self) -> H {
        self.handle
    }
}

/// Connects to a chain through the first responsive endpoint
#[derive(Debug, Clone)]
pub struct EndpointConnector {
    per_attempt_timeout: Duration,
    max_attempts: u32,
}

impl Default for EndpointConnector {
    fn default() -> Self {
        let config = ConnectorConfig::default();
        Self {
            per_attempt_timeout: Duration::from_millis(config.per_attempt_timeout_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl EndpointConnector {
    /// Create a connector, rejecting a zero timeout or attempt budget
    pub fn new(config: ConnectorConfig) -> XchainResult<Self> {
        if config.per_attempt_timeout_ms == 0 {
            return Err(XchainError::InvalidConfig(
                "per-attempt timeout must be positive".to_string(),
            ));
        }
        if config.max_attempts == 0 {
            return Err(XchainError::InvalidConfig(
                "max attempts must be positive".to_string(),
            ));
        }

        Ok(Self {
            per_attempt_timeout: Duration::from_millis(config.per_attempt_timeout_ms),
            max_attempts: config.max_attempts,
        })
    }

    pub fn per_attempt_timeout(&self) -> Duration {
        self.per_attempt_timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Connect to a chain described by a configuration entry
    pub async fn connect_configured<C: ChainConnector>(
        &self,
        connector: &C,
        chain: &ChainConfig,
    ) -> XchainResult<Connection<C::Handle>> {
        self.connect(connector, &chain.endpoints, &chain.options())
            .await
    }

    /// Try endpoints in round-robin order, one at a time, until one connects
    /// within the per-attempt timeout or the attempt budget is spent.
    pub async fn connect<C: ChainConnector>(
        &self,
        connector: &C,
        endpoints: &[String],
        options: &ChainOptions,
    ) -> XchainResult<Connection<C::Handle>> {
        let endpoints = EndpointSet::new(endpoints.to_vec())?;
        let chain = options.chain.name.as_str();
        let mut cursor = endpoints.cursor();
        // The attempt budget is caller controlled, so never reserve it upfront
        let mut attempts = Vec::new();
        let started = Instant::now();

        for attempt in 1..=self.max_attempts {
            let endpoint = endpoints.get(cursor);
            let started_at = Utc::now();
            let attempt_started = Instant::now();

            debug!(
                chain = chain,
                endpoint = endpoint,
                attempt = attempt,
                max_attempts = self.max_attempts,
                "Connecting"
            );

            // A connect that loses the race is dropped here, so a late
            // connection is never observed.
            let result =
                timeout(self.per_attempt_timeout, connector.connect(endpoint, options)).await;
            let elapsed_ms = attempt_started.elapsed().as_millis() as u64;

            let (outcome, error) = match result {
                Ok(Ok(handle)) => {
                    attempts.push(ConnectionAttempt {
                        endpoint: endpoint.to_string(),
                        attempt,
                        outcome: AttemptOutcome::Success,
                        error: None,
                        started_at,
                        elapsed_ms,
                    });
                    crate::metrics::record_connect_attempt(chain, AttemptOutcome::Success.as_str());
                    crate::metrics::record_connect_latency(chain, started.elapsed().as_secs_f64());
                    info!(
                        chain = chain,
                        endpoint = endpoint,
                        attempt = attempt,
                        "Connected"
                    );

                    return Ok(Connection {
                        handle,
                        chosen_endpoint: endpoint.to_string(),
                        attempts,
                    });
                }
                Ok(Err(e)) => (AttemptOutcome::Error, e.to_string()),
                Err(_) => (
                    AttemptOutcome::Timeout,
                    format!(
                        "timed out after {}ms",
                        self.per_attempt_timeout.as_millis()
                    ),
                ),
            };

            warn!(
                chain = chain,
                endpoint = endpoint,
                attempt = attempt,
                outcome = outcome.as_str(),
                error = %error,
                "Connection attempt failed, failing over"
            );
            crate::metrics::record_connect_attempt(chain, outcome.as_str());

            attempts.push(ConnectionAttempt {
                endpoint: endpoint.to_string(),
                attempt,
                outcome,
                error: Some(error),
                started_at,
                elapsed_ms,
            });
            cursor.advance();
        }

        crate::metrics::record_connections_exhausted(chain);
        warn!(
            chain = chain,
            attempts = attempts.len(),
            "All connection attempts failed"
        );

        Err(XchainError::ConnectionExhausted {
            chain: chain.to_string(),
            endpoints: endpoints.as_slice().to_vec(),
            attempts: attempts
                .into_iter()
                .map(|a| AttemptFailure {
                    endpoint: a.endpoint,
                    attempt: a.attempt,
                    error: a.error.unwrap_or_default(),
                })
                .collect(),
        })
    }
}
