//! Error types for the xchain core

use crate::chain::ClientError;
use crate::xcm::DryRunOutcome;

use serde::Serialize;
use thiserror::Error;

/// A failed connection attempt as reported by `ConnectionExhausted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFailure {
    pub endpoint: String,
    pub attempt: u32,
    pub error: String,
}

/// Main error type for the core
#[derive(Error, Debug)]
pub enum XchainError {
    #[error("No endpoints provided")]
    NoEndpointsProvided,

    #[error("{}", describe_exhausted(.endpoints, .attempts))]
    ConnectionExhausted {
        chain: String,
        endpoints: Vec<String>,
        attempts: Vec<AttemptFailure>,
    },

    #[error("Chain not found: {chain}")]
    ChainNotFound { chain: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Transaction built for chain {expected} cannot be submitted to {actual}")]
    ChainMismatch { expected: String, actual: String },

    #[error("Failed to query nomination pools: {0}")]
    PoolQueryFailed(#[source] ClientError),

    #[error("No nomination pool available on {chain}")]
    NoPoolAvailable { chain: String },

    #[error("Failed to resolve asset metadata on {chain}: {source}")]
    AssetLookup {
        chain: String,
        #[source]
        source: ClientError,
    },

    #[error("Simulation failed on {leg} chain: {source}")]
    Simulation {
        leg: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("{}", .outcome.describe_failure())]
    DryRunRejected { outcome: DryRunOutcome },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl XchainError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            XchainError::ConnectionExhausted { .. }
                | XchainError::PoolQueryFailed(_)
                | XchainError::AssetLookup { .. }
                | XchainError::Simulation { .. }
        )
    }

    /// Configuration errors fail fast and are never recovered into result objects
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            XchainError::NoEndpointsProvided
                | XchainError::ChainNotFound { .. }
                | XchainError::InvalidConfig(_)
                | XchainError::InvalidAmount { .. }
                | XchainError::InvalidTransfer(_)
                | XchainError::ChainMismatch { .. }
        )
    }
}

fn describe_exhausted(endpoints: &[String], attempts: &[AttemptFailure]) -> String {
    let detail = attempts
        .iter()
        .map(|a| format!("attempt {} to {}: {}", a.attempt, a.endpoint, a.error))
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Failed to connect after {} attempts (endpoints: {}): {}",
        attempts.len(),
        endpoints.join(", "),
        detail
    )
}

/// Result type for core operations
pub type XchainResult<T> = Result<T, XchainError>;
