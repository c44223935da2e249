//! Transaction lifecycle events
//!
//! A submitted transaction reports its progress as an ordered stream of
//! [`LifecycleEvent`]s. Only `Finalized`, `Invalid` and `Dropped` end the
//! lifecycle; everything else is progress reporting.

use crate::chain::ClientError;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream of lifecycle events for one submission
pub type EventStream = BoxStream<'static, Result<LifecycleEvent, ClientError>>;

/// Dispatch level error attached to a finalized transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchError {
    /// Discriminator of the runtime error, e.g. `Arithmetic` or `Module`
    pub kind: String,
    /// Decoded payload of the error variant, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl DispatchError {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: None,
        }
    }
}

/// Progress of a submitted transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleEvent {
    /// Accepted by the node's transaction pool
    Validated { tx_hash: [u8; 32] },

    /// Gossiped to peers
    Broadcast { tx_hash: [u8; 32] },

    /// Included in a (not yet final) block
    InBlock {
        tx_hash: [u8; 32],
        block_hash: [u8; 32],
    },

    /// Included in a finalized block
    Finalized {
        tx_hash: [u8; 32],
        block_hash: [u8; 32],
        dispatch_error: Option<DispatchError>,
    },

    /// Rejected by the transaction pool
    Invalid { reason: String },

    /// Evicted from the transaction pool before inclusion
    Dropped { reason: String },
}

impl LifecycleEvent {
    /// Get event name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Validated { .. } => "validated",
            LifecycleEvent::Broadcast { .. } => "broadcast",
            LifecycleEvent::InBlock { .. } => "in_block",
            LifecycleEvent::Finalized { .. } => "finalized",
            LifecycleEvent::Invalid { .. } => "invalid",
            LifecycleEvent::Dropped { .. } => "dropped",
        }
    }

    /// Check if this event ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Finalized { .. }
                | LifecycleEvent::Invalid { .. }
                | LifecycleEvent::Dropped { .. }
        )
    }
}

/// Format a 32 byte hash the way explorers display it
pub fn format_hash(hash: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        let hash = [7u8; 32];
        assert!(!LifecycleEvent::Broadcast { tx_hash: hash }.is_terminal());
        assert!(!LifecycleEvent::InBlock {
            tx_hash: hash,
            block_hash: hash
        }
        .is_terminal());
        assert!(LifecycleEvent::Finalized {
            tx_hash: hash,
            block_hash: hash,
            dispatch_error: None
        }
        .is_terminal());
        assert!(LifecycleEvent::Dropped {
            reason: "usurped".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_format_hash() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        hash[31] = 0x01;
        let formatted = format_hash(&hash);
        assert!(formatted.starts_with("0xab00"));
        assert!(formatted.ends_with("01"));
        assert_eq!(formatted.len(), 66);
    }
}
