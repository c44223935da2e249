//! Cross-chain (XCM) transfers gated by a two-leg dry run
//!
//! A transfer is simulated on the origin chain as the signed sender, and the
//! message it would forward is simulated on the destination chain. Only when
//! both legs succeed is a transaction handed back to the caller.

mod dry_run;
mod location;

pub use dry_run::DryRunValidator;

use crate::tx::Tx;

use serde::{Deserialize, Serialize};

/// Asset being transferred, as seen from the origin chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetId {
    /// The origin chain's native token
    Native,
    /// An asset registered in the `Assets` pallet under this id
    Fungible(u32),
}

/// Symbol and precision of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters of a cross-chain transfer, already validated by the caller's surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender: String,
    pub recipient: String,
    pub asset: AssetId,
    /// Human readable decimal amount, e.g. `"1.25"`
    pub amount: String,
}

/// Per-leg verdict of a transfer dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunOutcome {
    pub origin_success: bool,
    pub destination_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_error: Option<String>,
}

impl DryRunOutcome {
    /// Both legs must succeed independently
    pub fn is_success(&self) -> bool {
        self.origin_success && self.destination_success
    }

    /// Message naming every failed leg and its reason
    pub fn describe_failure(&self) -> String {
        let mut legs = Vec::new();
        if !self.origin_success {
            legs.push(format!(
                "Origin chain error: {}",
                self.origin_error.as_deref().unwrap_or("unknown")
            ));
        }
        if !self.destination_success {
            match (&self.destination_error, self.origin_success) {
                (Some(reason), _) => legs.push(format!("Destination chain error: {}", reason)),
                (None, true) => legs.push("Destination chain error: unknown".to_string()),
                // Destination was never reached
                (None, false) => {}
            }
        }
        if legs.is_empty() {
            return "Dry run succeeded".to_string();
        }
        format!("Dry run failed: {}", legs.join("; "))
    }
}

/// A transaction whose transfer passed both dry-run legs
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    pub tx: Tx,
    pub outcome: DryRunOutcome,
    pub asset: AssetMetadata,
    /// Amount in the asset's smallest unit
    pub units: u128,
}

/// Caller facing result of a dry-run gated transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XcmTransferResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Tx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run_details: Option<DryRunOutcome>,
}

impl XcmTransferResult {
    pub fn accepted(validated: ValidatedTransfer) -> Self {
        Self {
            success: true,
            transaction: Some(validated.tx),
            error: None,
            dry_run_details: Some(validated.outcome),
        }
    }

    pub fn rejected(error: String, outcome: Option<DryRunOutcome>) -> Self {
        Self {
            success: false,
            transaction: None,
            error: Some(error),
            dry_run_details: outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(
        origin_success: bool,
        destination_success: bool,
        origin_error: Option<&str>,
        destination_error: Option<&str>,
    ) -> DryRunOutcome {
        DryRunOutcome {
            origin_success,
            destination_success,
            origin_error: origin_error.map(str::to_string),
            destination_error: destination_error.map(str::to_string),
        }
    }

    #[test]
    fn test_describe_destination_failure() {
        let o = outcome(true, false, None, Some("Filtered"));
        assert!(!o.is_success());
        let msg = o.describe_failure();
        assert!(msg.contains("Destination chain error: Filtered"));
        assert!(!msg.contains("Origin chain error"));
    }

    #[test]
    fn test_describe_origin_failure_skips_unreached_destination() {
        let o = outcome(false, false, Some("BadOrigin"), None);
        let msg = o.describe_failure();
        assert!(msg.contains("Origin chain error: BadOrigin"));
        assert!(!msg.contains("Destination"));
    }

    #[test]
    fn test_describe_both_legs() {
        let o = outcome(false, false, Some("NotHoldingFees"), Some("Barrier"));
        let msg = o.describe_failure();
        assert!(msg.contains("Origin chain error: NotHoldingFees"));
        assert!(msg.contains("Destination chain error: Barrier"));
    }

    #[test]
    fn test_outcome_shape() {
        let o = outcome(true, false, None, Some("Filtered"));
        let value = serde_json::to_value(&o).unwrap();
        assert_eq!(value["originSuccess"], true);
        assert_eq!(value["destinationError"], "Filtered");
        assert!(value.get("originError").is_none());
    }
}
