//! Chain agnostic call and transaction descriptions

use super::amount::parse_units;
use crate::chain::{ChainHandle, ChainInfo};
use crate::error::{XchainError, XchainResult};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// A runtime call addressed by pallet and method name. Arguments are given
/// in the collaborator's JSON representation and encoded by it at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub pallet: String,
    pub method: String,
    pub args: Value,
}

impl Call {
    pub fn new(pallet: impl Into<String>, method: impl Into<String>, args: Value) -> Self {
        Self {
            pallet: pallet.into(),
            method: method.into(),
            args,
        }
    }

    /// `Pallet.method`, used in logs
    pub fn name(&self) -> String {
        format!("{}.{}", self.pallet, self.method)
    }
}

/// An immutable transaction bound to the chain it was built for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    chain: ChainInfo,
    call: Call,
}

impl Tx {
    pub fn new(chain: ChainInfo, call: Call) -> Self {
        Self { chain, call }
    }

    pub fn chain(&self) -> &ChainInfo {
        &self.chain
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    /// Check the transaction targets the chain behind `handle`
    pub fn ensure_chain(&self, handle: &ChainInfo) -> XchainResult<()> {
        if self.chain.name != handle.name {
            return Err(XchainError::ChainMismatch {
                expected: self.chain.name.clone(),
                actual: handle.name.clone(),
            });
        }
        Ok(())
    }
}

/// Resolve the native token decimals of `chain` for amount conversion
pub(crate) async fn native_units<H: ChainHandle + ?Sized>(
    chain: &H,
    amount: &str,
) -> XchainResult<u128> {
    let properties = chain
        .properties()
        .await
        .map_err(|source| XchainError::AssetLookup {
            chain: chain.info().name.clone(),
            source,
        })?;
    parse_units(amount, properties.token_decimals)
}

/// Build a `Balances.transfer_keep_alive` transfer of the native token
pub async fn build_native_transfer<H: ChainHandle + ?Sized>(
    chain: &H,
    recipient: &str,
    amount: &str,
) -> XchainResult<Tx> {
    if recipient.trim().is_empty() {
        return Err(XchainError::InvalidTransfer(
            "recipient must not be empty".to_string(),
        ));
    }
    let value = native_units(chain, amount).await?;

    debug!(
        chain = %chain.info().name,
        recipient = recipient,
        value = %value,
        "Built native transfer"
    );

    Ok(Tx::new(
        chain.info().clone(),
        Call::new(
            "Balances",
            "transfer_keep_alive",
            json!({ "dest": { "Id": recipient }, "value": value.to_string() }),
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainProperties, ClientError, MockChainHandle};

    fn handle_with_decimals(decimals: u8) -> MockChainHandle {
        let mut handle = MockChainHandle::new();
        handle.expect_info().return_const(ChainInfo::relay("polkadot"));
        handle.expect_properties().returning(move || {
            Ok(ChainProperties {
                token_symbol: "DOT".to_string(),
                token_decimals: decimals,
                ss58_format: Some(0),
            })
        });
        handle
    }

    #[tokio::test]
    async fn test_native_transfer_converts_amount() {
        let handle = handle_with_decimals(10);
        let recipient = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
        let tx = build_native_transfer(&handle, recipient, "2.5").await.unwrap();

        assert_eq!(tx.chain().name, "polkadot");
        assert_eq!(tx.call().name(), "Balances.transfer_keep_alive");
        assert_eq!(tx.call().args["value"], "25000000000");
    }

    #[tokio::test]
    async fn test_native_transfer_rejects_empty_recipient() {
        let handle = handle_with_decimals(10);
        let err = build_native_transfer(&handle, " ", "1").await.unwrap_err();
        assert!(matches!(err, XchainError::InvalidTransfer(_)));
    }

    #[tokio::test]
    async fn test_native_transfer_propagates_lookup_failure() {
        let mut handle = MockChainHandle::new();
        handle.expect_info().return_const(ChainInfo::relay("polkadot"));
        handle
            .expect_properties()
            .returning(|| Err(ClientError::Query("node unreachable".to_string())));

        let err = build_native_transfer(&handle, "alice", "1").await.unwrap_err();
        assert!(matches!(err, XchainError::AssetLookup { .. }));
    }

    #[test]
    fn test_ensure_chain() {
        let tx = Tx::new(
            ChainInfo::relay("polkadot"),
            Call::new("System", "remark", json!({ "remark": "0x00" })),
        );
        assert!(tx.ensure_chain(&ChainInfo::relay("polkadot")).is_ok());
        let err = tx.ensure_chain(&ChainInfo::relay("kusama")).unwrap_err();
        assert!(err.is_config_error());
    }
}
