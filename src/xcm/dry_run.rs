//! Two-leg dry run that gates cross-chain transfers
//!
//! A transfer is only built once the origin chain accepts the call and the
//! destination chain accepts the message it forwards.

use super::location::transfer_call;
use super::{
    AssetId, AssetMetadata, DryRunOutcome, TransferRequest, ValidatedTransfer, XcmTransferResult,
};
use crate::chain::{ChainHandle, ClientError, OriginKind, StoragePath};
use crate::error::{XchainError, XchainResult};
use crate::metrics;
use crate::tx::amount::parse_units;
use crate::tx::{Call, Tx};

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

const NOTHING_FORWARDED: &str = "no message forwarded to destination";

/// Value stored under `Assets.Metadata[id]`
#[derive(Debug, Deserialize)]
struct AssetsMetadata {
    symbol: String,
    decimals: u8,
}

/// Gates cross-chain transfers behind a simulation on both chains
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunValidator;

impl DryRunValidator {
    pub fn new() -> Self {
        Self
    }

    /// Symbol and decimals of `asset` on `chain`
    pub async fn resolve_asset<H: ChainHandle + ?Sized>(
        &self,
        chain: &H,
        asset: AssetId,
    ) -> XchainResult<AssetMetadata> {
        let lookup_failed = |source| XchainError::AssetLookup {
            chain: chain.info().name.clone(),
            source,
        };

        match asset {
            AssetId::Native => {
                let properties = chain.properties().await.map_err(lookup_failed)?;
                Ok(AssetMetadata {
                    symbol: properties.token_symbol,
                    decimals: properties.token_decimals,
                })
            }
            AssetId::Fungible(id) => {
                let path = StoragePath::new("Assets", "Metadata");
                let entries = chain
                    .query_state(&path, &[json!(id)])
                    .await
                    .map_err(lookup_failed)?;
                let entry = entries.into_iter().next().ok_or_else(|| {
                    XchainError::InvalidTransfer(format!(
                        "asset {} is not registered on {}",
                        id,
                        chain.info().name
                    ))
                })?;
                let metadata: AssetsMetadata = serde_json::from_value(entry.value).map_err(|e| {
                    lookup_failed(ClientError::Decode(format!("asset {}: {}", id, e)))
                })?;
                Ok(AssetMetadata {
                    symbol: metadata.symbol,
                    decimals: metadata.decimals,
                })
            }
        }
    }

    /// Simulate a transfer on both chains without building a transaction
    pub async fn simulate_transfer<O, D>(
        &self,
        origin: &O,
        destination: &D,
        request: &TransferRequest,
    ) -> XchainResult<DryRunOutcome>
    where
        O: ChainHandle + ?Sized,
        D: ChainHandle + ?Sized,
    {
        let (_, _, call) = self.prepare(origin, destination, request).await?;
        self.run_legs(origin, destination, &call, &request.sender).await
    }

    /// Simulate a transfer and, only if both legs succeed, return the
    /// transaction to sign. A rejected dry run fails with `DryRunRejected`.
    pub async fn validate_transfer<O, D>(
        &self,
        origin: &O,
        destination: &D,
        request: &TransferRequest,
    ) -> XchainResult<ValidatedTransfer>
    where
        O: ChainHandle + ?Sized,
        D: ChainHandle + ?Sized,
    {
        let (asset, units, call) = self.prepare(origin, destination, request).await?;

        let outcome = match self.run_legs(origin, destination, &call, &request.sender).await {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::record_dry_run("error");
                return Err(e);
            }
        };

        if !outcome.is_success() {
            metrics::record_dry_run("rejected");
            warn!(
                origin = %origin.info().name,
                destination = %destination.info().name,
                reason = %outcome.describe_failure(),
                "Transfer rejected by dry run"
            );
            return Err(XchainError::DryRunRejected { outcome });
        }

        metrics::record_dry_run("accepted");
        info!(
            origin = %origin.info().name,
            destination = %destination.info().name,
            call = %call.name(),
            units = %units,
            symbol = %asset.symbol,
            "Transfer passed dry run"
        );

        Ok(ValidatedTransfer {
            tx: Tx::new(origin.info().clone(), call),
            outcome,
            asset,
            units,
        })
    }

    /// Caller facing transfer: rejections and transport failures come back
    /// as an unsuccessful result, configuration errors as `Err`.
    pub async fn xcm_transfer<O, D>(
        &self,
        origin: &O,
        destination: &D,
        request: &TransferRequest,
    ) -> XchainResult<XcmTransferResult>
    where
        O: ChainHandle + ?Sized,
        D: ChainHandle + ?Sized,
    {
        match self.validate_transfer(origin, destination, request).await {
            Ok(validated) => Ok(XcmTransferResult::accepted(validated)),
            Err(XchainError::DryRunRejected { outcome }) => Ok(XcmTransferResult::rejected(
                outcome.describe_failure(),
                Some(outcome),
            )),
            Err(e) if e.is_config_error() => Err(e),
            Err(e) => Ok(XcmTransferResult::rejected(e.to_string(), None)),
        }
    }

    async fn prepare<O, D>(
        &self,
        origin: &O,
        destination: &D,
        request: &TransferRequest,
    ) -> XchainResult<(AssetMetadata, u128, Call)>
    where
        O: ChainHandle + ?Sized,
        D: ChainHandle + ?Sized,
    {
        if request.sender.trim().is_empty() {
            return Err(XchainError::InvalidTransfer("sender must not be empty".to_string()));
        }
        if request.recipient.trim().is_empty() {
            return Err(XchainError::InvalidTransfer(
                "recipient must not be empty".to_string(),
            ));
        }
        if origin.info().name == destination.info().name {
            return Err(XchainError::InvalidTransfer(format!(
                "origin and destination are both {}",
                origin.info().name
            )));
        }

        let asset = self.resolve_asset(origin, request.asset).await?;
        let units = parse_units(&request.amount, asset.decimals)?;
        let call = transfer_call(
            origin.info(),
            destination.info(),
            &request.recipient,
            request.asset,
            units,
        )?;
        Ok((asset, units, call))
    }

    async fn run_legs<O, D>(
        &self,
        origin: &O,
        destination: &D,
        call: &Call,
        sender: &str,
    ) -> XchainResult<DryRunOutcome>
    where
        O: ChainHandle + ?Sized,
        D: ChainHandle + ?Sized,
    {
        let signed = OriginKind::Signed {
            account: sender.to_string(),
        };
        let origin_report = origin
            .simulate(call, &signed)
            .await
            .map_err(|source| XchainError::Simulation {
                leg: "origin",
                source,
            })?;
        debug!(
            chain = %origin.info().name,
            success = origin_report.success,
            "Origin leg simulated"
        );

        if !origin_report.success {
            return Ok(DryRunOutcome {
                origin_success: false,
                destination_success: false,
                origin_error: Some(
                    origin_report
                        .failure_reason
                        .unwrap_or_else(|| "unknown".to_string()),
                ),
                destination_error: None,
            });
        }

        let forwarded = match origin_report.forwarded {
            Some(message) => message,
            None => {
                return Ok(DryRunOutcome {
                    origin_success: true,
                    destination_success: false,
                    origin_error: None,
                    destination_error: Some(NOTHING_FORWARDED.to_string()),
                })
            }
        };

        let xcm = OriginKind::Xcm {
            from: origin.info().clone(),
        };
        let destination_report = destination
            .simulate(&forwarded, &xcm)
            .await
            .map_err(|source| XchainError::Simulation {
                leg: "destination",
                source,
            })?;
        debug!(
            chain = %destination.info().name,
            success = destination_report.success,
            "Destination leg simulated"
        );

        let destination_error = if destination_report.success {
            None
        } else {
            Some(
                destination_report
                    .failure_reason
                    .unwrap_or_else(|| "unknown".to_string()),
            )
        };

        Ok(DryRunOutcome {
            origin_success: true,
            destination_success: destination_report.success,
            origin_error: None,
            destination_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{
        ChainInfo, ChainKind, ChainProperties, MockChainHandle, SimulationReport, StorageEntry,
    };

    fn forwarded_message() -> Call {
        Call::new("ParachainSystem", "receive_downward", json!({ "message": "0x0410" }))
    }

    fn relay_origin(report: Result<SimulationReport, ClientError>) -> MockChainHandle {
        let mut handle = MockChainHandle::new();
        handle.expect_info().return_const(ChainInfo::relay("polkadot"));
        handle.expect_properties().returning(|| {
            Ok(ChainProperties {
                token_symbol: "DOT".to_string(),
                token_decimals: 10,
                ss58_format: Some(0),
            })
        });
        handle
            .expect_simulate()
            .withf(|call, origin| {
                call.pallet == "XcmPallet"
                    && matches!(origin, OriginKind::Signed { account } if account == "alice")
            })
            .times(1)
            .returning(move |_, _| report.clone());
        handle
    }

    fn hub_destination() -> MockChainHandle {
        let mut handle = MockChainHandle::new();
        handle
            .expect_info()
            .return_const(ChainInfo::parachain("polkadot_asset_hub", ChainKind::AssetHub, 1000));
        handle
    }

    fn request(amount: &str) -> TransferRequest {
        TransferRequest {
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            asset: AssetId::Native,
            amount: amount.to_string(),
        }
    }

    #[tokio::test]
    async fn test_both_legs_pass_builds_transaction() {
        let origin = relay_origin(Ok(SimulationReport::succeeded(Some(forwarded_message()))));
        let mut destination = hub_destination();
        destination
            .expect_simulate()
            .withf(|call, origin| {
                call.method == "receive_downward"
                    && matches!(origin, OriginKind::Xcm { from } if from.name == "polkadot")
            })
            .times(1)
            .returning(|_, _| Ok(SimulationReport::succeeded(None)));

        let validated = DryRunValidator::new()
            .validate_transfer(&origin, &destination, &request("1.5"))
            .await
            .unwrap();

        assert!(validated.outcome.is_success());
        assert_eq!(validated.units, 15_000_000_000);
        assert_eq!(validated.asset.symbol, "DOT");
        assert_eq!(validated.tx.chain().name, "polkadot");
        assert_eq!(validated.tx.call().name(), "XcmPallet.limited_teleport_assets");
    }

    #[tokio::test]
    async fn test_destination_filtered_builds_nothing() {
        let origin = relay_origin(Ok(SimulationReport::succeeded(Some(forwarded_message()))));
        let mut destination = hub_destination();
        destination
            .expect_simulate()
            .times(1)
            .returning(|_, _| Ok(SimulationReport::failed("Filtered")));

        let result = DryRunValidator::new()
            .xcm_transfer(&origin, &destination, &request("1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.transaction.is_none());
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("Destination chain error: Filtered"));
        let details = result.dry_run_details.unwrap();
        assert!(details.origin_success);
        assert!(!details.destination_success);
    }

    #[tokio::test]
    async fn test_origin_failure_skips_destination() {
        let origin = relay_origin(Ok(SimulationReport::failed("Token(FundsUnavailable)")));
        // No simulate expectation: any destination call panics
        let destination = hub_destination();

        let err = DryRunValidator::new()
            .validate_transfer(&origin, &destination, &request("1"))
            .await
            .unwrap_err();

        match err {
            XchainError::DryRunRejected { outcome } => {
                assert!(!outcome.origin_success);
                assert!(!outcome.destination_success);
                assert_eq!(outcome.destination_error, None);
                assert!(outcome
                    .describe_failure()
                    .contains("Origin chain error: Token(FundsUnavailable)"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_forwarded_message_fails_destination() {
        let origin = relay_origin(Ok(SimulationReport::succeeded(None)));
        let destination = hub_destination();

        let outcome = DryRunValidator::new()
            .simulate_transfer(&origin, &destination, &request("1"))
            .await
            .unwrap();

        assert!(outcome.origin_success);
        assert!(!outcome.destination_success);
        assert_eq!(outcome.destination_error.as_deref(), Some(NOTHING_FORWARDED));
    }

    #[tokio::test]
    async fn test_bad_amount_is_never_simulated() {
        let mut origin = MockChainHandle::new();
        origin.expect_info().return_const(ChainInfo::relay("polkadot"));
        origin.expect_properties().returning(|| {
            Ok(ChainProperties {
                token_symbol: "DOT".to_string(),
                token_decimals: 10,
                ss58_format: Some(0),
            })
        });
        origin.expect_simulate().never();
        let destination = hub_destination();

        let err = DryRunValidator::new()
            .xcm_transfer(&origin, &destination, &request("-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, XchainError::InvalidAmount { .. }));

        let err = DryRunValidator::new()
            .xcm_transfer(&origin, &destination, &request("0.00000000001"))
            .await
            .unwrap_err();
        assert!(matches!(err, XchainError::InvalidAmount { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_recovered_into_result() {
        let origin = relay_origin(Err(ClientError::Simulation("runtime api missing".to_string())));
        let destination = hub_destination();

        let result = DryRunValidator::new()
            .xcm_transfer(&origin, &destination, &request("1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.dry_run_details.is_none());
        assert!(result.error.unwrap().contains("origin chain"));
    }

    #[tokio::test]
    async fn test_same_chain_rejected() {
        let mut origin = MockChainHandle::new();
        origin.expect_info().return_const(ChainInfo::relay("polkadot"));
        let mut destination = MockChainHandle::new();
        destination.expect_info().return_const(ChainInfo::relay("polkadot"));

        let err = DryRunValidator::new()
            .simulate_transfer(&origin, &destination, &request("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, XchainError::InvalidTransfer(_)));
    }

    #[tokio::test]
    async fn test_fungible_asset_metadata() {
        let mut hub = MockChainHandle::new();
        hub.expect_info()
            .return_const(ChainInfo::parachain("polkadot_asset_hub", ChainKind::AssetHub, 1000));
        hub.expect_query_state()
            .withf(|path, keys| {
                path.to_string() == "Assets.Metadata" && keys.len() == 1 && keys[0] == json!(1984)
            })
            .times(1)
            .returning(|_, keys| {
                Ok(vec![StorageEntry {
                    key: keys.to_vec(),
                    value: json!({
                        "deposit": "0",
                        "name": "Tether USD",
                        "symbol": "USDt",
                        "decimals": 6,
                        "is_frozen": false
                    }),
                }])
            });

        let metadata = DryRunValidator::new()
            .resolve_asset(&hub, AssetId::Fungible(1984))
            .await
            .unwrap();
        assert_eq!(metadata.symbol, "USDt");
        assert_eq!(metadata.decimals, 6);
    }
}
