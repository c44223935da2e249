//! XCM location and transfer call construction

use super::AssetId;
use crate::chain::{ChainInfo, ChainKind};
use crate::error::{XchainError, XchainResult};
use crate::tx::Call;

use serde_json::{json, Value};

/// `pallet_assets` instance on asset hub chains
const ASSETS_PALLET_INSTANCE: u8 = 50;

/// Pallet exposing the XCM extrinsics on `chain`
pub(crate) fn xcm_pallet(chain: &ChainInfo) -> &'static str {
    match chain.kind {
        ChainKind::Relay => "XcmPallet",
        ChainKind::Parachain | ChainKind::AssetHub => "PolkadotXcm",
    }
}

/// System chains teleport between each other; everything else goes through a reserve
pub(crate) fn transfer_method(origin: &ChainInfo, destination: &ChainInfo) -> &'static str {
    if origin.kind.is_system() && destination.kind.is_system() {
        "limited_teleport_assets"
    } else {
        "limited_reserve_transfer_assets"
    }
}

/// Location of `destination` as seen from `origin`
pub(crate) fn destination_location(
    origin: &ChainInfo,
    destination: &ChainInfo,
) -> XchainResult<Value> {
    let parents = match origin.kind {
        ChainKind::Relay => 0,
        ChainKind::Parachain | ChainKind::AssetHub => 1,
    };

    match destination.kind {
        ChainKind::Relay => {
            if parents == 0 {
                return Err(XchainError::InvalidTransfer(format!(
                    "relay chain {} cannot send to relay chain {}",
                    origin.name, destination.name
                )));
            }
            Ok(json!({ "parents": parents, "interior": "Here" }))
        }
        ChainKind::Parachain | ChainKind::AssetHub => {
            let para_id = destination.para_id.ok_or_else(|| {
                XchainError::InvalidTransfer(format!(
                    "destination {} has no para_id",
                    destination.name
                ))
            })?;
            Ok(json!({
                "parents": parents,
                "interior": { "X1": [{ "Parachain": para_id }] }
            }))
        }
    }
}

fn beneficiary_location(recipient: &str) -> Value {
    json!({
        "parents": 0,
        "interior": { "X1": [{ "AccountId32": { "network": null, "id": recipient } }] }
    })
}

/// Location of the transferred asset relative to `origin`
pub(crate) fn asset_location(origin: &ChainInfo, asset: AssetId) -> XchainResult<Value> {
    match (asset, origin.kind) {
        // The native token of an asset hub is the relay chain's token
        (AssetId::Native, ChainKind::AssetHub) => Ok(json!({ "parents": 1, "interior": "Here" })),
        (AssetId::Native, _) => Ok(json!({ "parents": 0, "interior": "Here" })),
        (AssetId::Fungible(id), ChainKind::AssetHub) => Ok(json!({
            "parents": 0,
            "interior": { "X2": [
                { "PalletInstance": ASSETS_PALLET_INSTANCE },
                { "GeneralIndex": id }
            ] }
        })),
        (AssetId::Fungible(id), kind) => Err(XchainError::InvalidTransfer(format!(
            "asset {} cannot be sent from a {} chain",
            id, kind
        ))),
    }
}

/// Build the XCM transfer call dispatched on `origin`
pub(crate) fn transfer_call(
    origin: &ChainInfo,
    destination: &ChainInfo,
    recipient: &str,
    asset: AssetId,
    units: u128,
) -> XchainResult<Call> {
    let dest = destination_location(origin, destination)?;
    let asset_id = asset_location(origin, asset)?;

    Ok(Call::new(
        xcm_pallet(origin),
        transfer_method(origin, destination),
        json!({
            "dest": { "V4": dest },
            "beneficiary": { "V4": beneficiary_location(recipient) },
            "assets": { "V4": [{ "id": asset_id, "fun": { "Fungible": units.to_string() } }] },
            "fee_asset_item": 0,
            "weight_limit": "Unlimited"
        }),
    ))
}
