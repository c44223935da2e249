//! Nomination pool staking transactions

use super::call::{native_units, Call, Tx};
use crate::chain::{ChainHandle, PoolSelector};
use crate::error::{XchainError, XchainResult};

use serde_json::json;
use tracing::info;

const POOLS_PALLET: &str = "NominationPools";

fn pool_tx<H: ChainHandle + ?Sized>(chain: &H, method: &str, args: serde_json::Value) -> Tx {
    Tx::new(chain.info().clone(), Call::new(POOLS_PALLET, method, args))
}

fn require_member(member: &str) -> XchainResult<()> {
    if member.trim().is_empty() {
        return Err(XchainError::InvalidTransfer(
            "member account must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Join `pool_id`, or the pool with the most points when none is given
pub async fn join_pool<H: ChainHandle + ?Sized>(
    chain: &H,
    amount: &str,
    pool_id: Option<u32>,
) -> XchainResult<Tx> {
    let value = native_units(chain, amount).await?;

    let pool_id = match pool_id {
        Some(id) => id,
        None => PoolSelector::new()
            .find_best_pool(chain)
            .await?
            .ok_or_else(|| XchainError::NoPoolAvailable {
                chain: chain.info().name.clone(),
            })?,
    };

    info!(chain = %chain.info().name, pool_id = pool_id, value = %value, "Built pool join");
    Ok(pool_tx(
        chain,
        "join",
        json!({ "amount": value.to_string(), "pool_id": pool_id }),
    ))
}

/// Bond more free balance into the caller's current pool
pub async fn bond_extra<H: ChainHandle + ?Sized>(chain: &H, amount: &str) -> XchainResult<Tx> {
    let value = native_units(chain, amount).await?;
    Ok(pool_tx(
        chain,
        "bond_extra",
        json!({ "extra": { "FreeBalance": value.to_string() } }),
    ))
}

/// Start unbonding `amount` worth of points for `member`
pub async fn unbond<H: ChainHandle + ?Sized>(
    chain: &H,
    member: &str,
    amount: &str,
) -> XchainResult<Tx> {
    require_member(member)?;
    let points = native_units(chain, amount).await?;
    Ok(pool_tx(
        chain,
        "unbond",
        json!({ "member_account": { "Id": member }, "unbonding_points": points.to_string() }),
    ))
}

/// Withdraw funds whose unbonding period has elapsed
pub fn withdraw_unbonded<H: ChainHandle + ?Sized>(
    chain: &H,
    member: &str,
    slashing_spans: u32,
) -> XchainResult<Tx> {
    require_member(member)?;
    Ok(pool_tx(
        chain,
        "withdraw_unbonded",
        json!({ "member_account": { "Id": member }, "num_slashing_spans": slashing_spans }),
    ))
}

pub fn claim_payout<H: ChainHandle + ?Sized>(chain: &H) -> Tx {
    pool_tx(chain, "claim_payout", json!({}))
}
