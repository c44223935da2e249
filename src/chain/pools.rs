//! Nomination pool enumeration and selection

use super::client::{ChainHandle, ClientError, StorageEntry, StoragePath};
use crate::error::{XchainError, XchainResult};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

const POOLS_PALLET: &str = "NominationPools";
const BONDED_POOLS: &str = "BondedPools";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    Open,
    Blocked,
    Destroying,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRoles {
    pub depositor: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub nominator: Option<String>,
    #[serde(default)]
    pub bouncer: Option<String>,
}

/// Caller facing view of a bonded pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub id: u32,
    pub state: PoolState,
    #[serde(serialize_with = "points_as_string")]
    pub points: u128,
    pub member_counter: u32,
    pub roles: PoolRoles,
}

/// Value stored under `NominationPools.BondedPools[id]`
#[derive(Debug, Deserialize)]
struct BondedPool {
    #[serde(deserialize_with = "lenient_u128")]
    points: u128,
    state: PoolState,
    member_counter: u32,
    roles: PoolRoles,
}

fn points_as_string<S: Serializer>(points: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&points.to_string())
}

/// Balances arrive either as JSON numbers or as decimal strings
fn lenient_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    struct BalanceVisitor;

    impl<'de> Visitor<'de> for BalanceVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u128, E> {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < u128::MAX as f64 {
                Ok(v as u128)
            } else {
                Err(E::custom("points must be an integer or decimal string"))
            }
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(v as u128)
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom("balance must not be negative"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim().parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(BalanceVisitor)
}

fn decode_pool(entry: &StorageEntry) -> Result<PoolInfo, ClientError> {
    let id = entry
        .key
        .first()
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| ClientError::Decode(format!("invalid pool key {:?}", entry.key)))?;

    let pool: BondedPool = serde_json::from_value(entry.value.clone())
        .map_err(|e| ClientError::Decode(format!("pool {}: {}", id, e)))?;

    Ok(PoolInfo {
        id,
        state: pool.state,
        points: pool.points,
        member_counter: pool.member_counter,
        roles: pool.roles,
    })
}

/// Picks a nomination pool to join
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSelector;

impl PoolSelector {
    pub fn new() -> Self {
        Self
    }

    /// Fetch every bonded pool, in the order the chain enumerates them
    pub async fn list_pools<H: ChainHandle + ?Sized>(
        &self,
        chain: &H,
    ) -> XchainResult<Vec<PoolInfo>> {
        let path = StoragePath::new(POOLS_PALLET, BONDED_POOLS);
        let entries = chain
            .query_state(&path, &[])
            .await
            .map_err(XchainError::PoolQueryFailed)?;

        let pools = entries
            .iter()
            .map(decode_pool)
            .collect::<Result<Vec<_>, _>>()
            .map_err(XchainError::PoolQueryFailed)?;

        debug!(chain = %chain.info().name, count = pools.len(), "Fetched bonded pools");
        Ok(pools)
    }

    /// Id of the pool with the most points, `None` when the chain has no pools.
    ///
    /// Ties go to the pool enumerated first. The chain does not guarantee a
    /// stable enumeration order, so callers must not rely on which of several
    /// equally ranked pools wins.
    pub async fn find_best_pool<H: ChainHandle + ?Sized>(
        &self,
        chain: &H,
    ) -> XchainResult<Option<u32>> {
        let pools = match self.list_pools(chain).await {
            Ok(pools) => pools,
            Err(e) => {
                crate::metrics::record_pool_selection("failed");
                return Err(e);
            }
        };

        let best = select_best(&pools);
        match best {
            Some(id) => {
                crate::metrics::record_pool_selection("found");
                info!(chain = %chain.info().name, pool_id = id, "Selected nomination pool");
            }
            None => {
                crate::metrics::record_pool_selection("not_found");
                info!(chain = %chain.info().name, "No nomination pools found");
            }
        }
        Ok(best)
    }
}

/// First pool with strictly maximal points
pub fn select_best(pools: &[PoolInfo]) -> Option<u32> {
    let mut best: Option<&PoolInfo> = None;
    for pool in pools {
        if best.map_or(true, |b| pool.points > b.points) {
            best = Some(pool);
        }
    }
    best.map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainInfo, MockChainHandle};
    use serde_json::json;

    fn entry(id: u32, points: Value) -> StorageEntry {
        StorageEntry {
            key: vec![json!(id)],
            value: json!({
                "points": points,
                "state": "Open",
                "member_counter": 12,
                "roles": {
                    "depositor": "14ShUZUYUR35RBZW6uVVt1zXDxmSQddkeDdXf1JkMA6P721N",
                    "root": "14ShUZUYUR35RBZW6uVVt1zXDxmSQddkeDdXf1JkMA6P721N",
                    "nominator": null,
                    "bouncer": null
                },
                "commission": { "current": null }
            }),
        }
    }

    fn handle_returning(
        result: Result<Vec<StorageEntry>, ClientError>,
    ) -> MockChainHandle {
        let mut handle = MockChainHandle::new();
        handle.expect_info().return_const(ChainInfo::relay("polkadot"));
        handle
            .expect_query_state()
            .withf(|path, keys| {
                path.pallet == "NominationPools" && path.item == "BondedPools" && keys.is_empty()
            })
            .times(1)
            .returning(move |_, _| result.clone());
        handle
    }

    #[tokio::test]
    async fn test_first_maximum_wins() {
        let handle = handle_returning(Ok(vec![
            entry(1, json!(500)),
            entry(2, json!(900)),
            entry(3, json!(900)),
        ]));

        let best = PoolSelector::new().find_best_pool(&handle).await.unwrap();
        assert_eq!(best, Some(2));
    }

    #[tokio::test]
    async fn test_empty_set_is_not_found() {
        let handle = handle_returning(Ok(Vec::new()));
        let best = PoolSelector::new().find_best_pool(&handle).await.unwrap();
        assert_eq!(best, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_distinct_from_not_found() {
        let handle = handle_returning(Err(ClientError::Query("socket closed".to_string())));
        let err = PoolSelector::new().find_best_pool(&handle).await.unwrap_err();
        assert!(matches!(err, XchainError::PoolQueryFailed(ClientError::Query(_))));
    }

    #[tokio::test]
    async fn test_points_beyond_u64_as_string() {
        let handle = handle_returning(Ok(vec![
            entry(7, json!("18446744073709551616")),
            entry(8, json!(u64::MAX)),
        ]));

        let pools = PoolSelector::new().list_pools(&handle).await.unwrap();
        assert_eq!(pools[0].points, 18_446_744_073_709_551_616);
        assert_eq!(pools[0].member_counter, 12);
        assert_eq!(pools[0].roles.nominator, None);
        assert_eq!(select_best(&pools), Some(7));
    }

    #[tokio::test]
    async fn test_undecodable_record_fails_query() {
        let handle = handle_returning(Ok(vec![StorageEntry {
            key: vec![json!(1)],
            value: json!({ "points": "not a number" }),
        }]));

        let err = PoolSelector::new().list_pools(&handle).await.unwrap_err();
        assert!(matches!(err, XchainError::PoolQueryFailed(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_float_points() {
        let handle = handle_returning(Ok(vec![entry(4, json!(1e20))]));
        let pools = PoolSelector::new().list_pools(&handle).await.unwrap();
        assert_eq!(pools[0].points, 100_000_000_000_000_000_000);

        let handle = handle_returning(Ok(vec![entry(5, json!(1.5))]));
        match PoolSelector::new().list_pools(&handle).await.unwrap_err() {
            XchainError::PoolQueryFailed(ClientError::Decode(msg)) => {
                assert!(msg.contains("points must be an integer or decimal string"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_select_best_strict_maximum() {
        let roles = PoolRoles {
            depositor: "d".to_string(),
            root: None,
            nominator: None,
            bouncer: None,
        };
        let pool = |id, points| PoolInfo {
            id,
            state: PoolState::Open,
            points,
            member_counter: 1,
            roles: roles.clone(),
        };

        assert_eq!(select_best(&[]), None);
        assert_eq!(select_best(&[pool(4, 0)]), Some(4));
        assert_eq!(select_best(&[pool(1, 10), pool(2, 30), pool(3, 20)]), Some(2));
        assert_eq!(select_best(&[pool(5, u128::MAX), pool(6, u128::MAX)]), Some(5));
    }

    #[test]
    fn test_pool_info_shape() {
        let info = PoolInfo {
            id: 3,
            state: PoolState::Blocked,
            points: 42,
            member_counter: 9,
            roles: PoolRoles {
                depositor: "d".to_string(),
                root: None,
                nominator: None,
                bouncer: None,
            },
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["memberCounter"], 9);
        assert_eq!(value["points"], "42");
        assert_eq!(value["state"], "Blocked");
    }
}
