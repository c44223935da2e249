//! xchain-core - resilient multi-chain connectivity for Polkadot style networks
//!
//! Connects to relay chains, parachains and asset hubs through a pluggable
//! chain client, failing over between RPC endpoints. On top of a connection it
//! selects nomination pools, gates cross-chain transfers behind a dry run on
//! both chains, and watches submitted transactions until finality.

pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod tx;
pub mod xcm;

pub use chain::{
    ChainConnector, ChainHandle, ChainInfo, ChainKind, ChainManager, EndpointConnector,
    PoolSelector,
};
pub use config::Settings;
pub use error::{XchainError, XchainResult};
pub use tx::{TransactionWatcher, Tx, TxResult};
pub use xcm::{DryRunValidator, XcmTransferResult};
