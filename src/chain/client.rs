//! Chain client contract
//!
//! The core never talks to a node directly. Everything chain specific (wire
//! protocol, runtime metadata, signing) lives behind [`ChainConnector`] and
//! [`ChainHandle`], which a concrete client implements once per transport.
//! Relay chains, parachains and asset hubs are all served by the same handle
//! type and told apart by [`ChainKind`].

use crate::events::EventStream;
use crate::tx::{Call, Tx};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Failures reported by the chain client collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("state query failed: {0}")]
    Query(String),

    #[error("failed to decode chain value: {0}")]
    Decode(String),

    #[error("simulation unavailable: {0}")]
    Simulation(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("event stream failed: {0}")]
    Stream(String),
}

/// Kind of network a handle is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Relay,
    Parachain,
    AssetHub,
}

impl ChainKind {
    /// Relay chain and system parachains trust each other for teleports
    pub fn is_system(&self) -> bool {
        matches!(self, ChainKind::Relay | ChainKind::AssetHub)
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainKind::Relay => "relay",
            ChainKind::Parachain => "parachain",
            ChainKind::AssetHub => "asset_hub",
        };
        f.write_str(name)
    }
}

/// Identity of one logical chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub name: String,
    pub kind: ChainKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub para_id: Option<u32>,
}

impl ChainInfo {
    pub fn relay(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChainKind::Relay,
            para_id: None,
        }
    }

    pub fn parachain(name: impl Into<String>, kind: ChainKind, para_id: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            para_id: Some(para_id),
        }
    }
}

/// Options forwarded untouched to [`ChainConnector::connect`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOptions {
    pub chain: ChainInfo,
    /// Client specific parameters (descriptors, light client flags, ...)
    pub params: Map<String, Value>,
}

impl ChainOptions {
    pub fn new(chain: ChainInfo) -> Self {
        Self {
            chain,
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Token properties advertised by a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProperties {
    pub token_symbol: String,
    pub token_decimals: u8,
    #[serde(default)]
    pub ss58_format: Option<u16>,
}

/// Storage item address, e.g. `NominationPools.BondedPools`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    pub pallet: String,
    pub item: String,
}

impl StoragePath {
    pub fn new(pallet: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            pallet: pallet.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pallet, self.item)
    }
}

/// One decoded storage entry. `key` holds the map keys in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub key: Vec<Value>,
    pub value: Value,
}

/// Origin a simulated call is dispatched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginKind {
    /// Signed by a local account
    Signed { account: String },
    /// Arriving as a cross-chain message from another chain
    Xcm { from: ChainInfo },
}

/// Result of simulating one leg of a transfer
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub success: bool,
    pub failure_reason: Option<String>,
    /// Message the simulated call would send to the next chain
    pub forwarded: Option<Call>,
}

impl SimulationReport {
    pub fn succeeded(forwarded: Option<Call>) -> Self {
        Self {
            success: true,
            failure_reason: None,
            forwarded,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason.into()),
            forwarded: None,
        }
    }
}

/// Opaque signing capability. Key material never crosses into the core.
pub trait Signer: Send + Sync {
    /// Account the signer signs for, in the chain's address format
    fn account_id(&self) -> &str;
}

/// Establishes connections to a single endpoint
#[async_trait]
pub trait ChainConnector: Send + Sync {
    type Handle: ChainHandle;

    async fn connect(
        &self,
        endpoint: &str,
        options: &ChainOptions,
    ) -> Result<Self::Handle, ClientError>;
}

/// Connection scoped capability over one chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainHandle: Send + Sync {
    /// Chain this handle is bound to
    fn info(&self) -> &ChainInfo;

    /// Endpoint the connection was established through
    fn endpoint(&self) -> &str;

    /// Native token properties
    async fn properties(&self) -> Result<ChainProperties, ClientError>;

    /// Read storage. An empty key list enumerates every entry of a map.
    async fn query_state(
        &self,
        path: &StoragePath,
        keys: &[Value],
    ) -> Result<Vec<StorageEntry>, ClientError>;

    /// Dry-run `call` as if dispatched from `origin`
    async fn simulate(
        &self,
        call: &Call,
        origin: &OriginKind,
    ) -> Result<SimulationReport, ClientError>;

    /// Sign, submit and subscribe to the lifecycle of `tx`
    ///
    /// The signer type must be `'static`; it is only borrowed for the call.
    async fn submit(
        &self,
        tx: &Tx,
        signer: &(dyn Signer + 'static),
    ) -> Result<EventStream, ClientError>;
}
