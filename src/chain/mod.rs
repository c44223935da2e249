//! Chain module - handles multi-chain connections and pool discovery
//!
//! This module provides:
//! - The chain client contract every concrete client implements
//! - Round-robin endpoint failover with per-attempt timeouts
//! - Nomination pool enumeration and selection
//! - A registry of connected chains keyed by name

mod client;
mod connector;
mod pools;

#[cfg(test)]
pub use client::MockChainHandle;
pub use client::{
    ChainConnector, ChainHandle, ChainInfo, ChainKind, ChainOptions, ChainProperties, ClientError,
    OriginKind, Signer, SimulationReport, StorageEntry, StoragePath,
};
pub use connector::{
    AttemptOutcome, Connection, ConnectionAttempt, EndpointConnector, EndpointSet,
    RoundRobinCursor,
};
pub use pools::{select_best, PoolInfo, PoolRoles, PoolSelector, PoolState};

use crate::config::Settings;
use crate::error::{XchainError, XchainResult};

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Connected chains indexed by chain name.
///
/// An optional convenience for long running services that share handles
/// across tasks. Call paths that own their connection use
/// [`EndpointConnector::connect`] directly and keep the handle to themselves.
pub struct ChainManager<H> {
    handles: DashMap<String, Arc<H>>,
}

impl<H: ChainHandle> Default for ChainManager<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ChainHandle> ChainManager<H> {
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
        }
    }

    /// Connect every enabled chain in key order, failing on the first chain
    /// that cannot be reached
    pub async fn connect_all<C>(settings: &Settings, connector: &C) -> XchainResult<Self>
    where
        C: ChainConnector<Handle = H>,
    {
        let endpoint_connector = EndpointConnector::new(settings.connector)?;
        let manager = Self::new();

        for (key, chain_config) in settings.enabled_chains() {
            info!(
                chain = %chain_config.name,
                kind = %chain_config.kind,
                endpoints = chain_config.endpoints.len(),
                "Initializing chain {}",
                key
            );

            let connection = endpoint_connector
                .connect_configured(connector, chain_config)
                .await?;
            info!(
                chain = %chain_config.name,
                endpoint = %connection.chosen_endpoint,
                attempts = connection.attempts.len(),
                "Chain initialized successfully"
            );
            manager.insert(connection.into_handle());
        }

        Ok(manager)
    }

    /// Register a handle under its chain name, replacing any previous one
    pub fn insert(&self, handle: H) -> Arc<H> {
        let handle = Arc::new(handle);
        self.handles
            .insert(handle.info().name.clone(), handle.clone());
        handle
    }

    /// Get the handle for a specific chain
    pub fn get(&self, name: &str) -> XchainResult<Arc<H>> {
        self.handles
            .get(name)
            .map(|h| h.clone())
            .ok_or_else(|| XchainError::ChainNotFound {
                chain: name.to_string(),
            })
    }

    /// Drop a chain's handle, e.g. before reconnecting it
    pub fn remove(&self, name: &str) -> Option<Arc<H>> {
        self.handles.remove(name).map(|(_, h)| h)
    }

    /// Names of all connected chains, sorted
    pub fn connected_chains(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
