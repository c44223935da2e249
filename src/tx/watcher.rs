//! Submission and finality tracking
//!
//! A watch starts in [`WatchState::Submitted`] and settles in exactly one
//! terminal state. Once it settles no further lifecycle event is read and the
//! subscription is released.

use super::Tx;
use crate::chain::{ChainHandle, Signer};
use crate::error::XchainResult;
use crate::events::{format_hash, EventStream, LifecycleEvent};
use crate::metrics;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    Submitted,
    FinalizedSuccess,
    FinalizedFailure,
    TransportError,
}

impl WatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchState::Submitted => "submitted",
            WatchState::FinalizedSuccess => "finalized_success",
            WatchState::FinalizedFailure => "finalized_failure",
            WatchState::TransportError => "transport_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchState::Submitted)
    }
}

/// Caller facing outcome of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub state: WatchState,
}

impl TxResult {
    fn finalized_success(tx_hash: &[u8; 32]) -> Self {
        Self {
            success: true,
            transaction_hash: Some(format_hash(tx_hash)),
            error: None,
            state: WatchState::FinalizedSuccess,
        }
    }

    fn finalized_failure(tx_hash: &[u8; 32], code: String) -> Self {
        Self {
            success: false,
            transaction_hash: Some(format_hash(tx_hash)),
            error: Some(code),
            state: WatchState::FinalizedFailure,
        }
    }

    /// The transaction may still have landed; no hash is known for certain
    fn transport_error(reason: String) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            error: Some(reason),
            state: WatchState::TransportError,
        }
    }
}

/// Lifecycle subscription held for the duration of one watch
struct Subscription {
    stream: EventStream,
    chain: String,
}

impl Subscription {
    fn open(stream: EventStream, chain: &str) -> Self {
        metrics::record_subscription_opened();
        debug!(chain = chain, "Lifecycle subscription opened");
        Self {
            stream,
            chain: chain.to_string(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        metrics::record_subscription_released();
        debug!(chain = %self.chain, "Lifecycle subscription released");
    }
}

/// Submits transactions and waits for their finality
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionWatcher;

impl TransactionWatcher {
    pub fn new() -> Self {
        Self
    }

    /// Submit `tx` through `chain` and resolve on its first terminal event.
    ///
    /// Only a transaction built for a different chain is an `Err`; every
    /// outcome after that point, transport failures included, is a `TxResult`.
    pub async fn submit_and_watch<H: ChainHandle + ?Sized>(
        &self,
        chain: &H,
        tx: &Tx,
        signer: &(dyn Signer + 'static),
    ) -> XchainResult<TxResult> {
        tx.ensure_chain(chain.info())?;
        let chain_name = chain.info().name.as_str();

        info!(
            chain = chain_name,
            endpoint = chain.endpoint(),
            call = %tx.call().name(),
            account = signer.account_id(),
            "Submitting transaction"
        );

        let result = match chain.submit(tx, signer).await {
            Ok(stream) => {
                let mut subscription = Subscription::open(stream, chain_name);
                watch(&mut subscription).await
            }
            Err(e) => TxResult::transport_error(e.to_string()),
        };

        metrics::record_tx_outcome(chain_name, result.state.as_str());
        match result.state {
            WatchState::FinalizedSuccess => info!(
                chain = chain_name,
                tx_hash = ?result.transaction_hash,
                "Transaction finalized"
            ),
            WatchState::FinalizedFailure => warn!(
                chain = chain_name,
                tx_hash = ?result.transaction_hash,
                error = ?result.error,
                "Transaction finalized with dispatch error"
            ),
            _ => error!(
                chain = chain_name,
                error = ?result.error,
                "Lost track of transaction before finality"
            ),
        }

        Ok(result)
    }
}

async fn watch(subscription: &mut Subscription) -> TxResult {
    loop {
        let event = match subscription.stream.next().await {
            Some(Ok(event)) => event,
            Some(Err(e)) => return TxResult::transport_error(e.to_string()),
            None => {
                return TxResult::transport_error(
                    "event stream closed before finality".to_string(),
                )
            }
        };

        debug!(chain = %subscription.chain, event = event.name(), "Lifecycle event");

        match event {
            LifecycleEvent::Finalized {
                tx_hash,
                dispatch_error: Some(dispatch_error),
                ..
            } => return TxResult::finalized_failure(&tx_hash, dispatch_error.kind),
            LifecycleEvent::Finalized { tx_hash, .. } => {
                return TxResult::finalized_success(&tx_hash)
            }
            LifecycleEvent::Invalid { reason } => {
                return TxResult::transport_error(format!("transaction invalid: {}", reason))
            }
            LifecycleEvent::Dropped { reason } => {
                return TxResult::transport_error(format!("transaction dropped: {}", reason))
            }
            // Progress only, the watch stays in `Submitted`
            LifecycleEvent::Validated { .. }
            | LifecycleEvent::Broadcast { .. }
            | LifecycleEvent::InBlock { .. } => {}
        }
    }
}
