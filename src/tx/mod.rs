//! Transaction construction, submission and finality tracking

pub mod amount;
mod call;
pub mod staking;
mod watcher;

pub use amount::{format_units, parse_units};
pub use call::{build_native_transfer, Call, Tx};
pub use watcher::{TransactionWatcher, TxResult, WatchState};
