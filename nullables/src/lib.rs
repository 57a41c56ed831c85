//! Nullable collaborators for deterministic testing.
//!
//! Every external dependency of the token graph (validator, ledger RPC,
//! document store, spend index, notifier) is abstracted behind a trait in
//! `slpdb-store`. This crate provides in-memory implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! [`NullLedger`] wires the validator, raw source and spend index together so
//! a test can describe a chain of transactions once.

pub mod ledger;
pub mod notifier;
pub mod rpc;
pub mod spend;
pub mod storage;
pub mod validator;

pub use ledger::NullLedger;
pub use notifier::NullNotifier;
pub use rpc::NullRawSource;
pub use spend::NullSpendIndex;
pub use storage::NullGraphStorage;
pub use validator::NullValidator;
