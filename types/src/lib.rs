//! Fundamental types for the SLP token graph.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! transaction ids, block hashes, raw token amounts, outpoints, parsed protocol
//! details, decoded transactions and the UTXO status enums.

pub mod amount;
pub mod block;
pub mod details;
pub mod error;
pub mod hash;
pub mod outpoint;
pub mod status;
pub mod transaction;

pub use amount::TokenAmount;
pub use block::{BlockHash, BlockRef};
pub use details::{TokenVersion, TransactionDetails, TransactionType};
pub use error::TypesError;
pub use hash::{TokenId, TxId};
pub use outpoint::Outpoint;
pub use status::{BatonUtxoStatus, OutputStatus, TokenBatonStatus, TokenUtxoStatus};
pub use transaction::{Transaction, TxOutput, Validation, MISSING_OUTPUT_ADDRESS};
