//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid 32-byte hex hash: {0}")]
    InvalidHash(String),

    #[error("invalid outpoint (expected txid:vout): {0}")]
    InvalidOutpoint(String),

    #[error("invalid fixed-point token amount: {0}")]
    InvalidAmount(String),
}
