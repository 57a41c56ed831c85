//! Protocol validity oracle.

use crate::StoreError;
use slpdb_types::{TokenId, Transaction, TransactionDetails, TxId, Validation};

/// Per-transaction protocol validation with a verdict cache and a raw
/// transaction cache, both evictable per id.
pub trait Validator: Send + Sync {
    /// Validate `txid`, optionally requiring it to belong to `token_id`.
    /// The verdict is cached and later readable via [`Self::cached_validation`].
    fn is_valid(&self, txid: &TxId, token_id: Option<&TokenId>) -> Result<bool, StoreError>;

    /// The cached verdict for `txid`, if validation has run.
    fn cached_validation(&self, txid: &TxId) -> Option<Validation>;

    /// The decoded transaction, from the validator's raw cache or its source.
    fn transaction(&self, txid: &TxId) -> Result<Transaction, StoreError>;

    /// Decode raw transaction bytes without touching any cache.
    fn decode(&self, raw: &[u8]) -> Result<Transaction, StoreError>;

    /// Seed the verdict cache, used when a graph is loaded from storage.
    fn preload(&self, txid: TxId, validation: Validation);

    /// Drop the cached verdict and raw bytes for `txid`.
    fn evict(&self, txid: &TxId);

    fn details_of(&self, txid: &TxId) -> Option<TransactionDetails> {
        self.cached_validation(txid).and_then(|v| v.details)
    }
}
