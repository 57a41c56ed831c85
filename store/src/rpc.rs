//! Ledger node raw-transaction source.

use crate::StoreError;
use slpdb_types::{BlockRef, TxId};

pub trait RawTransactionSource: Send + Sync {
    /// Raw bytes of `txid`. Unknown or unreachable ids are errors.
    fn fetch(&self, txid: &TxId) -> Result<Vec<u8>, StoreError>;

    /// The block confirming `txid`, or `None` while it is unconfirmed.
    fn confirmation(&self, txid: &TxId) -> Result<Option<BlockRef>, StoreError>;

    /// Drop any cached bytes for `txid`.
    fn evict(&self, txid: &TxId);
}
