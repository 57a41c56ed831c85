//! Nullable raw-transaction source backed by a map of bincode-encoded transactions.

use slpdb_store::{RawTransactionSource, StoreError};
use slpdb_types::{BlockRef, Transaction, TxId};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct NullRawSource {
    raw: Mutex<HashMap<TxId, Vec<u8>>>,
    blocks: Mutex<HashMap<TxId, BlockRef>>,
    evicted: Mutex<Vec<TxId>>,
}

impl NullRawSource {
    pub fn new() -> Self {
        Self {
            raw: Mutex::new(HashMap::new()),
            blocks: Mutex::new(HashMap::new()),
            evicted: Mutex::new(Vec::new()),
        }
    }

    /// Make `tx` fetchable by its txid.
    pub fn insert(&self, tx: &Transaction) {
        let bytes = bincode::serialize(tx).expect("transaction encodes");
        self.raw.lock().unwrap().insert(tx.txid, bytes);
    }

    /// Report `txid` as confirmed in `block`.
    pub fn confirm(&self, txid: &TxId, block: BlockRef) {
        self.blocks.lock().unwrap().insert(*txid, block);
    }

    /// Forget `txid` entirely, as if the node never saw it.
    pub fn remove(&self, txid: &TxId) {
        self.raw.lock().unwrap().remove(txid);
    }

    /// Ids passed to [`RawTransactionSource::evict`], in call order.
    pub fn evicted(&self) -> Vec<TxId> {
        self.evicted.lock().unwrap().clone()
    }
}

impl Default for NullRawSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RawTransactionSource for NullRawSource {
    fn fetch(&self, txid: &TxId) -> Result<Vec<u8>, StoreError> {
        self.raw
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(txid.to_string()))
    }

    fn confirmation(&self, txid: &TxId) -> Result<Option<BlockRef>, StoreError> {
        Ok(self.blocks.lock().unwrap().get(txid).copied())
    }

    fn evict(&self, txid: &TxId) {
        self.evicted.lock().unwrap().push(*txid);
    }
}
