//! Nullable notifier recording every publication.

use slpdb_store::{Notifier, StoreError};
use slpdb_types::{TokenId, TxId};
use std::sync::Mutex;

pub struct NullNotifier {
    published: Mutex<Vec<(TokenId, TxId)>>,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<(TokenId, TxId)> {
        self.published.lock().unwrap().clone()
    }

    /// Publications for one token, in order.
    pub fn published_for(&self, token_id: &TokenId) -> Vec<TxId> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == token_id)
            .map(|(_, txid)| *txid)
            .collect()
    }
}

impl Default for NullNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NullNotifier {
    fn publish(&self, token_id: &TokenId, txid: &TxId) -> Result<(), StoreError> {
        self.published.lock().unwrap().push((*token_id, *txid));
        Ok(())
    }
}
