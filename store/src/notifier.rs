use crate::StoreError;
use slpdb_types::{TokenId, TxId};

/// Publishes "token graph updated by txid" events to subscribers.
pub trait Notifier: Send + Sync {
    fn publish(&self, token_id: &TokenId, txid: &TxId) -> Result<(), StoreError>;
}
