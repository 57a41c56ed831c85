//! Durable storage trait for token and graph records.

use crate::{GraphRecord, SpendInfo, StoreError, TokenRecord};
use slpdb_types::{Outpoint, TokenId, TxId};

/// Shape of a spender query against stored transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendQueryKind {
    /// Look for a SEND consuming a token output.
    Send,
    /// Look for a MINT consuming a baton output.
    Mint,
}

/// Trait for the document store holding token and graph records.
///
/// Graph records are keyed by transaction id; token records by token id.
pub trait GraphStorage: Send + Sync {
    /// Insert or replace graph records by txid.
    fn upsert_graph_records(&self, records: &[GraphRecord]) -> Result<(), StoreError>;

    /// Insert or replace the token record.
    fn upsert_token_record(&self, record: &TokenRecord) -> Result<(), StoreError>;

    fn fetch_graph_record(&self, txid: &TxId) -> Result<Option<GraphRecord>, StoreError>;

    fn fetch_token_record(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, StoreError>;

    /// All graph records belonging to `token_id`, pruned ones included.
    fn fetch_graph_records(&self, token_id: &TokenId) -> Result<Vec<GraphRecord>, StoreError>;

    /// Delete every graph record of `token_id`. Returns how many were removed.
    fn delete_graph_records(&self, token_id: &TokenId) -> Result<usize, StoreError>;

    /// Find a stored transaction spending `outpoint`.
    fn query_spender(
        &self,
        outpoint: &Outpoint,
        kind: SpendQueryKind,
    ) -> Result<Option<SpendInfo>, StoreError>;
}
