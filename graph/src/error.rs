use slpdb_types::TxId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("parent {parent} of {txid} was not found in the graph, in storage or as a foreign dag parent")]
    MissingParent { txid: TxId, parent: TxId },

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("storage error: {0}")]
    Store(#[from] slpdb_store::StoreError),
}
