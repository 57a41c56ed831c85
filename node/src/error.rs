use slpdb_types::TokenId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("graph error: {0}")]
    Graph(#[from] slpdb_graph::GraphError),

    #[error("store error: {0}")]
    Store(#[from] slpdb_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("update scheduler for token {0} is shut down")]
    SchedulerStopped(TokenId),

    #[error("graph job cancelled: {0}")]
    Cancelled(String),
}
