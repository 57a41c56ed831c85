//! Collaborator traits and durable record shapes for the token graph.
//!
//! The graph core never talks to a database, a ledger node or a validator
//! directly; it depends only on the traits defined here. Production backends
//! live outside this workspace, `slpdb-nullables` provides in-memory ones.

pub mod error;
pub mod notifier;
pub mod records;
pub mod rpc;
pub mod spend;
pub mod storage;
pub mod validator;

pub use error::StoreError;
pub use notifier::Notifier;
pub use records::{
    DetailsRecord, GraphRecord, InputRecord, OutputRecord, PruningStateRecord, TokenRecord,
    TokenStatsRecord, TOKEN_SCHEMA_VERSION,
};
pub use rpc::RawTransactionSource;
pub use spend::{SpendIndex, SpendInfo};
pub use storage::{GraphStorage, SpendQueryKind};
pub use validator::Validator;
