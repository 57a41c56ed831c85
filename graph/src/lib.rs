//! Per-token transaction graph for SLP tokens.
//!
//! Each token owns a DAG of every transaction that ever moved it. The graph
//! validates conservation as transactions arrive, tracks which outputs remain
//! spendable, maps its state to durable records and evicts settled
//! transactions once they can no longer affect validation.

pub mod chain;
pub mod error;
pub mod graph_store;
pub mod node;
pub mod persistence;
pub mod pruning;
pub mod spend;
pub mod stats;
pub mod token_graph;

pub use chain::ChainTracker;
pub use error::GraphError;
pub use graph_store::GraphStore;
pub use node::{GraphInput, GraphNode, GraphOutput};
pub use pruning::{GraphPruner, PruningConfig, PruningState};
pub use spend::{SpendResolution, SpendResolver};
pub use stats::TokenStats;
pub use token_graph::{ExtendOutcome, GraphContext, SweepMode, SweepReport, TokenGraph};
