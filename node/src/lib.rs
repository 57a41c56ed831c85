//! Token graph runtime.
//!
//! Runs one serialized update queue per token graph, coalesces persistence
//! of unconfirmed arrivals, and routes mempool, block and double-spend
//! events to the right graph.

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod scheduler;
pub mod spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use manager::{BlockSummary, GraphManager};
pub use metrics::NodeMetrics;
pub use scheduler::{DebounceState, SchedulerConfig, UpdateScheduler};
