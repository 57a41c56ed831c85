//! Prometheus metrics for the token graph runtime.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that an exporter can encode
//! into the Prometheus text exposition format.

use prometheus::{IntCounter, IntGauge, Opts, Registry};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Transactions added to a token graph.
    pub txs_extended: IntCounter,
    /// Transactions excluded as protocol-invalid.
    pub txs_rejected: IntCounter,
    /// Persistence sweeps run.
    pub sweeps: IntCounter,
    /// Nodes evicted from memory by pruning.
    pub nodes_pruned: IntCounter,
    /// Notifications published after a debounce cycle.
    pub notifications: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Token graphs currently held in memory.
    pub loaded_graphs: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, NodeError> {
    let counter = IntCounter::with_opts(Opts::new(name, help)).map_err(metrics_error)?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(metrics_error)?;
    Ok(counter)
}

fn metrics_error(e: prometheus::Error) -> NodeError {
    NodeError::Config(format!("metrics registration failed: {e}"))
}

impl NodeMetrics {
    /// Create a fresh set of metrics under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let txs_extended = counter(
            &registry,
            "slpdb_graph_txs_extended_total",
            "Transactions added to a token graph",
        )?;
        let txs_rejected = counter(
            &registry,
            "slpdb_graph_txs_rejected_total",
            "Transactions rejected as protocol-invalid",
        )?;
        let sweeps = counter(
            &registry,
            "slpdb_graph_sweeps_total",
            "Persistence sweeps run",
        )?;
        let nodes_pruned = counter(
            &registry,
            "slpdb_graph_nodes_pruned_total",
            "Graph nodes evicted by pruning",
        )?;
        let notifications = counter(
            &registry,
            "slpdb_graph_notifications_total",
            "Transaction notifications published",
        )?;

        let loaded_graphs = IntGauge::with_opts(Opts::new(
            "slpdb_graph_loaded_graphs",
            "Token graphs currently held in memory",
        ))
        .map_err(metrics_error)?;
        registry
            .register(Box::new(loaded_graphs.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            txs_extended,
            txs_rejected,
            sweeps,
            nodes_pruned,
            notifications,
            loaded_graphs,
        })
    }
}
