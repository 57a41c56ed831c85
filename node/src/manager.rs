//! Routes transactions to per-token update schedulers.
//!
//! The manager owns one [`UpdateScheduler`] per token. Schedulers are created
//! the first time a token is seen, either from its stored records or by
//! bootstrapping its genesis. Block connections feed the chain tip tracker
//! and trigger a pruning sweep on every loaded graph; graphs with nothing
//! left to spend are dropped.

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::scheduler::{SchedulerConfig, UpdateScheduler};
use slpdb_graph::{
    ChainTracker, ExtendOutcome, GraphContext, PruningConfig, TokenGraph, TokenStats,
};
use slpdb_store::{GraphStorage, Notifier, RawTransactionSource, SpendIndex, Validator};
use slpdb_types::{BlockRef, TokenId, TokenVersion, TransactionType, TxId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a connected block did to the loaded graphs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSummary {
    pub routed: usize,
    pub pruned: usize,
    pub dropped: Vec<TokenId>,
}

pub struct GraphManager {
    config: NodeConfig,
    ctx: GraphContext,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<NodeMetrics>>,
    schedulers: tokio::sync::Mutex<HashMap<TokenId, Arc<UpdateScheduler>>>,
}

impl GraphManager {
    pub fn new(
        config: NodeConfig,
        validator: Arc<dyn Validator>,
        raw: Arc<dyn RawTransactionSource>,
        storage: Arc<dyn GraphStorage>,
        spends: Arc<dyn SpendIndex>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let metrics = if config.enable_metrics {
            Some(Arc::new(NodeMetrics::new()?))
        } else {
            None
        };
        let ctx = GraphContext {
            validator,
            raw,
            storage,
            spends,
            chain: Arc::new(ChainTracker::new(config.recent_blocks_capacity)),
        };
        Ok(Self {
            config,
            ctx,
            notifier,
            metrics,
            schedulers: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    pub fn chain(&self) -> &Arc<ChainTracker> {
        &self.ctx.chain
    }

    pub async fn loaded_tokens(&self) -> Vec<TokenId> {
        self.schedulers.lock().await.keys().copied().collect()
    }

    pub async fn scheduler(&self, token_id: &TokenId) -> Option<Arc<UpdateScheduler>> {
        self.schedulers.lock().await.get(token_id).cloned()
    }

    pub async fn token_stats(&self, token_id: &TokenId) -> Option<TokenStats> {
        let scheduler = self.scheduler(token_id).await?;
        Some(scheduler.with_graph(|graph| graph.stats()))
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            bootstrap_poll: self.config.bootstrap_poll(),
            shutdown_poll: self.config.shutdown_poll(),
        }
    }

    /// Token of a valid token transaction, or `None` for anything else.
    fn token_of(&self, txid: &TxId) -> Result<Option<TokenId>, NodeError> {
        if !self.ctx.validator.is_valid(txid, None)? {
            debug!(%txid, "not a valid token transaction");
            return Ok(None);
        }
        Ok(self
            .ctx
            .validator
            .cached_validation(txid)
            .and_then(|v| v.details)
            .map(|d| d.token_id))
    }

    /// Build the graph of a token not yet managed, or `None` when the token
    /// has no valid genesis or nothing left to track.
    ///
    /// Blocking: validates the genesis and reads storage.
    fn open_graph(
        ctx: GraphContext,
        pruning: PruningConfig,
        token_id: &TokenId,
    ) -> Result<Option<TokenGraph>, NodeError> {
        if !ctx.validator.is_valid(token_id, Some(token_id))? {
            warn!(token = %token_id, "token genesis is not valid");
            return Ok(None);
        }
        let Some(genesis) = ctx
            .validator
            .cached_validation(token_id)
            .and_then(|v| v.details)
            .filter(|d| d.transaction_type == TransactionType::Genesis)
        else {
            warn!(token = %token_id, "token id does not name a genesis transaction");
            return Ok(None);
        };

        if let Some(mut record) = ctx.storage.fetch_token_record(token_id)? {
            if record.is_graph_pruned {
                debug!(token = %token_id, "token graph is totally pruned");
                return Ok(None);
            }
            let mut records = ctx.storage.fetch_graph_records(token_id)?;
            if record.stats.block_created.is_none() {
                if let Some(block) = ctx.raw.confirmation(token_id)? {
                    record.stats.block_created = Some(block.height);
                    if let Some(genesis) = records.iter_mut().find(|r| r.txid == *token_id) {
                        genesis.block_hash.get_or_insert(block.hash);
                    }
                    info!(
                        token = %token_id,
                        height = block.height,
                        "genesis confirmation filled in"
                    );
                }
            }
            let graph = TokenGraph::from_records(&record, &records, pruning, ctx)?;
            return Ok(Some(graph));
        }

        let created = ctx.raw.confirmation(token_id)?.map(|block| block.height);
        let mut graph = TokenGraph::new(genesis, created, pruning, ctx);
        if graph.genesis().version == TokenVersion::Nft1Child {
            if let Err(e) = graph.resolve_nft_parent() {
                warn!(token = %token_id, error = %e, "NFT group parent not resolved");
            }
        }
        Ok(Some(graph))
    }

    /// The scheduler of `token_id`, created and bootstrapped on first sight.
    ///
    /// The graph is opened off the scheduler map lock; when two callers race
    /// to open the same token the first insert wins.
    pub async fn scheduler_for(
        &self,
        token_id: &TokenId,
    ) -> Result<Option<Arc<UpdateScheduler>>, NodeError> {
        let existing = self.schedulers.lock().await.get(token_id).cloned();
        let (scheduler, bootstrap) = match existing {
            Some(existing) => {
                let retry = !existing.is_loaded() && existing.begin_bootstrap();
                (existing, retry)
            }
            None => {
                let ctx = self.ctx.clone();
                let pruning = self.config.pruning();
                let token = *token_id;
                let opened =
                    tokio::task::spawn_blocking(move || Self::open_graph(ctx, pruning, &token))
                        .await
                        .map_err(|e| NodeError::Cancelled(e.to_string()))??;
                let Some(graph) = opened else {
                    return Ok(None);
                };

                let mut schedulers = self.schedulers.lock().await;
                match schedulers.entry(*token_id) {
                    Entry::Occupied(entry) => {
                        debug!(token = %token_id, "token graph opened concurrently");
                        let existing = entry.get().clone();
                        let retry = !existing.is_loaded() && existing.begin_bootstrap();
                        (existing, retry)
                    }
                    Entry::Vacant(entry) => {
                        let scheduler = Arc::new(UpdateScheduler::new(
                            graph,
                            self.notifier.clone(),
                            self.metrics.clone(),
                            self.scheduler_config(),
                        ));
                        let bootstrap = !scheduler.is_loaded() && scheduler.begin_bootstrap();
                        entry.insert(scheduler.clone());
                        if let Some(metrics) = &self.metrics {
                            metrics.loaded_graphs.set(schedulers.len() as i64);
                        }
                        info!(token = %token_id, bootstrap, "token graph opened");
                        (scheduler, bootstrap)
                    }
                }
            }
        };
        if bootstrap {
            let block_hash = match self.ctx.raw.confirmation(token_id) {
                Ok(block) => block.map(|b| b.hash),
                Err(e) => {
                    warn!(token = %token_id, error = %e, "genesis confirmation unavailable");
                    None
                }
            };
            scheduler.bootstrap(block_hash).await?;
        }
        Ok(Some(scheduler))
    }

    /// Route an unconfirmed transaction.
    pub async fn on_transaction(&self, txid: TxId) -> Result<Option<ExtendOutcome>, NodeError> {
        let Some(token_id) = self.token_of(&txid)? else {
            return Ok(None);
        };
        let Some(scheduler) = self.scheduler_for(&token_id).await? else {
            return Ok(None);
        };
        Ok(Some(scheduler.enqueue(txid, None, None).await?))
    }

    /// Record a connected block, route its token transactions and run a
    /// pruning sweep on every loaded graph.
    pub async fn on_block(&self, block: BlockRef, txids: &[TxId]) -> Result<BlockSummary, NodeError> {
        self.ctx.chain.push(block);
        let mut summary = BlockSummary::default();

        for txid in txids {
            let Some(token_id) = self.token_of(txid)? else {
                continue;
            };
            let Some(scheduler) = self.scheduler_for(&token_id).await? else {
                continue;
            };
            scheduler.enqueue(*txid, Some(block.hash), None).await?;
            summary.routed += 1;
        }

        let schedulers: Vec<Arc<UpdateScheduler>> =
            self.schedulers.lock().await.values().cloned().collect();
        for scheduler in schedulers {
            if !scheduler.is_loaded() {
                continue;
            }
            let report = scheduler.commit().await?;
            summary.pruned += report.pruned;
            if report.totally_pruned {
                summary.dropped.push(*scheduler.token_id());
            }
        }
        for token_id in &summary.dropped {
            self.drop_graph(token_id).await?;
        }

        info!(
            height = block.height,
            routed = summary.routed,
            pruned = summary.pruned,
            dropped = summary.dropped.len(),
            "block applied to token graphs"
        );
        Ok(summary)
    }

    /// Remove double-spent transactions from every graph holding one.
    /// Returns the tokens whose graph changed.
    pub async fn on_double_spend(&self, txids: &[TxId]) -> Result<Vec<TokenId>, NodeError> {
        let schedulers: Vec<Arc<UpdateScheduler>> =
            self.schedulers.lock().await.values().cloned().collect();
        let mut changed = Vec::new();
        for scheduler in schedulers {
            if scheduler.remove_double_spends(txids.to_vec()).await? {
                changed.push(*scheduler.token_id());
            }
        }
        Ok(changed)
    }

    async fn drop_graph(&self, token_id: &TokenId) -> Result<(), NodeError> {
        let removed = {
            let mut schedulers = self.schedulers.lock().await;
            let removed = schedulers.remove(token_id);
            if let Some(metrics) = &self.metrics {
                metrics.loaded_graphs.set(schedulers.len() as i64);
            }
            removed
        };
        if let Some(scheduler) = removed {
            scheduler.shutdown().await?;
            info!(token = %token_id, "totally pruned token graph dropped");
        }
        Ok(())
    }

    /// Shut down every scheduler. All are attempted; the first error is
    /// returned.
    pub async fn stop(&self) -> Result<(), NodeError> {
        let schedulers: Vec<Arc<UpdateScheduler>> = {
            let mut map = self.schedulers.lock().await;
            map.drain().map(|(_, s)| s).collect()
        };
        if let Some(metrics) = &self.metrics {
            metrics.loaded_graphs.set(0);
        }
        let mut first_error = None;
        for scheduler in schedulers {
            if let Err(e) = scheduler.shutdown().await {
                error!(token = %scheduler.token_id(), error = %e, "scheduler shutdown failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
