//! Per-token update scheduler.
//!
//! Every mutation of a token graph runs as a job on one worker task fed by a
//! FIFO channel, so updates for a token apply exactly once and in submission
//! order. Each job holds the queue gate (an async mutex) while it runs;
//! pausing the queue is acquiring the gate, which also waits out the job in
//! flight.
//!
//! Unconfirmed arrivals are not persisted one by one. The debounce unit is a
//! two-state machine: in [`DebounceState::Accepting`] the first arrival
//! switches it to [`DebounceState::Draining`] and spawns one cycle that takes
//! the gate, drains the pending ids, sweeps, publishes one notification per
//! id and returns to `Accepting`. Ids arriving while a cycle runs are picked
//! up by the same cycle's next loop instead of starting another one.

use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::spans;
use slpdb_graph::{ExtendOutcome, SweepMode, SweepReport, TokenGraph};
use slpdb_store::Notifier;
use slpdb_types::{BlockHash, TokenId, TxId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceState {
    Accepting,
    Draining,
}

struct Debounce {
    state: DebounceState,
    pending: Vec<TxId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub bootstrap_poll: Duration,
    pub shutdown_poll: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bootstrap_poll: Duration::from_millis(250),
            shutdown_poll: Duration::from_millis(500),
        }
    }
}

struct Job {
    txid: TxId,
    block_hash: Option<BlockHash>,
    process_up_to: Option<u32>,
    reply: oneshot::Sender<Result<ExtendOutcome, NodeError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// State shared between the scheduler handle, its worker and debounce cycles.
struct Shared {
    token_id: TokenId,
    graph: Arc<Mutex<TokenGraph>>,
    gate: tokio::sync::Mutex<()>,
    debounce: Mutex<Debounce>,
    loaded: AtomicBool,
    bootstrap_initiated: AtomicBool,
    notifier: Arc<dyn Notifier>,
    metrics: Option<Arc<NodeMetrics>>,
}

impl Shared {
    /// Run `extend` on the blocking pool. Callers hold the gate.
    async fn extend(
        &self,
        txid: TxId,
        block_hash: Option<BlockHash>,
        process_up_to: Option<u32>,
    ) -> Result<ExtendOutcome, NodeError> {
        let graph = self.graph.clone();
        let span = spans::extend_span(&self.token_id, &txid);
        let (result, loaded) = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            let mut graph = lock(&graph);
            let result = graph.extend(txid, block_hash, process_up_to);
            (result, graph.is_loaded())
        })
        .await
        .map_err(|e| NodeError::Cancelled(e.to_string()))?;
        self.loaded.store(loaded, Ordering::SeqCst);

        let outcome = result?;
        if let Some(metrics) = &self.metrics {
            match &outcome {
                ExtendOutcome::Inserted { .. } => metrics.txs_extended.inc(),
                ExtendOutcome::Rejected(_) => metrics.txs_rejected.inc(),
                ExtendOutcome::AlreadyPresent => {}
            }
        }
        Ok(outcome)
    }

    /// Run a sweep on the blocking pool. Callers hold the gate.
    async fn sweep(&self, mode: SweepMode) -> Result<SweepReport, NodeError> {
        let graph = self.graph.clone();
        let span = spans::sweep_span(
            &self.token_id,
            match mode {
                SweepMode::Prune => "prune",
                SweepMode::PersistOnly => "persist",
            },
        );
        let report = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            lock(&graph).sweep(mode)
        })
        .await
        .map_err(|e| NodeError::Cancelled(e.to_string()))??;

        if let Some(metrics) = &self.metrics {
            metrics.sweeps.inc();
            metrics.nodes_pruned.inc_by(report.pruned as u64);
        }
        Ok(report)
    }

    fn publish(&self, ids: &[TxId]) {
        for txid in ids {
            match self.notifier.publish(&self.token_id, txid) {
                Ok(()) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.notifications.inc();
                    }
                }
                Err(e) => warn!(token = %self.token_id, %txid, error = %e, "notification failed"),
            }
        }
    }

    fn on_unconfirmed(shared: &Arc<Self>, txid: TxId) {
        let start = {
            let mut debounce = lock(&shared.debounce);
            if !debounce.pending.contains(&txid) {
                debounce.pending.push(txid);
            }
            if debounce.state == DebounceState::Accepting {
                debounce.state = DebounceState::Draining;
                true
            } else {
                false
            }
        };
        if start {
            tokio::spawn(run_debounce(shared.clone()));
        }
    }
}

async fn run_worker(shared: Arc<Shared>, mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = jobs.recv().await {
        let Job {
            txid,
            block_hash,
            process_up_to,
            reply,
        } = job;
        let result = {
            let _gate = shared.gate.lock().await;
            shared.extend(txid, block_hash, process_up_to).await
        };
        if let Ok(ExtendOutcome::Inserted { confirmed: false }) = &result {
            Shared::on_unconfirmed(&shared, txid);
        }
        if reply.send(result).is_err() {
            debug!(token = %shared.token_id, %txid, "extend caller went away");
        }
    }
    debug!(token = %shared.token_id, "update worker stopped");
}

async fn run_debounce(shared: Arc<Shared>) {
    loop {
        // Only the job in flight is waited out; queued jobs interleave with cycles.
        let gate = shared.gate.lock().await;
        let ids = std::mem::take(&mut lock(&shared.debounce).pending);
        let span = spans::debounce_span(&shared.token_id, ids.len());
        let swept = async {
            match shared.sweep(SweepMode::PersistOnly).await {
                Ok(report) => {
                    debug!(persisted = report.persisted, "debounce sweep complete");
                    shared.publish(&ids);
                    true
                }
                Err(e) => {
                    error!(error = %e, withheld = ids.len(), "debounce sweep failed");
                    false
                }
            }
        }
        .instrument(span)
        .await;

        let done = {
            let mut debounce = lock(&shared.debounce);
            if !swept {
                // Withheld ids go back in front; the next cycle publishes them.
                let arrived = std::mem::replace(&mut debounce.pending, ids);
                for txid in arrived {
                    if !debounce.pending.contains(&txid) {
                        debounce.pending.push(txid);
                    }
                }
            }
            if !swept || debounce.pending.is_empty() {
                debounce.state = DebounceState::Accepting;
                true
            } else {
                false
            }
        };
        drop(gate);
        if done {
            break;
        }
    }
}

/// Serialized update queue of one token graph.
pub struct UpdateScheduler {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl UpdateScheduler {
    /// Take ownership of `graph` and start its worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        graph: TokenGraph,
        notifier: Arc<dyn Notifier>,
        metrics: Option<Arc<NodeMetrics>>,
        config: SchedulerConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            token_id: *graph.token_id(),
            loaded: AtomicBool::new(graph.is_loaded()),
            graph: Arc::new(Mutex::new(graph)),
            gate: tokio::sync::Mutex::new(()),
            debounce: Mutex::new(Debounce {
                state: DebounceState::Accepting,
                pending: Vec::new(),
            }),
            bootstrap_initiated: AtomicBool::new(false),
            notifier,
            metrics,
        });
        let (sender, jobs) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(shared.clone(), jobs));
        Self {
            shared,
            config,
            sender: Mutex::new(Some(sender)),
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    pub fn token_id(&self) -> &TokenId {
        &self.shared.token_id
    }

    /// Whether the graph holds at least its genesis node.
    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }

    pub fn debounce_state(&self) -> DebounceState {
        lock(&self.shared.debounce).state
    }

    /// Run `f` against the graph, blocking while a job holds it.
    pub fn with_graph<R>(&self, f: impl FnOnce(&mut TokenGraph) -> R) -> R {
        f(&mut lock(&self.shared.graph))
    }

    /// Announce that a bootstrap is coming; enqueues wait until it lands.
    ///
    /// Returns `false` when a bootstrap was already initiated.
    pub fn begin_bootstrap(&self) -> bool {
        !self.shared.bootstrap_initiated.swap(true, Ordering::SeqCst)
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.shared.bootstrap_initiated.load(Ordering::SeqCst) && !self.is_loaded()
    }

    /// Add the genesis transaction. A failed bootstrap clears the initiated
    /// flag so a later caller may try again.
    pub async fn bootstrap(&self, block_hash: Option<BlockHash>) -> Result<ExtendOutcome, NodeError> {
        self.begin_bootstrap();
        let token_id = self.shared.token_id;
        info!(token = %token_id, "bootstrapping token graph");
        let result = self.submit(token_id, block_hash, None).await;
        let landed = matches!(
            &result,
            Ok(ExtendOutcome::Inserted { .. }) | Ok(ExtendOutcome::AlreadyPresent)
        );
        if !landed {
            warn!(token = %token_id, ?result, "token bootstrap failed");
            self.shared.bootstrap_initiated.store(false, Ordering::SeqCst);
        }
        result
    }

    /// Queue `txid` for extension and wait for its outcome.
    ///
    /// While a bootstrap is in progress and the graph is still empty, this
    /// polls until the genesis lands or the bootstrap fails.
    pub async fn enqueue(
        &self,
        txid: TxId,
        block_hash: Option<BlockHash>,
        process_up_to: Option<u32>,
    ) -> Result<ExtendOutcome, NodeError> {
        while self.is_bootstrapping() {
            if self.is_closed() {
                return Err(NodeError::SchedulerStopped(self.shared.token_id));
            }
            debug!(token = %self.shared.token_id, %txid, "waiting for token bootstrap");
            tokio::time::sleep(self.config.bootstrap_poll).await;
        }
        self.submit(txid, block_hash, process_up_to).await
    }

    async fn submit(
        &self,
        txid: TxId,
        block_hash: Option<BlockHash>,
        process_up_to: Option<u32>,
    ) -> Result<ExtendOutcome, NodeError> {
        let sender = lock(&self.sender)
            .clone()
            .ok_or(NodeError::SchedulerStopped(self.shared.token_id))?;
        let (reply, outcome) = oneshot::channel();
        sender
            .send(Job {
                txid,
                block_hash,
                process_up_to,
                reply,
            })
            .map_err(|_| NodeError::SchedulerStopped(self.shared.token_id))?;
        drop(sender);
        outcome
            .await
            .map_err(|_| NodeError::Cancelled(format!("extend of {txid} was dropped")))?
    }

    /// Out-of-band pruning sweep, run between jobs.
    pub async fn commit(&self) -> Result<SweepReport, NodeError> {
        let _gate = self.shared.gate.lock().await;
        self.shared.sweep(SweepMode::Prune).await
    }

    /// Remove the first of `txids` present in the graph and persist the
    /// reset parents. Returns whether anything changed.
    pub async fn remove_double_spends(&self, txids: Vec<TxId>) -> Result<bool, NodeError> {
        let _gate = self.shared.gate.lock().await;
        let graph = self.shared.graph.clone();
        let changed = tokio::task::spawn_blocking(move || lock(&graph).remove_double_spends(&txids))
            .await
            .map_err(|e| NodeError::Cancelled(e.to_string()))?;
        if changed {
            self.shared.sweep(SweepMode::PersistOnly).await?;
        }
        Ok(changed)
    }

    /// Stop accepting jobs, drain the queue, persist anything dirty and wait
    /// for a running debounce cycle to finish.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        let token_id = self.shared.token_id;
        drop(lock(&self.sender).take());
        if let Some(worker) = self.worker.lock().await.take() {
            worker
                .await
                .map_err(|e| NodeError::Cancelled(e.to_string()))?;
        }

        {
            let _gate = self.shared.gate.lock().await;
            if self.with_graph(|graph| graph.has_dirty()) {
                let report = self.shared.sweep(SweepMode::PersistOnly).await?;
                info!(token = %token_id, persisted = report.persisted, "final sweep on shutdown");
            }
            let withheld = {
                let mut debounce = lock(&self.shared.debounce);
                match debounce.state {
                    DebounceState::Accepting => std::mem::take(&mut debounce.pending),
                    DebounceState::Draining => Vec::new(),
                }
            };
            self.shared.publish(&withheld);
        }

        while self.debounce_state() == DebounceState::Draining {
            debug!(token = %token_id, "waiting for debounce cycle");
            tokio::time::sleep(self.config.shutdown_poll).await;
        }
        info!(token = %token_id, "update scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_graph::{ChainTracker, GraphContext, PruningConfig};
    use slpdb_nullables::ledger::test_txid;
    use slpdb_nullables::{NullGraphStorage, NullLedger, NullNotifier};
    use slpdb_store::Validator;
    use slpdb_types::{TokenAmount, TransactionDetails};

    struct Fixture {
        ledger: NullLedger,
        storage: Arc<NullGraphStorage>,
        notifier: Arc<NullNotifier>,
        metrics: Arc<NodeMetrics>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ledger: NullLedger::new(),
                storage: Arc::new(NullGraphStorage::new()),
                notifier: Arc::new(NullNotifier::new()),
                metrics: Arc::new(NodeMetrics::new().unwrap()),
            }
        }

        fn scheduler_for(&self, genesis: TransactionDetails) -> UpdateScheduler {
            let ctx = GraphContext {
                validator: self.ledger.validator.clone(),
                raw: self.ledger.raw.clone(),
                storage: self.storage.clone(),
                spends: self.ledger.spends.clone(),
                chain: Arc::new(ChainTracker::new(10)),
            };
            let graph = TokenGraph::new(genesis, None, PruningConfig::default(), ctx);
            UpdateScheduler::new(
                graph,
                self.notifier.clone(),
                Some(self.metrics.clone()),
                SchedulerConfig {
                    bootstrap_poll: Duration::from_millis(5),
                    shutdown_poll: Duration::from_millis(5),
                },
            )
        }

        fn token_scheduler(&self) -> (TokenId, UpdateScheduler) {
            let token = self.ledger.genesis(1, 0, 1000, None);
            let genesis = self
                .ledger
                .validator
                .transaction(&token)
                .unwrap()
                .slp_message
                .unwrap();
            (token, self.scheduler_for(genesis))
        }
    }

    #[tokio::test]
    async fn arrivals_during_paused_queue_coalesce_into_one_cycle() {
        let f = Fixture::new();
        let (_, scheduler) = f.token_scheduler();
        scheduler.bootstrap(None).await.unwrap();
        scheduler.shutdown().await.unwrap();
        let sweeps_before = f.metrics.sweeps.get();
        let published_before = f.notifier.published().len();

        let ids = [test_txid(7), test_txid(8), test_txid(7)];
        {
            let _gate = scheduler.shared.gate.lock().await;
            for id in ids {
                Shared::on_unconfirmed(&scheduler.shared, id);
            }
            tokio::task::yield_now().await;
            assert_eq!(scheduler.debounce_state(), DebounceState::Draining);
        }
        while scheduler.debounce_state() == DebounceState::Draining {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(f.metrics.sweeps.get() - sweeps_before, 1);
        let published: Vec<TxId> = f.notifier.published()[published_before..]
            .iter()
            .map(|(_, txid)| *txid)
            .collect();
        assert_eq!(published, vec![test_txid(7), test_txid(8)]);
    }

    #[tokio::test]
    async fn unconfirmed_genesis_is_persisted_and_notified() {
        let f = Fixture::new();
        let (token, scheduler) = f.token_scheduler();
        let outcome = scheduler.bootstrap(None).await.unwrap();
        assert_eq!(outcome, ExtendOutcome::Inserted { confirmed: false });
        scheduler.shutdown().await.unwrap();

        assert!(f.storage.graph_record(&token).is_some());
        assert_eq!(f.notifier.published_for(&token), vec![token]);
    }

    #[tokio::test]
    async fn failed_debounce_sweep_defers_notifications() {
        let f = Fixture::new();
        let (token, scheduler) = f.token_scheduler();
        f.storage.set_unavailable(true);
        let outcome = scheduler.bootstrap(None).await.unwrap();
        assert_eq!(outcome, ExtendOutcome::Inserted { confirmed: false });
        while scheduler.debounce_state() == DebounceState::Draining {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(f.notifier.published_for(&token).is_empty());

        f.storage.set_unavailable(false);
        let send = f
            .ledger
            .send(2, token, &[slpdb_types::Outpoint::new(token, 1)], &[400, 600]);
        assert!(scheduler.enqueue(send, None, None).await.unwrap().is_inserted());
        while scheduler.debounce_state() == DebounceState::Draining {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(f.notifier.published_for(&token), vec![token, send]);
        assert!(f.storage.graph_record(&token).is_some());
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_publishes_withheld_notifications() {
        let f = Fixture::new();
        let (token, scheduler) = f.token_scheduler();
        f.storage.set_unavailable(true);
        scheduler.bootstrap(None).await.unwrap();
        while scheduler.debounce_state() == DebounceState::Draining {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(f.notifier.published_for(&token).is_empty());

        f.storage.set_unavailable(false);
        scheduler.shutdown().await.unwrap();
        assert_eq!(f.notifier.published_for(&token), vec![token]);
        assert!(f.storage.graph_record(&token).is_some());
    }

    #[tokio::test]
    async fn failed_bootstrap_can_be_retried() {
        let f = Fixture::new();
        let token = test_txid(1);
        let scheduler = f.scheduler_for(TransactionDetails::genesis(
            token,
            0,
            TokenAmount::new(1000),
            None,
        ));

        assert!(scheduler.bootstrap(None).await.is_err());
        assert!(!scheduler.shared.bootstrap_initiated.load(Ordering::SeqCst));
        assert!(!scheduler.is_loaded());

        f.ledger.genesis(1, 0, 1000, None);
        assert!(scheduler.bootstrap(None).await.unwrap().is_inserted());
        assert!(scheduler.is_loaded());
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn closed_scheduler_refuses_jobs() {
        let f = Fixture::new();
        let (token, scheduler) = f.token_scheduler();
        scheduler.shutdown().await.unwrap();
        assert!(scheduler.is_closed());
        assert!(matches!(
            scheduler.enqueue(token, None, None).await,
            Err(NodeError::SchedulerStopped(_))
        ));
    }
}
