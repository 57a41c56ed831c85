//! Per-token transaction graph.
//!
//! A [`TokenGraph`] owns the [`GraphStore`] of one token plus its genesis
//! metadata, and grows one transaction at a time through [`TokenGraph::extend`].
//! Extension runs in three phases: parents are resolved and spend effects
//! computed without touching the graph, the new node's outputs are built and
//! checked for conservation, and only then are parent statuses, baton
//! bookkeeping and the node itself committed. A rejected or failed extension
//! leaves the graph unchanged.

use crate::chain::ChainTracker;
use crate::error::GraphError;
use crate::graph_store::GraphStore;
use crate::node::{GraphInput, GraphNode, GraphOutput};
use crate::persistence;
use crate::pruning::{GraphPruner, PruningConfig, PruningState};
use crate::spend::{SpendResolution, SpendResolver};
use crate::stats::TokenStats;
use slpdb_store::{
    GraphRecord, GraphStorage, RawTransactionSource, SpendIndex, SpendInfo, TokenRecord,
    Validator, TOKEN_SCHEMA_VERSION,
};
use slpdb_types::{
    BatonUtxoStatus, BlockHash, Outpoint, OutputStatus, TokenBatonStatus, TokenId, TokenVersion,
    Transaction, TransactionDetails, TransactionType, TxId, Validation,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators shared by every token graph.
#[derive(Clone)]
pub struct GraphContext {
    pub validator: Arc<dyn Validator>,
    pub raw: Arc<dyn RawTransactionSource>,
    pub storage: Arc<dyn GraphStorage>,
    pub spends: Arc<dyn SpendIndex>,
    pub chain: Arc<ChainTracker>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// A new node was added.
    Inserted { confirmed: bool },
    /// The node already existed; only its block hash may have been filled in.
    AlreadyPresent,
    /// The transaction breaks the protocol rules and was excluded.
    Rejected(String),
}

impl ExtendOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepMode {
    /// Persist dirty nodes only.
    PersistOnly,
    /// Also mark and evict aged-and-spent nodes.
    Prune,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub persisted: usize,
    pub pruned: usize,
    pub flushed: usize,
    pub totally_pruned: bool,
}

struct ParentUpdate {
    outpoint: Outpoint,
    resolution: SpendResolution,
}

pub struct TokenGraph {
    token_id: TokenId,
    genesis: TransactionDetails,
    block_created: Option<u32>,
    last_updated_block: u32,
    mint_baton: Option<Outpoint>,
    baton_status: TokenBatonStatus,
    nft_parent_id: Option<TxId>,
    totally_pruned: bool,
    pruning: PruningState,
    pruner: GraphPruner,
    store: GraphStore,
    startup_spends: Option<HashMap<Outpoint, SpendInfo>>,
    ctx: GraphContext,
}

impl TokenGraph {
    /// An empty graph for the token created by `genesis`.
    pub fn new(
        genesis: TransactionDetails,
        block_created: Option<u32>,
        config: PruningConfig,
        ctx: GraphContext,
    ) -> Self {
        let token_id = genesis.token_id;
        Self {
            token_id,
            genesis,
            block_created,
            last_updated_block: 0,
            mint_baton: None,
            baton_status: TokenBatonStatus::NeverCreated,
            nft_parent_id: None,
            totally_pruned: false,
            pruning: PruningState::default(),
            pruner: GraphPruner::new(config),
            store: GraphStore::new(token_id),
            startup_spends: None,
            ctx,
        }
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn genesis(&self) -> &TransactionDetails {
        &self.genesis
    }

    pub fn decimals(&self) -> u8 {
        self.genesis.decimals
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn context(&self) -> &GraphContext {
        &self.ctx
    }

    /// Whether at least one node (the genesis) is present.
    pub fn is_loaded(&self) -> bool {
        !self.store.is_empty()
    }

    pub fn block_created(&self) -> Option<u32> {
        self.block_created
    }

    pub fn last_updated_block(&self) -> u32 {
        self.last_updated_block
    }

    pub fn mint_baton(&self) -> Option<Outpoint> {
        self.mint_baton
    }

    pub fn baton_status(&self) -> TokenBatonStatus {
        self.baton_status
    }

    pub fn nft_parent_id(&self) -> Option<TxId> {
        self.nft_parent_id
    }

    /// True once no live node retains a spendable output.
    pub fn is_totally_pruned(&self) -> bool {
        self.totally_pruned
    }

    pub fn pruning_state(&self) -> &PruningState {
        &self.pruning
    }

    pub fn has_dirty(&self) -> bool {
        self.store.dirty_items().next().is_some()
    }

    pub fn set_startup_spends(&mut self, spends: HashMap<Outpoint, SpendInfo>) {
        self.startup_spends = Some(spends);
    }

    pub fn clear_startup_spends(&mut self) {
        self.startup_spends = None;
    }

    /// Add `txid` to the graph.
    ///
    /// Idempotent: an existing node only gets its block hash filled in.
    /// `process_up_to` reconstructs the graph as of that height; spends
    /// confirmed at or after it are ignored.
    pub fn extend(
        &mut self,
        txid: TxId,
        block_hash: Option<BlockHash>,
        process_up_to: Option<u32>,
    ) -> Result<ExtendOutcome, GraphError> {
        if let Some(node) = self.store.get_mut(&txid) {
            if node.block_hash.is_none() && block_hash.is_some() {
                node.block_hash = block_hash;
                node.dirty = true;
                debug!(token = %self.token_id, %txid, "block hash recorded for existing node");
                if txid == self.token_id && self.block_created.is_none() {
                    self.block_created = self.ctx.chain.best_height();
                }
            }
            return Ok(ExtendOutcome::AlreadyPresent);
        }

        let valid = self.ctx.validator.is_valid(&txid, Some(&self.token_id))?;
        let validation = self.ctx.validator.cached_validation(&txid);
        if !valid {
            let reason = validation
                .and_then(|v| v.invalid_reason)
                .unwrap_or_else(|| String::from("not a valid transaction of this token"));
            warn!(token = %self.token_id, %txid, %reason, "rejected invalid token transaction");
            return Ok(ExtendOutcome::Rejected(reason));
        }
        let Some(details) = validation.and_then(|v| v.details) else {
            warn!(token = %self.token_id, %txid, "validator returned no token details");
            return Ok(ExtendOutcome::Rejected(String::from("no token details")));
        };
        let tx = self.ctx.validator.transaction(&txid)?;

        let mut node = GraphNode::new(details, block_hash);
        let updates = if txid == self.token_id {
            Vec::new()
        } else {
            self.resolve_parents(&txid, &tx, &mut node, process_up_to)?
        };
        node.outputs = token_outputs(&node.details, &tx);

        let kind = node.details.transaction_type;
        if kind != TransactionType::Genesis {
            let inputs = node.input_total();
            let outputs = node.output_total();
            if outputs > inputs && kind != TransactionType::Mint {
                let reason = format!("declared outputs {outputs} exceed resolved inputs {inputs}");
                warn!(token = %self.token_id, %txid, %reason, "rejected transaction");
                return Ok(ExtendOutcome::Rejected(reason));
            }
            if inputs > outputs {
                node.outputs.push(GraphOutput::excess_burned(inputs - outputs));
            }
        }

        for update in updates {
            self.apply_parent_update(&txid, update);
        }
        self.apply_baton_declaration(&txid, &node.details);
        self.last_updated_block = process_up_to
            .or_else(|| self.ctx.chain.best_height())
            .unwrap_or(self.last_updated_block);
        if txid == self.token_id && block_hash.is_some() && self.block_created.is_none() {
            self.block_created = self.ctx.chain.best_height();
        }

        let confirmed = node.is_confirmed();
        debug!(
            token = %self.token_id,
            %txid,
            kind = %kind,
            inputs = node.inputs.len(),
            outputs = node.outputs.len(),
            confirmed,
            "graph extended"
        );
        self.store.set(txid, node);
        Ok(ExtendOutcome::Inserted { confirmed })
    }

    /// Resolve every parent of `tx`, copying input snapshots into `node` and
    /// returning the spend effects to apply on commit.
    fn resolve_parents(
        &self,
        txid: &TxId,
        tx: &Transaction,
        node: &mut GraphNode,
        ceiling: Option<u32>,
    ) -> Result<Vec<ParentUpdate>, GraphError> {
        let resolver = SpendResolver {
            token_id: &self.token_id,
            validator: self.ctx.validator.as_ref(),
            spends: self.ctx.spends.as_ref(),
            storage: self.ctx.storage.as_ref(),
            startup: self.startup_spends.as_ref(),
        };
        let mut visited = HashSet::new();
        let mut updates = Vec::new();

        for input in &tx.inputs {
            let prev_id = input.txid;
            let Some(prev) = self.ctx.validator.cached_validation(&prev_id) else {
                debug!(%txid, input = %input, "skipping input with no validation");
                continue;
            };

            if let Some(parent) = self.store.get(&prev_id, false) {
                if visited.insert(prev_id) {
                    let spent_vouts = tx.inputs.iter().filter(|i| i.txid == prev_id).map(|i| i.vout);
                    for vout in spent_vouts {
                        let Some(output) = parent.output(vout) else {
                            continue;
                        };
                        let outpoint = Outpoint::new(prev_id, vout);
                        let resolution = resolver.resolve(
                            &outpoint,
                            output.is_baton(),
                            output.has_native_output(),
                            ceiling,
                        )?;
                        updates.push(ParentUpdate {
                            outpoint,
                            resolution,
                        });
                    }
                }
                if let Some(output) = parent.output(input.vout) {
                    node.inputs.push(GraphInput::from_output(*input, output));
                }
            } else if prev.validity && visited.insert(prev_id) {
                self.check_unresolved_parent(txid, &prev_id)?;
            }
        }
        Ok(updates)
    }

    /// A valid parent that is not live must be settled in storage, or be the
    /// NFT group parent of an NFT child token.
    fn check_unresolved_parent(&self, txid: &TxId, parent: &TxId) -> Result<(), GraphError> {
        if let Some(evicted) = self.store.get(parent, true) {
            if evicted.has_live_outputs() {
                return Err(GraphError::Consistency(format!(
                    "evicted node {parent} still has unspent outputs"
                )));
            }
            return Ok(());
        }

        if let Some(record) = self.ctx.storage.fetch_graph_record(parent)? {
            let live = record.outputs.iter().any(|o| o.status.is_live());
            if record.token_id == self.token_id && live {
                return Err(GraphError::Consistency(format!(
                    "graph record {parent} was loaded from storage with unspent outputs"
                )));
            }
            return Ok(());
        }

        let raw = self.ctx.raw.fetch(parent)?;
        let prev_tx = self.ctx.validator.decode(&raw)?;
        let group_parent = self.genesis.version == TokenVersion::Nft1Child
            && prev_tx
                .slp_message
                .as_ref()
                .is_some_and(|m| m.version == TokenVersion::Nft1Group);
        if group_parent {
            debug!(token = %self.token_id, %parent, "input spends an NFT group parent");
            return Ok(());
        }
        Err(GraphError::MissingParent {
            txid: *txid,
            parent: *parent,
        })
    }

    fn apply_parent_update(&mut self, spender: &TxId, update: ParentUpdate) {
        let ParentUpdate {
            outpoint,
            resolution,
        } = update;
        let Some(parent) = self.store.get_mut(&outpoint.txid) else {
            return;
        };
        parent.dirty = true;
        let Some(output) = parent.output_mut(outpoint.vout) else {
            return;
        };
        output.spending_txid = if resolution.status.is_live() {
            None
        } else {
            Some(resolution.spender.unwrap_or(*spender))
        };
        output.status = resolution.status;
        output.invalid_reason = resolution.invalid_reason;

        if let OutputStatus::Baton(status) = resolution.status {
            let burned = !matches!(
                status,
                BatonUtxoStatus::BatonUnspent | BatonUtxoStatus::BatonSpentInMint
            );
            if burned && self.mint_baton == Some(outpoint) {
                info!(token = %self.token_id, baton = %outpoint, ?status, "minting baton burned");
                self.mint_baton = None;
                self.baton_status = TokenBatonStatus::DeadBurned;
            }
        }
    }

    fn apply_baton_declaration(&mut self, txid: &TxId, details: &TransactionDetails) {
        match (details.transaction_type, details.baton_vout) {
            (TransactionType::Genesis | TransactionType::Mint, Some(vout)) => {
                self.mint_baton = Some(Outpoint::new(*txid, vout));
                self.baton_status = TokenBatonStatus::Alive;
            }
            (TransactionType::Mint, None) => {
                info!(token = %self.token_id, %txid, "minting ended by MINT without baton");
                self.mint_baton = None;
                self.baton_status = TokenBatonStatus::DeadEnded;
            }
            _ => {}
        }
    }

    /// Persist dirty nodes and, in [`SweepMode::Prune`], evict aged-and-spent ones.
    ///
    /// Dirty flags clear and nodes leave the live map only after storage
    /// accepted their records; dependent caches are flushed only after the
    /// token record is stored too.
    pub fn sweep(&mut self, mode: SweepMode) -> Result<SweepReport, GraphError> {
        let recent = match mode {
            SweepMode::Prune => self.ctx.chain.recent(),
            SweepMode::PersistOnly => Vec::new(),
        };
        let marks: HashMap<TxId, u32> = self
            .pruner
            .find_pruneable(self.store.iter(), &self.token_id, &recent)
            .into_iter()
            .collect();

        let decimals = self.decimals();
        let records: Vec<GraphRecord> = self
            .store
            .iter()
            .filter(|(txid, node)| node.dirty || marks.contains_key(*txid))
            .map(|(txid, node)| {
                persistence::graph_record(
                    &self.token_id,
                    decimals,
                    txid,
                    node,
                    marks.get(txid).copied(),
                )
            })
            .collect();

        if !records.is_empty() {
            self.ctx.storage.upsert_graph_records(&records)?;
        }
        for record in &records {
            if let Some(node) = self.store.get_mut(&record.txid) {
                node.dirty = false;
            }
        }
        for (txid, height) in &marks {
            if let Some(node) = self.store.get(txid, false) {
                self.pruning.record(node);
            }
            self.store.prune(txid, *height);
        }

        self.totally_pruned = !self.store.iter().any(|(_, node)| node.has_live_outputs());
        self.ctx.storage.upsert_token_record(&self.token_record())?;
        let flushed = self
            .store
            .flush_evicted(self.ctx.validator.as_ref(), self.ctx.raw.as_ref());

        let report = SweepReport {
            persisted: records.len(),
            pruned: marks.len(),
            flushed: flushed.len(),
            totally_pruned: self.totally_pruned,
        };
        debug!(
            token = %self.token_id,
            persisted = report.persisted,
            pruned = report.pruned,
            flushed = report.flushed,
            totally_pruned = report.totally_pruned,
            "graph sweep complete"
        );
        Ok(report)
    }

    pub fn stats(&self) -> TokenStats {
        TokenStats::collect(
            &self.store,
            &self.pruning,
            self.block_created,
            self.baton_status,
        )
    }

    pub fn token_record(&self) -> TokenRecord {
        let decimals = self.decimals();
        TokenRecord {
            token_id: self.token_id,
            schema_version: TOKEN_SCHEMA_VERSION,
            is_graph_pruned: self.totally_pruned,
            last_updated_block: self.last_updated_block,
            genesis_details: persistence::details_record(&self.genesis, decimals),
            mint_baton_utxo: self.mint_baton,
            stats: persistence::stats_record(&self.stats(), decimals),
            pruning_state: persistence::pruning_state_record(&self.pruning, decimals),
            nft_parent_id: self.nft_parent_id,
        }
    }

    /// Rebuild a graph from its durable records.
    ///
    /// Pruned records are skipped. Every loaded node is preloaded into the
    /// validator as valid. A token without a block created loads only while
    /// its genesis is unconfirmed.
    pub fn from_records(
        token: &TokenRecord,
        records: &[GraphRecord],
        config: PruningConfig,
        ctx: GraphContext,
    ) -> Result<Self, GraphError> {
        let decimals = token.genesis_details.decimals;
        let genesis = persistence::details_from_record(&token.genesis_details, decimals)?;
        let mut graph = Self::new(genesis, token.stats.block_created, config, ctx);

        for record in records {
            if record.token_id != token.token_id {
                return Err(GraphError::InvalidRecord(format!(
                    "graph record {} belongs to token {}, not {}",
                    record.txid, record.token_id, token.token_id
                )));
            }
            if record.prune_height.is_some() {
                if record.outputs.iter().any(|o| o.status.is_live()) {
                    return Err(GraphError::Consistency(format!(
                        "pruned graph record {} still has unspent outputs",
                        record.txid
                    )));
                }
                continue;
            }
            let node = persistence::node_from_record(record, decimals)?;
            graph.store.set(record.txid, node);
        }
        let Some(genesis_node) = graph.store.get(&token.token_id, false) else {
            return Err(GraphError::Consistency(format!(
                "genesis node of token {} is missing",
                token.token_id
            )));
        };
        if genesis_node.block_hash.is_some() && token.stats.block_created.is_none() {
            return Err(GraphError::Consistency(format!(
                "token {} has a confirmed genesis but no block created",
                token.token_id
            )));
        }

        graph.last_updated_block = token.last_updated_block;
        graph.mint_baton = token.mint_baton_utxo;
        graph.baton_status = token.stats.minting_baton_status;
        graph.nft_parent_id = token.nft_parent_id;
        graph.totally_pruned = token.is_graph_pruned;
        graph.pruning = persistence::pruning_state_from_record(&token.pruning_state, decimals)?;

        for (txid, node) in graph.store.iter() {
            graph
                .ctx
                .validator
                .preload(*txid, Validation::valid(node.details.clone()));
        }
        info!(token = %graph.token_id, nodes = graph.store.len(), "token graph loaded from storage");
        Ok(graph)
    }

    /// Derive and remember the NFT group parent of an NFT child token.
    ///
    /// The child genesis's first input spends either the group GENESIS itself
    /// or a group transaction whose token id names the group.
    pub fn resolve_nft_parent(&mut self) -> Result<Option<TxId>, GraphError> {
        if self.genesis.version != TokenVersion::Nft1Child {
            return Ok(None);
        }
        let genesis_tx = self.ctx.validator.decode(&self.ctx.raw.fetch(&self.token_id)?)?;
        let first = genesis_tx.inputs.first().ok_or_else(|| {
            GraphError::Consistency(format!("NFT child genesis {} has no inputs", self.token_id))
        })?;
        let burn_tx = self.ctx.validator.decode(&self.ctx.raw.fetch(&first.txid)?)?;
        let message = burn_tx.slp_message.ok_or_else(|| {
            GraphError::Consistency(format!(
                "NFT child genesis {} does not spend a token transaction",
                self.token_id
            ))
        })?;
        let parent = if message.transaction_type == TransactionType::Genesis {
            first.txid
        } else {
            message.token_id
        };
        self.nft_parent_id = Some(parent);
        Ok(Some(parent))
    }

    /// Remove the first of `txids` present in the graph, undoing its spends.
    ///
    /// Returns whether anything changed.
    pub fn remove_double_spends(&mut self, txids: &[TxId]) -> bool {
        for txid in txids {
            if !self.store.has(txid, false) {
                continue;
            }
            let Some((_, reset)) = self.store.remove_double_spend(txid) else {
                continue;
            };
            self.ctx.raw.evict(txid);
            if self.mint_baton.is_some_and(|b| b.txid == *txid) {
                self.mint_baton = None;
            }
            for outpoint in reset {
                let is_baton = self
                    .store
                    .get(&outpoint.txid, false)
                    .and_then(|p| p.output(outpoint.vout))
                    .is_some_and(GraphOutput::is_baton);
                if is_baton {
                    self.mint_baton = Some(outpoint);
                    self.baton_status = TokenBatonStatus::Alive;
                }
            }
            info!(token = %self.token_id, %txid, "double-spent transaction removed from graph");
            return true;
        }
        false
    }
}

/// Token outputs declared by `details`, built against the native outputs of `tx`.
fn token_outputs(details: &TransactionDetails, tx: &Transaction) -> Vec<GraphOutput> {
    let mut outputs = Vec::new();
    match details.transaction_type {
        TransactionType::Genesis | TransactionType::Mint => {
            let quantity = details.genesis_or_mint_quantity.unwrap_or_default();
            outputs.push(GraphOutput::token(
                1,
                tx.address_of(1),
                tx.satoshis_of(1),
                quantity,
            ));
            if let Some(vout) = details.baton_vout {
                outputs.push(GraphOutput::baton(
                    vout,
                    tx.address_of(vout),
                    tx.satoshis_of(vout),
                ));
            }
        }
        TransactionType::Send => {
            for (vout, amount) in details.send_outputs.iter().enumerate().skip(1) {
                if amount.is_zero() {
                    continue;
                }
                let vout = vout as u32;
                outputs.push(GraphOutput::token(
                    vout,
                    tx.address_of(vout),
                    tx.satoshis_of(vout),
                    *amount,
                ));
            }
        }
    }
    outputs
}
