//! Live node map plus the eviction side-store for one token.
//!
//! Pruned nodes leave the live map immediately but stay reachable by id in
//! the side-store until [`GraphStore::flush_evicted`] runs, which the caller
//! does only after the prune markers are durable.

use crate::node::GraphNode;
use slpdb_store::{RawTransactionSource, Validator};
use slpdb_types::{Outpoint, TxId};
use std::collections::HashMap;
use tracing::debug;

pub struct GraphStore {
    genesis_id: TxId,
    live: HashMap<TxId, GraphNode>,
    evicted: HashMap<TxId, GraphNode>,
}

impl GraphStore {
    pub fn new(genesis_id: TxId) -> Self {
        Self {
            genesis_id,
            live: HashMap::new(),
            evicted: HashMap::new(),
        }
    }

    pub fn genesis_id(&self) -> &TxId {
        &self.genesis_id
    }

    pub fn has(&self, txid: &TxId, include_evicted: bool) -> bool {
        self.live.contains_key(txid) || (include_evicted && self.evicted.contains_key(txid))
    }

    pub fn get(&self, txid: &TxId, include_evicted: bool) -> Option<&GraphNode> {
        match self.live.get(txid) {
            Some(node) => Some(node),
            None if include_evicted => self.evicted.get(txid),
            None => None,
        }
    }

    /// Mutable access to a live node.
    pub fn get_mut(&mut self, txid: &TxId) -> Option<&mut GraphNode> {
        self.live.get_mut(txid)
    }

    pub fn set(&mut self, txid: TxId, node: GraphNode) {
        self.live.insert(txid, node);
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn evicted_len(&self) -> usize {
        self.evicted.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TxId, &GraphNode)> {
        self.live.iter()
    }

    pub fn dirty_items(&self) -> impl Iterator<Item = (&TxId, &GraphNode)> {
        self.live.iter().filter(|(_, node)| node.dirty)
    }

    /// Move a live node into the side-store with a prune marker.
    ///
    /// Returns `false` for the genesis id or an id that is not live.
    pub fn prune(&mut self, txid: &TxId, at_height: u32) -> bool {
        if *txid == self.genesis_id {
            return false;
        }
        let Some(mut node) = self.live.remove(txid) else {
            return false;
        };
        node.dirty = true;
        node.prune_height = Some(at_height);
        debug!(%txid, prune_height = at_height, "node evicted from live graph");
        self.evicted.insert(*txid, node);
        true
    }

    /// Drop the dependent caches of every evicted node and clear the side-store.
    ///
    /// Returns the flushed ids.
    pub fn flush_evicted(
        &mut self,
        validator: &dyn Validator,
        raw: &dyn RawTransactionSource,
    ) -> Vec<TxId> {
        let txids: Vec<TxId> = self.evicted.keys().copied().collect();
        for txid in &txids {
            raw.evict(txid);
            validator.evict(txid);
        }
        self.evicted.clear();
        txids
    }

    /// Remove a live node that was double-spent out of the mempool.
    ///
    /// Every parent output the node spent is reset to its unspent status and
    /// the parent marked dirty. Returns the removed node and the reset
    /// outpoints, or `None` for the genesis id or an id that is not live.
    pub fn remove_double_spend(&mut self, txid: &TxId) -> Option<(GraphNode, Vec<Outpoint>)> {
        if *txid == self.genesis_id {
            return None;
        }
        let node = self.live.remove(txid)?;
        let mut reset = Vec::new();
        for input in &node.inputs {
            let Some(parent) = self.live.get_mut(&input.txid) else {
                continue;
            };
            if let Some(output) = parent.output_mut(input.vout) {
                if output.spending_txid == Some(*txid) {
                    output.reset_unspent();
                    parent.dirty = true;
                    reset.push(input.outpoint());
                }
            }
        }
        debug!(%txid, reset = reset.len(), "removed double-spent node");
        Some((node, reset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{GraphInput, GraphOutput};
    use slpdb_nullables::{NullRawSource, NullValidator};
    use slpdb_types::{OutputStatus, TokenAmount, TokenUtxoStatus, TransactionDetails};

    fn id(v: u8) -> TxId {
        TxId::new([v; 32])
    }

    fn node(token: TxId) -> GraphNode {
        let mut n = GraphNode::new(
            TransactionDetails::send(token, 0, &[TokenAmount::new(10)]),
            None,
        );
        n.outputs
            .push(GraphOutput::token(1, "a".into(), 546, TokenAmount::new(10)));
        n
    }

    #[test]
    fn genesis_is_never_pruned() {
        let mut store = GraphStore::new(id(1));
        store.set(id(1), node(id(1)));
        assert!(!store.prune(&id(1), 100));
        assert!(store.has(&id(1), false));
    }

    #[test]
    fn prune_of_absent_id_is_noop() {
        let mut store = GraphStore::new(id(1));
        assert!(!store.prune(&id(2), 100));
        assert_eq!(store.evicted_len(), 0);
    }

    #[test]
    fn pruned_node_is_reachable_only_via_evicted_lookup() {
        let mut store = GraphStore::new(id(1));
        let mut n = node(id(1));
        n.dirty = false;
        store.set(id(2), n);
        assert!(store.prune(&id(2), 90));

        assert!(!store.has(&id(2), false));
        assert!(store.get(&id(2), false).is_none());
        let evicted = store.get(&id(2), true).unwrap();
        assert_eq!(evicted.prune_height, Some(90));
        assert!(evicted.dirty);
    }

    #[test]
    fn flush_evicts_dependent_caches_and_clears() {
        let mut store = GraphStore::new(id(1));
        store.set(id(2), node(id(1)));
        store.prune(&id(2), 90);
        let validator = NullValidator::new();
        let raw = NullRawSource::new();

        let flushed = store.flush_evicted(&validator, &raw);
        assert_eq!(flushed, vec![id(2)]);
        assert_eq!(raw.evicted(), vec![id(2)]);
        assert_eq!(validator.evicted(), vec![id(2)]);
        assert!(!store.has(&id(2), true));
    }

    #[test]
    fn flush_on_empty_side_store_is_noop() {
        let mut store = GraphStore::new(id(1));
        let validator = NullValidator::new();
        let raw = NullRawSource::new();
        assert!(store.flush_evicted(&validator, &raw).is_empty());
        assert!(raw.evicted().is_empty());
        assert!(validator.evicted().is_empty());
    }

    #[test]
    fn dirty_items_lists_only_dirty_nodes() {
        let mut store = GraphStore::new(id(1));
        let mut clean = node(id(1));
        clean.dirty = false;
        store.set(id(1), clean);
        store.set(id(2), node(id(1)));
        let dirty: Vec<TxId> = store.dirty_items().map(|(k, _)| *k).collect();
        assert_eq!(dirty, vec![id(2)]);
    }

    #[test]
    fn double_spend_removal_resets_parent_outputs() {
        let mut store = GraphStore::new(id(1));
        let mut parent = node(id(1));
        parent.dirty = false;
        {
            let o = parent.output_mut(1).unwrap();
            o.status = TokenUtxoStatus::SpentSameToken.into();
            o.spending_txid = Some(id(3));
        }
        let mut child = node(id(1));
        child.inputs.push(GraphInput::from_output(
            Outpoint::new(id(2), 1),
            parent.output(1).unwrap(),
        ));
        store.set(id(2), parent);
        store.set(id(3), child);

        let (_, reset) = store.remove_double_spend(&id(3)).unwrap();
        assert_eq!(reset, vec![Outpoint::new(id(2), 1)]);
        let parent = store.get(&id(2), false).unwrap();
        assert!(parent.dirty);
        assert_eq!(parent.output(1).unwrap().status, OutputStatus::UNSPENT);
        assert!(!store.has(&id(3), true));
        assert!(store.remove_double_spend(&id(1)).is_none());
    }
}
