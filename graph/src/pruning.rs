//! Graph pruning: evict settled transactions from memory.
//!
//! A node is "aged and spent" once it is confirmed in a block older than the
//! K-th most recent tracked tip and none of its outputs can still be spent.
//! Such a node can never again affect validation, so it is persisted with a
//! prune height and dropped from the live graph. The prune height lags the
//! tip by K blocks so a short reorganisation still finds the node in storage.

use crate::node::GraphNode;
use slpdb_types::{BlockRef, TokenAmount, TransactionType, TxId};

/// Configuration for graph pruning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PruningConfig {
    /// Number of recent chain tips a block must fall behind (K).
    pub window: usize,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self { window: 10 }
    }
}

/// Decides which nodes are aged and spent.
pub struct GraphPruner {
    config: PruningConfig,
}

impl GraphPruner {
    pub fn new(config: PruningConfig) -> Self {
        Self { config }
    }

    /// Prune height for `node` given the recent tips (newest first), or
    /// `None` when the node must stay live.
    pub fn prune_height(&self, node: &GraphNode, recent: &[BlockRef]) -> Option<u32> {
        let hash = node.block_hash?;
        let window = self.config.window;
        if window == 0 || recent.len() < window {
            return None;
        }
        let window = &recent[..window];
        if window.iter().any(|b| b.hash == hash) || node.has_live_outputs() {
            return None;
        }
        window.last().map(|b| b.height)
    }

    /// Every non-genesis node eligible for pruning, with its prune height.
    pub fn find_pruneable<'a>(
        &self,
        nodes: impl Iterator<Item = (&'a TxId, &'a GraphNode)>,
        genesis_id: &TxId,
        recent: &[BlockRef],
    ) -> Vec<(TxId, u32)> {
        nodes
            .filter(|(txid, _)| *txid != genesis_id)
            .filter_map(|(txid, node)| self.prune_height(node, recent).map(|h| (*txid, h)))
            .collect()
    }

    pub fn config(&self) -> &PruningConfig {
        &self.config
    }
}

/// Counters carried forward from evicted nodes so statistics survive eviction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruningState {
    pub send_count: u64,
    pub mint_count: u64,
    pub mint_quantity: TokenAmount,
    pub burned_quantity: TokenAmount,
}

impl PruningState {
    /// Account for a node leaving the live graph.
    pub fn record(&mut self, node: &GraphNode) {
        match node.details.transaction_type {
            TransactionType::Send => self.send_count += 1,
            TransactionType::Mint => {
                self.mint_count += 1;
                self.mint_quantity = self.mint_quantity
                    + node.details.genesis_or_mint_quantity.unwrap_or(TokenAmount::ZERO);
            }
            TransactionType::Genesis => {}
        }
        self.burned_quantity = self.burned_quantity + node.burned_total();
    }

    pub fn pruned_count(&self) -> u64 {
        self.send_count + self.mint_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::GraphOutput;
    use slpdb_types::{BlockHash, TokenUtxoStatus, TransactionDetails};

    fn tips(from: u32, count: u32) -> Vec<BlockRef> {
        (0..count)
            .map(|i| {
                let h = from - i;
                BlockRef::new(BlockHash::new([h as u8; 32]), h)
            })
            .collect()
    }

    fn spent_node(block: Option<u32>) -> GraphNode {
        let token = TxId::new([1; 32]);
        let mut node = GraphNode::new(
            TransactionDetails::send(token, 0, &[TokenAmount::new(5)]),
            block.map(|h| BlockHash::new([h as u8; 32])),
        );
        let mut out = GraphOutput::token(1, "a".into(), 546, TokenAmount::new(5));
        out.status = TokenUtxoStatus::SpentSameToken.into();
        node.outputs.push(out);
        node
    }

    #[test]
    fn aged_spent_node_gets_kth_tip_height() {
        let pruner = GraphPruner::new(PruningConfig { window: 10 });
        let recent = tips(120, 10);
        assert_eq!(pruner.prune_height(&spent_node(Some(50)), &recent), Some(111));
    }

    #[test]
    fn node_inside_window_is_kept() {
        let pruner = GraphPruner::new(PruningConfig { window: 10 });
        let recent = tips(120, 10);
        assert_eq!(pruner.prune_height(&spent_node(Some(115)), &recent), None);
    }

    #[test]
    fn unconfirmed_node_is_kept() {
        let pruner = GraphPruner::new(PruningConfig::default());
        assert_eq!(pruner.prune_height(&spent_node(None), &tips(120, 10)), None);
    }

    #[test]
    fn short_tip_history_disables_pruning() {
        let pruner = GraphPruner::new(PruningConfig { window: 10 });
        assert_eq!(pruner.prune_height(&spent_node(Some(50)), &tips(120, 9)), None);
    }

    #[test]
    fn node_with_live_output_is_kept() {
        let pruner = GraphPruner::new(PruningConfig { window: 3 });
        let mut node = spent_node(Some(50));
        node.outputs[0].status = TokenUtxoStatus::Unspent.into();
        assert_eq!(pruner.prune_height(&node, &tips(120, 3)), None);
    }

    #[test]
    fn genesis_is_never_pruneable() {
        let pruner = GraphPruner::new(PruningConfig { window: 3 });
        let genesis = TxId::new([1; 32]);
        let other = TxId::new([2; 32]);
        let a = spent_node(Some(50));
        let b = spent_node(Some(50));
        let nodes = [(genesis, a), (other, b)];
        let found = pruner.find_pruneable(
            nodes.iter().map(|(k, v)| (k, v)),
            &genesis,
            &tips(120, 3),
        );
        assert_eq!(found, vec![(other, 118)]);
    }

    #[test]
    fn pruning_state_counts_sends_and_burns() {
        let mut state = PruningState::default();
        let mut node = spent_node(Some(50));
        node.outputs
            .push(GraphOutput::excess_burned(TokenAmount::new(7)));
        state.record(&node);
        assert_eq!(state.send_count, 1);
        assert_eq!(state.burned_quantity, TokenAmount::new(7));
        assert_eq!(state.pruned_count(), 1);
    }
}
