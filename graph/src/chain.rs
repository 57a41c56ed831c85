//! Recent chain tips, newest first.
//!
//! Shared by every token graph: the block ingester pushes each connected
//! block, graphs read the best height and the recent-tip window for pruning.

use slpdb_types::BlockRef;
use std::collections::VecDeque;
use std::sync::RwLock;

pub struct ChainTracker {
    capacity: usize,
    tips: RwLock<VecDeque<BlockRef>>,
}

impl ChainTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tips: RwLock::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record a newly connected block.
    ///
    /// A block not above the current tip is a reorganisation: tips at or
    /// above its height are dropped first.
    pub fn push(&self, block: BlockRef) {
        let mut tips = self.tips.write().unwrap_or_else(|e| e.into_inner());
        while tips.front().is_some_and(|tip| tip.height >= block.height) {
            tips.pop_front();
        }
        tips.push_front(block);
        tips.truncate(self.capacity);
    }

    pub fn best_height(&self) -> Option<u32> {
        self.tips
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .front()
            .map(|b| b.height)
    }

    /// Snapshot of the tracked tips, newest first.
    pub fn recent(&self) -> Vec<BlockRef> {
        self.tips
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tips.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChainTracker {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_types::BlockHash;

    fn block(height: u32) -> BlockRef {
        BlockRef::new(BlockHash::new([height as u8; 32]), height)
    }

    #[test]
    fn keeps_newest_first_up_to_capacity() {
        let chain = ChainTracker::new(3);
        for h in 100..105 {
            chain.push(block(h));
        }
        let heights: Vec<u32> = chain.recent().iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![104, 103, 102]);
        assert_eq!(chain.best_height(), Some(104));
    }

    #[test]
    fn reorg_drops_tips_at_or_above_new_height() {
        let chain = ChainTracker::new(10);
        for h in 100..105 {
            chain.push(block(h));
        }
        let replacement = BlockRef::new(BlockHash::new([0xaa; 32]), 103);
        chain.push(replacement);
        let recent = chain.recent();
        assert_eq!(recent[0], replacement);
        assert_eq!(recent[1].height, 102);
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn empty_tracker_has_no_best_height() {
        let chain = ChainTracker::new(5);
        assert!(chain.is_empty());
        assert_eq!(chain.best_height(), None);
    }
}
