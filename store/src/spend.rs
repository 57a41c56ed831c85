//! Spender lookups for token outputs.

use serde::{Deserialize, Serialize};
use slpdb_types::{Outpoint, TxId};

/// The transaction that spent an outpoint, and the height of the block
/// confirming it (`None` while the spender is unconfirmed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendInfo {
    pub txid: TxId,
    pub block: Option<u32>,
}

impl SpendInfo {
    pub fn new(txid: TxId, block: Option<u32>) -> Self {
        Self { txid, block }
    }

    /// Whether the spend had happened as of `ceiling`.
    ///
    /// Unconfirmed spends and spends confirmed at or above the ceiling are
    /// treated as not yet happened.
    pub fn happened_before(&self, ceiling: u32) -> bool {
        matches!(self.block, Some(height) if height < ceiling)
    }
}

/// Live cross-token spend index, maintained by the block/mempool ingester.
pub trait SpendIndex: Send + Sync {
    /// The transaction spending `outpoint`, if the index has seen one.
    fn spender_of(&self, outpoint: &Outpoint) -> Option<SpendInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_excludes_unconfirmed_and_later_spends() {
        let txid = TxId::new([7; 32]);
        assert!(SpendInfo::new(txid, Some(99)).happened_before(100));
        assert!(!SpendInfo::new(txid, Some(100)).happened_before(100));
        assert!(!SpendInfo::new(txid, Some(150)).happened_before(100));
        assert!(!SpendInfo::new(txid, None).happened_before(100));
    }
}
