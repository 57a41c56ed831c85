//! Nullable spend index.

use slpdb_store::{SpendIndex, SpendInfo};
use slpdb_types::{Outpoint, TxId};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct NullSpendIndex {
    spends: Mutex<HashMap<Outpoint, SpendInfo>>,
}

impl NullSpendIndex {
    pub fn new() -> Self {
        Self {
            spends: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, outpoint: Outpoint, info: SpendInfo) {
        self.spends.lock().unwrap().insert(outpoint, info);
    }

    /// Stamp every spend made by `spender` with the confirming height.
    pub fn confirm(&self, spender: &TxId, height: u32) {
        for info in self.spends.lock().unwrap().values_mut() {
            if info.txid == *spender {
                info.block = Some(height);
            }
        }
    }

    pub fn remove(&self, outpoint: &Outpoint) {
        self.spends.lock().unwrap().remove(outpoint);
    }
}

impl Default for NullSpendIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpendIndex for NullSpendIndex {
    fn spender_of(&self, outpoint: &Outpoint) -> Option<SpendInfo> {
        self.spends.lock().unwrap().get(outpoint).copied()
    }
}
