//! Nullable validator with a registered ground truth and an observable cache.

use slpdb_store::{StoreError, Validator};
use slpdb_types::{TokenId, Transaction, TxId, Validation};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory validator for testing.
///
/// Tests register each transaction with the verdict a real validator would
/// reach. Validating a transaction also caches the verdicts of its known
/// ancestors, the way a DAG-walking validator does.
pub struct NullValidator {
    transactions: Mutex<HashMap<TxId, Transaction>>,
    verdicts: Mutex<HashMap<TxId, Validation>>,
    cache: Mutex<HashMap<TxId, Validation>>,
    evicted: Mutex<Vec<TxId>>,
}

impl NullValidator {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            verdicts: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            evicted: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, tx: Transaction, validation: Validation) {
        self.verdicts.lock().unwrap().insert(tx.txid, validation);
        self.transactions.lock().unwrap().insert(tx.txid, tx);
    }

    /// Ids passed to [`Validator::evict`], in call order.
    pub fn evicted(&self) -> Vec<TxId> {
        self.evicted.lock().unwrap().clone()
    }

    pub fn is_cached(&self, txid: &TxId) -> bool {
        self.cache.lock().unwrap().contains_key(txid)
    }

    fn verdict_of(&self, txid: &TxId) -> Option<Validation> {
        if let Some(v) = self.verdicts.lock().unwrap().get(txid) {
            return Some(v.clone());
        }
        self.transactions
            .lock()
            .unwrap()
            .get(txid)
            .map(|tx| Validation::invalid(tx.slp_message.clone(), "Unregistered transaction"))
    }

    fn cache_ancestors(&self, txid: &TxId) {
        let mut stack = vec![*txid];
        while let Some(id) = stack.pop() {
            let inputs = match self.transactions.lock().unwrap().get(&id) {
                Some(tx) => tx.inputs.clone(),
                None => continue,
            };
            for input in inputs {
                if self.is_cached(&input.txid) {
                    continue;
                }
                if let Some(v) = self.verdicts.lock().unwrap().get(&input.txid).cloned() {
                    self.cache.lock().unwrap().insert(input.txid, v);
                    stack.push(input.txid);
                }
            }
        }
    }
}

impl Default for NullValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for NullValidator {
    fn is_valid(&self, txid: &TxId, token_id: Option<&TokenId>) -> Result<bool, StoreError> {
        let verdict = self
            .verdict_of(txid)
            .ok_or_else(|| StoreError::NotFound(txid.to_string()))?;
        self.cache_ancestors(txid);
        let same_token = match (token_id, &verdict.details) {
            (Some(token), Some(details)) => details.token_id == *token,
            (Some(_), None) => false,
            (None, _) => true,
        };
        let valid = verdict.validity && same_token;
        self.cache.lock().unwrap().insert(*txid, verdict);
        Ok(valid)
    }

    fn cached_validation(&self, txid: &TxId) -> Option<Validation> {
        self.cache.lock().unwrap().get(txid).cloned()
    }

    fn transaction(&self, txid: &TxId) -> Result<Transaction, StoreError> {
        self.transactions
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(txid.to_string()))
    }

    fn decode(&self, raw: &[u8]) -> Result<Transaction, StoreError> {
        bincode::deserialize(raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn preload(&self, txid: TxId, validation: Validation) {
        self.cache.lock().unwrap().insert(txid, validation);
    }

    fn evict(&self, txid: &TxId) {
        self.cache.lock().unwrap().remove(txid);
        self.evicted.lock().unwrap().push(*txid);
    }
}
