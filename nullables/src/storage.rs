//! Nullable document store.
//!
//! Records are held bincode-encoded so every write goes through a real
//! serialize/deserialize cycle.

use slpdb_store::{
    GraphRecord, GraphStorage, SpendInfo, SpendQueryKind, StoreError, TokenRecord,
};
use slpdb_types::{Outpoint, TokenId, TransactionType, TxId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct NullGraphStorage {
    graph: Mutex<HashMap<TxId, Vec<u8>>>,
    tokens: Mutex<HashMap<TokenId, Vec<u8>>>,
    unavailable: AtomicBool,
    token_writes: AtomicUsize,
    graph_writes: AtomicUsize,
}

impl NullGraphStorage {
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            token_writes: AtomicUsize::new(0),
            graph_writes: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of token record upserts so far.
    pub fn token_writes(&self) -> usize {
        self.token_writes.load(Ordering::SeqCst)
    }

    /// Number of `upsert_graph_records` batches so far.
    pub fn graph_writes(&self) -> usize {
        self.graph_writes.load(Ordering::SeqCst)
    }

    /// Decoded graph record, bypassing availability checks.
    pub fn graph_record(&self, txid: &TxId) -> Option<GraphRecord> {
        self.graph
            .lock()
            .unwrap()
            .get(txid)
            .map(|b| bincode::deserialize(b).expect("stored graph record decodes"))
    }

    pub fn token_record(&self, token_id: &TokenId) -> Option<TokenRecord> {
        self.tokens
            .lock()
            .unwrap()
            .get(token_id)
            .map(|b| bincode::deserialize(b).expect("stored token record decodes"))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null storage switched off".into()));
        }
        Ok(())
    }

    fn decode_graph(bytes: &[u8]) -> Result<GraphRecord, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Default for NullGraphStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStorage for NullGraphStorage {
    fn upsert_graph_records(&self, records: &[GraphRecord]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut graph = self.graph.lock().unwrap();
        for record in records {
            let bytes =
                bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
            graph.insert(record.txid, bytes);
        }
        self.graph_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn upsert_token_record(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let bytes =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.tokens.lock().unwrap().insert(record.token_id, bytes);
        self.token_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fetch_graph_record(&self, txid: &TxId) -> Result<Option<GraphRecord>, StoreError> {
        self.check_available()?;
        self.graph
            .lock()
            .unwrap()
            .get(txid)
            .map(|b| Self::decode_graph(b))
            .transpose()
    }

    fn fetch_token_record(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, StoreError> {
        self.check_available()?;
        self.tokens
            .lock()
            .unwrap()
            .get(token_id)
            .map(|b| bincode::deserialize(b).map_err(|e| StoreError::Serialization(e.to_string())))
            .transpose()
    }

    fn fetch_graph_records(&self, token_id: &TokenId) -> Result<Vec<GraphRecord>, StoreError> {
        self.check_available()?;
        let graph = self.graph.lock().unwrap();
        let mut records = Vec::new();
        for bytes in graph.values() {
            let record = Self::decode_graph(bytes)?;
            if record.token_id == *token_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn delete_graph_records(&self, token_id: &TokenId) -> Result<usize, StoreError> {
        self.check_available()?;
        let mut graph = self.graph.lock().unwrap();
        let mut doomed = Vec::new();
        for (txid, bytes) in graph.iter() {
            if Self::decode_graph(bytes)?.token_id == *token_id {
                doomed.push(*txid);
            }
        }
        for txid in &doomed {
            graph.remove(txid);
        }
        Ok(doomed.len())
    }

    fn query_spender(
        &self,
        outpoint: &Outpoint,
        kind: SpendQueryKind,
    ) -> Result<Option<SpendInfo>, StoreError> {
        self.check_available()?;
        let wanted = match kind {
            SpendQueryKind::Send => TransactionType::Send,
            SpendQueryKind::Mint => TransactionType::Mint,
        };
        let graph = self.graph.lock().unwrap();
        for bytes in graph.values() {
            let record = Self::decode_graph(bytes)?;
            if record.details.transaction_type != wanted {
                continue;
            }
            let spends = record
                .inputs
                .iter()
                .any(|i| i.txid == outpoint.txid && i.vout == outpoint.vout);
            if spends {
                return Ok(Some(SpendInfo::new(record.txid, None)));
            }
        }
        Ok(None)
    }
}
