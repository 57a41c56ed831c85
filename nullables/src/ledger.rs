//! A small simulated ledger feeding the nullable validator, raw source and
//! spend index at once.

use crate::{NullRawSource, NullSpendIndex, NullValidator};
use slpdb_store::SpendInfo;
use slpdb_types::{
    BlockRef, Outpoint, TokenAmount, TokenId, TokenVersion, Transaction, TransactionDetails, TxId, TxOutput,
    Validation,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Satoshis carried by every fixture output.
pub const DUST: u64 = 546;

/// Deterministic transaction id for fixtures.
pub fn test_txid(seed: u8) -> TxId {
    TxId::new([seed; 32])
}

/// Outpoint of a non-token funding output, never known to the validator.
pub fn funding_outpoint(seed: u8) -> Outpoint {
    Outpoint::new(TxId::new([0xf0 ^ seed; 32]), 0)
}

pub struct NullLedger {
    pub validator: Arc<NullValidator>,
    pub raw: Arc<NullRawSource>,
    pub spends: Arc<NullSpendIndex>,
    decimals: Mutex<HashMap<TokenId, u8>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            validator: Arc::new(NullValidator::new()),
            raw: Arc::new(NullRawSource::new()),
            spends: Arc::new(NullSpendIndex::new()),
            decimals: Mutex::new(HashMap::new()),
        }
    }

    /// Register `tx` with `validation` and index the spends of its inputs.
    pub fn add(&self, tx: Transaction, validation: Validation) -> TxId {
        let txid = tx.txid;
        for input in &tx.inputs {
            self.spends.record(*input, SpendInfo::new(txid, None));
        }
        self.raw.insert(&tx);
        self.validator.register(tx, validation);
        txid
    }

    /// Like [`Self::add`] but without indexing spends.
    pub fn add_unindexed(&self, tx: Transaction, validation: Validation) -> TxId {
        let txid = tx.txid;
        self.raw.insert(&tx);
        self.validator.register(tx, validation);
        txid
    }

    /// Confirm `txid` at `height` in the spend index.
    pub fn confirm(&self, txid: &TxId, height: u32) {
        self.spends.confirm(txid, height);
    }

    /// Confirm `txid` in `block`, visible to both the spend index and the
    /// raw source.
    pub fn confirm_in(&self, txid: &TxId, block: BlockRef) {
        self.spends.confirm(txid, block.height);
        self.raw.confirm(txid, block);
    }

    pub fn genesis(&self, seed: u8, decimals: u8, quantity: u128, baton_vout: Option<u32>) -> TokenId {
        self.genesis_with(
            seed,
            TokenVersion::Fungible,
            decimals,
            quantity,
            baton_vout,
            vec![funding_outpoint(seed)],
        )
    }

    pub fn genesis_with(
        &self,
        seed: u8,
        version: TokenVersion,
        decimals: u8,
        quantity: u128,
        baton_vout: Option<u32>,
        inputs: Vec<Outpoint>,
    ) -> TokenId {
        let txid = test_txid(seed);
        let details =
            TransactionDetails::genesis(txid, decimals, TokenAmount::new(quantity), baton_vout)
                .with_version(version);
        let width = baton_vout.unwrap_or(1).max(1) + 1;
        self.decimals.lock().unwrap().insert(txid, decimals);
        self.add(fixture_tx(seed, inputs, width, Some(details.clone())), Validation::valid(details))
    }

    pub fn mint(
        &self,
        seed: u8,
        token_id: TokenId,
        baton: Outpoint,
        quantity: u128,
        baton_vout: Option<u32>,
    ) -> TxId {
        let details = TransactionDetails::mint(
            token_id,
            self.decimals_of(&token_id),
            TokenAmount::new(quantity),
            baton_vout,
        )
        .with_version(self.version_of(&token_id));
        let width = baton_vout.unwrap_or(1).max(1) + 1;
        self.add(
            fixture_tx(seed, vec![baton, funding_outpoint(seed)], width, Some(details.clone())),
            Validation::valid(details),
        )
    }

    /// A valid SEND paying `amounts` to vouts 1.. from `inputs`.
    pub fn send(&self, seed: u8, token_id: TokenId, inputs: &[Outpoint], amounts: &[u128]) -> TxId {
        let tx = self.send_tx(seed, token_id, inputs, amounts);
        let details = tx.slp_message.clone().expect("send fixture carries details");
        self.add(tx, Validation::valid(details))
    }

    /// A SEND shaped transaction the validator rejects.
    pub fn invalid_send(
        &self,
        seed: u8,
        token_id: TokenId,
        inputs: &[Outpoint],
        amounts: &[u128],
        reason: &str,
    ) -> TxId {
        let tx = self.send_tx(seed, token_id, inputs, amounts);
        let details = tx.slp_message.clone();
        self.add(tx, Validation::invalid(details, reason))
    }

    /// A plain transaction with no protocol message spending `inputs`.
    pub fn non_token(&self, seed: u8, inputs: &[Outpoint]) -> TxId {
        self.add(
            fixture_tx(seed, inputs.to_vec(), 2, None),
            Validation::invalid(None, "No SLP message"),
        )
    }

    fn send_tx(&self, seed: u8, token_id: TokenId, inputs: &[Outpoint], amounts: &[u128]) -> Transaction {
        let amounts: Vec<TokenAmount> = amounts.iter().copied().map(TokenAmount::new).collect();
        let details = TransactionDetails::send(token_id, self.decimals_of(&token_id), &amounts)
            .with_version(self.version_of(&token_id));
        let width = amounts.len() as u32 + 1;
        fixture_tx(seed, inputs.to_vec(), width, Some(details))
    }

    fn decimals_of(&self, token_id: &TokenId) -> u8 {
        self.decimals.lock().unwrap().get(token_id).copied().unwrap_or(0)
    }

    fn version_of(&self, token_id: &TokenId) -> TokenVersion {
        use slpdb_store::Validator;
        self.validator
            .transaction(token_id)
            .ok()
            .and_then(|tx| tx.slp_message)
            .map(|d| d.version)
            .unwrap_or(TokenVersion::Fungible)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// A transaction with a marker output at vout 0 and `width - 1` dust outputs.
pub fn fixture_tx(
    seed: u8,
    inputs: Vec<Outpoint>,
    width: u32,
    slp_message: Option<TransactionDetails>,
) -> Transaction {
    let mut outputs = vec![TxOutput {
        address: String::from("marker"),
        satoshis: 0,
    }];
    for vout in 1..width {
        outputs.push(TxOutput {
            address: format!("addr-{seed}-{vout}"),
            satoshis: DUST,
        });
    }
    Transaction {
        txid: test_txid(seed),
        inputs,
        outputs,
        slp_message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_store::{SpendIndex, Validator};

    #[test]
    fn send_indexes_its_input_spends() {
        let ledger = NullLedger::new();
        let token = ledger.genesis(1, 2, 1000, Some(2));
        let send = ledger.send(2, token, &[Outpoint::new(token, 1)], &[1000]);
        let spend = ledger.spends.spender_of(&Outpoint::new(token, 1)).unwrap();
        assert_eq!(spend.txid, send);
        assert_eq!(spend.block, None);
        ledger.confirm(&send, 101);
        assert_eq!(
            ledger.spends.spender_of(&Outpoint::new(token, 1)).unwrap().block,
            Some(101)
        );
    }

    #[test]
    fn genesis_has_room_for_baton() {
        let ledger = NullLedger::new();
        let token = ledger.genesis(1, 0, 10, Some(3));
        let tx = ledger.validator.transaction(&token).unwrap();
        assert_eq!(tx.outputs.len(), 4);
        assert_eq!(tx.slp_message.unwrap().token_id, token);
    }
}
