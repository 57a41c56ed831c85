//! Token statistics derived from the live graph plus pruned counters.

use crate::graph_store::GraphStore;
use crate::pruning::PruningState;
use slpdb_types::{OutputStatus, TokenAmount, TokenBatonStatus, TransactionType};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenStats {
    pub block_created: Option<u32>,
    pub valid_txns_since_genesis: u64,
    pub valid_token_utxos: u64,
    pub valid_token_addresses: u64,
    pub minted: TokenAmount,
    pub burned: TokenAmount,
    pub circulating_supply: TokenAmount,
    pub satoshis_locked_up: u64,
    pub baton_status: TokenBatonStatus,
}

impl TokenStats {
    /// Collect statistics over `store`.
    ///
    /// Minted supply covers every GENESIS/MINT ever seen, the circulating
    /// supply is what unspent token outputs hold, and everything else was
    /// burned.
    pub fn collect(
        store: &GraphStore,
        pruning: &PruningState,
        block_created: Option<u32>,
        baton_status: TokenBatonStatus,
    ) -> Self {
        let mut minted = pruning.mint_quantity;
        let mut circulating = TokenAmount::ZERO;
        let mut utxos = 0u64;
        let mut satoshis = 0u64;
        let mut addresses = HashSet::new();

        for (_, node) in store.iter() {
            if matches!(
                node.details.transaction_type,
                TransactionType::Genesis | TransactionType::Mint
            ) {
                minted = minted + node.details.genesis_or_mint_quantity.unwrap_or(TokenAmount::ZERO);
            }
            for output in &node.outputs {
                if output.status == OutputStatus::BATON_UNSPENT {
                    satoshis += output.satoshis;
                } else if output.status == OutputStatus::UNSPENT {
                    utxos += 1;
                    satoshis += output.satoshis;
                    circulating = circulating + output.amount;
                    if let Some(address) = &output.address {
                        addresses.insert(address.as_str());
                    }
                }
            }
        }

        Self {
            block_created,
            valid_txns_since_genesis: store.len() as u64 + pruning.pruned_count(),
            valid_token_utxos: utxos,
            valid_token_addresses: addresses.len() as u64,
            minted,
            burned: minted.saturating_sub(circulating),
            circulating_supply: circulating,
            satoshis_locked_up: satoshis,
            baton_status,
        }
    }
}
