//! Durable record shapes for token graphs.
//!
//! Token amounts are persisted as human-scaled fixed-point strings
//! (`raw / 10^decimals`); ids and hashes as lowercase hex. Field names
//! serialize in camelCase to match the document store's schema.

use serde::{Deserialize, Serialize};
use slpdb_types::{
    BlockHash, Outpoint, OutputStatus, TokenBatonStatus, TokenId, TransactionType, TxId,
};

/// Version of the token record layout written by this crate.
pub const TOKEN_SCHEMA_VERSION: u32 = 1;

/// Persisted form of [`slpdb_types::TransactionDetails`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsRecord {
    pub transaction_type: TransactionType,
    pub token_id: TokenId,
    pub version_type: u8,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub document_uri: String,
    pub document_sha256_hex: Option<String>,
    pub baton_vout: Option<u32>,
    pub contains_baton: bool,
    pub genesis_or_mint_quantity: Option<String>,
    pub send_outputs: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// Absent only for the synthetic burned-surplus output.
    pub vout: Option<u32>,
    pub address: Option<String>,
    pub satoshis: u64,
    pub token_amount: String,
    pub spending_txid: Option<TxId>,
    pub status: OutputStatus,
    pub invalid_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    pub txid: TxId,
    pub vout: u32,
    pub address: String,
    pub satoshis: u64,
    pub token_amount: String,
}

/// One persisted graph node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecord {
    pub token_id: TokenId,
    pub txid: TxId,
    pub details: DetailsRecord,
    pub outputs: Vec<OutputRecord>,
    pub inputs: Vec<InputRecord>,
    pub block_hash: Option<BlockHash>,
    /// Set once the node was evicted; such records are not loaded back.
    pub prune_height: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatsRecord {
    pub block_created: Option<u32>,
    pub qty_valid_txns_since_genesis: u64,
    pub qty_valid_token_utxos: u64,
    pub qty_valid_token_addresses: u64,
    pub qty_token_minted: String,
    pub qty_token_burned: String,
    pub qty_token_circulating_supply: String,
    pub qty_satoshis_locked_up: u64,
    pub minting_baton_status: TokenBatonStatus,
}

/// Counters carried forward from evicted nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruningStateRecord {
    pub send_count: u64,
    pub mint_count: u64,
    pub mint_quantity: String,
    pub burned_quantity: String,
}

/// Per-token record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub token_id: TokenId,
    pub schema_version: u32,
    pub is_graph_pruned: bool,
    pub last_updated_block: u32,
    pub genesis_details: DetailsRecord,
    pub mint_baton_utxo: Option<Outpoint>,
    pub stats: TokenStatsRecord,
    pub pruning_state: PruningStateRecord,
    pub nft_parent_id: Option<TxId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_types::TokenUtxoStatus;

    #[test]
    fn output_record_uses_camel_case_names() {
        let rec = OutputRecord {
            vout: Some(1),
            address: Some("addr".into()),
            satoshis: 546,
            token_amount: "10.00".into(),
            spending_txid: None,
            status: TokenUtxoStatus::Unspent.into(),
            invalid_reason: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["tokenAmount"], "10.00");
        assert_eq!(json["spendingTxid"], serde_json::Value::Null);
        assert_eq!(json["status"], "UNSPENT");
        let back: OutputRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
