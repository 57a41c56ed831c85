//! Mapping between in-memory graph state and durable records.
//!
//! Amounts are rescaled by `10^-decimals` on the way out and back on the way
//! in; the rescaling is exact, so a record survives a round trip unchanged.

use crate::error::GraphError;
use crate::node::{GraphInput, GraphNode, GraphOutput};
use crate::pruning::PruningState;
use crate::stats::TokenStats;
use slpdb_store::{
    DetailsRecord, GraphRecord, InputRecord, OutputRecord, PruningStateRecord, TokenStatsRecord,
};
use slpdb_types::{TokenAmount, TokenId, TokenVersion, TransactionDetails, TransactionType, TxId};

fn scaled(amount: TokenAmount, decimals: u8) -> String {
    amount.to_scaled_string(decimals)
}

fn parse_amount(s: &str, decimals: u8) -> Result<TokenAmount, GraphError> {
    TokenAmount::from_scaled_str(s, decimals).map_err(|e| GraphError::InvalidRecord(e.to_string()))
}

pub fn details_record(details: &TransactionDetails, decimals: u8) -> DetailsRecord {
    let send_outputs = match details.transaction_type {
        TransactionType::Send => Some(
            details
                .send_outputs
                .iter()
                .map(|a| scaled(*a, decimals))
                .collect(),
        ),
        _ => None,
    };
    DetailsRecord {
        transaction_type: details.transaction_type,
        token_id: details.token_id,
        version_type: details.version.as_byte(),
        decimals: details.decimals,
        symbol: details.symbol.clone(),
        name: details.name.clone(),
        document_uri: details.document_uri.clone(),
        document_sha256_hex: details.document_sha256.map(hex::encode),
        baton_vout: details.baton_vout,
        contains_baton: details.baton_vout.is_some(),
        genesis_or_mint_quantity: details
            .genesis_or_mint_quantity
            .map(|q| scaled(q, decimals)),
        send_outputs,
    }
}

pub fn details_from_record(
    record: &DetailsRecord,
    decimals: u8,
) -> Result<TransactionDetails, GraphError> {
    let version = TokenVersion::from_byte(record.version_type).ok_or_else(|| {
        GraphError::InvalidRecord(format!("unknown token version {:#04x}", record.version_type))
    })?;
    let document_sha256 = match &record.document_sha256_hex {
        Some(h) => {
            let bytes = hex::decode(h).map_err(|e| GraphError::InvalidRecord(e.to_string()))?;
            let hash: [u8; 32] = bytes.try_into().map_err(|_| {
                GraphError::InvalidRecord(format!("document hash is not 32 bytes: {h}"))
            })?;
            Some(hash)
        }
        None => None,
    };
    let genesis_or_mint_quantity = record
        .genesis_or_mint_quantity
        .as_deref()
        .map(|q| parse_amount(q, decimals))
        .transpose()?;
    let send_outputs = match &record.send_outputs {
        Some(outputs) => outputs
            .iter()
            .map(|a| parse_amount(a, decimals))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(TransactionDetails {
        transaction_type: record.transaction_type,
        token_id: record.token_id,
        version,
        decimals: record.decimals,
        symbol: record.symbol.clone(),
        name: record.name.clone(),
        document_uri: record.document_uri.clone(),
        document_sha256,
        baton_vout: record.baton_vout,
        genesis_or_mint_quantity,
        send_outputs,
    })
}

fn output_record(output: &GraphOutput, decimals: u8) -> OutputRecord {
    OutputRecord {
        vout: output.vout,
        address: output.address.clone(),
        satoshis: output.satoshis,
        token_amount: scaled(output.amount, decimals),
        spending_txid: output.spending_txid,
        status: output.status,
        invalid_reason: output.invalid_reason.clone(),
    }
}

fn input_record(input: &GraphInput, decimals: u8) -> InputRecord {
    InputRecord {
        txid: input.txid,
        vout: input.vout,
        address: input.address.clone(),
        satoshis: input.satoshis,
        token_amount: scaled(input.amount, decimals),
    }
}

/// Build the durable record of one node.
pub fn graph_record(
    token_id: &TokenId,
    decimals: u8,
    txid: &TxId,
    node: &GraphNode,
    prune_height: Option<u32>,
) -> GraphRecord {
    GraphRecord {
        token_id: *token_id,
        txid: *txid,
        details: details_record(&node.details, decimals),
        outputs: node
            .outputs
            .iter()
            .map(|o| output_record(o, decimals))
            .collect(),
        inputs: node
            .inputs
            .iter()
            .map(|i| input_record(i, decimals))
            .collect(),
        block_hash: node.block_hash,
        prune_height,
    }
}

/// Rebuild a clean node from its record.
pub fn node_from_record(record: &GraphRecord, decimals: u8) -> Result<GraphNode, GraphError> {
    let outputs = record
        .outputs
        .iter()
        .map(|o| {
            Ok(GraphOutput {
                vout: o.vout,
                address: o.address.clone(),
                satoshis: o.satoshis,
                amount: parse_amount(&o.token_amount, decimals)?,
                spending_txid: o.spending_txid,
                status: o.status,
                invalid_reason: o.invalid_reason.clone(),
            })
        })
        .collect::<Result<Vec<_>, GraphError>>()?;
    let inputs = record
        .inputs
        .iter()
        .map(|i| {
            Ok(GraphInput {
                txid: i.txid,
                vout: i.vout,
                address: i.address.clone(),
                satoshis: i.satoshis,
                amount: parse_amount(&i.token_amount, decimals)?,
            })
        })
        .collect::<Result<Vec<_>, GraphError>>()?;
    Ok(GraphNode {
        details: details_from_record(&record.details, decimals)?,
        outputs,
        inputs,
        block_hash: record.block_hash,
        dirty: false,
        prune_height: record.prune_height,
    })
}

pub fn stats_record(stats: &TokenStats, decimals: u8) -> TokenStatsRecord {
    TokenStatsRecord {
        block_created: stats.block_created,
        qty_valid_txns_since_genesis: stats.valid_txns_since_genesis,
        qty_valid_token_utxos: stats.valid_token_utxos,
        qty_valid_token_addresses: stats.valid_token_addresses,
        qty_token_minted: scaled(stats.minted, decimals),
        qty_token_burned: scaled(stats.burned, decimals),
        qty_token_circulating_supply: scaled(stats.circulating_supply, decimals),
        qty_satoshis_locked_up: stats.satoshis_locked_up,
        minting_baton_status: stats.baton_status,
    }
}

pub fn pruning_state_record(state: &PruningState, decimals: u8) -> PruningStateRecord {
    PruningStateRecord {
        send_count: state.send_count,
        mint_count: state.mint_count,
        mint_quantity: scaled(state.mint_quantity, decimals),
        burned_quantity: scaled(state.burned_quantity, decimals),
    }
}

pub fn pruning_state_from_record(
    record: &PruningStateRecord,
    decimals: u8,
) -> Result<PruningState, GraphError> {
    Ok(PruningState {
        send_count: record.send_count,
        mint_count: record.mint_count,
        mint_quantity: parse_amount(&record.mint_quantity, decimals)?,
        burned_quantity: parse_amount(&record.burned_quantity, decimals)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_types::{BlockHash, TokenUtxoStatus};

    fn sample_node() -> (TokenId, TxId, GraphNode) {
        let token = TxId::new([1; 32]);
        let txid = TxId::new([2; 32]);
        let mut details =
            TransactionDetails::send(token, 2, &[TokenAmount::new(400), TokenAmount::new(1)]);
        details.symbol = "TOK".into();
        details.document_sha256 = Some([0xab; 32]);
        let mut node = GraphNode::new(details, Some(BlockHash::new([9; 32])));
        let mut spent = GraphOutput::token(1, "addr-1".into(), 546, TokenAmount::new(400));
        spent.status = TokenUtxoStatus::SpentInvalidSlp.into();
        spent.spending_txid = Some(TxId::new([3; 32]));
        spent.invalid_reason = Some("bad".into());
        node.outputs.push(spent);
        node.outputs
            .push(GraphOutput::token(2, "addr-2".into(), 546, TokenAmount::new(1)));
        node.outputs
            .push(GraphOutput::excess_burned(TokenAmount::new(599)));
        node.inputs.push(GraphInput {
            txid: token,
            vout: 1,
            address: "addr-0".into(),
            satoshis: 546,
            amount: TokenAmount::new(1000),
        });
        (token, txid, node)
    }

    #[test]
    fn amounts_persist_rescaled() {
        let (token, txid, node) = sample_node();
        let record = graph_record(&token, 2, &txid, &node, None);
        assert_eq!(record.outputs[0].token_amount, "4.00");
        assert_eq!(record.outputs[2].token_amount, "5.99");
        assert_eq!(record.outputs[2].vout, None);
        assert_eq!(record.inputs[0].token_amount, "10.00");
        assert_eq!(
            record.details.send_outputs,
            Some(vec!["0.00".into(), "4.00".into(), "0.01".into()])
        );
    }

    #[test]
    fn node_record_round_trip() {
        let (token, txid, node) = sample_node();
        let record = graph_record(&token, 2, &txid, &node, Some(500));
        let back = node_from_record(&record, 2).unwrap();
        assert!(!back.dirty);
        assert_eq!(back.prune_height, Some(500));
        assert_eq!(back.outputs, node.outputs);
        assert_eq!(back.inputs, node.inputs);
        assert_eq!(back.details, node.details);
        assert_eq!(graph_record(&token, 2, &txid, &back, back.prune_height), record);
    }

    #[test]
    fn record_survives_json() {
        let (token, txid, node) = sample_node();
        let record = graph_record(&token, 2, &txid, &node, None);
        let json = serde_json::to_string(&record).unwrap();
        let back: GraphRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unknown_version_byte_is_invalid() {
        let (token, txid, node) = sample_node();
        let mut record = graph_record(&token, 2, &txid, &node, None);
        record.details.version_type = 0x07;
        assert!(matches!(
            node_from_record(&record, 2),
            Err(GraphError::InvalidRecord(_))
        ));
    }

    #[test]
    fn over_precise_amount_is_invalid() {
        let (token, txid, node) = sample_node();
        let mut record = graph_record(&token, 2, &txid, &node, None);
        record.outputs[0].token_amount = "4.001".into();
        assert!(node_from_record(&record, 2).is_err());
    }
}
