//! Graph nodes: one per transaction that moved the token.

use slpdb_types::{
    BatonUtxoStatus, BlockHash, Outpoint, OutputStatus, TokenAmount, TokenUtxoStatus,
    TransactionDetails, TxId, MISSING_OUTPUT_ADDRESS,
};

/// A token-carrying (or baton) output of a graph node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphOutput {
    /// `None` only for the synthetic burned-surplus output.
    pub vout: Option<u32>,
    pub address: Option<String>,
    pub satoshis: u64,
    pub amount: TokenAmount,
    pub spending_txid: Option<TxId>,
    pub status: OutputStatus,
    pub invalid_reason: Option<String>,
}

impl GraphOutput {
    pub fn token(vout: u32, address: String, satoshis: u64, amount: TokenAmount) -> Self {
        Self {
            vout: Some(vout),
            address: Some(address),
            satoshis,
            amount,
            spending_txid: None,
            status: OutputStatus::UNSPENT,
            invalid_reason: None,
        }
    }

    pub fn baton(vout: u32, address: String, satoshis: u64) -> Self {
        Self {
            status: OutputStatus::BATON_UNSPENT,
            ..Self::token(vout, address, satoshis, TokenAmount::ZERO)
        }
    }

    /// Surplus input amount destroyed by the owning transaction.
    pub fn excess_burned(amount: TokenAmount) -> Self {
        Self {
            vout: None,
            address: None,
            satoshis: 0,
            amount,
            spending_txid: None,
            status: TokenUtxoStatus::ExcessInputBurned.into(),
            invalid_reason: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn is_baton(&self) -> bool {
        self.status.is_baton()
    }

    /// Whether the owning transaction has a native output at this index.
    pub fn has_native_output(&self) -> bool {
        matches!(self.address.as_deref(), Some(a) if a != MISSING_OUTPUT_ADDRESS)
    }

    /// Reset to the unspent status of the output's family.
    pub fn reset_unspent(&mut self) {
        self.status = match self.status {
            OutputStatus::Baton(_) => BatonUtxoStatus::BatonUnspent.into(),
            OutputStatus::Token(_) => TokenUtxoStatus::Unspent.into(),
        };
        self.spending_txid = None;
        self.invalid_reason = None;
    }
}

/// Snapshot of the parent output an input consumed, taken at resolution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphInput {
    pub txid: TxId,
    pub vout: u32,
    pub address: String,
    pub satoshis: u64,
    pub amount: TokenAmount,
}

impl GraphInput {
    pub fn from_output(outpoint: Outpoint, output: &GraphOutput) -> Self {
        Self {
            txid: outpoint.txid,
            vout: outpoint.vout,
            address: output
                .address
                .clone()
                .unwrap_or_else(|| MISSING_OUTPUT_ADDRESS.to_string()),
            satoshis: output.satoshis,
            amount: output.amount,
        }
    }

    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid, self.vout)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    pub details: TransactionDetails,
    pub outputs: Vec<GraphOutput>,
    pub inputs: Vec<GraphInput>,
    /// Confirming block, `None` while unconfirmed.
    pub block_hash: Option<BlockHash>,
    /// In-memory state not yet reflected in storage.
    pub dirty: bool,
    pub prune_height: Option<u32>,
}

impl GraphNode {
    /// A fresh, dirty node with no outputs or inputs yet.
    pub fn new(details: TransactionDetails, block_hash: Option<BlockHash>) -> Self {
        Self {
            details,
            outputs: Vec::new(),
            inputs: Vec::new(),
            block_hash,
            dirty: true,
            prune_height: None,
        }
    }

    pub fn output(&self, vout: u32) -> Option<&GraphOutput> {
        self.outputs.iter().find(|o| o.vout == Some(vout))
    }

    pub fn output_mut(&mut self, vout: u32) -> Option<&mut GraphOutput> {
        self.outputs.iter_mut().find(|o| o.vout == Some(vout))
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_hash.is_some()
    }

    pub fn has_live_outputs(&self) -> bool {
        self.outputs.iter().any(GraphOutput::is_live)
    }

    /// Sum of all output amounts, the synthetic burn output included.
    pub fn output_total(&self) -> TokenAmount {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    pub fn input_total(&self) -> TokenAmount {
        self.inputs.iter().map(|i| i.amount).sum()
    }

    /// Amount recorded as destroyed by this node's outputs.
    pub fn burned_total(&self) -> TokenAmount {
        self.outputs
            .iter()
            .filter(|o| o.status.is_burn())
            .map(|o| o.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excess_output_has_no_vout() {
        let o = GraphOutput::excess_burned(TokenAmount::new(600));
        assert_eq!(o.vout, None);
        assert!(!o.is_live());
        assert!(o.status.is_burn());
    }

    #[test]
    fn reset_keeps_output_family() {
        let mut baton = GraphOutput::baton(2, "a".into(), 546);
        baton.status = BatonUtxoStatus::BatonSpentInMint.into();
        baton.spending_txid = Some(TxId::new([1; 32]));
        baton.reset_unspent();
        assert_eq!(baton.status, OutputStatus::BATON_UNSPENT);
        assert_eq!(baton.spending_txid, None);
    }

    #[test]
    fn missing_native_output_is_detected() {
        let o = GraphOutput::token(5, MISSING_OUTPUT_ADDRESS.into(), 0, TokenAmount::new(1));
        assert!(!o.has_native_output());
        assert!(GraphOutput::token(1, "addr".into(), 546, TokenAmount::new(1)).has_native_output());
    }
}
