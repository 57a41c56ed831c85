//! Decoded ledger transactions and validation verdicts.

use serde::{Deserialize, Serialize};

use crate::{Outpoint, TransactionDetails, TxId};

/// One native output of a decoded transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Owning address as rendered by the decoder (address encoding is opaque here).
    pub address: String,
    pub satoshis: u64,
}

/// A decoded ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: TxId,
    pub inputs: Vec<Outpoint>,
    pub outputs: Vec<TxOutput>,
    /// Protocol message parsed from output 0, if it carries one.
    pub slp_message: Option<TransactionDetails>,
}

impl Transaction {
    pub fn output(&self, vout: u32) -> Option<&TxOutput> {
        self.outputs.get(vout as usize)
    }

    /// Address of output `vout`, or a placeholder when the output is absent.
    pub fn address_of(&self, vout: u32) -> String {
        self.output(vout)
            .map(|o| o.address.clone())
            .unwrap_or_else(|| MISSING_OUTPUT_ADDRESS.to_string())
    }

    pub fn satoshis_of(&self, vout: u32) -> u64 {
        self.output(vout).map(|o| o.satoshis).unwrap_or(0)
    }
}

/// Placeholder address for a token output that has no native output behind it.
pub const MISSING_OUTPUT_ADDRESS: &str = "Missing transaction output.";

/// The Validator's verdict for one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub validity: bool,
    pub details: Option<TransactionDetails>,
    pub invalid_reason: Option<String>,
}

impl Validation {
    pub fn valid(details: TransactionDetails) -> Self {
        Self {
            validity: true,
            details: Some(details),
            invalid_reason: None,
        }
    }

    pub fn invalid(details: Option<TransactionDetails>, reason: impl Into<String>) -> Self {
        Self {
            validity: false,
            details,
            invalid_reason: Some(reason.into()),
        }
    }
}
