//! Parsed protocol details of a token transaction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{TokenAmount, TokenId};

/// Protocol subtype of a token transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Creates a token.
    Genesis,
    /// Increases supply; requires spending the minting baton.
    Mint,
    /// Transfers existing supply.
    Send,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Genesis => "GENESIS",
            Self::Mint => "MINT",
            Self::Send => "SEND",
        };
        f.write_str(s)
    }
}

/// Token kind as declared by the protocol version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenVersion {
    Fungible,
    Nft1Group,
    Nft1Child,
}

impl TokenVersion {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Fungible),
            0x81 => Some(Self::Nft1Group),
            0x41 => Some(Self::Nft1Child),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Fungible => 0x01,
            Self::Nft1Group => 0x81,
            Self::Nft1Child => 0x41,
        }
    }
}

/// Details parsed from a transaction's protocol message.
///
/// `send_outputs` is indexed by output index: entry 0 is the protocol marker
/// output and never carries tokens. It is empty for GENESIS and MINT.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub transaction_type: TransactionType,
    pub token_id: TokenId,
    pub version: TokenVersion,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub document_uri: String,
    pub document_sha256: Option<[u8; 32]>,
    pub baton_vout: Option<u32>,
    pub genesis_or_mint_quantity: Option<TokenAmount>,
    pub send_outputs: Vec<TokenAmount>,
}

impl TransactionDetails {
    /// Details for a GENESIS transaction; the token id is the genesis txid.
    pub fn genesis(
        token_id: TokenId,
        decimals: u8,
        quantity: TokenAmount,
        baton_vout: Option<u32>,
    ) -> Self {
        Self {
            transaction_type: TransactionType::Genesis,
            token_id,
            version: TokenVersion::Fungible,
            decimals,
            symbol: String::new(),
            name: String::new(),
            document_uri: String::new(),
            document_sha256: None,
            baton_vout,
            genesis_or_mint_quantity: Some(quantity),
            send_outputs: Vec::new(),
        }
    }

    pub fn mint(
        token_id: TokenId,
        decimals: u8,
        quantity: TokenAmount,
        baton_vout: Option<u32>,
    ) -> Self {
        Self {
            transaction_type: TransactionType::Mint,
            ..Self::genesis(token_id, decimals, quantity, baton_vout)
        }
    }

    /// Details for a SEND; `amounts[i]` goes to output `i + 1`.
    pub fn send(token_id: TokenId, decimals: u8, amounts: &[TokenAmount]) -> Self {
        let mut send_outputs = Vec::with_capacity(amounts.len() + 1);
        send_outputs.push(TokenAmount::ZERO);
        send_outputs.extend_from_slice(amounts);
        Self {
            transaction_type: TransactionType::Send,
            baton_vout: None,
            genesis_or_mint_quantity: None,
            send_outputs,
            ..Self::genesis(token_id, decimals, TokenAmount::ZERO, None)
        }
    }

    pub fn with_version(mut self, version: TokenVersion) -> Self {
        self.version = version;
        self
    }

    pub fn is_genesis_or_mint(&self) -> bool {
        matches!(
            self.transaction_type,
            TransactionType::Genesis | TransactionType::Mint
        )
    }

    /// Total declared output amount.
    pub fn declared_total(&self) -> TokenAmount {
        match self.transaction_type {
            TransactionType::Send => self.send_outputs.iter().skip(1).sum(),
            _ => self.genesis_or_mint_quantity.unwrap_or(TokenAmount::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TxId;

    #[test]
    fn send_reserves_marker_slot() {
        let d = TransactionDetails::send(
            TxId::new([1; 32]),
            0,
            &[TokenAmount::new(10), TokenAmount::new(5)],
        );
        assert_eq!(d.send_outputs.len(), 3);
        assert!(d.send_outputs[0].is_zero());
        assert_eq!(d.declared_total(), TokenAmount::new(15));
    }

    #[test]
    fn version_byte_mapping() {
        for v in [TokenVersion::Fungible, TokenVersion::Nft1Group, TokenVersion::Nft1Child] {
            assert_eq!(TokenVersion::from_byte(v.as_byte()), Some(v));
        }
        assert_eq!(TokenVersion::from_byte(0x02), None);
    }
}
