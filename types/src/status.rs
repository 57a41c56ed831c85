//! Spend-status enums for token outputs and minting batons.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Status of a token-carrying output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenUtxoStatus {
    Unspent,
    /// Spent by a valid SEND of the same token.
    SpentSameToken,
    /// Spent by a valid transaction that is not a SEND (tokens burned).
    SpentNotInSend,
    /// Spent by a transaction that failed validation (tokens burned).
    SpentInvalidSlp,
    /// The declared token output has no underlying native output.
    MissingCorrespondingOutput,
    /// Synthetic output recording input surplus destroyed by a transaction.
    ExcessInputBurned,
}

/// Status of a minting baton output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatonUtxoStatus {
    BatonUnspent,
    BatonSpentInMint,
    BatonSpentNotInMint,
    BatonSpentNonSlp,
    BatonSpentInvalid,
    BatonMissingCorrespondingOutput,
}

/// Status carried by a graph output: either a token status or a baton status.
///
/// Serialized as the bare protocol name (`"UNSPENT"`, `"BATON_SPENT_IN_MINT"`);
/// the two name families are disjoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputStatus {
    Token(TokenUtxoStatus),
    Baton(BatonUtxoStatus),
}

impl OutputStatus {
    pub const UNSPENT: Self = Self::Token(TokenUtxoStatus::Unspent);
    pub const BATON_UNSPENT: Self = Self::Baton(BatonUtxoStatus::BatonUnspent);

    /// Whether the output can still be spent.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Token(TokenUtxoStatus::Unspent) | Self::Baton(BatonUtxoStatus::BatonUnspent)
        )
    }

    pub fn is_baton(&self) -> bool {
        matches!(self, Self::Baton(_))
    }

    /// Whether the tokens carried by the output left circulation.
    pub fn is_burn(&self) -> bool {
        matches!(
            self,
            Self::Token(
                TokenUtxoStatus::SpentNotInSend
                    | TokenUtxoStatus::SpentInvalidSlp
                    | TokenUtxoStatus::MissingCorrespondingOutput
                    | TokenUtxoStatus::ExcessInputBurned
            )
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token(s) => match s {
                TokenUtxoStatus::Unspent => "UNSPENT",
                TokenUtxoStatus::SpentSameToken => "SPENT_SAME_TOKEN",
                TokenUtxoStatus::SpentNotInSend => "SPENT_NOT_IN_SEND",
                TokenUtxoStatus::SpentInvalidSlp => "SPENT_INVALID_SLP",
                TokenUtxoStatus::MissingCorrespondingOutput => "MISSING_CORRESPONDING_OUTPUT",
                TokenUtxoStatus::ExcessInputBurned => "EXCESS_INPUT_BURNED",
            },
            Self::Baton(s) => match s {
                BatonUtxoStatus::BatonUnspent => "BATON_UNSPENT",
                BatonUtxoStatus::BatonSpentInMint => "BATON_SPENT_IN_MINT",
                BatonUtxoStatus::BatonSpentNotInMint => "BATON_SPENT_NOT_IN_MINT",
                BatonUtxoStatus::BatonSpentNonSlp => "BATON_SPENT_NON_SLP",
                BatonUtxoStatus::BatonSpentInvalid => "BATON_SPENT_INVALID",
                BatonUtxoStatus::BatonMissingCorrespondingOutput => {
                    "BATON_MISSING_CORRESPONDING_OUTPUT"
                }
            },
        }
    }
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "UNSPENT" => TokenUtxoStatus::Unspent.into(),
            "SPENT_SAME_TOKEN" => TokenUtxoStatus::SpentSameToken.into(),
            "SPENT_NOT_IN_SEND" => TokenUtxoStatus::SpentNotInSend.into(),
            "SPENT_INVALID_SLP" => TokenUtxoStatus::SpentInvalidSlp.into(),
            "MISSING_CORRESPONDING_OUTPUT" => TokenUtxoStatus::MissingCorrespondingOutput.into(),
            "EXCESS_INPUT_BURNED" => TokenUtxoStatus::ExcessInputBurned.into(),
            "BATON_UNSPENT" => BatonUtxoStatus::BatonUnspent.into(),
            "BATON_SPENT_IN_MINT" => BatonUtxoStatus::BatonSpentInMint.into(),
            "BATON_SPENT_NOT_IN_MINT" => BatonUtxoStatus::BatonSpentNotInMint.into(),
            "BATON_SPENT_NON_SLP" => BatonUtxoStatus::BatonSpentNonSlp.into(),
            "BATON_SPENT_INVALID" => BatonUtxoStatus::BatonSpentInvalid.into(),
            "BATON_MISSING_CORRESPONDING_OUTPUT" => {
                BatonUtxoStatus::BatonMissingCorrespondingOutput.into()
            }
            other => return Err(format!("unknown output status: {other}")),
        };
        Ok(status)
    }
}

impl Serialize for OutputStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl From<TokenUtxoStatus> for OutputStatus {
    fn from(s: TokenUtxoStatus) -> Self {
        Self::Token(s)
    }
}

impl From<BatonUtxoStatus> for OutputStatus {
    fn from(s: BatonUtxoStatus) -> Self {
        Self::Baton(s)
    }
}

/// Liveness of a token's minting authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenBatonStatus {
    NeverCreated,
    Alive,
    /// Baton spent outside a MINT or by an invalid transaction.
    DeadBurned,
    /// A MINT deliberately declared no new baton.
    DeadEnded,
}
