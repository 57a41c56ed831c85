//! Transaction output references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TxId, TypesError};

/// Reference to output `vout` of transaction `txid`. Displayed as `txid:vout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: TxId,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for Outpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| TypesError::InvalidOutpoint(s.to_string()))?;
        let vout = vout
            .parse()
            .map_err(|_| TypesError::InvalidOutpoint(s.to_string()))?;
        Ok(Self::new(txid.parse()?, vout))
    }
}
