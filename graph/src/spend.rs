//! Output spend resolution.
//!
//! Given a parent output, find the transaction that spent it and classify the
//! spend. Spender lookups consult, in order, the startup warm cache, the live
//! spend index and finally a storage query.

use slpdb_store::{GraphStorage, SpendIndex, SpendInfo, SpendQueryKind, StoreError, Validator};
use slpdb_types::{
    BatonUtxoStatus, Outpoint, OutputStatus, TokenId, TokenUtxoStatus, TransactionType, TxId,
};
use std::collections::HashMap;
use tracing::{debug, warn};

const BATON_NOT_IN_MINT: &str = "Baton was spent in a non-mint SLP transaction.";
const NO_NATIVE_OUTPUT: &str = "Token output has no corresponding native output.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendResolution {
    pub status: OutputStatus,
    pub spender: Option<TxId>,
    pub invalid_reason: Option<String>,
}

impl SpendResolution {
    fn unspent(baton: bool) -> Self {
        let status = if baton {
            OutputStatus::BATON_UNSPENT
        } else {
            OutputStatus::UNSPENT
        };
        Self {
            status,
            spender: None,
            invalid_reason: None,
        }
    }

    fn spent(status: impl Into<OutputStatus>, spender: TxId, reason: Option<String>) -> Self {
        Self {
            status: status.into(),
            spender: Some(spender),
            invalid_reason: reason,
        }
    }
}

/// Borrowed view of the collaborators a resolution needs.
pub struct SpendResolver<'a> {
    pub token_id: &'a TokenId,
    pub validator: &'a dyn Validator,
    pub spends: &'a dyn SpendIndex,
    pub storage: &'a dyn GraphStorage,
    pub startup: Option<&'a HashMap<Outpoint, SpendInfo>>,
}

impl SpendResolver<'_> {
    /// Find the spender of `outpoint`.
    pub fn spender_of(
        &self,
        outpoint: &Outpoint,
        kind: SpendQueryKind,
    ) -> Result<Option<SpendInfo>, StoreError> {
        if let Some(info) = self.startup.and_then(|cache| cache.get(outpoint)) {
            debug!(%outpoint, "spender found in startup cache");
            return Ok(Some(*info));
        }
        if let Some(info) = self.spends.spender_of(outpoint) {
            return Ok(Some(info));
        }
        let found = self.storage.query_spender(outpoint, kind)?;
        if let Some(info) = &found {
            debug!(%outpoint, spender = %info.txid, "spender found by storage query");
        }
        Ok(found)
    }

    /// Resolve the status of `outpoint`.
    ///
    /// `native_output` tells whether the parent transaction has an underlying
    /// output at that index. With a `ceiling`, spends confirmed at or above
    /// it, and unconfirmed spends, count as not yet happened.
    pub fn resolve(
        &self,
        outpoint: &Outpoint,
        baton: bool,
        native_output: bool,
        ceiling: Option<u32>,
    ) -> Result<SpendResolution, StoreError> {
        let kind = if baton {
            SpendQueryKind::Mint
        } else {
            SpendQueryKind::Send
        };
        let Some(info) = self.spender_of(outpoint, kind)? else {
            return Ok(SpendResolution::unspent(baton));
        };
        if let Some(ceiling) = ceiling {
            if !info.happened_before(ceiling) {
                return Ok(SpendResolution::unspent(baton));
            }
        }

        let valid_for_token = self.validator.is_valid(&info.txid, Some(self.token_id))?;
        let verdict = self.validator.cached_validation(&info.txid);
        if let Some(v) = &verdict {
            if !v.validity {
                self.validator.evict(&info.txid);
            }
        }

        let verdict = match verdict {
            Some(v) if !(v.validity && v.details.is_none()) => v,
            other => {
                warn!(%outpoint, spender = %info.txid, "validator has no verdict for spender");
                let reason = other.and_then(|v| v.invalid_reason);
                return Ok(no_verdict(baton, native_output, reason));
            }
        };

        let spender_type = verdict.details.as_ref().map(|d| d.transaction_type);
        let resolution = if baton {
            match (valid_for_token, verdict.validity, spender_type) {
                (true, _, Some(TransactionType::Mint)) => {
                    SpendResolution::spent(BatonUtxoStatus::BatonSpentInMint, info.txid, None)
                }
                (_, true, _) => SpendResolution::spent(
                    BatonUtxoStatus::BatonSpentNotInMint,
                    info.txid,
                    Some(BATON_NOT_IN_MINT.to_string()),
                ),
                (_, false, Some(_)) => SpendResolution::spent(
                    BatonUtxoStatus::BatonSpentInvalid,
                    info.txid,
                    verdict.invalid_reason,
                ),
                (_, false, None) => {
                    SpendResolution::spent(BatonUtxoStatus::BatonSpentNonSlp, info.txid, None)
                }
            }
        } else {
            match (valid_for_token, verdict.validity, spender_type) {
                (true, _, Some(TransactionType::Send)) => {
                    SpendResolution::spent(TokenUtxoStatus::SpentSameToken, info.txid, None)
                }
                (_, true, _) => {
                    SpendResolution::spent(TokenUtxoStatus::SpentNotInSend, info.txid, None)
                }
                (_, false, _) => SpendResolution::spent(
                    TokenUtxoStatus::SpentInvalidSlp,
                    info.txid,
                    verdict.invalid_reason,
                ),
            }
        };
        Ok(resolution)
    }
}

fn no_verdict(baton: bool, native_output: bool, reason: Option<String>) -> SpendResolution {
    let (status, reason): (OutputStatus, Option<String>) = match (baton, native_output) {
        (false, true) => (TokenUtxoStatus::SpentInvalidSlp.into(), reason),
        (true, true) => (BatonUtxoStatus::BatonSpentInvalid.into(), reason),
        (false, false) => (
            TokenUtxoStatus::MissingCorrespondingOutput.into(),
            Some(NO_NATIVE_OUTPUT.to_string()),
        ),
        (true, false) => (
            BatonUtxoStatus::BatonMissingCorrespondingOutput.into(),
            Some(NO_NATIVE_OUTPUT.to_string()),
        ),
    };
    SpendResolution {
        status,
        spender: None,
        invalid_reason: reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slpdb_nullables::ledger::fixture_tx;
    use slpdb_types::Validation;
    use slpdb_nullables::{NullGraphStorage, NullLedger};

    struct Fixture {
        ledger: NullLedger,
        storage: NullGraphStorage,
        token: TokenId,
    }

    impl Fixture {
        fn new() -> Self {
            let ledger = NullLedger::new();
            let token = ledger.genesis(1, 0, 100, Some(2));
            Self {
                ledger,
                storage: NullGraphStorage::new(),
                token,
            }
        }

        fn resolver<'a>(
            &'a self,
            startup: Option<&'a HashMap<Outpoint, SpendInfo>>,
        ) -> SpendResolver<'a> {
            SpendResolver {
                token_id: &self.token,
                validator: self.ledger.validator.as_ref(),
                spends: self.ledger.spends.as_ref(),
                storage: &self.storage,
                startup,
            }
        }
    }

    #[test]
    fn unspent_output_resolves_unspent() {
        let f = Fixture::new();
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 1), false, true, None)
            .unwrap();
        assert_eq!(r, SpendResolution::unspent(false));
    }

    #[test]
    fn valid_send_spend_is_same_token() {
        let f = Fixture::new();
        let send = f.ledger.send(2, f.token, &[Outpoint::new(f.token, 1)], &[100]);
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 1), false, true, None)
            .unwrap();
        assert_eq!(r.status, TokenUtxoStatus::SpentSameToken.into());
        assert_eq!(r.spender, Some(send));
    }

    #[test]
    fn invalid_spender_burns_and_is_evicted() {
        let f = Fixture::new();
        let bad = f
            .ledger
            .invalid_send(2, f.token, &[Outpoint::new(f.token, 1)], &[500], "too much");
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 1), false, true, None)
            .unwrap();
        assert_eq!(r.status, TokenUtxoStatus::SpentInvalidSlp.into());
        assert_eq!(r.invalid_reason.as_deref(), Some("too much"));
        assert!(f.ledger.validator.evicted().contains(&bad));
    }

    #[test]
    fn baton_spent_by_mint() {
        let f = Fixture::new();
        f.ledger.mint(2, f.token, Outpoint::new(f.token, 2), 50, Some(2));
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 2), true, true, None)
            .unwrap();
        assert_eq!(r.status, BatonUtxoStatus::BatonSpentInMint.into());
    }

    #[test]
    fn baton_spent_by_send_is_not_in_mint() {
        let f = Fixture::new();
        f.ledger.send(2, f.token, &[Outpoint::new(f.token, 2)], &[]);
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 2), true, true, None)
            .unwrap();
        assert_eq!(r.status, BatonUtxoStatus::BatonSpentNotInMint.into());
        assert_eq!(r.invalid_reason.as_deref(), Some(BATON_NOT_IN_MINT));
    }

    #[test]
    fn baton_spent_by_plain_transaction_is_non_slp() {
        let f = Fixture::new();
        f.ledger.non_token(2, &[Outpoint::new(f.token, 2)]);
        let r = f
            .resolver(None)
            .resolve(&Outpoint::new(f.token, 2), true, true, None)
            .unwrap();
        assert_eq!(r.status, BatonUtxoStatus::BatonSpentNonSlp.into());
    }

    #[test]
    fn ceiling_hides_later_and_unconfirmed_spends() {
        let f = Fixture::new();
        let send = f.ledger.send(2, f.token, &[Outpoint::new(f.token, 1)], &[100]);
        let op = Outpoint::new(f.token, 1);

        let r = f.resolver(None).resolve(&op, false, true, Some(200)).unwrap();
        assert_eq!(r.status, OutputStatus::UNSPENT);

        f.ledger.confirm(&send, 200);
        let r = f.resolver(None).resolve(&op, false, true, Some(200)).unwrap();
        assert_eq!(r.status, OutputStatus::UNSPENT);

        let r = f.resolver(None).resolve(&op, false, true, Some(201)).unwrap();
        assert_eq!(r.status, TokenUtxoStatus::SpentSameToken.into());
    }

    #[test]
    fn startup_cache_takes_priority() {
        let f = Fixture::new();
        f.ledger.send(2, f.token, &[Outpoint::new(f.token, 1)], &[100]);
        let other = f.ledger.send(3, f.token, &[], &[]);
        let mut cache = HashMap::new();
        cache.insert(Outpoint::new(f.token, 1), SpendInfo::new(other, None));
        let r = f
            .resolver(Some(&cache))
            .resolve(&Outpoint::new(f.token, 1), false, true, None)
            .unwrap();
        assert_eq!(r.spender, Some(other));
    }

    #[test]
    fn spender_without_details_classifies_by_native_output() {
        let f = Fixture::new();
        let op = Outpoint::new(f.token, 1);
        f.ledger.add(
            fixture_tx(9, vec![op], 2, None),
            Validation {
                validity: true,
                details: None,
                invalid_reason: None,
            },
        );

        let r = f.resolver(None).resolve(&op, false, false, None).unwrap();
        assert_eq!(r.status, TokenUtxoStatus::MissingCorrespondingOutput.into());
        assert_eq!(r.spender, None);

        let r = f.resolver(None).resolve(&op, false, true, None).unwrap();
        assert_eq!(r.status, TokenUtxoStatus::SpentInvalidSlp.into());

        let r = f.resolver(None).resolve(&op, true, false, None).unwrap();
        assert_eq!(
            r.status,
            BatonUtxoStatus::BatonMissingCorrespondingOutput.into()
        );
    }
}
