use proptest::prelude::*;

use slpdb_graph::{ChainTracker, ExtendOutcome, GraphContext, PruningConfig, TokenGraph};
use slpdb_nullables::{NullGraphStorage, NullLedger};
use slpdb_store::Validator;
use slpdb_types::{Outpoint, TokenAmount, TxId};
use std::sync::Arc;

fn graph_for(ledger: &NullLedger, token: TxId) -> TokenGraph {
    let ctx = GraphContext {
        validator: ledger.validator.clone(),
        raw: ledger.raw.clone(),
        storage: Arc::new(NullGraphStorage::new()),
        spends: ledger.spends.clone(),
        chain: Arc::new(ChainTracker::new(10)),
    };
    let genesis = ledger.validator.transaction(&token).unwrap().slp_message.unwrap();
    TokenGraph::new(genesis, None, PruningConfig::default(), ctx)
}

fn check_conservation(graph: &TokenGraph, txid: &TxId) -> Result<(), TestCaseError> {
    let node = graph.store().get(txid, false).unwrap();
    prop_assert_eq!(node.output_total(), node.input_total());
    Ok(())
}

proptest! {
    /// Every accepted SEND balances its inputs against outputs plus burn, and
    /// the token's supply always splits into circulating and burned.
    #[test]
    fn sends_conserve_token_amounts(
        quantity in 1u128..1_000_000,
        first in prop::collection::vec(0u128..400_000, 0..5),
        second in prop::collection::vec(0u128..400_000, 0..5),
    ) {
        let ledger = NullLedger::new();
        let token = ledger.genesis(1, 0, quantity, None);
        let mut graph = graph_for(&ledger, token);
        graph.extend(token, None, None).unwrap();

        let s1 = ledger.send(2, token, &[Outpoint::new(token, 1)], &first);
        let outcome = graph.extend(s1, None, None).unwrap();
        let first_total: u128 = first.iter().sum();
        if first_total > quantity {
            prop_assert!(matches!(outcome, ExtendOutcome::Rejected(_)));
            prop_assert_eq!(graph.store().len(), 1);
            return Ok(());
        }
        prop_assert!(outcome.is_inserted());
        check_conservation(&graph, &s1)?;

        let spent: Vec<Outpoint> = first
            .iter()
            .enumerate()
            .filter(|(_, a)| **a > 0)
            .map(|(i, _)| Outpoint::new(s1, i as u32 + 1))
            .collect();
        let s2 = ledger.send(3, token, &spent, &second);
        let outcome = graph.extend(s2, None, None).unwrap();
        let second_total: u128 = second.iter().sum();
        prop_assert_eq!(outcome.is_inserted(), second_total <= first_total);
        if outcome.is_inserted() {
            check_conservation(&graph, &s2)?;
        }

        let stats = graph.stats();
        prop_assert_eq!(stats.minted, TokenAmount::new(quantity));
        prop_assert_eq!(stats.circulating_supply + stats.burned, stats.minted);
    }
}
