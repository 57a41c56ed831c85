//! Span constructors for graph operations.
//!
//! Consistent span names and fields make traces of one token easy to filter.

use slpdb_types::{TokenId, TxId};
use tracing::{info_span, Span};

/// One `extend` job on a token graph.
pub fn extend_span(token: &TokenId, txid: &TxId) -> Span {
    info_span!("graph_extend", token = %token, txid = %txid)
}

/// One persistence sweep.
pub fn sweep_span(token: &TokenId, mode: &'static str) -> Span {
    info_span!("graph_sweep", token = %token, mode)
}

/// One debounce cycle draining `pending` ids.
pub fn debounce_span(token: &TokenId, pending: usize) -> Span {
    info_span!("debounce_cycle", token = %token, pending)
}
