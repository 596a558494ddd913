//! Top-k ranking with a deterministic tie-break.
//!
//! Callers rely on reproducible orderings when scores tie, which is common
//! with implicit feedback and cold entities: ties are always broken by the
//! original candidate order. That rules out `select_nth_unstable`-style
//! partial sorts; a stable full sort keeps the contract.

use std::cmp::Ordering;

/// Candidate indices in descending score order; ties keep candidate order.
///
/// NaN scores compare as equal to everything and therefore also fall back to
/// candidate order rather than panicking.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    indices
}

/// Rank all candidates and keep the first `limit`.
///
/// `limit` is the *internal* fetch size: callers over-fetch past the
/// requested result count to leave room for exclusions applied afterwards
/// (rated items, the queried entity itself). `None` returns the full
/// ranking.
pub fn top_k(scores: &[f32], limit: Option<usize>) -> Vec<usize> {
    let mut ranked = rank_descending(scores);
    if let Some(limit) = limit {
        ranked.truncate(limit.min(ranked.len()));
    }
    ranked
}
