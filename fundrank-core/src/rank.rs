//! Ordering of fitted strengths with deterministic tie-breaking.

use std::cmp::Ordering;

use crate::constants::RANK_TIE_TOLERANCE;

/// Item indices sorted by descending strength.
///
/// Strengths within the relative `tolerance` of each other count as tied and
/// keep their relative order from the input list, so identical ledger
/// contents and item order always reproduce the same ranking. The ordering
/// is scale-invariant: multiplying every strength by a positive constant
/// cannot reorder any non-tied pair.
pub fn rank_by_strength(strengths: &[f64], tolerance: f64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..strengths.len()).collect();
    order.sort_by(|&a, &b| {
        strengths[b].partial_cmp(&strengths[a]).unwrap_or(Ordering::Equal).then(a.cmp(&b))
    });

    // Tie bands are anchored at their strongest member: an item joins the
    // current band while it is within tolerance of the anchor, otherwise it
    // opens the next one. Anchored membership keeps the tie relation
    // transitive; pairwise closeness is not (a chain of sub-tolerance steps
    // would chain arbitrarily far apart items together).
    let mut start = 0;
    while start < order.len() {
        let anchor = strengths[order[start]];
        let band = tolerance * anchor.abs();
        let mut end = start + 1;
        while end < order.len() && anchor - strengths[order[end]] <= band {
            end += 1;
        }
        // Within a band, input order.
        order[start..end].sort_unstable();
        start = end;
    }
    order
}

/// Convenience wrapper using the default tie tolerance.
pub fn rank(strengths: &[f64]) -> Vec<usize> {
    rank_by_strength(strengths, RANK_TIE_TOLERANCE)
}
