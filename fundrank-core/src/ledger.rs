//! Comparison ledger: the single mutable accumulator in the pipeline.
//!
//! Folds oracle verdicts into symmetric per-pair win counts. Folding is
//! purely additive and commutative, so verdicts may arrive in any order
//! (callers doing concurrent judging funnel `record` through one mutex).
//! The ledger is the sole input to the fitter.

use std::collections::BTreeMap;

use crate::types::{Outcome, TiePolicy};

/// Counts accumulated for one unordered pair, oriented so that "first" is
/// the lower of the two item indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairRecord {
    pub first_wins: u32,
    pub second_wins: u32,
    pub ties: u32,
    /// Pairs abandoned after the oracle exhausted its retries. Kept for the
    /// audit trail; contribute to neither side and never enter the fit.
    pub undecided: u32,
}

impl PairRecord {
    fn flipped(self) -> PairRecord {
        PairRecord {
            first_wins: self.second_wins,
            second_wins: self.first_wins,
            ties: self.ties,
            undecided: self.undecided,
        }
    }

    /// Judged games for this pair (decided + ties, not undecided).
    pub fn games(&self) -> u32 {
        self.first_wins + self.second_wins + self.ties
    }
}

pub struct Ledger {
    num_items: usize,
    // BTreeMap so snapshots iterate in a deterministic order.
    pairs: BTreeMap<(usize, usize), PairRecord>,
}

impl Ledger {
    pub fn new(num_items: usize) -> Self {
        Ledger { num_items, pairs: BTreeMap::new() }
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    fn normalize(&self, first: usize, second: usize) -> ((usize, usize), bool) {
        assert!(first < self.num_items, "item index {} out of range", first);
        assert!(second < self.num_items, "item index {} out of range", second);
        assert!(first != second, "an item is never paired with itself (index {})", first);
        if first < second { ((first, second), false) } else { ((second, first), true) }
    }

    /// Fold one verdict into the accumulator. Counts only add, so any fold
    /// order produces the same snapshot.
    pub fn record(&mut self, first: usize, second: usize, outcome: Outcome) {
        let (key, swapped) = self.normalize(first, second);
        let outcome = if swapped { outcome.flipped() } else { outcome };
        let rec = self.pairs.entry(key).or_default();
        match outcome {
            Outcome::FirstWins => rec.first_wins += 1,
            Outcome::SecondWins => rec.second_wins += 1,
            Outcome::Tie => rec.ties += 1,
        }
    }

    /// Record a pair whose judgment was abandoned (oracle retries exhausted).
    pub fn record_undecided(&mut self, first: usize, second: usize) {
        let (key, _) = self.normalize(first, second);
        self.pairs.entry(key).or_default().undecided += 1;
    }

    /// Order-independent lookup: the record as seen from (first, second).
    /// All-zero if the pair was never submitted.
    pub fn get(&self, first: usize, second: usize) -> PairRecord {
        let (key, swapped) = self.normalize(first, second);
        let rec = self.pairs.get(&key).copied().unwrap_or_default();
        if swapped { rec.flipped() } else { rec }
    }

    /// Snapshot iterator over all recorded pairs, keys oriented low-to-high.
    pub fn pairs(&self) -> impl Iterator<Item = ((usize, usize), PairRecord)> + '_ {
        self.pairs.iter().map(|(&k, &v)| (k, v))
    }

    /// Total judged comparisons across all pairs (excludes undecided).
    pub fn total_comparisons(&self) -> u64 {
        self.pairs.values().map(|r| r.games() as u64).sum()
    }

    /// True when no pair has any judged game.
    pub fn is_unjudged(&self) -> bool {
        self.pairs.values().all(|r| r.games() == 0)
    }

    /// Per-item (win credit, judged games). Ties credit each side per the
    /// tie policy but always count as a game.
    pub fn win_game_totals(&self, tie_policy: TiePolicy) -> (Vec<f64>, Vec<u64>) {
        let tie_credit = match tie_policy {
            TiePolicy::HalfWin => 0.5,
            TiePolicy::Ignore => 0.0,
        };
        let mut wins = vec![0.0; self.num_items];
        let mut games = vec![0u64; self.num_items];
        for (&(a, b), rec) in &self.pairs {
            wins[a] += rec.first_wins as f64 + tie_credit * rec.ties as f64;
            wins[b] += rec.second_wins as f64 + tie_credit * rec.ties as f64;
            games[a] += rec.games() as u64;
            games[b] += rec.games() as u64;
        }
        (wins, games)
    }

    /// Number of connected components among items that have at least one
    /// judged game. Items with no comparisons are excluded (reported
    /// separately as uncompared). Returns 0 when nothing was judged.
    pub fn observed_components(&self) -> usize {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); self.num_items];
        let mut seen_item = vec![false; self.num_items];
        for (&(a, b), rec) in &self.pairs {
            if rec.games() == 0 {
                continue;
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
            seen_item[a] = true;
            seen_item[b] = true;
        }

        let mut visited = vec![false; self.num_items];
        let mut components = 0;
        for start in 0..self.num_items {
            if !seen_item[start] || visited[start] {
                continue;
            }
            components += 1;
            let mut stack = vec![start];
            visited[start] = true;
            while let Some(node) = stack.pop() {
                for &next in &adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
        }
        components
    }

    /// Per-item flag: has this item any judged game?
    pub fn compared(&self) -> Vec<bool> {
        let mut seen = vec![false; self.num_items];
        for (&(a, b), rec) in &self.pairs {
            if rec.games() > 0 {
                seen[a] = true;
                seen[b] = true;
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let ledger = Ledger::new(3);
        assert_eq!(ledger.get(0, 2), PairRecord::default());
        assert_eq!(ledger.total_comparisons(), 0);
        assert!(ledger.is_unjudged());
        assert_eq!(ledger.observed_components(), 0);
    }

    #[test]
    fn test_symmetric_lookup() {
        let mut ledger = Ledger::new(2);
        ledger.record(1, 0, Outcome::FirstWins); // item 1 beat item 0

        let forward = ledger.get(1, 0);
        assert_eq!(forward.first_wins, 1);
        assert_eq!(forward.second_wins, 0);

        let backward = ledger.get(0, 1);
        assert_eq!(backward.first_wins, 0);
        assert_eq!(backward.second_wins, 1);
    }

    #[test]
    fn test_fold_is_commutative() {
        let verdicts = [
            (0usize, 1usize, Outcome::FirstWins),
            (2, 1, Outcome::Tie),
            (0, 2, Outcome::SecondWins),
            (1, 0, Outcome::FirstWins),
        ];

        let mut in_order = Ledger::new(3);
        for &(a, b, o) in &verdicts {
            in_order.record(a, b, o);
        }

        let mut shuffled = Ledger::new(3);
        for &(a, b, o) in &[verdicts[3], verdicts[0], verdicts[2], verdicts[1]] {
            shuffled.record(a, b, o);
        }

        let lhs: Vec<_> = in_order.pairs().collect();
        let rhs: Vec<_> = shuffled.pairs().collect();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_undecided_counts_for_audit_only() {
        let mut ledger = Ledger::new(2);
        ledger.record_undecided(0, 1);
        ledger.record_undecided(1, 0);

        assert_eq!(ledger.get(0, 1).undecided, 2);
        assert_eq!(ledger.total_comparisons(), 0);
        assert!(ledger.is_unjudged());
        // Undecided pairs do not connect the graph.
        assert_eq!(ledger.observed_components(), 0);
    }

    #[test]
    fn test_win_game_totals_tie_policies() {
        let mut ledger = Ledger::new(2);
        ledger.record(0, 1, Outcome::FirstWins);
        ledger.record(0, 1, Outcome::Tie);

        let (wins, games) = ledger.win_game_totals(TiePolicy::HalfWin);
        assert_eq!(wins, vec![1.5, 0.5]);
        assert_eq!(games, vec![2, 2]);

        let (wins, games) = ledger.win_game_totals(TiePolicy::Ignore);
        assert_eq!(wins, vec![1.0, 0.0]);
        assert_eq!(games, vec![2, 2]);
    }

    #[test]
    fn test_components() {
        let mut ledger = Ledger::new(5);
        ledger.record(0, 1, Outcome::FirstWins);
        ledger.record(2, 3, Outcome::FirstWins);
        // Item 4 never compared.
        assert_eq!(ledger.observed_components(), 2);
        assert_eq!(ledger.compared(), vec![true, true, true, true, false]);

        ledger.record(1, 2, Outcome::Tie);
        assert_eq!(ledger.observed_components(), 1);
    }

    #[test]
    #[should_panic(expected = "never paired with itself")]
    fn test_self_pair_panics() {
        let mut ledger = Ledger::new(2);
        ledger.record(1, 1, Outcome::Tie);
    }
}
