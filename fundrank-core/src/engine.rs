//! Report assembly: fit, rank, and allocate in one pure pass over a ledger
//! snapshot. Recomputable at any time; the ledger is the authoritative state.

use crate::allocation::{allocate, AllocationOptions};
use crate::bradley_terry::{fit, FitOptions};
use crate::constants::RANK_TIE_TOLERANCE;
use crate::error::ConfigError;
use crate::ledger::Ledger;
use crate::rank::rank_by_strength;
use crate::types::{IdMap, Item, RankedEntry, RankingReport};

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub fit: FitOptions,
    pub allocation: AllocationOptions,
    /// Strengths within this relative tolerance count as tied and keep
    /// input order.
    pub rank_tolerance: f64,
}

impl EvalOptions {
    pub fn with_budget(budget: u64) -> Self {
        EvalOptions {
            fit: FitOptions::default(),
            allocation: AllocationOptions { budget, ..AllocationOptions::default() },
            rank_tolerance: RANK_TIE_TOLERANCE,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fit.validate()?;
        self.allocation.validate()
    }
}

/// Produce the full ranking report for a set of items and their ledger.
///
/// Deterministic given identical ledger contents and item order. Degenerate
/// inputs (no items, no comparisons) yield neutral, well-defined reports.
pub fn evaluate(
    items: &[Item],
    ledger: &Ledger,
    options: &EvalOptions,
) -> Result<RankingReport, ConfigError> {
    assert_eq!(
        items.len(),
        ledger.num_items(),
        "ledger was built for a different item set"
    );
    IdMap::from_items(items)?;
    options.validate()?;

    let fit_outcome = fit(ledger, &options.fit)?;
    let order = rank_by_strength(&fit_outcome.strengths, options.rank_tolerance);
    let allocations = allocate(items.len(), &options.allocation)?;
    let (wins, games) = ledger.win_game_totals(options.fit.tie_policy);

    let entries = order
        .iter()
        .enumerate()
        .map(|(position, &idx)| RankedEntry {
            id: items[idx].id.clone(),
            label: items[idx].label.clone(),
            strength: fit_outcome.strengths[idx],
            wins: wins[idx],
            games: games[idx],
            allocation: allocations[position],
        })
        .collect();

    Ok(RankingReport {
        entries,
        warnings: fit_outcome.warnings,
        converged: fit_outcome.converged,
        iterations: fit_outcome.iterations,
        total_comparisons: ledger.total_comparisons(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Warning;
    use crate::types::Outcome;

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter().map(|&id| Item::bare(id)).collect()
    }

    /// A wins all, D loses all, budget 1000 at s = 1.
    #[test]
    fn test_four_item_scenario() {
        let set = items(&["A", "B", "C", "D"]);
        let mut ledger = Ledger::new(4);
        for &(a, b) in &[(0, 1), (1, 2), (2, 3), (0, 2), (0, 3), (1, 3)] {
            ledger.record(a, b, Outcome::FirstWins);
        }

        let report = evaluate(&set, &ledger, &EvalOptions::with_budget(1000)).unwrap();
        let order: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);

        let allocations: Vec<u64> = report.entries.iter().map(|e| e.allocation).collect();
        assert_eq!(allocations.iter().sum::<u64>(), 1000);
        for window in allocations.windows(2) {
            assert!(window[0] >= window[1]);
        }
        assert_eq!(allocations, vec![480, 240, 160, 120]);
        assert_eq!(report.total_comparisons, 6);
        assert!(report.converged);
    }

    #[test]
    fn test_zero_comparisons_falls_back_to_input_order() {
        let set = items(&["x", "y", "z"]);
        let ledger = Ledger::new(3);
        let report = evaluate(&set, &ledger, &EvalOptions::with_budget(100)).unwrap();

        let order: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
        assert!(report.entries.iter().all(|e| (e.strength - 1.0).abs() < 1e-12));
        assert_eq!(report.entries.iter().map(|e| e.allocation).sum::<u64>(), 100);
        // The curve still applies by position even though strengths tie.
        assert!(report.entries[0].allocation >= report.entries[2].allocation);
    }

    #[test]
    fn test_disconnected_graph_full_deterministic_ranking() {
        let set = items(&["A", "B", "C", "D"]);
        let build = || {
            let mut ledger = Ledger::new(4);
            ledger.record(0, 1, Outcome::FirstWins);
            ledger.record(2, 3, Outcome::FirstWins);
            ledger
        };

        let first = evaluate(&set, &build(), &EvalOptions::with_budget(400)).unwrap();
        let second = evaluate(&set, &build(), &EvalOptions::with_budget(400)).unwrap();

        assert_eq!(first.entries.len(), 4);
        assert!(first.warnings.contains(&Warning::DisconnectedGraph { components: 2 }));

        let order_a: Vec<&str> = first.entries.iter().map(|e| e.id.as_str()).collect();
        let order_b: Vec<&str> = second.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order_a, order_b);
        assert_eq!(first.entries.iter().map(|e| e.allocation).sum::<u64>(), 400);
    }

    #[test]
    fn test_empty_item_set() {
        let report = evaluate(&[], &Ledger::new(0), &EvalOptions::with_budget(1000)).unwrap();
        assert!(report.entries.is_empty());
        assert!(report.converged);
    }

    #[test]
    fn test_wins_and_games_reported() {
        let set = items(&["a", "b"]);
        let mut ledger = Ledger::new(2);
        ledger.record(0, 1, Outcome::FirstWins);
        ledger.record(0, 1, Outcome::Tie);

        let report = evaluate(&set, &ledger, &EvalOptions::with_budget(10)).unwrap();
        let top = &report.entries[0];
        assert_eq!(top.id, "a");
        assert_eq!(top.games, 2);
        assert!((top.wins - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let set = items(&["a", "a"]);
        let result = evaluate(&set, &Ledger::new(2), &EvalOptions::with_budget(10));
        assert!(matches!(result, Err(ConfigError::DuplicateItem(_))));
    }
}
