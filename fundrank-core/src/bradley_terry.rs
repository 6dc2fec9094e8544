//! Maximum-likelihood Bradley-Terry fitting via Zermelo's fixed-point
//! iteration (the classical MM update).
//!
//! Operates on a [`Ledger`] snapshot only; pure function, no IO. Ghost-opponent
//! regularization links every item to a virtual average player so the
//! effective graph is always connected and perfect win/loss records keep a
//! finite maximum.

use std::collections::BTreeMap;

use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_PRIOR_STRENGTH, DEFAULT_TOLERANCE};
use crate::error::{ConfigError, Warning};
use crate::ledger::Ledger;
use crate::types::TiePolicy;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitOptions {
    /// Iteration cap; hitting it yields a `DidNotConverge` warning, not an error.
    pub max_iterations: usize,
    /// Stop once the max relative strength change falls below this.
    pub tolerance: f64,
    /// Ghost-opponent pseudo-count. 0 disables regularization entirely.
    pub prior_strength: f64,
    pub tie_policy: TiePolicy,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            prior_strength: DEFAULT_PRIOR_STRENGTH,
            tie_policy: TiePolicy::HalfWin,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if !(self.prior_strength >= 0.0) || !self.prior_strength.is_finite() {
            return Err(ConfigError::InvalidPrior(self.prior_strength));
        }
        Ok(())
    }
}

/// Result of one fit: strengths are positive, geometric mean normalized, and
/// comparable only in ratio (the model is identifiable up to a global scale).
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// One strength per item, in input order. Uncompared items are pinned
    /// to 0.0 (minimum possible rank) rather than given an arbitrary value.
    pub strengths: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub warnings: Vec<Warning>,
}

/// Fit the Bradley-Terry model to a ledger snapshot.
///
/// Degenerate inputs are well-defined: zero items yields an empty vector and
/// a ledger with no judged games yields an all-equal neutral vector.
pub fn fit(ledger: &Ledger, options: &FitOptions) -> Result<FitOutcome, ConfigError> {
    options.validate()?;
    let num_items = ledger.num_items();

    if num_items == 0 {
        return Ok(FitOutcome { strengths: Vec::new(), converged: true, iterations: 0, warnings: Vec::new() });
    }

    if ledger.is_unjudged() {
        return Ok(FitOutcome {
            strengths: vec![1.0; num_items],
            converged: true,
            iterations: 0,
            warnings: Vec::new(),
        });
    }

    let mut solver = Solver::new(ledger, options);
    let (converged, iterations) = solver.run(options.max_iterations, options.tolerance);

    let mut strengths = solver.scores[..num_items].to_vec();

    let mut warnings = Vec::new();
    if !converged {
        warnings.push(Warning::DidNotConverge { iterations });
    }
    let components = ledger.observed_components();
    if components > 1 {
        warnings.push(Warning::DisconnectedGraph { components });
    }

    // Fallback policy for items the oracle never saw: minimum possible rank.
    let compared = ledger.compared();
    let uncompared = compared.iter().filter(|&&c| !c).count();
    if uncompared > 0 {
        for (idx, &was_compared) in compared.iter().enumerate() {
            if !was_compared {
                strengths[idx] = 0.0;
            }
        }
        warnings.push(Warning::UncomparedItems { count: uncompared });
    }

    normalize_geometric(&mut strengths);

    Ok(FitOutcome { strengths, converged, iterations, warnings })
}

/// Zermelo iteration state. Indices 0..num_items are real items; when the
/// prior is active one extra slot holds the ghost opponent.
struct Solver {
    total: usize,
    /// Sparse fractional wins: wins_table[i][j] = win credit of i over j.
    wins_table: Vec<BTreeMap<usize, f64>>,
    total_wins: Vec<f64>,
    scores: Vec<f64>,
}

impl Solver {
    fn new(ledger: &Ledger, options: &FitOptions) -> Self {
        let num_items = ledger.num_items();
        let has_ghost = options.prior_strength > 0.0;
        let total = if has_ghost { num_items + 1 } else { num_items };

        let mut wins_table: Vec<BTreeMap<usize, f64>> = (0..total).map(|_| BTreeMap::new()).collect();

        let tie_credit = match options.tie_policy {
            TiePolicy::HalfWin => 0.5,
            TiePolicy::Ignore => 0.0,
        };

        for ((a, b), rec) in ledger.pairs() {
            let a_credit = rec.first_wins as f64 + tie_credit * rec.ties as f64;
            let b_credit = rec.second_wins as f64 + tie_credit * rec.ties as f64;
            // An Ignore-policy pair with only ties contributes no games; keep
            // the edge out of the table so it doesn't distort the denominator.
            if a_credit + b_credit == 0.0 {
                continue;
            }
            // Entries go in both directions even for zero credit, so the
            // sparse iteration below sees every opponent an item faced.
            *wins_table[a].entry(b).or_insert(0.0) += a_credit;
            *wins_table[b].entry(a).or_insert(0.0) += b_credit;
        }

        // Ghost regularization: O(n) pseudo-games instead of O(n^2) priors.
        if has_ghost {
            let ghost = num_items;
            for i in 0..num_items {
                *wins_table[i].entry(ghost).or_insert(0.0) += options.prior_strength;
                *wins_table[ghost].entry(i).or_insert(0.0) += options.prior_strength;
            }
        }

        let mut total_wins = vec![0.0; total];
        for i in 0..total {
            total_wins[i] = wins_table[i].values().sum();
        }

        Solver { total, wins_table, total_wins, scores: vec![1.0; total] }
    }

    fn get_wins(&self, i: usize, j: usize) -> f64 {
        self.wins_table[i].get(&j).copied().unwrap_or(0.0)
    }

    fn run_iteration(&mut self) {
        let mut new_scores = vec![0.0; self.total];

        for i in 0..self.total {
            let wins_i = self.total_wins[i];
            if wins_i == 0.0 {
                // Standard BT behavior: an item that never won anything
                // collapses to zero strength.
                new_scores[i] = 0.0;
                continue;
            }

            let score_i = self.scores[i];
            let mut denominator = 0.0;

            // Only iterate over opponents i actually faced (sparse).
            for (&j, &wins_i_to_j) in &self.wins_table[i] {
                let games = wins_i_to_j + self.get_wins(j, i);
                if games > 0.0 && (score_i + self.scores[j]) > 0.0 {
                    denominator += games / (score_i + self.scores[j]);
                }
            }

            new_scores[i] = if denominator > 0.0 { wins_i / denominator } else { score_i };
        }

        self.scores = new_scores;
    }

    /// Returns (converged, iterations run).
    fn run(&mut self, max_iterations: usize, tolerance: f64) -> (bool, usize) {
        for iteration in 1..=max_iterations {
            let old_scores = self.scores.clone();
            self.run_iteration();
            normalize_geometric(&mut self.scores);

            let max_relative_change = self
                .scores
                .iter()
                .zip(old_scores.iter())
                .map(|(new, old)| (new - old).abs() / old.abs().max(1e-12))
                .fold(0.0_f64, f64::max);

            if max_relative_change < tolerance {
                return (true, iteration);
            }
        }
        (false, max_iterations)
    }
}

/// Divide by the geometric mean of the positive entries so the vector
/// neither drifts toward zero nor infinity across iterations. Zeros stay
/// zero (they carry rank information: never won anything).
fn normalize_geometric(scores: &mut [f64]) {
    let mut log_sum = 0.0;
    let mut positive = 0usize;
    for &score in scores.iter() {
        if score > 0.0 {
            log_sum += score.ln();
            positive += 1;
        }
    }
    if positive == 0 {
        return;
    }
    let geo_mean = (log_sum / positive as f64).exp();
    if geo_mean > 0.0 && geo_mean.is_finite() {
        for score in scores.iter_mut() {
            *score /= geo_mean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    fn ledger_from(n: usize, verdicts: &[(usize, usize, Outcome)]) -> Ledger {
        let mut ledger = Ledger::new(n);
        for &(a, b, o) in verdicts {
            ledger.record(a, b, o);
        }
        ledger
    }

    #[test]
    fn test_transitive_chain_orders_correctly() {
        let ledger = ledger_from(3, &[
            (0, 1, Outcome::FirstWins),
            (1, 2, Outcome::FirstWins),
            (0, 2, Outcome::FirstWins),
        ]);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert!(out.converged);
        assert!(out.strengths[0] > out.strengths[1]);
        assert!(out.strengths[1] > out.strengths[2]);
    }

    #[test]
    fn test_unanimous_evidence_monotonicity() {
        // A beat B every time; B never beat anything it faced.
        let ledger = ledger_from(3, &[
            (0, 1, Outcome::FirstWins),
            (0, 1, Outcome::FirstWins),
            (2, 1, Outcome::FirstWins),
        ]);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert!(out.strengths[0] > out.strengths[1]);
    }

    #[test]
    fn test_no_comparisons_neutral_vector() {
        let ledger = Ledger::new(4);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert_eq!(out.strengths, vec![1.0; 4]);
        assert!(out.converged);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_zero_items() {
        let ledger = Ledger::new(0);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert!(out.strengths.is_empty());
    }

    #[test]
    fn test_geometric_mean_is_one() {
        let ledger = ledger_from(2, &[(0, 1, Outcome::FirstWins), (1, 0, Outcome::FirstWins)]);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        let log_mean: f64 =
            out.strengths.iter().map(|s| s.ln()).sum::<f64>() / out.strengths.len() as f64;
        assert!(log_mean.exp() > 0.99 && log_mean.exp() < 1.01, "geo mean was {}", log_mean.exp());
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let ledger = ledger_from(3, &[
            (0, 1, Outcome::FirstWins),
            (1, 2, Outcome::FirstWins),
        ]);
        let out = fit(&ledger, &FitOptions { max_iterations: 1, ..FitOptions::default() }).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
        assert!(out.warnings.contains(&Warning::DidNotConverge { iterations: 1 }));
        assert_eq!(out.strengths.len(), 3);
    }

    #[test]
    fn test_ties_keep_items_close() {
        let mut ledger = Ledger::new(2);
        for _ in 0..10 {
            ledger.record(0, 1, Outcome::Tie);
        }
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        let ratio = out.strengths[0] / out.strengths[1];
        assert!(ratio > 0.95 && ratio < 1.05, "ratio was {ratio}");
    }

    #[test]
    fn test_disconnected_graph_warns_but_ranks_all() {
        let ledger = ledger_from(4, &[
            (0, 1, Outcome::FirstWins),
            (2, 3, Outcome::FirstWins),
        ]);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert!(out.warnings.contains(&Warning::DisconnectedGraph { components: 2 }));
        assert_eq!(out.strengths.len(), 4);
        for &s in &out.strengths {
            assert!(s.is_finite() && s > 0.0);
        }
        // The two winners are pulled alike by the prior; no cross evidence.
        let ratio = out.strengths[0] / out.strengths[2];
        assert!(ratio > 0.9 && ratio < 1.1, "ratio was {ratio}");
        // Winners above losers inside each component.
        assert!(out.strengths[0] > out.strengths[1]);
        assert!(out.strengths[2] > out.strengths[3]);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let build = || ledger_from(4, &[
            (0, 1, Outcome::FirstWins),
            (2, 3, Outcome::FirstWins),
        ]);
        let a = fit(&build(), &FitOptions::default()).unwrap();
        let b = fit(&build(), &FitOptions::default()).unwrap();
        assert_eq!(a.strengths, b.strengths);
    }

    #[test]
    fn test_uncompared_item_pinned_last() {
        let ledger = ledger_from(3, &[(0, 1, Outcome::FirstWins)]);
        let out = fit(&ledger, &FitOptions::default()).unwrap();
        assert!(out.warnings.contains(&Warning::UncomparedItems { count: 1 }));
        assert_eq!(out.strengths[2], 0.0);
        assert!(out.strengths[0] > 0.0 && out.strengths[1] > 0.0);
    }

    #[test]
    fn test_perfect_record_without_prior_stays_finite() {
        let ledger = ledger_from(2, &[(0, 1, Outcome::FirstWins)]);
        let options = FitOptions { prior_strength: 0.0, ..FitOptions::default() };
        let out = fit(&ledger, &options).unwrap();
        assert!(out.strengths[0].is_finite());
        assert_eq!(out.strengths[1], 0.0); // never won anything
    }

    #[test]
    fn test_invalid_options_rejected() {
        let ledger = Ledger::new(2);
        assert!(fit(&ledger, &FitOptions { max_iterations: 0, ..FitOptions::default() }).is_err());
        assert!(fit(&ledger, &FitOptions { tolerance: 0.0, ..FitOptions::default() }).is_err());
        assert!(fit(&ledger, &FitOptions { prior_strength: -1.0, ..FitOptions::default() }).is_err());
        assert!(fit(&ledger, &FitOptions { tolerance: f64::NAN, ..FitOptions::default() }).is_err());
    }
}
