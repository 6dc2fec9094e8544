use std::collections::HashMap;

use crate::error::{ConfigError, Warning};

/// A competing item: opaque identifier plus a display label.
///
/// The item set is fixed before scheduling begins; the crate handles the
/// internal mapping to dense array indices via [`IdMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: String,
    pub label: String,
}

impl Item {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Item { id: id.into(), label: label.into() }
    }

    /// An item whose display label is its identifier.
    pub fn bare(id: impl Into<String>) -> Self {
        let id = id.into();
        Item { label: id.clone(), id }
    }
}

/// Outcome of a single oracle judgment of an ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    FirstWins,
    SecondWins,
    Tie,
}

impl Outcome {
    /// The same verdict seen from the opposite orientation of the pair.
    pub fn flipped(self) -> Outcome {
        match self {
            Outcome::FirstWins => Outcome::SecondWins,
            Outcome::SecondWins => Outcome::FirstWins,
            Outcome::Tie => Outcome::Tie,
        }
    }
}

/// How ties enter the Bradley-Terry likelihood.
///
/// `HalfWin` credits each side half a win per tie (keeps the likelihood
/// well-defined under the continuous model, where exact ties have
/// probability zero). `Ignore` drops ties from the fit entirely; they still
/// count as games for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TiePolicy {
    HalfWin,
    Ignore,
}

/// One row of the final report, in rank order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedEntry {
    pub id: String,
    pub label: String,
    /// Fitted Bradley-Terry strength, geometric mean normalized.
    pub strength: f64,
    /// Win credit from the ledger (ties counted per the tie policy).
    pub wins: f64,
    /// Total judged games, including ties, excluding undecided pairs.
    pub games: u64,
    /// Integer budget units assigned to this rank.
    pub allocation: u64,
}

/// Full result of a fit-rank-allocate pass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankingReport {
    /// Entries sorted best-first; allocations sum exactly to the budget.
    pub entries: Vec<RankedEntry>,
    /// Non-fatal statistical anomalies observed during the fit.
    pub warnings: Vec<Warning>,
    /// False when the fitter hit its iteration cap first.
    pub converged: bool,
    /// Fixed-point iterations actually run.
    pub iterations: usize,
    /// Total verdicts folded into the ledger (decided + ties).
    pub total_comparisons: u64,
}

/// Maps between caller-provided string IDs and internal 0..N indices.
pub struct IdMap {
    ids: Vec<String>,
    id_to_idx: HashMap<String, usize>,
}

impl IdMap {
    pub fn from_items(items: &[Item]) -> Result<Self, ConfigError> {
        let mut id_to_idx = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if id_to_idx.insert(item.id.clone(), idx).is_some() {
                return Err(ConfigError::DuplicateItem(item.id.clone()));
            }
        }
        Ok(IdMap { ids: items.iter().map(|i| i.id.clone()).collect(), id_to_idx })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn id_at(&self, idx: usize) -> &str {
        &self.ids[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_flip() {
        assert_eq!(Outcome::FirstWins.flipped(), Outcome::SecondWins);
        assert_eq!(Outcome::SecondWins.flipped(), Outcome::FirstWins);
        assert_eq!(Outcome::Tie.flipped(), Outcome::Tie);
    }

    #[test]
    fn test_id_map_round_trip() {
        let items = vec![Item::bare("x"), Item::new("y", "Why")];
        let map = IdMap::from_items(&items).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of("y"), Some(1));
        assert_eq!(map.id_at(0), "x");
        assert_eq!(map.index_of("z"), None);
    }

    #[test]
    fn test_id_map_rejects_duplicates() {
        let items = vec![Item::bare("x"), Item::bare("x")];
        assert!(matches!(
            IdMap::from_items(&items),
            Err(ConfigError::DuplicateItem(id)) if id == "x"
        ));
    }
}
