//! Budget allocation along a Zipf curve with largest-remainder rounding.
//!
//! weight(rank) = rank^-s, normalized over the considered ranks, scaled to
//! the budget, floored, then leftover units go one each to the largest
//! fractional remainders (earlier rank wins ties). The rounded sum equals
//! the budget exactly; no drift.

use crate::constants::DEFAULT_EXPONENT;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationOptions {
    /// Total budget in integer units; exhausted exactly.
    pub budget: u64,
    /// Zipf exponent s > 0. Larger values skew harder toward the top.
    pub exponent: f64,
    /// Only the best `top_n` ranks receive anything; the whole budget is
    /// split among them. `None` considers every rank.
    pub top_n: Option<usize>,
}

impl Default for AllocationOptions {
    fn default() -> Self {
        AllocationOptions { budget: 0, exponent: DEFAULT_EXPONENT, top_n: None }
    }
}

impl AllocationOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.exponent > 0.0) || !self.exponent.is_finite() {
            return Err(ConfigError::InvalidExponent(self.exponent));
        }
        Ok(())
    }
}

/// Allocations by rank position: `result[0]` is rank 1's share.
///
/// Guarantees for valid options: the sum is exactly `budget`, every share is
/// a non-negative integer, and shares are non-increasing in rank.
pub fn allocate(num_items: usize, options: &AllocationOptions) -> Result<Vec<u64>, ConfigError> {
    options.validate()?;

    let mut allocations = vec![0u64; num_items];
    let considered = options.top_n.unwrap_or(num_items).min(num_items);
    if considered == 0 {
        return Ok(allocations);
    }

    let weights: Vec<f64> =
        (1..=considered).map(|rank| (rank as f64).powf(-options.exponent)).collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(considered);
    let mut floor_sum: u64 = 0;
    for (idx, &w) in weights.iter().enumerate() {
        let ideal = options.budget as f64 * w / weight_sum;
        let floor = ideal.floor() as u64;
        allocations[idx] = floor;
        floor_sum += floor;
        remainders.push((idx, ideal - floor as f64));
    }

    // Largest remainder first; ties go to the earlier rank.
    remainders.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
    });

    let mut leftover = options.budget - floor_sum;
    let mut cursor = 0usize;
    while leftover > 0 {
        let (idx, _) = remainders[cursor];
        allocations[idx] += 1;
        leftover -= 1;
        cursor += 1;
        if cursor == remainders.len() {
            cursor = 0; // cycle if float error leaves more units than ranks
        }
    }

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn alloc(n: usize, budget: u64, exponent: f64) -> Vec<u64> {
        allocate(n, &AllocationOptions { budget, exponent, top_n: None }).unwrap()
    }

    #[test]
    fn test_harmonic_split() {
        // Weights 1, 1/2, 1/3, 1/4 over a budget of 1000.
        let shares = alloc(4, 1000, 1.0);
        assert_eq!(shares.iter().sum::<u64>(), 1000);
        assert_eq!(shares, vec![480, 240, 160, 120]);
    }

    #[test]
    fn test_exact_sum_across_exponents() {
        for s in [0.5, 1.0, 1.5, 2.0] {
            for budget in [0u64, 7, 100, 1_000, 510_000] {
                for n in [1usize, 2, 3, 10, 31] {
                    let shares = alloc(n, budget, s);
                    assert_eq!(
                        shares.iter().sum::<u64>(),
                        budget,
                        "drift at n={n} budget={budget} s={s}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_monotonically_non_increasing() {
        for s in [0.5, 1.0, 1.5, 2.0] {
            let shares = alloc(20, 1_337, s);
            for window in shares.windows(2) {
                assert!(window[0] >= window[1], "rank order violated: {shares:?}");
            }
        }
    }

    #[test]
    fn test_top_n_cap() {
        let shares =
            allocate(10, &AllocationOptions { budget: 900, exponent: 1.0, top_n: Some(3) })
                .unwrap();
        assert_eq!(shares.iter().sum::<u64>(), 900);
        assert!(shares[3..].iter().all(|&a| a == 0));
        assert!(shares[0] >= shares[1] && shares[1] >= shares[2]);
    }

    #[test]
    fn test_zero_items_and_zero_budget() {
        assert!(alloc(0, 1000, 1.0).is_empty());
        assert_eq!(alloc(5, 0, 1.0), vec![0; 5]);
    }

    #[test]
    fn test_bad_exponent_rejected() {
        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = allocate(3, &AllocationOptions { budget: 10, exponent: s, top_n: None });
            assert!(matches!(result, Err(ConfigError::InvalidExponent(_))), "accepted s={s}");
        }
    }

    proptest! {
        #[test]
        fn prop_sum_is_exact(
            n in 1usize..50,
            budget in 0u64..2_000_000,
            s_idx in 0usize..4,
        ) {
            let s = [0.5, 1.0, 1.5, 2.0][s_idx];
            let shares = alloc(n, budget, s);
            prop_assert_eq!(shares.iter().sum::<u64>(), budget);
        }

        #[test]
        fn prop_non_increasing(
            n in 1usize..50,
            budget in 0u64..2_000_000,
            s_idx in 0usize..4,
        ) {
            let s = [0.5, 1.0, 1.5, 2.0][s_idx];
            let shares = alloc(n, budget, s);
            for window in shares.windows(2) {
                prop_assert!(window[0] >= window[1]);
            }
        }
    }
}
