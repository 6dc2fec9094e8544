/// Convergence tolerance for the Bradley-Terry fixed-point loop: stop once
/// the maximum relative strength change in an iteration falls below this.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Iteration cap for the fitter. The MM update usually converges in tens of
/// iterations; hitting this cap is reported as a non-fatal warning.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Ghost-opponent prior strength: fractional wins exchanged between every
/// item and a virtual average player. Keeps the effective comparison graph
/// connected and the likelihood maximum finite even for perfect records.
pub const DEFAULT_PRIOR_STRENGTH: f64 = 0.01;

/// Default Zipf exponent for the allocation curve: weight(rank) = rank^-s.
pub const DEFAULT_EXPONENT: f64 = 1.0;

/// Strengths within this relative distance are treated as tied by the
/// ranker and keep their original input order.
pub const RANK_TIE_TOLERANCE: f64 = 1e-9;

/// Minimum number of pairs every item is guaranteed to appear in, regardless
/// of how the random schedule falls out.
pub const DEFAULT_MIN_APPEARANCES: usize = 1;
