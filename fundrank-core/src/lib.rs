//! fundrank-core: Pure-computation ranking and allocation engine.
//!
//! Pairwise comparison verdicts → Bradley-Terry strengths → ranked list →
//! budget-exact Zipf allocation. No IO, no HTTP, no filesystem, only math.
//! Bring your own oracle: whatever decides a single pairwise verdict (a
//! human, a heuristic, an LLM) lives outside this crate, which only consumes
//! its outcomes via the [`Ledger`].
//!
//! Items are identified by caller-provided string IDs; the crate handles the
//! mapping to dense indices internally.
//!
//! # Quick start
//!
//! ```rust
//! use fundrank_core::{evaluate, EvalOptions, Item, Ledger, Outcome};
//!
//! let items = vec![
//!     Item::new("alpha", "Project Alpha"),
//!     Item::new("beta", "Project Beta"),
//!     Item::new("gamma", "Project Gamma"),
//! ];
//!
//! let mut ledger = Ledger::new(items.len());
//! ledger.record(0, 1, Outcome::FirstWins); // alpha beat beta
//! ledger.record(1, 2, Outcome::FirstWins); // beta beat gamma
//! ledger.record(0, 2, Outcome::FirstWins); // alpha beat gamma
//!
//! let report = evaluate(&items, &ledger, &EvalOptions::with_budget(1_000)).unwrap();
//!
//! for entry in &report.entries {
//!     println!("{}: {:.4} -> {}", entry.label, entry.strength, entry.allocation);
//! }
//! ```

pub mod allocation;
pub mod bradley_terry;
pub mod constants;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod rank;
pub mod schedule;
pub mod types;

// Re-export primary public API at crate root.
pub use allocation::{allocate, AllocationOptions};
pub use bradley_terry::{fit, FitOptions, FitOutcome};
pub use engine::{evaluate, EvalOptions};
pub use error::{ConfigError, Warning};
pub use ledger::{Ledger, PairRecord};
pub use rank::{rank, rank_by_strength};
pub use schedule::{plan_pairs, PlanOptions};
pub use types::{IdMap, Item, Outcome, RankedEntry, RankingReport, TiePolicy};
