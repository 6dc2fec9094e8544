//! Error and warning kinds for the ranking pipeline.
//!
//! `ConfigError` is the only fatal kind and is raised before any oracle work
//! starts. Statistical anomalies (non-convergence, disconnection, uncompared
//! items) are `Warning`s attached to the result, never errors.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate item id: {0:?}")]
    DuplicateItem(String),

    #[error("unknown item id: {0:?}")]
    UnknownItem(String),

    #[error(
        "{requested} comparisons requested but only {available} distinct pairs exist \
         for {items} items; allow repeats to go past that"
    )]
    TooManyPairs { requested: usize, available: usize, items: usize },

    #[error("zipf exponent must be a positive finite number, got {0}")]
    InvalidExponent(f64),

    #[error("convergence tolerance must be a positive finite number, got {0}")]
    InvalidTolerance(f64),

    #[error("iteration cap must be at least 1")]
    ZeroIterations,

    #[error("regularization prior must be finite and non-negative, got {0}")]
    InvalidPrior(f64),

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}

/// Non-fatal conditions surfaced alongside results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Warning {
    /// The fitter hit its iteration cap; the best current estimate was kept.
    DidNotConverge { iterations: usize },
    /// The observed comparison graph has more than one connected component.
    /// Cross-component order is driven by the regularization prior only.
    DisconnectedGraph { components: usize },
    /// Items with zero recorded comparisons; pinned to the bottom of the
    /// ranking rather than given an arbitrary strength.
    UncomparedItems { count: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DidNotConverge { iterations } => {
                write!(f, "fit did not fully converge within {iterations} iterations")
            }
            Warning::DisconnectedGraph { components } => {
                write!(
                    f,
                    "comparison graph has {components} disconnected components; \
                     cross-component order relies on the regularization prior"
                )
            }
            Warning::UncomparedItems { count } => {
                write!(f, "{count} item(s) have no recorded comparisons and were ranked last")
            }
        }
    }
}
