//! Pair scheduling: decide which comparisons to submit to the oracle.
//!
//! Circle-method round-robin over a seeded shuffle of the roster: each round
//! is a near-perfect matching, the roster rotates between rounds, and rounds
//! accumulate until the target comparison count is reached (last round
//! truncated). Rounds 1..n-1 contain every distinct pair exactly once, so
//! duplicate avoidance is free until the full round-robin is exhausted.
//!
//! Two post-passes repair what random truncation can leave behind: every
//! item is topped up to a minimum number of appearances, and bridging edges
//! are appended until the plan graph is connected (Bradley-Terry strengths
//! are only comparable within a connected component). Appended edges may push
//! the plan slightly past the target count.
//!
//! Pure function of (item count, options); the seed makes plans reproducible.

use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::constants::DEFAULT_MIN_APPEARANCES;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanOptions {
    /// Target number of comparisons (k). The plan may exceed this slightly
    /// when the repair passes append edges.
    pub target_comparisons: usize,
    /// Every item appears in at least this many pairs.
    pub min_appearances: usize,
    /// Allow the same pair to be scheduled more than once (redundancy for
    /// oracle noise averaging). Off = strict duplicate avoidance.
    pub allow_repeats: bool,
    /// RNG seed for reproducible plans.
    pub seed: u64,
}

impl PlanOptions {
    pub fn for_target(target_comparisons: usize, seed: u64) -> Self {
        PlanOptions {
            target_comparisons,
            min_appearances: DEFAULT_MIN_APPEARANCES,
            allow_repeats: false,
            seed,
        }
    }
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Rotate all roster slots except the first one step to the right.
fn rotate(roster: &mut Vec<Option<usize>>) {
    if roster.len() > 2 {
        let last = roster.pop().unwrap();
        roster.insert(1, last);
    }
}

struct Plan {
    pairs: Vec<(usize, usize)>,
    appearances: Vec<usize>,
    scheduled: HashSet<(usize, usize)>,
}

impl Plan {
    fn push(&mut self, first: usize, second: usize) {
        self.pairs.push((first, second));
        self.appearances[first] += 1;
        self.appearances[second] += 1;
        self.scheduled.insert(pair_key(first, second));
    }
}

/// Produce the comparison plan for `num_items` items.
///
/// Fewer than two items yields an empty plan. Asking for more pairs than
/// C(n, 2) with duplicate avoidance on is a configuration error, rejected
/// before any oracle work begins.
pub fn plan_pairs(
    num_items: usize,
    options: &PlanOptions,
) -> Result<Vec<(usize, usize)>, ConfigError> {
    if num_items < 2 {
        return Ok(Vec::new());
    }

    let max_distinct = num_items * (num_items - 1) / 2;
    if !options.allow_repeats && options.target_comparisons > max_distinct {
        return Err(ConfigError::TooManyPairs {
            requested: options.target_comparisons,
            available: max_distinct,
            items: num_items,
        });
    }

    let mut rng = SmallRng::seed_from_u64(options.seed);

    let mut roster: Vec<Option<usize>> = (0..num_items).map(Some).collect();
    roster.shuffle(&mut rng);
    if roster.len() % 2 == 1 {
        roster.push(None); // bye slot for odd counts
    }
    let slots = roster.len();
    let distinct_rounds = slots - 1;

    let mut plan = Plan {
        pairs: Vec::with_capacity(options.target_comparisons),
        appearances: vec![0; num_items],
        scheduled: HashSet::new(),
    };

    let mut round = 0usize;
    'rounds: while plan.pairs.len() < options.target_comparisons {
        if !options.allow_repeats && round >= distinct_rounds {
            break;
        }
        let half = slots / 2;
        for i in 0..half {
            if plan.pairs.len() >= options.target_comparisons {
                break 'rounds;
            }
            let (Some(mut a), Some(mut b)) = (roster[i], roster[slots - 1 - i]) else {
                continue;
            };
            if rng.random::<f64>() < 0.5 {
                std::mem::swap(&mut a, &mut b); // randomize presentation side
            }
            plan.push(a, b);
        }
        rotate(&mut roster);
        round += 1;
    }

    if plan.pairs.is_empty() && options.min_appearances == 0 {
        return Ok(plan.pairs);
    }

    top_up_appearances(&mut plan, num_items, options, &mut rng);
    connect_components(&mut plan, num_items, &mut rng);

    Ok(plan.pairs)
}

/// Append edges until every item reaches the minimum appearance count.
fn top_up_appearances(
    plan: &mut Plan,
    num_items: usize,
    options: &PlanOptions,
    rng: &mut SmallRng,
) {
    for item in 0..num_items {
        while plan.appearances[item] < options.min_appearances {
            let Some(partner) = pick_partner(item, num_items, plan, options.allow_repeats, rng)
            else {
                break; // item already paired with everyone
            };
            if rng.random::<f64>() < 0.5 {
                plan.push(item, partner);
            } else {
                plan.push(partner, item);
            }
        }
    }
}

fn pick_partner(
    item: usize,
    num_items: usize,
    plan: &Plan,
    allow_repeats: bool,
    rng: &mut SmallRng,
) -> Option<usize> {
    if allow_repeats {
        loop {
            let candidate = rng.random_range(0..num_items);
            if candidate != item {
                return Some(candidate);
            }
        }
    }
    let mut candidates: Vec<usize> = (0..num_items).filter(|&c| c != item).collect();
    candidates.shuffle(rng);
    candidates.into_iter().find(|&c| !plan.scheduled.contains(&pair_key(item, c)))
}

/// Append a bridging edge from each disconnected component to the first one,
/// choosing random members on both sides. A cross-component pair cannot be a
/// duplicate, so this is safe under strict duplicate avoidance too.
fn connect_components(plan: &mut Plan, num_items: usize, rng: &mut SmallRng) {
    let mut uf = UnionFind::new(num_items);
    for &(a, b) in &plan.pairs {
        uf.union(a, b);
    }

    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut root_slot = vec![usize::MAX; num_items];
    for item in 0..num_items {
        let root = uf.find(item);
        if root_slot[root] == usize::MAX {
            root_slot[root] = components.len();
            components.push(Vec::new());
        }
        components[root_slot[root]].push(item);
    }

    let (anchor, rest) = components.split_first().expect("num_items >= 2");
    for component in rest {
        let a = anchor[rng.random_range(0..anchor.len())];
        let b = component[rng.random_range(0..component.len())];
        if rng.random::<f64>() < 0.5 {
            plan.push(a, b);
        } else {
            plan.push(b, a);
        }
        uf.union(a, b);
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
