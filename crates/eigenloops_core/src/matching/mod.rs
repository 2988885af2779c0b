//! Matching policies that carry identities from one sample to the next.
//!
//! [`GreedyNearest`] reproduces the classic behaviour: fresh values are taken
//! in decomposition order and each one claims the closest identity still
//! available. [`OptimalAssignment`] minimises the summed distance instead and
//! survives close crossings that trip the greedy pass.

mod hungarian;

pub use hungarian::{solve_assignment, OptimalAssignment};

use log::debug;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use crate::traits::Matcher;

/// Relative gap under which two candidate distances count as a tie.
const TIE_RELATIVE_EPS: f64 = 1e-9;

/// Greedy nearest-match with a consumable pool of identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyNearest;

impl Matcher for GreedyNearest {
    fn assign(&self, reference: &[Complex<f64>], candidates: &[Complex<f64>]) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..reference.len()).collect();
        let mut assignment = Vec::with_capacity(candidates.len());

        for (idx, &candidate) in candidates.iter().enumerate() {
            if pool.is_empty() {
                break;
            }
            let (slot, runner_up) = nearest_slot(&pool, reference, candidate);
            if let Some((best, second)) = runner_up {
                if second - best <= TIE_RELATIVE_EPS * best.max(f64::MIN_POSITIVE) {
                    debug!(
                        "[matching] candidate #{} nearly tied ({:.3e} vs {:.3e})",
                        idx, best, second
                    );
                }
            }
            assignment.push(pool.remove(slot));
        }

        assignment
    }
}

/// Index into `pool` of the identity closest to `candidate`, plus the best and
/// second-best distances when the pool holds more than one identity. Ties keep
/// the earliest pool entry.
fn nearest_slot(
    pool: &[usize],
    reference: &[Complex<f64>],
    candidate: Complex<f64>,
) -> (usize, Option<(f64, f64)>) {
    let mut best_slot = 0;
    let mut best = f64::INFINITY;
    let mut second = f64::INFINITY;
    for (slot, &id) in pool.iter().enumerate() {
        let distance = (candidate - reference[id]).norm();
        if distance < best {
            second = best;
            best = distance;
            best_slot = slot;
        } else if distance < second {
            second = distance;
        }
    }
    let gap = if pool.len() > 1 && second.is_finite() {
        Some((best, second))
    } else {
        None
    };
    (best_slot, gap)
}

/// Serializable choice of matching policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    #[default]
    Greedy,
    Optimal,
}

impl Matcher for AssignmentStrategy {
    fn assign(&self, reference: &[Complex<f64>], candidates: &[Complex<f64>]) -> Vec<usize> {
        match self {
            AssignmentStrategy::Greedy => GreedyNearest.assign(reference, candidates),
            AssignmentStrategy::Optimal => OptimalAssignment.assign(reference, candidates),
        }
    }
}

/// Checks that `assignment` uses every identity in `0..dim` exactly once.
pub(crate) fn is_permutation(assignment: &[usize], dim: usize) -> bool {
    if assignment.len() != dim {
        return false;
    }
    let mut seen = vec![false; dim];
    for &id in assignment {
        if id >= dim || seen[id] {
            return false;
        }
        seen[id] = true;
    }
    true
}
