//! Minimum-cost bipartite assignment (Kuhn-Munkres with potentials).

use nalgebra::Complex;
use num_traits::Zero;

use crate::traits::Matcher;

/// Matches candidates to identities minimising the summed complex distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalAssignment;

impl Matcher for OptimalAssignment {
    fn assign(&self, reference: &[Complex<f64>], candidates: &[Complex<f64>]) -> Vec<usize> {
        let dim = reference.len().min(candidates.len());
        let cost: Vec<Vec<f64>> = candidates[..dim]
            .iter()
            .map(|&candidate| {
                reference[..dim]
                    .iter()
                    .map(|&value| (candidate - value).norm())
                    .collect()
            })
            .collect();
        solve_assignment(&cost)
    }
}

/// Solves the square assignment problem for `cost[row][col]`, returning the
/// column chosen for every row. Non-finite costs are replaced by a large
/// finite penalty so the potentials stay well defined.
pub fn solve_assignment(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }

    let penalty = f64::MAX.sqrt() / n as f64;
    let entry = |row: usize, col: usize| -> f64 {
        let value = cost[row][col];
        if value.is_finite() {
            value
        } else {
            penalty
        }
    };

    // 1-based potentials; column 0 is the virtual start of each augmenting path.
    let mut u = vec![f64::zero(); n + 1];
    let mut v = vec![f64::zero(); n + 1];
    let mut owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut col0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[col0] = true;
            let row0 = owner[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0usize;

            for col in 1..=n {
                if used[col] {
                    continue;
                }
                let slack = entry(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }

            for col in 0..=n {
                if used[col] {
                    u[owner[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }

            col0 = col1;
            if owner[col0] == 0 {
                break;
            }
        }

        loop {
            let col1 = way[col0];
            owner[col0] = owner[col1];
            col0 = col1;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for col in 1..=n {
        if owner[col] != 0 {
            assignment[owner[col] - 1] = col - 1;
        }
    }
    assignment
}
