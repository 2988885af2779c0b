//! Accumulators threaded through the tracking folds.
//!
//! Each accumulator owns the growing table and the latest value of every
//! identity; advancing it by one sample runs a matching pass against that
//! latest state.

use nalgebra::Complex;

use super::align::VectorAlignment;
use super::types::{EigenLoops, EigenTrajectories, EigenvectorTrajectories};
use crate::error::TrackError;
use crate::matching::is_permutation;
use crate::traits::{Eigenpair, Matcher};

/// Runs `matcher` and validates that every identity is consumed exactly once.
pub(crate) fn match_identities<M: Matcher>(
    matcher: &M,
    reference: &[Complex<f64>],
    candidates: &[Complex<f64>],
    sample: usize,
) -> Result<Vec<usize>, TrackError> {
    if candidates.len() != reference.len() {
        return Err(TrackError::Mismatch {
            sample,
            expected: reference.len(),
            found: candidates.len(),
        });
    }
    let assignment = matcher.assign(reference, candidates);
    if !is_permutation(&assignment, reference.len()) {
        return Err(TrackError::InvalidAssignment { sample });
    }
    Ok(assignment)
}

/// Single-parameter trajectory table under construction.
#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    params: Vec<f64>,
    values: Vec<Vec<Complex<f64>>>,
    latest: Vec<Complex<f64>>,
}

impl TrajectoryAccumulator {
    /// Seeds identities `0..n` in the order the decomposition returned them.
    pub fn new(param: f64, initial: Vec<Complex<f64>>) -> Self {
        Self {
            params: vec![param],
            values: initial.iter().map(|&value| vec![value]).collect(),
            latest: initial,
        }
    }

    pub fn dimension(&self) -> usize {
        self.latest.len()
    }

    /// Number of samples recorded so far.
    pub fn samples(&self) -> usize {
        self.params.len()
    }

    /// Latest value of every identity.
    pub fn latest(&self) -> &[Complex<f64>] {
        &self.latest
    }

    /// Appends one sample. Returns the identity assigned to each entry of
    /// `fresh`.
    pub fn advance<M: Matcher>(
        &mut self,
        param: f64,
        fresh: &[Complex<f64>],
        matcher: &M,
    ) -> Result<Vec<usize>, TrackError> {
        let assignment = match_identities(matcher, &self.latest, fresh, self.samples())?;
        for (&value, &id) in fresh.iter().zip(&assignment) {
            self.values[id].push(value);
            self.latest[id] = value;
        }
        self.params.push(param);
        Ok(assignment)
    }

    pub fn finish(self) -> EigenTrajectories {
        EigenTrajectories {
            params: self.params,
            values: self.values,
        }
    }
}

/// Trajectory table that also carries aligned eigenvectors.
#[derive(Debug, Clone)]
pub struct VectorAccumulator {
    values: TrajectoryAccumulator,
    vectors: Vec<Vec<Vec<Complex<f64>>>>,
    alignment: VectorAlignment,
}

impl VectorAccumulator {
    /// First-sample vectors are stored as the decomposition returned them.
    pub fn new(param: f64, pairs: Vec<Eigenpair>, alignment: VectorAlignment) -> Self {
        let initial = pairs.iter().map(|pair| pair.value).collect();
        let vectors = pairs.into_iter().map(|pair| vec![pair.vector]).collect();
        Self {
            values: TrajectoryAccumulator::new(param, initial),
            vectors,
            alignment,
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.dimension()
    }

    pub fn samples(&self) -> usize {
        self.values.samples()
    }

    pub fn advance<M: Matcher>(
        &mut self,
        param: f64,
        pairs: &[Eigenpair],
        matcher: &M,
    ) -> Result<Vec<usize>, TrackError> {
        let fresh: Vec<Complex<f64>> = pairs.iter().map(|pair| pair.value).collect();
        let assignment = self.values.advance(param, &fresh, matcher)?;
        for (pair, &id) in pairs.iter().zip(&assignment) {
            let history = &mut self.vectors[id];
            let aligned = match history.last() {
                Some(previous) => self.alignment.apply(previous, &pair.vector),
                None => pair.vector.clone(),
            };
            history.push(aligned);
        }
        Ok(assignment)
    }

    pub fn finish(self) -> EigenvectorTrajectories {
        EigenvectorTrajectories {
            trajectories: self.values.finish(),
            vectors: self.vectors,
        }
    }
}

/// Two-parameter loop table, filled one `v` slice at a time.
#[derive(Debug, Clone)]
pub struct LoopAccumulator {
    u: Vec<f64>,
    v: Vec<f64>,
    values: Vec<Vec<Vec<Complex<f64>>>>,
}

impl LoopAccumulator {
    /// Identities are those of the first slice's trajectories.
    pub fn new(v: f64, slice: EigenTrajectories) -> Self {
        let values = slice
            .values
            .into_iter()
            .map(|trajectory| trajectory.into_iter().map(|value| vec![value]).collect())
            .collect();
        Self {
            u: slice.params,
            v: vec![v],
            values,
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn slices(&self) -> usize {
        self.v.len()
    }

    /// Value of every identity at `(u[0], v_latest)`.
    fn anchors(&self) -> Vec<Complex<f64>> {
        self.values
            .iter()
            .map(|rows| rows.first().and_then(|row| row.last()).copied().unwrap_or_default())
            .collect()
    }

    /// Appends one slice, matching trajectories by their first `u` value only.
    pub fn advance<M: Matcher>(
        &mut self,
        v: f64,
        slice: EigenTrajectories,
        matcher: &M,
    ) -> Result<Vec<usize>, TrackError> {
        let sample = self.slices();
        if slice.samples() != self.u.len() {
            return Err(TrackError::Mismatch {
                sample,
                expected: self.u.len(),
                found: slice.samples(),
            });
        }
        let starts: Vec<Complex<f64>> = slice
            .values
            .iter()
            .map(|trajectory| trajectory.first().copied().unwrap_or_default())
            .collect();
        let assignment = match_identities(matcher, &self.anchors(), &starts, sample)?;
        for (trajectory, &id) in slice.values.into_iter().zip(&assignment) {
            for (row, value) in self.values[id].iter_mut().zip(trajectory) {
                row.push(value);
            }
        }
        self.v.push(v);
        Ok(assignment)
    }

    pub fn finish(self) -> EigenLoops {
        EigenLoops {
            u: self.u,
            v: self.v,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::GreedyNearest;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    struct Constant(Vec<usize>);

    impl Matcher for Constant {
        fn assign(&self, _: &[Complex<f64>], _: &[Complex<f64>]) -> Vec<usize> {
            self.0.clone()
        }
    }

    #[test]
    fn advance_reorders_fresh_values() {
        let mut acc = TrajectoryAccumulator::new(0.0, vec![c(1.0, 0.0), c(5.0, 0.0)]);
        let assignment = acc
            .advance(0.1, &[c(5.1, 0.0), c(0.9, 0.0)], &GreedyNearest)
            .expect("advance");
        assert_eq!(assignment, vec![1, 0]);
        assert_eq!(acc.latest(), &[c(0.9, 0.0), c(5.1, 0.0)]);
        assert_eq!(acc.samples(), 2);

        let table = acc.finish();
        assert_eq!(table.params, vec![0.0, 0.1]);
        assert_eq!(table.values[0], vec![c(1.0, 0.0), c(0.9, 0.0)]);
        assert_eq!(table.values[1], vec![c(5.0, 0.0), c(5.1, 0.0)]);
    }

    #[test]
    fn advance_rejects_count_mismatch() {
        let mut acc = TrajectoryAccumulator::new(0.0, vec![c(1.0, 0.0), c(5.0, 0.0)]);
        let err = acc
            .advance(0.1, &[c(1.0, 0.0)], &GreedyNearest)
            .expect_err("expected mismatch");
        match err {
            TrackError::Mismatch {
                sample,
                expected,
                found,
            } => {
                assert_eq!((sample, expected, found), (1, 2, 1));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(acc.samples(), 1);
    }

    #[test]
    fn advance_rejects_non_permutation() {
        let mut acc = TrajectoryAccumulator::new(0.0, vec![c(1.0, 0.0), c(5.0, 0.0)]);
        let err = acc
            .advance(0.1, &[c(1.0, 0.0), c(5.0, 0.0)], &Constant(vec![0, 0]))
            .expect_err("expected invalid assignment");
        assert!(matches!(err, TrackError::InvalidAssignment { sample: 1 }));
    }

    #[test]
    fn vector_accumulator_aligns_to_previous_vector() {
        let pairs = vec![
            Eigenpair {
                value: c(1.0, 0.0),
                vector: vec![c(1.0, 0.0), c(0.0, 0.0)],
            },
            Eigenpair {
                value: c(2.0, 0.0),
                vector: vec![c(0.0, 0.0), c(1.0, 0.0)],
            },
        ];
        let mut acc = VectorAccumulator::new(0.0, pairs, VectorAlignment::Sign);
        let fresh = vec![
            Eigenpair {
                value: c(2.01, 0.0),
                vector: vec![c(0.0, 0.0), c(-1.0, 0.0)],
            },
            Eigenpair {
                value: c(1.01, 0.0),
                vector: vec![c(-1.0, 0.0), c(0.0, 0.0)],
            },
        ];
        acc.advance(0.1, &fresh, &GreedyNearest).expect("advance");
        let result = acc.finish();
        assert_eq!(result.vector(0, 1), Some(&[c(1.0, 0.0), c(0.0, 0.0)][..]));
        assert_eq!(result.vector(1, 1), Some(&[c(0.0, 0.0), c(1.0, 0.0)][..]));
        assert_eq!(result.trajectories.values[1][1], c(2.01, 0.0));
    }

    #[test]
    fn loop_accumulator_matches_on_first_u_value() {
        let first = EigenTrajectories {
            params: vec![0.0, 1.0],
            values: vec![vec![c(0.0, 0.0), c(0.5, 0.0)], vec![c(3.0, 0.0), c(3.5, 0.0)]],
        };
        let mut acc = LoopAccumulator::new(0.0, first);
        // The second slice disagrees wildly at u[1]; only u[0] decides.
        let second = EigenTrajectories {
            params: vec![0.0, 1.0],
            values: vec![vec![c(3.1, 0.0), c(-9.0, 0.0)], vec![c(0.1, 0.0), c(9.0, 0.0)]],
        };
        let assignment = acc.advance(0.5, second, &GreedyNearest).expect("advance");
        assert_eq!(assignment, vec![1, 0]);

        let loops = acc.finish();
        assert_eq!(loops.v, vec![0.0, 0.5]);
        assert_eq!(loops.values[0][0], vec![c(0.0, 0.0), c(0.1, 0.0)]);
        assert_eq!(loops.values[0][1], vec![c(0.5, 0.0), c(9.0, 0.0)]);
        assert_eq!(loops.values[1][1], vec![c(3.5, 0.0), c(-9.0, 0.0)]);
    }

    #[test]
    fn loop_accumulator_rejects_short_slice() {
        let first = EigenTrajectories {
            params: vec![0.0, 1.0],
            values: vec![vec![c(0.0, 0.0), c(0.5, 0.0)]],
        };
        let mut acc = LoopAccumulator::new(0.0, first);
        let short = EigenTrajectories {
            params: vec![0.0],
            values: vec![vec![c(0.0, 0.0)]],
        };
        let err = acc.advance(1.0, short, &GreedyNearest).expect_err("expected mismatch");
        assert!(matches!(err, TrackError::Mismatch { sample: 1, .. }));
    }
}
