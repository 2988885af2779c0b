//! Reconstruction of continuous eigenvalue trajectories from unordered
//! per-sample decompositions.
//!
//! Each sweep is a fold over the sample grid: the accumulator holds the latest
//! value of every identity, and each new sample is matched against it before
//! being appended. Decomposition happens strictly in grid order, so a given
//! matcher always reproduces the same identities.

pub mod accumulator;
pub mod align;
pub mod types;

pub use accumulator::{LoopAccumulator, TrajectoryAccumulator, VectorAccumulator};
pub use align::{align_phase, align_sign, inner_product, VectorAlignment};
pub use types::{ComplexBounds, EigenLoops, EigenTrajectories, EigenvectorTrajectories};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::decompose::{DecompositionSettings, DenseEigen};
use crate::error::TrackError;
use crate::matching::AssignmentStrategy;
use crate::traits::{Decomposer, Matcher, SquareMatrix};

/// Optional `(samples_done, samples_total)` callback.
pub type ProgressCallback<'a> = Option<&'a mut dyn FnMut(usize, usize)>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TrackerSettings {
    #[serde(default)]
    pub strategy: AssignmentStrategy,
    #[serde(default)]
    pub alignment: VectorAlignment,
    #[serde(default)]
    pub decomposition: DecompositionSettings,
}

/// Drives the sweeps with a decomposition primitive and a matching policy.
#[derive(Debug, Clone)]
pub struct Tracker<D = DenseEigen, M = AssignmentStrategy> {
    decomposer: D,
    matcher: M,
    alignment: VectorAlignment,
}

impl Tracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            decomposer: DenseEigen::new(settings.decomposition),
            matcher: settings.strategy,
            alignment: settings.alignment,
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

impl<D, M: Matcher> Tracker<D, M> {
    pub fn with_parts(decomposer: D, matcher: M, alignment: VectorAlignment) -> Self {
        Self {
            decomposer,
            matcher,
            alignment,
        }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn alignment(&self) -> VectorAlignment {
        self.alignment
    }

    /// Decomposes the first sample and seeds identities in output order.
    pub fn start<X>(&self, matrix: &X, param: f64) -> Result<TrajectoryAccumulator, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
    {
        let dim = square_dimension(matrix)?;
        let initial = self
            .decomposer
            .eigenvalues(matrix)
            .map_err(|source| TrackError::Decomposition { sample: 0, source })?;
        ensure_count(0, dim, initial.len())?;
        Ok(TrajectoryAccumulator::new(param, initial))
    }

    /// Decomposes one further sample and appends it to `acc`.
    pub fn step<X>(
        &self,
        acc: &mut TrajectoryAccumulator,
        matrix: &X,
        param: f64,
    ) -> Result<(), TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
    {
        let sample = acc.samples();
        ensure_shape(matrix, sample, acc.dimension())?;
        let fresh = self
            .decomposer
            .eigenvalues(matrix)
            .map_err(|source| TrackError::Decomposition { sample, source })?;
        acc.advance(param, &fresh, &self.matcher)?;
        trace!("[tracking] sample #{} at t = {}", sample, param);
        Ok(())
    }

    /// Tracks the eigenvalues of `family(t)` along `grid`.
    pub fn track<X, F>(&self, family: F, grid: &[f64]) -> Result<EigenTrajectories, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64) -> X,
    {
        self.track_with_progress(family, grid, None)
    }

    /// Same as [`Tracker::track`], reporting progress after every sample.
    pub fn track_with_progress<X, F>(
        &self,
        mut family: F,
        grid: &[f64],
        mut on_progress: ProgressCallback<'_>,
    ) -> Result<EigenTrajectories, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64) -> X,
    {
        let (&first, rest) = grid.split_first().ok_or(TrackError::EmptyGrid)?;
        let total = grid.len();
        debug!("[tracking] sweeping {} samples", total);

        let initial = self.start(&family(first), first)?;
        report(&mut on_progress, initial.samples(), total);

        let acc = rest.iter().try_fold(initial, |mut acc, &param| {
            self.step(&mut acc, &family(param), param)?;
            report(&mut on_progress, acc.samples(), total);
            Ok::<_, TrackError>(acc)
        })?;

        debug!(
            "[tracking] finished {} trajectories over {} samples",
            acc.dimension(),
            acc.samples()
        );
        Ok(acc.finish())
    }

    /// Tracks eigenvalue loops of `family(u, v)`: one sweep over `u` per
    /// value of `v`, with slices matched by their first `u` value.
    pub fn track_loops<X, F>(
        &self,
        family: F,
        u: &[f64],
        v: &[f64],
    ) -> Result<EigenLoops, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64, f64) -> X,
    {
        self.track_loops_with_progress(family, u, v, None)
    }

    /// Same as [`Tracker::track_loops`], reporting progress per `v` slice.
    pub fn track_loops_with_progress<X, F>(
        &self,
        mut family: F,
        u: &[f64],
        v: &[f64],
        mut on_progress: ProgressCallback<'_>,
    ) -> Result<EigenLoops, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64, f64) -> X,
    {
        let (&first, rest) = v.split_first().ok_or(TrackError::EmptyGrid)?;
        let total = v.len();
        debug!("[loops] sweeping {} x {} samples", u.len(), total);

        let initial = LoopAccumulator::new(first, self.track(|x| family(x, first), u)?);
        report(&mut on_progress, initial.slices(), total);

        let acc = rest.iter().try_fold(initial, |mut acc, &param| {
            let sample = acc.slices();
            let expected = acc.dimension();
            let slice = self
                .track(|x| family(x, param), u)
                .map_err(|err| relabel_slice_error(err, sample, expected))?;
            if slice.dimension() != expected {
                return Err(TrackError::Dimension {
                    sample,
                    expected,
                    rows: slice.dimension(),
                    cols: slice.dimension(),
                });
            }
            acc.advance(param, slice, &self.matcher)?;
            trace!("[loops] slice #{} at v = {}", sample, param);
            report(&mut on_progress, acc.slices(), total);
            Ok::<_, TrackError>(acc)
        })?;

        debug!(
            "[loops] finished {} loops over {} slices",
            acc.dimension(),
            acc.slices()
        );
        Ok(acc.finish())
    }

    /// Tracks eigenvalues together with eigenvectors aligned to the previous
    /// sample of the same identity.
    pub fn track_with_vectors<X, F>(
        &self,
        family: F,
        grid: &[f64],
    ) -> Result<EigenvectorTrajectories, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64) -> X,
    {
        self.track_with_vectors_and_progress(family, grid, None)
    }

    pub fn track_with_vectors_and_progress<X, F>(
        &self,
        mut family: F,
        grid: &[f64],
        mut on_progress: ProgressCallback<'_>,
    ) -> Result<EigenvectorTrajectories, TrackError>
    where
        X: SquareMatrix,
        D: Decomposer<X>,
        F: FnMut(f64) -> X,
    {
        let (&first, rest) = grid.split_first().ok_or(TrackError::EmptyGrid)?;
        let total = grid.len();
        debug!("[vectors] sweeping {} samples", total);

        let matrix = family(first);
        let dim = square_dimension(&matrix)?;
        let pairs = self
            .decomposer
            .eigenpairs(&matrix)
            .map_err(|source| TrackError::Decomposition { sample: 0, source })?;
        ensure_count(0, dim, pairs.len())?;
        let initial = VectorAccumulator::new(first, pairs, self.alignment);
        report(&mut on_progress, initial.samples(), total);

        let acc = rest.iter().try_fold(initial, |mut acc, &param| {
            let sample = acc.samples();
            let matrix = family(param);
            ensure_shape(&matrix, sample, acc.dimension())?;
            let pairs = self
                .decomposer
                .eigenpairs(&matrix)
                .map_err(|source| TrackError::Decomposition { sample, source })?;
            acc.advance(param, &pairs, &self.matcher)?;
            report(&mut on_progress, acc.samples(), total);
            Ok::<_, TrackError>(acc)
        })?;

        Ok(acc.finish())
    }
}

/// Tracks eigenvalues of `family` along `grid` with default settings.
pub fn track_eigenvalues<X, F>(family: F, grid: &[f64]) -> Result<EigenTrajectories, TrackError>
where
    X: SquareMatrix,
    DenseEigen: Decomposer<X>,
    F: FnMut(f64) -> X,
{
    Tracker::default().track(family, grid)
}

/// Tracks eigenvalue loops of `family` over `u` x `v` with default settings.
pub fn track_eigenvalue_loops<X, F>(
    family: F,
    u: &[f64],
    v: &[f64],
) -> Result<EigenLoops, TrackError>
where
    X: SquareMatrix,
    DenseEigen: Decomposer<X>,
    F: FnMut(f64, f64) -> X,
{
    Tracker::default().track_loops(family, u, v)
}

/// Tracks eigenvalues and sign-aligned eigenvectors with default settings.
pub fn track_eigenvectors<X, F>(
    family: F,
    grid: &[f64],
) -> Result<EigenvectorTrajectories, TrackError>
where
    X: SquareMatrix,
    DenseEigen: Decomposer<X>,
    F: FnMut(f64) -> X,
{
    Tracker::default().track_with_vectors(family, grid)
}

fn square_dimension<X: SquareMatrix>(matrix: &X) -> Result<usize, TrackError> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(TrackError::Shape { rows, cols });
    }
    Ok(rows)
}

fn ensure_shape<X: SquareMatrix>(
    matrix: &X,
    sample: usize,
    expected: usize,
) -> Result<(), TrackError> {
    let (rows, cols) = matrix.shape();
    if rows != expected || cols != expected {
        return Err(TrackError::Dimension {
            sample,
            expected,
            rows,
            cols,
        });
    }
    Ok(())
}

fn ensure_count(sample: usize, expected: usize, found: usize) -> Result<(), TrackError> {
    if found != expected {
        return Err(TrackError::Mismatch {
            sample,
            expected,
            found,
        });
    }
    Ok(())
}

/// Attaches the `v` index to a failure inside a later slice. A non-square
/// matrix there is a dimension change relative to the first slice.
fn relabel_slice_error(err: TrackError, slice: usize, expected: usize) -> TrackError {
    match err {
        TrackError::Shape { rows, cols } => TrackError::Dimension {
            sample: slice,
            expected,
            rows,
            cols,
        },
        other => TrackError::Slice {
            slice,
            source: Box::new(other),
        },
    }
}

fn report(on_progress: &mut ProgressCallback<'_>, done: usize, total: usize) {
    if let Some(progress) = on_progress.as_deref_mut() {
        progress(done, total);
    }
}
