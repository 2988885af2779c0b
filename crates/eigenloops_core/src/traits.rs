use anyhow::Result;
use nalgebra::{Complex, DMatrix};

/// A dense matrix whose shape can be inspected before decomposition.
pub trait SquareMatrix {
    /// Returns `(rows, cols)`.
    fn shape(&self) -> (usize, usize);
}

impl<T: nalgebra::Scalar> SquareMatrix for DMatrix<T> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }
}

/// An eigenvalue together with a unit-norm eigenvector.
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenpair {
    pub value: Complex<f64>,
    pub vector: Vec<Complex<f64>>,
}

/// The eigendecomposition primitive the trackers call once per sample.
///
/// Output order is unconstrained and may differ between calls.
pub trait Decomposer<M> {
    fn eigenvalues(&self, matrix: &M) -> Result<Vec<Complex<f64>>>;

    /// Eigenvalues with their eigenvectors, each defined only up to a
    /// scalar sign/phase.
    fn eigenpairs(&self, matrix: &M) -> Result<Vec<Eigenpair>>;
}

/// Assigns a fresh, unordered set of values to existing identities.
pub trait Matcher {
    /// `reference[id]` is the latest value of identity `id`. Returns, for each
    /// entry of `candidates` in order, the identity it continues. The result
    /// must be a permutation of `0..reference.len()` when the lengths agree.
    fn assign(&self, reference: &[Complex<f64>], candidates: &[Complex<f64>]) -> Vec<usize>;
}

impl<M: Matcher + ?Sized> Matcher for &M {
    fn assign(&self, reference: &[Complex<f64>], candidates: &[Complex<f64>]) -> Vec<usize> {
        (**self).assign(reference, candidates)
    }
}
