//! Dense eigendecomposition backed by nalgebra.
//!
//! Eigenvalues come from a Schur decomposition; eigenvectors are recovered as
//! null vectors of `A - λI` via an SVD, normalised to unit length.

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::linalg::{Schur, SVD};
use nalgebra::{Complex, DMatrix};
use serde::{Deserialize, Serialize};

use crate::traits::{Decomposer, Eigenpair};

/// Imaginary parts below this are treated as real when choosing the SVD path.
const REAL_EIGENVALUE_EPS: f64 = 1e-12;

/// Relative gap below which eigenvalues are treated as one repeated value.
const DEGENERACY_EPS: f64 = 1e-8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DecompositionSettings {
    /// Deflation tolerance for the Schur iteration.
    pub tolerance: f64,
    /// Iteration cap for the Schur iteration; `0` means unbounded.
    pub max_iterations: usize,
}

impl Default for DecompositionSettings {
    fn default() -> Self {
        Self {
            tolerance: f64::EPSILON,
            max_iterations: 0,
        }
    }
}

/// The default decomposition primitive for real and complex dense matrices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseEigen {
    pub settings: DecompositionSettings,
}

impl DenseEigen {
    pub fn new(settings: DecompositionSettings) -> Self {
        Self { settings }
    }
}

impl Decomposer<DMatrix<f64>> for DenseEigen {
    fn eigenvalues(&self, matrix: &DMatrix<f64>) -> Result<Vec<Complex<f64>>> {
        ensure_finite(matrix.iter().all(|v| v.is_finite()))?;
        if matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        let schur = Schur::try_new(
            matrix.clone(),
            self.settings.tolerance,
            self.settings.max_iterations,
        )
        .ok_or_else(|| anyhow!("Schur decomposition did not converge."))?;
        Ok(schur.complex_eigenvalues().iter().cloned().collect())
    }

    fn eigenpairs(&self, matrix: &DMatrix<f64>) -> Result<Vec<Eigenpair>> {
        let eigenvalues = self.eigenvalues(matrix)?;
        let complex_matrix = matrix.map(|v| Complex::new(v, 0.0));
        assemble_pairs(&eigenvalues, |lambda, count| {
            if lambda.im.abs() <= REAL_EIGENVALUE_EPS {
                real_null_basis(matrix, lambda.re, count)
            } else {
                complex_null_basis(&complex_matrix, lambda, count)
            }
        })
    }
}

impl Decomposer<DMatrix<Complex<f64>>> for DenseEigen {
    fn eigenvalues(&self, matrix: &DMatrix<Complex<f64>>) -> Result<Vec<Complex<f64>>> {
        ensure_finite(matrix.iter().all(|v| v.re.is_finite() && v.im.is_finite()))?;
        if matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        let schur = Schur::try_new(
            matrix.clone(),
            self.settings.tolerance,
            self.settings.max_iterations,
        )
        .ok_or_else(|| anyhow!("Schur decomposition did not converge."))?;
        let (_, t) = schur.unpack();
        Ok(triangular_eigenvalues(&t))
    }

    fn eigenpairs(&self, matrix: &DMatrix<Complex<f64>>) -> Result<Vec<Eigenpair>> {
        let eigenvalues = self.eigenvalues(matrix)?;
        assemble_pairs(&eigenvalues, |lambda, count| complex_null_basis(matrix, lambda, count))
    }
}

/// Pairs every eigenvalue with an eigenvector. Copies of a repeated eigenvalue
/// share one null space and receive distinct basis vectors from it.
fn assemble_pairs<F>(eigenvalues: &[Complex<f64>], mut null_basis: F) -> Result<Vec<Eigenpair>>
where
    F: FnMut(Complex<f64>, usize) -> Result<Vec<Vec<Complex<f64>>>>,
{
    let mut vectors: Vec<Option<Vec<Complex<f64>>>> = vec![None; eigenvalues.len()];
    for group in degenerate_groups(eigenvalues) {
        let lead = group[0];
        let basis = null_basis(eigenvalues[lead], group.len()).with_context(|| {
            format!("Failed to compute eigenvector for eigenvalue index {}", lead)
        })?;
        for (&idx, vector) in group.iter().zip(basis) {
            vectors[idx] = Some(vector);
        }
    }

    eigenvalues
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(idx, (&value, vector))| {
            let vector = vector
                .ok_or_else(|| anyhow!("Missing eigenvector for eigenvalue index {}", idx))?;
            Ok(Eigenpair { value, vector })
        })
        .collect()
}

/// Groups indices of eigenvalues that coincide within `DEGENERACY_EPS`,
/// relative to their magnitude. Groups keep decomposition order.
fn degenerate_groups(values: &[Complex<f64>]) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; values.len()];
    let mut groups = Vec::new();
    for i in 0..values.len() {
        if assigned[i] {
            continue;
        }
        let tolerance = DEGENERACY_EPS * (1.0 + values[i].norm());
        let group: Vec<usize> = (i..values.len())
            .filter(|&j| !assigned[j] && (values[j] - values[i]).norm() <= tolerance)
            .collect();
        for &j in &group {
            assigned[j] = true;
        }
        groups.push(group);
    }
    groups
}

fn ensure_finite(all_finite: bool) -> Result<()> {
    if !all_finite {
        bail!("Matrix contains non-finite entries.");
    }
    Ok(())
}

/// Reads eigenvalues off a complex Schur factor. Any 2x2 block left on the
/// diagonal is solved directly.
fn triangular_eigenvalues(t: &DMatrix<Complex<f64>>) -> Vec<Complex<f64>> {
    let dim = t.nrows();
    let mut values = Vec::with_capacity(dim);
    let mut i = 0;
    while i < dim {
        if i + 1 < dim && !is_negligible(t[(i + 1, i)], t[(i, i)], t[(i + 1, i + 1)]) {
            let (a, b, c, d) = (t[(i, i)], t[(i, i + 1)], t[(i + 1, i)], t[(i + 1, i + 1)]);
            let half_trace = (a + d) * 0.5;
            let half_gap = (a - d) * 0.5;
            let root = (half_gap * half_gap + b * c).sqrt();
            values.push(half_trace + root);
            values.push(half_trace - root);
            i += 2;
        } else {
            values.push(t[(i, i)]);
            i += 1;
        }
    }
    values
}

fn is_negligible(sub: Complex<f64>, a: Complex<f64>, d: Complex<f64>) -> bool {
    let sub = sub.norm();
    sub == 0.0 || sub <= f64::EPSILON * (a.norm() + d.norm())
}

fn real_null_basis(
    matrix: &DMatrix<f64>,
    lambda: f64,
    count: usize,
) -> Result<Vec<Vec<Complex<f64>>>> {
    let dim = matrix.nrows();
    let mut shifted = matrix.clone();
    for i in 0..dim {
        shifted[(i, i)] -= lambda;
    }

    let svd = SVD::new(shifted, false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| anyhow!("SVD did not produce right singular vectors."))?;
    let basis = smallest_singular_indices(svd.singular_values.as_slice(), count)
        .into_iter()
        .map(|row| {
            let mut vector: Vec<Complex<f64>> =
                v_t.row(row).iter().map(|&v| Complex::new(v, 0.0)).collect();
            normalize_complex_vector(&mut vector);
            vector
        })
        .collect();
    Ok(basis)
}

fn complex_null_basis(
    matrix: &DMatrix<Complex<f64>>,
    lambda: Complex<f64>,
    count: usize,
) -> Result<Vec<Vec<Complex<f64>>>> {
    let dim = matrix.nrows();
    let mut shifted = matrix.clone();
    for i in 0..dim {
        shifted[(i, i)] -= lambda;
    }

    let svd = SVD::new(shifted, false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| anyhow!("SVD did not produce right singular vectors."))?;
    let basis = smallest_singular_indices(svd.singular_values.as_slice(), count)
        .into_iter()
        .map(|row| {
            // v_t holds the adjoint of V, so null vectors are conjugated rows.
            let mut vector: Vec<Complex<f64>> = v_t.row(row).iter().map(|c| c.conj()).collect();
            normalize_complex_vector(&mut vector);
            vector
        })
        .collect();
    Ok(basis)
}

/// Indices of the `count` smallest singular values, smallest first.
fn smallest_singular_indices(singular_values: &[f64], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..singular_values.len()).collect();
    order.sort_by(|&a, &b| singular_values[a].total_cmp(&singular_values[b]));
    order.truncate(count);
    order
}

pub(crate) fn normalize_complex_vector(vec: &mut [Complex<f64>]) {
    let norm = vec.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    if norm > 0.0 {
        for entry in vec {
            *entry /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residual(matrix: &DMatrix<Complex<f64>>, pair: &Eigenpair) -> f64 {
        let dim = matrix.nrows();
        let mut worst: f64 = 0.0;
        for i in 0..dim {
            let mut acc = Complex::new(0.0, 0.0);
            for j in 0..dim {
                acc += matrix[(i, j)] * pair.vector[j];
            }
            worst = worst.max((acc - pair.value * pair.vector[i]).norm());
        }
        worst
    }

    fn sorted_by_re(mut values: Vec<Complex<f64>>) -> Vec<Complex<f64>> {
        values.sort_by(|a, b| a.re.partial_cmp(&b.re).unwrap());
        values
    }

    #[test]
    fn real_eigenvalues_of_diagonal_matrix() {
        let mat = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]);
        let values = sorted_by_re(DenseEigen::default().eigenvalues(&mat).expect("eigenvalues"));
        assert!((values[0].re - 1.0).abs() < 1e-12);
        assert!((values[1].re - 2.0).abs() < 1e-12);
        assert!(values.iter().all(|v| v.im.abs() < 1e-12));
    }

    #[test]
    fn real_rotation_has_conjugate_pair() {
        let mat = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        let mut values = DenseEigen::default().eigenvalues(&mat).expect("eigenvalues");
        values.sort_by(|a, b| a.im.partial_cmp(&b.im).unwrap());
        assert!((values[0] - Complex::new(0.0, -1.0)).norm() < 1e-12);
        assert!((values[1] - Complex::new(0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn complex_eigenvalues_of_triangular_matrix() {
        let mat = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(1.0, 1.0),
                Complex::new(3.0, 0.0),
                Complex::new(0.0, 0.0),
                Complex::new(-2.0, 0.5),
            ],
        );
        let values = sorted_by_re(DenseEigen::default().eigenvalues(&mat).expect("eigenvalues"));
        assert!((values[0] - Complex::new(-2.0, 0.5)).norm() < 1e-10);
        assert!((values[1] - Complex::new(1.0, 1.0)).norm() < 1e-10);
    }

    #[test]
    fn complex_eigenvalues_match_trace_and_determinant() {
        let mat = DMatrix::from_row_slice(
            3,
            3,
            &[
                Complex::new(1.0, 0.5),
                Complex::new(0.2, -1.0),
                Complex::new(0.0, 0.3),
                Complex::new(-0.7, 0.0),
                Complex::new(2.0, 0.0),
                Complex::new(1.1, 1.1),
                Complex::new(0.4, -0.2),
                Complex::new(0.0, 1.0),
                Complex::new(-1.5, 0.25),
            ],
        );
        let values = DenseEigen::default().eigenvalues(&mat).expect("eigenvalues");
        assert_eq!(values.len(), 3);
        let trace = mat[(0, 0)] + mat[(1, 1)] + mat[(2, 2)];
        let sum: Complex<f64> = values.iter().sum();
        assert!((sum - trace).norm() < 1e-9);
        let det = mat.determinant();
        let product: Complex<f64> = values.iter().product();
        assert!((product - det).norm() < 1e-9);
    }

    #[test]
    fn eigenpairs_satisfy_eigen_equation() {
        let mat = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, 0.0, -1.0, 0.5, 0.3, 0.0, 0.2, -1.0]);
        let pairs = DenseEigen::default().eigenpairs(&mat).expect("eigenpairs");
        let complex_mat = mat.map(|v| Complex::new(v, 0.0));
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            let norm: f64 = pair.vector.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-10);
            assert!(residual(&complex_mat, pair) < 1e-8);
        }
    }

    #[test]
    fn real_eigenvalues_get_real_eigenvectors() {
        let mat = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let pairs = DenseEigen::default().eigenpairs(&mat).expect("eigenpairs");
        for pair in &pairs {
            assert!(pair.vector.iter().all(|c| c.im == 0.0));
        }
    }

    #[test]
    fn complex_eigenpairs_satisfy_eigen_equation() {
        let mat = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex::new(0.0, 1.0),
                Complex::new(1.0, 0.0),
                Complex::new(2.0, -1.0),
                Complex::new(0.5, 0.0),
            ],
        );
        let pairs = DenseEigen::default().eigenpairs(&mat).expect("eigenpairs");
        for pair in &pairs {
            assert!(residual(&mat, pair) < 1e-8);
        }
    }

    fn overlap(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x.conj() * y).sum::<Complex<f64>>().norm()
    }

    #[test]
    fn repeated_eigenvalue_gets_independent_eigenvectors() {
        let mat = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]);
        let pairs = DenseEigen::default().eigenpairs(&mat).expect("eigenpairs");
        assert_eq!(pairs.len(), 2);
        let complex_mat = mat.map(|v| Complex::new(v, 0.0));
        for pair in &pairs {
            assert!((pair.value.re - 2.0).abs() < 1e-12);
            assert!(residual(&complex_mat, pair) < 1e-10);
        }
        assert!(overlap(&pairs[0].vector, &pairs[1].vector) < 1e-10);
    }

    #[test]
    fn repeated_complex_eigenvalue_gets_independent_eigenvectors() {
        let lambda = Complex::new(0.5, -1.5);
        let mat = DMatrix::from_diagonal_element(3, 3, lambda);
        let pairs = DenseEigen::default().eigenpairs(&mat).expect("eigenpairs");
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            assert!(residual(&mat, pair) < 1e-10);
        }
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(overlap(&pairs[i].vector, &pairs[j].vector) < 1e-10);
            }
        }
    }

    #[test]
    fn degenerate_groups_keep_decomposition_order() {
        let values = [
            Complex::new(1.0, 0.0),
            Complex::new(3.0, 0.0),
            Complex::new(1.0 + 1e-12, 0.0),
            Complex::new(3.0, 1e-3),
        ];
        assert_eq!(degenerate_groups(&values), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn smallest_singular_indices_are_ascending() {
        assert_eq!(smallest_singular_indices(&[3.0, 0.0, 1.0, 0.0], 3), vec![1, 3, 2]);
    }

    #[test]
    fn empty_matrix_has_no_eigenvalues() {
        let mat = DMatrix::<f64>::zeros(0, 0);
        assert!(DenseEigen::default().eigenvalues(&mat).expect("empty").is_empty());
    }

    #[test]
    fn non_finite_entries_are_rejected() {
        let mat = DMatrix::from_row_slice(2, 2, &[f64::NAN, 0.0, 0.0, 1.0]);
        let err = DenseEigen::default().eigenvalues(&mat).expect_err("expected error");
        assert!(format!("{err}").contains("non-finite"));
    }
}
