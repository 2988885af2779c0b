//! Stock matrix families and their serializable descriptions.
//!
//! These cover the sweeps the animations are usually built from: a straight
//! homotopy between two matrices, a base matrix perturbed by two phase terms
//! (the loop family), and polynomial root homotopies expressed through
//! companion matrices.

use anyhow::{bail, Result};
use nalgebra::{Complex, DMatrix};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// `(1 - t) start + t end`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearHomotopy {
    pub start: DMatrix<Complex<f64>>,
    pub end: DMatrix<Complex<f64>>,
}

impl LinearHomotopy {
    pub fn new(start: DMatrix<Complex<f64>>, end: DMatrix<Complex<f64>>) -> Result<Self> {
        if start.shape() != end.shape() {
            bail!(
                "Homotopy endpoints differ in shape: {:?} vs {:?}.",
                start.shape(),
                end.shape()
            );
        }
        Ok(Self { start, end })
    }

    pub fn at(&self, t: f64) -> DMatrix<Complex<f64>> {
        self.start.map(|v| v * (1.0 - t)) + self.end.map(|v| v * t)
    }
}

/// `base + u_scale e^{iu} u_term + v_scale e^{iv} v_term`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseLoop {
    pub base: DMatrix<Complex<f64>>,
    pub u_term: DMatrix<Complex<f64>>,
    pub v_term: DMatrix<Complex<f64>>,
    pub u_scale: f64,
    pub v_scale: f64,
}

impl PhaseLoop {
    pub fn at(&self, u: f64, v: f64) -> DMatrix<Complex<f64>> {
        let u_phase = Complex::from_polar(self.u_scale, u);
        let v_phase = Complex::from_polar(self.v_scale, v);
        let mut out = self.base.clone();
        for ((entry, &a), &b) in out.iter_mut().zip(self.u_term.iter()).zip(self.v_term.iter()) {
            *entry += u_phase * a + v_phase * b;
        }
        out
    }
}

/// Companion matrix of a polynomial given highest degree first. Its
/// eigenvalues are the polynomial's roots.
pub fn companion_matrix(coeffs: &[Complex<f64>]) -> Result<DMatrix<Complex<f64>>> {
    let (&leading, rest) = match coeffs.split_first() {
        Some(split) => split,
        None => bail!("Polynomial has no coefficients."),
    };
    if leading.is_zero() {
        bail!("Leading coefficient must be non-zero.");
    }

    let degree = rest.len();
    let mut matrix = DMatrix::zeros(degree, degree);
    for (j, &c) in rest.iter().enumerate() {
        matrix[(0, j)] = -c / leading;
    }
    for i in 1..degree {
        matrix[(i, i - 1)] = Complex::one();
    }
    Ok(matrix)
}

/// Roots of `(1 - t) start + t end`, tracked as companion eigenvalues.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialHomotopy {
    start: Vec<Complex<f64>>,
    end: Vec<Complex<f64>>,
}

impl PolynomialHomotopy {
    pub fn new(start: Vec<Complex<f64>>, end: Vec<Complex<f64>>) -> Result<Self> {
        if start.len() != end.len() {
            bail!(
                "Polynomials differ in degree: {} vs {} coefficients.",
                start.len(),
                end.len()
            );
        }
        companion_matrix(&start)?;
        companion_matrix(&end)?;
        Ok(Self { start, end })
    }

    pub fn degree(&self) -> usize {
        self.start.len().saturating_sub(1)
    }

    pub fn coefficients_at(&self, t: f64) -> Vec<Complex<f64>> {
        self.start
            .iter()
            .zip(&self.end)
            .map(|(&p, &q)| p * (1.0 - t) + q * t)
            .collect()
    }

    /// Companion matrix at `t`. A vanishing leading coefficient yields
    /// non-finite entries, which the decomposition rejects.
    pub fn at(&self, t: f64) -> DMatrix<Complex<f64>> {
        let coeffs = self.coefficients_at(t);
        let degree = coeffs.len().saturating_sub(1);
        let mut matrix = DMatrix::zeros(degree, degree);
        for j in 0..degree {
            matrix[(0, j)] = -coeffs[j + 1] / coeffs[0];
        }
        for i in 1..degree {
            matrix[(i, i - 1)] = Complex::one();
        }
        matrix
    }
}

/// Serializable family description; matrices are row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FamilySpec {
    Homotopy {
        dimension: usize,
        start: Vec<Complex<f64>>,
        end: Vec<Complex<f64>>,
    },
    PhaseLoop {
        dimension: usize,
        base: Vec<Complex<f64>>,
        u_term: Vec<Complex<f64>>,
        v_term: Vec<Complex<f64>>,
        u_scale: f64,
        v_scale: f64,
    },
    Polynomial {
        start: Vec<Complex<f64>>,
        end: Vec<Complex<f64>>,
    },
}

/// A validated family ready to be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Family {
    Homotopy(LinearHomotopy),
    PhaseLoop(PhaseLoop),
    Polynomial(PolynomialHomotopy),
}

impl Family {
    pub fn dimension(&self) -> usize {
        match self {
            Family::Homotopy(h) => h.start.nrows(),
            Family::PhaseLoop(l) => l.base.nrows(),
            Family::Polynomial(p) => p.degree(),
        }
    }

    /// One-parameter evaluation. The phase loop is swept along `u` with `v`
    /// held at zero.
    pub fn at(&self, t: f64) -> DMatrix<Complex<f64>> {
        match self {
            Family::Homotopy(h) => h.at(t),
            Family::PhaseLoop(l) => l.at(t, 0.0),
            Family::Polynomial(p) => p.at(t),
        }
    }

    /// The two-parameter form, available only for phase loops.
    pub fn as_loop(&self) -> Result<&PhaseLoop> {
        match self {
            Family::PhaseLoop(l) => Ok(l),
            _ => bail!("Loop tracking requires a phase_loop family."),
        }
    }
}

impl FamilySpec {
    pub fn build(&self) -> Result<Family> {
        match self {
            FamilySpec::Homotopy {
                dimension,
                start,
                end,
            } => {
                let start = square_from_rows(*dimension, start, "start")?;
                let end = square_from_rows(*dimension, end, "end")?;
                Ok(Family::Homotopy(LinearHomotopy::new(start, end)?))
            }
            FamilySpec::PhaseLoop {
                dimension,
                base,
                u_term,
                v_term,
                u_scale,
                v_scale,
            } => Ok(Family::PhaseLoop(PhaseLoop {
                base: square_from_rows(*dimension, base, "base")?,
                u_term: square_from_rows(*dimension, u_term, "u_term")?,
                v_term: square_from_rows(*dimension, v_term, "v_term")?,
                u_scale: *u_scale,
                v_scale: *v_scale,
            })),
            FamilySpec::Polynomial { start, end } => Ok(Family::Polynomial(
                PolynomialHomotopy::new(start.clone(), end.clone())?,
            )),
        }
    }
}

fn square_from_rows(
    dimension: usize,
    entries: &[Complex<f64>],
    label: &str,
) -> Result<DMatrix<Complex<f64>>> {
    if entries.len() != dimension * dimension {
        bail!(
            "Matrix '{}' has {} entries, expected {} for dimension {}.",
            label,
            entries.len(),
            dimension * dimension,
            dimension
        );
    }
    Ok(DMatrix::from_row_slice(dimension, dimension, entries))
}
