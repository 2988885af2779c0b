//! Stateless eigenvector alignment against the previous sample.

use log::warn;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};

/// How a fresh eigenvector is normalised against its predecessor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorAlignment {
    /// Multiply by the sign (±1) of the real part of the inner product.
    #[default]
    Sign,
    /// Rotate by the unit phase of the inner product.
    Phase,
}

impl VectorAlignment {
    pub fn apply(self, previous: &[Complex<f64>], candidate: &[Complex<f64>]) -> Vec<Complex<f64>> {
        match self {
            VectorAlignment::Sign => align_sign(previous, candidate),
            VectorAlignment::Phase => align_phase(previous, candidate),
        }
    }
}

/// `Σ conj(a_i) b_i`.
pub fn inner_product(a: &[Complex<f64>], b: &[Complex<f64>]) -> Complex<f64> {
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

/// Scales `candidate` by `sign(Re <previous, candidate>)`.
///
/// An orthogonal candidate has sign zero and collapses to the zero vector.
pub fn align_sign(previous: &[Complex<f64>], candidate: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let overlap = inner_product(previous, candidate).re;
    let sign = if overlap > 0.0 {
        1.0
    } else if overlap < 0.0 {
        -1.0
    } else {
        warn!("[align] eigenvector is orthogonal to its predecessor; sign is zero");
        0.0
    };
    candidate.iter().map(|&c| c * sign).collect()
}

/// Rotates `candidate` so that `<previous, candidate>` becomes real and
/// non-negative. A zero overlap leaves the candidate untouched.
pub fn align_phase(previous: &[Complex<f64>], candidate: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let overlap = inner_product(previous, candidate);
    let magnitude = overlap.norm();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return candidate.to_vec();
    }
    let rotation = overlap.conj() / magnitude;
    candidate.iter().map(|&c| c * rotation).collect()
}
