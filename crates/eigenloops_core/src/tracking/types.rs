//! Materialised tracking results.

use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use crate::traits::Matcher;

/// Axis-aligned extent of a set of complex values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComplexBounds {
    pub re_min: f64,
    pub re_max: f64,
    pub im_min: f64,
    pub im_max: f64,
}

impl ComplexBounds {
    /// Extent of `values`, or `None` when there are none.
    pub fn from_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Complex<f64>>,
    {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            re_min: first.re,
            re_max: first.re,
            im_min: first.im,
            im_max: first.im,
        };
        for value in iter {
            bounds.re_min = bounds.re_min.min(value.re);
            bounds.re_max = bounds.re_max.max(value.re);
            bounds.im_min = bounds.im_min.min(value.im);
            bounds.im_max = bounds.im_max.max(value.im);
        }
        Some(bounds)
    }

    /// Grows every side by `margin`.
    pub fn padded(self, margin: f64) -> Self {
        Self {
            re_min: self.re_min - margin,
            re_max: self.re_max + margin,
            im_min: self.im_min - margin,
            im_max: self.im_max + margin,
        }
    }
}

/// Eigenvalues ordered by trajectory identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EigenTrajectories {
    /// The sample grid the sweep followed.
    pub params: Vec<f64>,
    /// `values[id][k]` is identity `id` at `params[k]`.
    pub values: Vec<Vec<Complex<f64>>>,
}

impl EigenTrajectories {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn samples(&self) -> usize {
        self.params.len()
    }

    pub fn trajectory(&self, id: usize) -> Option<&[Complex<f64>]> {
        self.values.get(id).map(|row| row.as_slice())
    }

    /// Every identity's value at sample `k`, in identity order.
    pub fn column(&self, k: usize) -> Option<Vec<Complex<f64>>> {
        if k >= self.samples() {
            return None;
        }
        Some(self.values.iter().map(|row| row[k]).collect())
    }

    pub fn bounds(&self) -> Option<ComplexBounds> {
        ComplexBounds::from_values(self.values.iter().flatten())
    }

    /// For a sweep that returns to its starting matrix, reports which
    /// identity each trajectory ends on: `perm[id]` is the identity whose
    /// starting value trajectory `id` finishes closest to.
    pub fn closure_permutation<M: Matcher>(&self, matcher: &M) -> Vec<usize> {
        let last = match self.samples().checked_sub(1) {
            Some(last) => last,
            None => return Vec::new(),
        };
        let start: Vec<Complex<f64>> = self.values.iter().map(|row| row[0]).collect();
        let end: Vec<Complex<f64>> = self.values.iter().map(|row| row[last]).collect();
        matcher.assign(&start, &end)
    }
}

/// Eigenvalue loops over a two-parameter sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EigenLoops {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    /// `values[id][j][k]` is identity `id` at `(u[j], v[k])`.
    pub values: Vec<Vec<Vec<Complex<f64>>>>,
}

impl EigenLoops {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, id: usize, j: usize, k: usize) -> Option<Complex<f64>> {
        self.values.get(id)?.get(j)?.get(k).copied()
    }

    /// The trajectories along `u` at `v[k]`, indexed by identity.
    pub fn slice(&self, k: usize) -> Option<Vec<Vec<Complex<f64>>>> {
        if k >= self.v.len() {
            return None;
        }
        Some(
            self.values
                .iter()
                .map(|rows| rows.iter().map(|row| row[k]).collect())
                .collect(),
        )
    }

    pub fn bounds(&self) -> Option<ComplexBounds> {
        ComplexBounds::from_values(self.values.iter().flatten().flatten())
    }

    /// Like [`EigenTrajectories::closure_permutation`], comparing the first
    /// `u` value of the last slice with that of the first slice.
    pub fn closure_permutation<M: Matcher>(&self, matcher: &M) -> Vec<usize> {
        let last = match self.v.len().checked_sub(1) {
            Some(last) if !self.u.is_empty() => last,
            _ => return Vec::new(),
        };
        let start: Vec<Complex<f64>> = self.values.iter().map(|rows| rows[0][0]).collect();
        let end: Vec<Complex<f64>> = self.values.iter().map(|rows| rows[0][last]).collect();
        matcher.assign(&start, &end)
    }
}

/// Eigenvalue trajectories with sign- or phase-aligned eigenvectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EigenvectorTrajectories {
    pub trajectories: EigenTrajectories,
    /// `vectors[id][k]` is the eigenvector of identity `id` at sample `k`.
    pub vectors: Vec<Vec<Vec<Complex<f64>>>>,
}

impl EigenvectorTrajectories {
    pub fn vector(&self, id: usize, k: usize) -> Option<&[Complex<f64>]> {
        self.vectors.get(id)?.get(k).map(|v| v.as_slice())
    }
}
