//! Sample grid construction.

use anyhow::{bail, Result};

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut values: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            values[count - 1] = end;
            values
        }
    }
}

/// `count` samples of `[0, 1]` that crowd toward both ends:
/// `1 / (1 + (t / (1 - t))^(-beta))` on an even grid, endpoints pinned.
pub fn sigmoid_schedule(count: usize, beta: f64) -> Result<Vec<f64>> {
    if !(beta > 0.0) {
        bail!("beta must be positive.");
    }
    let mut values: Vec<f64> = linspace(0.0, 1.0, count)
        .into_iter()
        .map(|t| 1.0 / (1.0 + (t / (1.0 - t)).powf(-beta)))
        .collect();
    if let Some(first) = values.first_mut() {
        *first = 0.0;
    }
    if count > 1 {
        values[count - 1] = 1.0;
    }
    Ok(values)
}
