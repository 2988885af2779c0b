//! Error type shared by the trackers.

use thiserror::Error;

/// Failures raised while reconstructing trajectories.
///
/// Every variant aborts the whole sweep; no partial table is returned.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("sample grid is empty")]
    EmptyGrid,

    /// The family's first matrix is not square.
    #[error("matrix must be square, got {rows}x{cols}")]
    Shape { rows: usize, cols: usize },

    /// A later matrix does not have the shape fixed by the first sample.
    #[error("matrix at sample {sample} is {rows}x{cols}, expected {expected}x{expected}")]
    Dimension {
        sample: usize,
        expected: usize,
        rows: usize,
        cols: usize,
    },

    /// The decomposition returned a different number of eigenvalues than the
    /// number of tracked identities.
    #[error("decomposition at sample {sample} returned {found} eigenvalues, expected {expected}")]
    Mismatch {
        sample: usize,
        expected: usize,
        found: usize,
    },

    #[error("matcher returned an invalid assignment at sample {sample}")]
    InvalidAssignment { sample: usize },

    /// A failure inside a loop slice after the first, tagged with its `v` index.
    #[error("loop slice {slice} failed: {source}")]
    Slice {
        slice: usize,
        #[source]
        source: Box<TrackError>,
    },

    #[error("eigendecomposition failed at sample {sample}: {source}")]
    Decomposition {
        sample: usize,
        #[source]
        source: anyhow::Error,
    },
}
