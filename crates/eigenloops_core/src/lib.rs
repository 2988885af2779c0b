pub mod decompose;
pub mod error;
pub mod families;
pub mod grids;
pub mod matching;
/// The `eigenloops_core` crate reconstructs continuous eigenvalue trajectories
/// from parameterized matrix families whose eigendecomposition returns values
/// in no particular order.
///
/// Key components:
/// - **Traits**: `Decomposer` (eigendecomposition primitive), `Matcher`
///   (identity assignment policy), `SquareMatrix` (shape inspection).
/// - **Tracking**: `Tracker` with single-parameter, two-parameter loop and
///   eigenvector-aware sweeps, each a fold over the sample grid.
/// - **Matching**: greedy nearest-match and optimal assignment policies.
/// - **Families**: homotopies, phase loops and polynomial companion families.
pub mod traits;
pub mod tracking;

pub use error::TrackError;
pub use tracking::{
    track_eigenvalue_loops, track_eigenvalues, track_eigenvectors, Tracker, TrackerSettings,
};
