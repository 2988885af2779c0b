//! WASM bindings for the eigenloops tracker.
//!
//! Families arrive as serialized `FamilySpec` values; results are returned as
//! serialized `EigenTrajectories`, `EigenLoops` or `EigenvectorTrajectories`.

mod runner;
mod tracker;

pub use runner::WasmTrajectoryRunner;
pub use tracker::{linspace, sigmoid_schedule, WasmEigenTracker};
