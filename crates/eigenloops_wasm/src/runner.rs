//! Batch-stepped single-parameter sweep, so the UI can interleave progress
//! updates with decomposition work.

use crate::tracker::{decode_family, decode_settings, encode};
use anyhow::{bail, Result};
use eigenloops_core::families::Family;
use eigenloops_core::tracking::{EigenTrajectories, TrajectoryAccumulator};
use eigenloops_core::Tracker;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Progress payload for the stepped trajectory runner.
#[derive(Debug, Serialize, PartialEq)]
struct TrackingProgress {
    done: bool,
    current_sample: usize,
    total_samples: usize,
}

struct TrajectoryRunnerState {
    tracker: Tracker,
    family: Family,
    grid: Vec<f64>,
    acc: TrajectoryAccumulator,
}

impl TrajectoryRunnerState {
    fn new(tracker: Tracker, family: Family, grid: Vec<f64>) -> Result<Self> {
        let first = match grid.first() {
            Some(&first) => first,
            None => bail!("Sample grid is empty."),
        };
        let acc = tracker.start(&family.at(first), first)?;
        Ok(Self {
            tracker,
            family,
            grid,
            acc,
        })
    }

    fn is_done(&self) -> bool {
        self.acc.samples() >= self.grid.len()
    }

    fn run_steps(&mut self, batch_size: usize) -> Result<()> {
        for _ in 0..batch_size {
            if self.is_done() {
                break;
            }
            let param = self.grid[self.acc.samples()];
            self.tracker
                .step(&mut self.acc, &self.family.at(param), param)?;
        }
        Ok(())
    }

    fn progress(&self) -> TrackingProgress {
        TrackingProgress {
            done: self.is_done(),
            current_sample: self.acc.samples(),
            total_samples: self.grid.len(),
        }
    }

    fn result(&self) -> Result<EigenTrajectories> {
        if !self.is_done() {
            bail!("Tracking has not finished yet.");
        }
        Ok(self.acc.clone().finish())
    }
}

#[wasm_bindgen]
pub struct WasmTrajectoryRunner {
    state: Option<TrajectoryRunnerState>,
}

#[wasm_bindgen]
impl WasmTrajectoryRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        family: JsValue,
        grid: Vec<f64>,
        settings: JsValue,
    ) -> Result<WasmTrajectoryRunner, JsValue> {
        console_error_panic_hook::set_once();

        let tracker = Tracker::new(decode_settings(settings)?);
        let family = decode_family(family)?;
        let state = TrajectoryRunnerState::new(tracker, family, grid)
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;

        Ok(WasmTrajectoryRunner { state: Some(state) })
    }

    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.is_done())
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        state
            .run_steps(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("Tracking failed: {}", e)))?;

        encode(&state.progress())
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        encode(&state.progress())
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let result = state
            .result()
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        encode(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigenloops_core::families::FamilySpec;
    use eigenloops_core::grids::linspace;
    use eigenloops_core::TrackerSettings;
    use num_complex::Complex;

    fn c(re: f64) -> Complex<f64> {
        Complex::new(re, 0.0)
    }

    fn diagonal_family() -> Family {
        FamilySpec::Homotopy {
            dimension: 2,
            start: vec![c(1.0), c(0.0), c(0.0), c(5.0)],
            end: vec![c(2.0), c(0.0), c(0.0), c(6.0)],
        }
        .build()
        .expect("family should build")
    }

    fn runner_state(grid: Vec<f64>) -> TrajectoryRunnerState {
        TrajectoryRunnerState::new(
            Tracker::new(TrackerSettings::default()),
            diagonal_family(),
            grid,
        )
        .expect("runner state")
    }

    #[test]
    fn runner_progresses_in_batches() {
        let mut state = runner_state(linspace(0.0, 1.0, 5));
        assert_eq!(
            state.progress(),
            TrackingProgress {
                done: false,
                current_sample: 1,
                total_samples: 5,
            }
        );
        assert!(state.result().is_err(), "expected unfinished runner");

        state.run_steps(2).expect("run steps");
        assert_eq!(state.progress().current_sample, 3);
        assert!(!state.is_done());

        state.run_steps(10).expect("run steps");
        assert!(state.is_done());
        assert_eq!(state.progress().current_sample, 5);

        let result = state.result().expect("result");
        assert_eq!(result.samples(), 5);
        let low = if result.values[0][0].re < 3.0 { 0 } else { 1 };
        assert!((result.values[low][4].re - 2.0).abs() < 1e-12);
        assert!((result.values[1 - low][4].re - 6.0).abs() < 1e-12);
    }

    #[test]
    fn runner_matches_one_shot_tracking() {
        let grid = linspace(0.0, 1.0, 7);
        let mut state = runner_state(grid.clone());
        state.run_steps(3).expect("run steps");
        state.run_steps(3).expect("run steps");
        let family = diagonal_family();
        let expected = Tracker::default()
            .track(|t| family.at(t), &grid)
            .expect("track");
        assert_eq!(state.result().expect("result"), expected);
    }

    #[test]
    fn single_sample_runner_is_done_immediately() {
        let state = runner_state(vec![0.5]);
        assert!(state.is_done());
        assert_eq!(state.result().expect("result").samples(), 1);
    }

    #[test]
    fn runner_rejects_empty_grid() {
        let result = TrajectoryRunnerState::new(
            Tracker::default(),
            diagonal_family(),
            Vec::new(),
        );
        let message = result.err().map(|e| format!("{e}")).unwrap_or_default();
        assert!(message.contains("Sample grid is empty"));
    }
}
