//! One-shot tracking calls and grid helpers.

use eigenloops_core::families::{Family, FamilySpec};
use eigenloops_core::grids;
use eigenloops_core::{Tracker, TrackerSettings};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn decode_settings(settings: JsValue) -> Result<TrackerSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(TrackerSettings::default());
    }
    from_value(settings)
        .map_err(|e| JsValue::from_str(&format!("Invalid tracker settings: {}", e)))
}

pub(crate) fn decode_family(family: JsValue) -> Result<Family, JsValue> {
    let spec: FamilySpec = from_value(family)
        .map_err(|e| JsValue::from_str(&format!("Invalid family description: {}", e)))?;
    spec.build()
        .map_err(|e| JsValue::from_str(&format!("Invalid family: {}", e)))
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Forwards `(done, total)` to an optional JS callback.
fn forward_progress(callback: Option<&js_sys::Function>) -> impl FnMut(usize, usize) + '_ {
    move |done, total| {
        if let Some(callback) = callback {
            // A throwing progress callback must not abort the sweep.
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_f64(done as f64),
                &JsValue::from_f64(total as f64),
            );
        }
    }
}

#[wasm_bindgen]
pub struct WasmEigenTracker {
    tracker: Tracker,
}

#[wasm_bindgen]
impl WasmEigenTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<WasmEigenTracker, JsValue> {
        console_error_panic_hook::set_once();

        let settings = decode_settings(settings)?;
        Ok(WasmEigenTracker {
            tracker: Tracker::new(settings),
        })
    }

    pub fn track(
        &self,
        family: JsValue,
        grid: Vec<f64>,
        on_progress: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let family = decode_family(family)?;
        let mut progress = forward_progress(on_progress.as_ref());
        let result = self
            .tracker
            .track_with_progress(|t| family.at(t), &grid, Some(&mut progress))
            .map_err(|e| JsValue::from_str(&format!("Tracking failed: {}", e)))?;
        encode(&result)
    }

    pub fn track_loops(
        &self,
        family: JsValue,
        u: Vec<f64>,
        v: Vec<f64>,
        on_progress: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let family = decode_family(family)?;
        let phase_loop = family
            .as_loop()
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        let mut progress = forward_progress(on_progress.as_ref());
        let result = self
            .tracker
            .track_loops_with_progress(|a, b| phase_loop.at(a, b), &u, &v, Some(&mut progress))
            .map_err(|e| JsValue::from_str(&format!("Loop tracking failed: {}", e)))?;
        encode(&result)
    }

    pub fn track_vectors(&self, family: JsValue, grid: Vec<f64>) -> Result<JsValue, JsValue> {
        let family = decode_family(family)?;
        let result = self
            .tracker
            .track_with_vectors(|t| family.at(t), &grid)
            .map_err(|e| JsValue::from_str(&format!("Eigenvector tracking failed: {}", e)))?;
        encode(&result)
    }
}

#[wasm_bindgen]
pub fn linspace(start: f64, end: f64, count: u32) -> Vec<f64> {
    grids::linspace(start, end, count as usize)
}

#[wasm_bindgen]
pub fn sigmoid_schedule(count: u32, beta: f64) -> Result<Vec<f64>, JsValue> {
    grids::sigmoid_schedule(count as usize, beta).map_err(|e| JsValue::from_str(&format!("{}", e)))
}
