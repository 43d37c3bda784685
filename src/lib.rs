// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite ("EPP Engine")

pub mod types;
pub mod config;
pub mod error;
pub mod pathway;
pub mod network;
pub mod controller;
pub mod events;
pub mod simulation;

pub use config::*;
pub use controller::{Controller, Reaction};
pub use error::{SimError, SimResult};
pub use events::EventSchedule;
pub use network::PathwayNetwork;
pub use pathway::Pathway;
pub use simulation::{PathwaySimulation, RunOutcome, RunPhase, StopHandle};
pub use types::*;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(typescript_type = "Function")]
    type Callback;

    #[wasm_bindgen(method, catch, js_name = call)]
    fn call1(this: &Callback, context: &JsValue, arg: &JsValue) -> Result<JsValue, JsValue>;
}

fn require_callback(name: &'static str, value: JsValue) -> Result<Callback, SimError> {
    if value.is_function() {
        Ok(value.unchecked_into())
    } else {
        Err(SimError::MissingCallback(name))
    }
}

fn to_js_error(err: SimError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Call `callback(value)`. Returns `false` only when the callback
/// explicitly returned `false`.
fn notify<T: serde::Serialize>(callback: &Callback, value: &T) -> bool {
    let arg = serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL);
    match callback.call1(&JsValue::NULL, &arg) {
        Ok(ret) => ret.as_bool() != Some(false),
        Err(err) => {
            tracing::warn!(error = ?err, "callback threw");
            true
        }
    }
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl PathwaySimulation {
    /// Build from a JS parameter object; `undefined` or `null` selects the
    /// default EVM scenario.
    #[wasm_bindgen(constructor)]
    pub fn create(config: JsValue) -> Result<PathwaySimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config = if config.is_undefined() || config.is_null() {
            SimulationConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        PathwaySimulation::new(config).map_err(to_js_error)
    }

    /// Start stepping manually via `tick()`.
    #[wasm_bindgen(js_name = start)]
    pub fn start_js(&mut self) -> Result<(), JsValue> {
        self.start().map_err(to_js_error)
    }

    /// Run to completion, calling `onTick(snapshot)` every tick and
    /// `onFinish(summary)` once. Returns `false` if stopped early.
    ///
    /// The instance is borrowed for the whole run, so callbacks stop it
    /// through a handle from `stopHandle()` or by returning `false` from
    /// `onTick`. Ticks are not paced here; use `tick()` on a timer with
    /// `delayMs` for an animated run.
    #[wasm_bindgen(js_name = run)]
    pub fn run_js(&mut self, on_tick: JsValue, on_finish: JsValue) -> Result<bool, JsValue> {
        let on_tick = require_callback("onTick", on_tick).map_err(to_js_error)?;
        let on_finish = require_callback("onFinish", on_finish).map_err(to_js_error)?;
        let handle = self.stop_handle();
        let outcome = self
            .run(
                |snapshot| {
                    if !notify(&on_tick, snapshot) {
                        handle.stop();
                    }
                },
                |summary| {
                    notify(&on_finish, &summary);
                },
            )
            .map_err(to_js_error)?;
        Ok(outcome == RunOutcome::Finished)
    }

    /// Handle that stops this instance at the next tick boundary, usable
    /// from inside `run` callbacks.
    #[wasm_bindgen(js_name = stopHandle)]
    pub fn stop_handle_js(&self) -> StopHandle {
        self.stop_handle()
    }

    /// Advance one tick. Returns the snapshot, the summary on the step that
    /// finishes the run, or `null` when not running.
    pub fn tick(&mut self) -> JsValue {
        match self.step() {
            StepOutcome::Tick(snapshot) => serde_wasm_bindgen::to_value(&snapshot).unwrap_or(JsValue::NULL),
            StepOutcome::Finished(summary) => serde_wasm_bindgen::to_value(&summary).unwrap_or(JsValue::NULL),
            StepOutcome::Idle => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = stop)]
    pub fn stop_js(&mut self) {
        self.stop();
    }

    #[wasm_bindgen(getter, js_name = currentTick)]
    pub fn current_tick_js(&self) -> u64 {
        self.current_tick()
    }

    #[wasm_bindgen(getter, js_name = delayMs)]
    pub fn delay_ms_js(&self) -> u64 {
        self.config.simulation_delay_ms
    }

    #[wasm_bindgen(getter, js_name = isRunning)]
    pub fn is_running_js(&self) -> bool {
        self.is_running()
    }

    #[wasm_bindgen(getter, js_name = isFinished)]
    pub fn is_finished_js(&self) -> bool {
        self.phase() == RunPhase::Finished
    }

    pub fn get_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.stats()).unwrap_or(JsValue::NULL)
    }

    pub fn get_headline(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.headline()).unwrap_or(JsValue::NULL)
    }

    /// Final summary; `null` unless the run finished.
    pub fn get_summary(&self) -> JsValue {
        if self.phase() != RunPhase::Finished {
            return JsValue::NULL;
        }
        serde_wasm_bindgen::to_value(&self.summary()).unwrap_or(JsValue::NULL)
    }

    /// Fresh instance with the same configuration. Handles taken from the
    /// old instance no longer apply.
    pub fn reset(&mut self) {
        match PathwaySimulation::new(self.config.clone()) {
            Ok(fresh) => *self = fresh,
            Err(err) => tracing::error!(%err, "reset failed"),
        }
    }
}

#[wasm_bindgen]
impl StopHandle {
    #[wasm_bindgen(js_name = stop)]
    pub fn stop_js(&self) {
        self.stop();
    }

    #[wasm_bindgen(getter, js_name = isStopped)]
    pub fn is_stopped_js(&self) -> bool {
        self.is_stopped()
    }
}
