//! Simulation runner and TUI application state.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::warn;

use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::sim::engine::Engine;
use crate::sim::strategy::DieselStrategy;
use crate::sim::types::StepResult;

/// Maximum number of history entries kept for the rolling chart.
const MAX_HISTORY: usize = 200;

/// Tick interval options in milliseconds (slowest → fastest).
const SPEED_LEVELS_MS: [u64; 6] = [500, 250, 100, 50, 20, 5];

/// Default speed index (100 ms).
const DEFAULT_SPEED_IDX: usize = 2;

/// TUI application state.
pub struct App {
    engine: Engine,
    /// Rolling history of step results for the chart.
    pub history: VecDeque<StepResult>,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Current index into `SPEED_LEVELS_MS`.
    pub speed_idx: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When the last simulation tick was executed.
    pub last_tick: Instant,
    /// Name of the active preset.
    pub preset_name: String,
    /// Last step failure, shown in the status panel.
    pub last_error: Option<String>,
}

impl App {
    /// Creates a new app from a scenario labelled `name`.
    ///
    /// # Errors
    ///
    /// Returns the [`FleetError`](crate::error::FleetError) hit while
    /// building the fleet.
    pub fn new(name: &str, scenario: &ScenarioConfig) -> Result<Self> {
        Ok(Self {
            engine: scenario.build_engine()?,
            history: VecDeque::with_capacity(MAX_HISTORY),
            paused: false,
            speed_idx: DEFAULT_SPEED_IDX,
            quit: false,
            last_tick: Instant::now(),
            preset_name: name.to_string(),
            last_error: None,
        })
    }

    /// Advances the simulation by one step if not finished.
    ///
    /// A failing step pauses the run and keeps the error for display.
    pub fn tick(&mut self) {
        match self.engine.step() {
            Ok(Some(result)) => {
                if self.history.len() >= MAX_HISTORY {
                    self.history.pop_front();
                }
                self.history.push_back(result);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "step failed");
                self.last_error = Some(e.to_string());
                self.paused = true;
            }
        }
    }

    /// Toggles pause/resume.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Increases simulation speed (shorter tick interval).
    pub fn speed_up(&mut self) {
        if self.speed_idx + 1 < SPEED_LEVELS_MS.len() {
            self.speed_idx += 1;
        }
    }

    /// Decreases simulation speed (longer tick interval).
    pub fn speed_down(&mut self) {
        if self.speed_idx > 0 {
            self.speed_idx -= 1;
        }
    }

    /// Returns the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        SPEED_LEVELS_MS[self.speed_idx]
    }

    /// Moves the live fleet to the next diesel strategy; later steps use it.
    pub fn cycle_strategy(&mut self) {
        let next = self.engine.fleet().strategy().cycle();
        self.engine.fleet_mut().set_diesel_strategy(next);
    }

    /// Switches to a different preset, resetting simulation state.
    ///
    /// Unknown names are ignored.
    pub fn switch_preset(&mut self, name: &str) {
        let Ok(scenario) = ScenarioConfig::from_preset(name) else {
            return;
        };
        match scenario.build_engine() {
            Ok(engine) => {
                self.engine = engine;
                self.history.clear();
                self.paused = false;
                self.last_error = None;
                self.preset_name = name.to_string();
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    /// Restarts the current preset from the beginning.
    pub fn restart(&mut self) {
        let name = self.preset_name.clone();
        self.switch_preset(&name);
    }

    pub fn strategy(&self) -> DieselStrategy {
        self.engine.fleet().strategy()
    }

    /// Fleet-average SOC in percent, from the live fleet.
    pub fn soc_pct(&self) -> f64 {
        self.engine.fleet().storage_state().average_soc_pct()
    }

    pub fn has_storage(&self) -> bool {
        self.engine.fleet().storage_state().capacity_kwh > 0.0
    }

    /// Index of the next step to run.
    pub fn step_index(&self) -> usize {
        self.engine.step_index()
    }

    pub fn total_steps(&self) -> usize {
        self.engine.config().total_steps()
    }

    /// Returns `true` when all timesteps have been executed.
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    /// Returns the most recent step result, if any.
    pub fn last_result(&self) -> Option<&StepResult> {
        self.history.back()
    }
}
