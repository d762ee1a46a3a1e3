//! Core simulation types: run configuration and per-step records.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::power_balance::bus_supply_kw;
use super::strategy::DieselStrategy;
use crate::devices::DeviceKind;
use crate::environment::default_start_time;

/// Centralized simulation configuration.
///
/// The engine, weather generator, and demand profile all take their timing
/// from this struct so `dt_hours` is computed in one place.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(24, 1, 42);
/// assert_eq!(cfg.dt_hours, 1.0);
/// assert_eq!(cfg.total_steps(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulation steps per day.
    pub steps_per_day: usize,
    /// Number of days to simulate.
    pub days: usize,
    /// Duration of one timestep in hours, derived as `24.0 / steps_per_day`.
    pub dt_hours: f64,
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Wall-clock time of the first step.
    pub start_time: NaiveDateTime,
}

impl SimConfig {
    /// Creates a new simulation configuration starting at the default start time.
    ///
    /// # Arguments
    ///
    /// * `steps_per_day` - Number of timesteps per simulated day (must be > 0)
    /// * `days` - Number of days to simulate (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero.
    pub fn new(steps_per_day: usize, days: usize, seed: u64) -> Self {
        assert!(steps_per_day > 0, "steps_per_day must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            steps_per_day,
            days,
            dt_hours: 24.0 / steps_per_day as f64,
            seed,
            start_time: default_start_time(),
        }
    }

    /// Replaces the start time.
    pub fn with_start_time(mut self, start_time: NaiveDateTime) -> Self {
        self.start_time = start_time;
        self
    }

    /// Total number of simulation steps across all days, saturating at
    /// `usize::MAX` instead of overflowing.
    pub fn total_steps(&self) -> usize {
        self.steps_per_day
            .checked_mul(self.days)
            .unwrap_or(usize::MAX)
    }
}

/// Output of one device in a step, in fleet order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceOutput {
    pub name: String,
    pub kind: DeviceKind,
    /// Bus convention: positive = supply, negative = draw.
    pub power_kw: f64,
}

/// Complete record of one dispatch step.
///
/// Power terms follow the bus convention and balance as
/// `renewable + diesel + battery + grid + unbalanced == demand`.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Timestamp of the environment snapshot the step ran against.
    pub timestamp: NaiveDateTime,
    /// Duration of the step in hours.
    pub timestep_hours: f64,
    /// Load to be served (kW).
    pub demand_kw: f64,
    /// Wind plus solar output (kW, >= 0).
    pub renewable_generation_kw: f64,
    /// Total diesel output (kW, >= 0).
    pub diesel_generation_kw: f64,
    /// Net battery flow (kW; positive=discharge, negative=charge).
    pub battery_power_kw: f64,
    /// Net grid flow (kW; positive=import, negative=export).
    pub grid_power_kw: f64,
    /// Residual no grid connection could take (kW; positive=unserved,
    /// negative=curtailed). Always 0 when the fleet has a grid connection.
    pub unbalanced_kw: f64,
    /// Energy stored across all batteries after the step (kWh).
    pub battery_soc_kwh: f64,
    /// Combined battery capacity (kWh).
    pub battery_capacity_kwh: f64,
    /// Diesel fuel burn rate during the step (L/h).
    pub diesel_usage_lph: f64,
    /// Grid cost of the step ($; negative is revenue).
    pub grid_cost: f64,
    /// Strategy in force when the step ran.
    pub diesel_strategy: DieselStrategy,
    pub battery_count: usize,
    pub grid_count: usize,
    pub device_outputs: Vec<DeviceOutput>,
}

impl StepResult {
    /// Fleet state of charge as a percentage (0 without batteries).
    pub fn battery_soc_pct(&self) -> f64 {
        if self.battery_capacity_kwh > 0.0 {
            self.battery_soc_kwh / self.battery_capacity_kwh * 100.0
        } else {
            0.0
        }
    }

    /// Total supply from every source, including any unbalanced residual.
    pub fn total_supply_kw(&self) -> f64 {
        bus_supply_kw(
            self.renewable_generation_kw,
            self.diesel_generation_kw,
            self.battery_power_kw,
            self.grid_power_kw,
        ) + self.unbalanced_kw
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}h) | demand={:>8.2} kW | renew={:>8.2}  diesel={:>8.2}  \
             bat={:>8.2} (SoC={:.1}%)  grid={:>8.2} kW | cost={:>7.2} fuel={:.1} L/h [{}]",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.timestep_hours,
            self.demand_kw,
            self.renewable_generation_kw,
            self.diesel_generation_kw,
            self.battery_power_kw,
            self.battery_soc_pct(),
            self.grid_power_kw,
            self.grid_cost,
            self.diesel_usage_lph,
            self.diesel_strategy,
        )?;
        if self.unbalanced_kw != 0.0 {
            write!(f, " unbalanced={:.2} kW", self.unbalanced_kw)?;
        }
        Ok(())
    }
}
