use serde::Serialize;

use super::types::{check_name, check_non_negative};
use crate::error::Result;

/// Default specific fuel consumption (litres per kWh generated).
pub const DEFAULT_FUEL_L_PER_KWH: f64 = 0.4;

/// A dispatchable diesel generator.
///
/// Output follows the setpoint handed to it by the dispatch strategy,
/// clamped to `[0, rated_power_kw]`. Fuel burn is linear in output.
#[derive(Debug, Clone, Serialize)]
pub struct DieselGenerator {
    name: String,
    rated_power_kw: f64,
    fuel_litres_per_kwh: f64,
    power_output_kw: f64,
    fuel_used_l_per_h: f64,
}

impl DieselGenerator {
    /// Creates a new generator.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`](crate::error::FleetError::Validation)
    /// for an empty name or a negative or non-finite rating or fuel rate.
    pub fn new(name: &str, rated_power_kw: f64, fuel_litres_per_kwh: f64) -> Result<Self> {
        Ok(Self {
            name: check_name("diesel_generator", name)?,
            rated_power_kw: check_non_negative("diesel_generator.rated_power_kw", rated_power_kw)?,
            fuel_litres_per_kwh: check_non_negative(
                "diesel_generator.fuel_litres_per_kwh",
                fuel_litres_per_kwh,
            )?,
            power_output_kw: 0.0,
            fuel_used_l_per_h: 0.0,
        })
    }

    /// Applies a setpoint (kW) and returns the actual, clamped output.
    ///
    /// Non-finite setpoints are treated as 0.
    pub fn update_output(&mut self, setpoint_kw: f64) -> f64 {
        let setpoint = if setpoint_kw.is_finite() { setpoint_kw } else { 0.0 };
        self.power_output_kw = self.rated_power_kw.min(setpoint.max(0.0));
        self.fuel_used_l_per_h = self.fuel_litres_per_kwh * self.power_output_kw;
        self.power_output_kw
    }

    /// Output as a percentage of rating (0 for a zero-rated unit).
    pub fn utilization_pct(&self) -> f64 {
        if self.rated_power_kw > 0.0 {
            self.power_output_kw / self.rated_power_kw * 100.0
        } else {
            0.0
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rated_power_kw(&self) -> f64 {
        self.rated_power_kw
    }

    pub fn fuel_litres_per_kwh(&self) -> f64 {
        self.fuel_litres_per_kwh
    }

    pub fn power_output_kw(&self) -> f64 {
        self.power_output_kw
    }

    /// Fuel burn rate from the last update (L/h).
    pub fn fuel_used_l_per_h(&self) -> f64 {
        self.fuel_used_l_per_h
    }
}
