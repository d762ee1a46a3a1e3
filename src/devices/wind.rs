use serde::Serialize;

use super::types::{check_name, check_non_negative};
use crate::environment::Environment;
use crate::error::{FleetError, Result};

/// Default cut-in wind speed (m/s).
pub const DEFAULT_CUT_IN_SPEED: f64 = 3.0;
/// Default rated wind speed (m/s).
pub const DEFAULT_RATED_SPEED: f64 = 12.0;
/// Default cut-out wind speed (m/s).
pub const DEFAULT_CUT_OUT_SPEED: f64 = 25.0;

/// A horizontal-axis wind turbine with a fixed yaw direction.
///
/// Output follows a cubic power curve between cut-in and rated speed, stays
/// flat at nameplate up to cut-out, and is scaled by how well the rotor faces
/// the wind. Output is never negative and never exceeds `rated_power_kw`.
#[derive(Debug, Clone, Serialize)]
pub struct WindTurbine {
    name: String,
    rated_power_kw: f64,
    direction_deg: f64,
    cut_in_speed: f64,
    rated_speed: f64,
    cut_out_speed: f64,
    power_output_kw: f64,
}

impl WindTurbine {
    /// Creates a turbine after checking its parameters.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique device name
    /// * `rated_power_kw` - Nameplate output (kW, >= 0)
    /// * `direction_deg` - Direction the rotor faces (degrees, 0..=360)
    /// * `cut_in_speed` - Wind speed where production starts (m/s)
    /// * `rated_speed` - Wind speed where nameplate output is reached (m/s)
    /// * `cut_out_speed` - Wind speed where the turbine shuts down (m/s)
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] unless
    /// `0 <= cut_in < rated < cut_out` and the direction is within `[0, 360]`.
    pub fn new(
        name: &str,
        rated_power_kw: f64,
        direction_deg: f64,
        cut_in_speed: f64,
        rated_speed: f64,
        cut_out_speed: f64,
    ) -> Result<Self> {
        let name = check_name("wind_turbine", name)?;
        check_non_negative("wind_turbine.rated_power_kw", rated_power_kw)?;
        if !(direction_deg.is_finite() && (0.0..=360.0).contains(&direction_deg)) {
            return Err(FleetError::validation(
                "wind_turbine.direction_deg",
                format!("must be in [0, 360], got {direction_deg}"),
            ));
        }
        check_non_negative("wind_turbine.cut_in_speed", cut_in_speed)?;
        if !(rated_speed.is_finite() && cut_out_speed.is_finite())
            || cut_in_speed >= rated_speed
            || rated_speed >= cut_out_speed
        {
            return Err(FleetError::validation(
                "wind_turbine.rated_speed",
                format!(
                    "speeds must satisfy cut_in < rated < cut_out, got {cut_in_speed} / {rated_speed} / {cut_out_speed}"
                ),
            ));
        }

        Ok(Self {
            name,
            rated_power_kw,
            direction_deg,
            cut_in_speed,
            rated_speed,
            cut_out_speed,
            power_output_kw: 0.0,
        })
    }

    /// Creates a turbine with the default 3 / 12 / 25 m/s power curve.
    ///
    /// # Errors
    ///
    /// See [`WindTurbine::new`].
    pub fn with_default_curve(name: &str, rated_power_kw: f64, direction_deg: f64) -> Result<Self> {
        Self::new(
            name,
            rated_power_kw,
            direction_deg,
            DEFAULT_CUT_IN_SPEED,
            DEFAULT_RATED_SPEED,
            DEFAULT_CUT_OUT_SPEED,
        )
    }

    /// Recomputes output from the current wind and returns it (kW).
    pub fn update_output(&mut self, environment: &Environment) -> f64 {
        self.power_output_kw =
            self.curve_kw(environment.wind_speed) * self.alignment(environment.wind_direction);
        self.power_output_kw
    }

    /// Power curve value at wind speed `v` for a perfectly aligned rotor (kW).
    pub fn curve_kw(&self, v: f64) -> f64 {
        if !(v >= self.cut_in_speed && v < self.cut_out_speed) {
            return 0.0;
        }
        if v < self.rated_speed {
            let ci3 = self.cut_in_speed.powi(3);
            self.rated_power_kw * (v.powi(3) - ci3) / (self.rated_speed.powi(3) - ci3)
        } else {
            self.rated_power_kw
        }
    }

    /// Yaw alignment factor in `[0, 1]` for a wind from `wind_direction` degrees.
    pub fn alignment(&self, wind_direction: f64) -> f64 {
        let diff = (self.direction_deg - wind_direction).abs() % 360.0;
        let diff = diff.min(360.0 - diff);
        diff.to_radians().cos().max(0.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rated_power_kw(&self) -> f64 {
        self.rated_power_kw
    }

    pub fn direction_deg(&self) -> f64 {
        self.direction_deg
    }

    pub fn cut_in_speed(&self) -> f64 {
        self.cut_in_speed
    }

    pub fn rated_speed(&self) -> f64 {
        self.rated_speed
    }

    pub fn cut_out_speed(&self) -> f64 {
        self.cut_out_speed
    }

    pub fn power_output_kw(&self) -> f64 {
        self.power_output_kw
    }
}
