use serde::Serialize;

use super::types::{check_finite, check_name, check_non_negative};
use crate::environment::Environment;
use crate::error::Result;

/// Default power temperature coefficient (fraction per °C).
pub const DEFAULT_TEMP_COEFFICIENT: f64 = 0.004;
/// Standard test condition cell temperature (°C).
pub const STC_TEMP_C: f64 = 25.0;

/// Irradiance at which a panel delivers its rated power (W/m²).
const STC_IRRADIANCE: f64 = 1000.0;

/// A solar PV array driven by irradiance and ambient temperature.
///
/// Output scales linearly with irradiance and is derated by
/// `temp_coefficient` for every degree above `stc_temp_c` (and uprated
/// below it). Never negative.
#[derive(Debug, Clone, Serialize)]
pub struct SolarPanel {
    name: String,
    rated_power_kw: f64,
    temp_coefficient: f64,
    stc_temp_c: f64,
    power_output_kw: f64,
}

impl SolarPanel {
    /// Creates a new solar array.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique device name
    /// * `rated_power_kw` - Output at 1000 W/m² and STC temperature (kW)
    /// * `temp_coefficient` - Fractional power loss per °C above STC (>= 0)
    /// * `stc_temp_c` - Reference cell temperature (°C)
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`](crate::error::FleetError::Validation)
    /// for an empty name or a negative or non-finite parameter.
    pub fn new(
        name: &str,
        rated_power_kw: f64,
        temp_coefficient: f64,
        stc_temp_c: f64,
    ) -> Result<Self> {
        Ok(Self {
            name: check_name("solar_panel", name)?,
            rated_power_kw: check_non_negative("solar_panel.rated_power_kw", rated_power_kw)?,
            temp_coefficient: check_non_negative(
                "solar_panel.temp_coefficient",
                temp_coefficient,
            )?,
            stc_temp_c: check_finite("solar_panel.stc_temp_c", stc_temp_c)?,
            power_output_kw: 0.0,
        })
    }

    /// Creates an array with the default temperature coefficient and STC.
    ///
    /// # Errors
    ///
    /// See [`SolarPanel::new`].
    pub fn with_defaults(name: &str, rated_power_kw: f64) -> Result<Self> {
        Self::new(name, rated_power_kw, DEFAULT_TEMP_COEFFICIENT, STC_TEMP_C)
    }

    /// Recomputes output from irradiance and temperature and returns it (kW).
    pub fn update_output(&mut self, environment: &Environment) -> f64 {
        let base = self.rated_power_kw * environment.solar_radiation / STC_IRRADIANCE;
        let derate = 1.0 - (environment.temperature - self.stc_temp_c) * self.temp_coefficient;
        self.power_output_kw = (base * derate).max(0.0);
        self.power_output_kw
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rated_power_kw(&self) -> f64 {
        self.rated_power_kw
    }

    pub fn temp_coefficient(&self) -> f64 {
        self.temp_coefficient
    }

    pub fn stc_temp_c(&self) -> f64 {
        self.stc_temp_c
    }

    pub fn power_output_kw(&self) -> f64 {
        self.power_output_kw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sky(radiation: f64, temperature: f64) -> Environment {
        Environment {
            solar_radiation: radiation,
            temperature,
            ..Environment::default()
        }
    }

    #[test]
    fn rated_output_at_stc() {
        let mut pv = SolarPanel::with_defaults("PV1", 100.0).unwrap();
        assert!((pv.update_output(&sky(1000.0, 25.0)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn hot_panels_are_derated() {
        let mut pv = SolarPanel::with_defaults("PV1", 100.0).unwrap();
        // 35 °C is 10 degrees above STC: 4% loss at half irradiance.
        let kw = pv.update_output(&sky(500.0, 35.0));
        assert!((kw - 48.0).abs() < 1e-9);
    }

    #[test]
    fn cold_panels_gain() {
        let mut pv = SolarPanel::with_defaults("PV1", 100.0).unwrap();
        let kw = pv.update_output(&sky(1000.0, 5.0));
        assert!((kw - 108.0).abs() < 1e-9);
    }

    #[test]
    fn dark_or_extreme_heat_gives_zero() {
        let mut pv = SolarPanel::new("PV1", 100.0, 0.05, 25.0).unwrap();
        assert_eq!(pv.update_output(&sky(0.0, 25.0)), 0.0);
        // derate = 1 - 25 * 0.05 < 0
        assert_eq!(pv.update_output(&sky(800.0, 50.0)), 0.0);
    }

    #[test]
    fn rejects_negative_parameters() {
        assert!(SolarPanel::new("PV", -1.0, 0.004, 25.0).is_err());
        assert!(SolarPanel::new("PV", 10.0, -0.004, 25.0).is_err());
        assert!(SolarPanel::new("PV", 10.0, 0.004, f64::NAN).is_err());
    }
}
