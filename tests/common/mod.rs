//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;

use microgrid_sim::devices::{Battery, DieselGenerator, GridConnection, SolarPanel, WindTurbine};
use microgrid_sim::environment::{Environment, default_start_time};
use microgrid_sim::sim::fleet::Fleet;
use microgrid_sim::sim::types::SimConfig;

/// Default simulation configuration (24 steps/day, 1 day, seed 42).
pub fn default_config() -> SimConfig {
    SimConfig::new(24, 1, 42)
}

/// Environment with the given wind and irradiance, at 25 °C and clear sky.
pub fn environment(wind_speed: f64, wind_direction: f64, solar_radiation: f64) -> Environment {
    environment_at(wind_speed, wind_direction, solar_radiation, default_start_time())
}

pub fn environment_at(
    wind_speed: f64,
    wind_direction: f64,
    solar_radiation: f64,
    timestamp: NaiveDateTime,
) -> Environment {
    Environment::new(25.0, wind_speed, wind_direction, solar_radiation, 0.0, timestamp)
        .expect("fixture environment should be valid")
}

/// 600 kW turbine facing 225°, 2 MWh / 1 MW battery at 80 %, and a grid at
/// 0.40 / 0.08 $/kWh.
pub fn wind_site() -> Fleet {
    let mut fleet = Fleet::new();
    fleet
        .add_device(WindTurbine::with_default_curve("WT1", 600.0, 225.0).unwrap())
        .unwrap();
    fleet
        .add_device(Battery::new("BESS1", 2000.0, 1000.0, 0.9, 0.8).unwrap())
        .unwrap();
    fleet
        .add_device(GridConnection::new("Grid", 0.40, 0.08).unwrap())
        .unwrap();
    fleet
}

/// Islanded fleet: one 100 kW diesel and a 1 MWh / 200 kW battery at `soc`.
pub fn diesel_site(initial_charge: f64) -> Fleet {
    let mut fleet = Fleet::new();
    fleet
        .add_device(DieselGenerator::new("DG1", 100.0, 0.3).unwrap())
        .unwrap();
    fleet
        .add_device(Battery::new("BESS1", 1000.0, 200.0, 0.9, initial_charge).unwrap())
        .unwrap();
    fleet
}

/// Every technology once, grid-tied.
pub fn mixed_site() -> Fleet {
    let mut fleet = wind_site();
    fleet
        .add_device(SolarPanel::with_defaults("PV1", 250.0).unwrap())
        .unwrap();
    fleet
        .add_device(DieselGenerator::new("DG1", 150.0, 0.3).unwrap())
        .unwrap();
    fleet
}

/// Asserts `|a - b| <= tol` with a readable message.
pub fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tol,
        "{what}: expected {expected}, got {actual} (tol {tol})"
    );
}
