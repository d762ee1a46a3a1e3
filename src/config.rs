//! TOML-based scenario configuration and preset definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::demand::{DEFAULT_NOISE_FRAC, DemandProfile};
use crate::devices::battery::{DEFAULT_INITIAL_CHARGE, DEFAULT_ROUND_TRIP_EFFICIENCY};
use crate::devices::diesel::DEFAULT_FUEL_L_PER_KWH;
use crate::devices::solar::{DEFAULT_TEMP_COEFFICIENT, STC_TEMP_C};
use crate::devices::wind::{DEFAULT_CUT_IN_SPEED, DEFAULT_CUT_OUT_SPEED, DEFAULT_RATED_SPEED};
use crate::devices::{Battery, Device, DieselGenerator, GridConnection, SolarPanel, WindTurbine};
use crate::environment::default_start_time;
use crate::error::{FleetError, Result as FleetResult};
use crate::sim::engine::Engine;
use crate::sim::fleet::Fleet;
use crate::sim::strategy::DieselStrategy;
use crate::sim::types::SimConfig;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections are optional. Device tables are arrays (`[[battery]]`) so a
/// scenario may hold any number of each technology; devices join the fleet
/// in the order wind, solar, diesel, battery, grid, and in file order within
/// each kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub wind_turbine: Vec<WindTurbineConfig>,
    #[serde(default)]
    pub solar_panel: Vec<SolarPanelConfig>,
    #[serde(default)]
    pub diesel_generator: Vec<DieselGeneratorConfig>,
    #[serde(default)]
    pub battery: Vec<BatteryConfig>,
    #[serde(default)]
    pub grid_connection: Vec<GridConnectionConfig>,
    /// Diesel setpoints (kW) by generator name, used by the `manual` strategy.
    #[serde(default)]
    pub manual_setpoints: BTreeMap<String, f64>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of timesteps per simulated day (must be > 0).
    pub steps_per_day: usize,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// First timestamp, as a quoted ISO string (`"2024-01-01T00:00:00"`).
    pub start_time: NaiveDateTime,
    /// Site demand target (kWh/day).
    pub total_daily_kwh: f64,
    /// Demand noise band (fraction of demand).
    pub demand_noise: f64,
    /// Diesel strategy tag.
    pub strategy: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_day: 24,
            days: 1,
            seed: 42,
            start_time: default_start_time(),
            total_daily_kwh: 6000.0,
            demand_noise: DEFAULT_NOISE_FRAC,
            strategy: DieselStrategy::default().as_str().to_string(),
        }
    }
}

fn default_cut_in() -> f64 {
    DEFAULT_CUT_IN_SPEED
}

fn default_rated_speed() -> f64 {
    DEFAULT_RATED_SPEED
}

fn default_cut_out() -> f64 {
    DEFAULT_CUT_OUT_SPEED
}

fn default_temp_coefficient() -> f64 {
    DEFAULT_TEMP_COEFFICIENT
}

fn default_stc_temp() -> f64 {
    STC_TEMP_C
}

fn default_fuel_rate() -> f64 {
    DEFAULT_FUEL_L_PER_KWH
}

fn default_round_trip_efficiency() -> f64 {
    DEFAULT_ROUND_TRIP_EFFICIENCY
}

fn default_initial_charge() -> f64 {
    DEFAULT_INITIAL_CHARGE
}

/// Wind turbine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindTurbineConfig {
    pub name: String,
    #[serde(alias = "rated_power")]
    pub rated_power_kw: f64,
    #[serde(alias = "direction")]
    pub direction_deg: f64,
    #[serde(default = "default_cut_in")]
    pub cut_in_speed: f64,
    #[serde(default = "default_rated_speed")]
    pub rated_speed: f64,
    #[serde(default = "default_cut_out")]
    pub cut_out_speed: f64,
}

impl WindTurbineConfig {
    /// # Errors
    ///
    /// See [`WindTurbine::new`].
    pub fn build(&self) -> FleetResult<WindTurbine> {
        WindTurbine::new(
            &self.name,
            self.rated_power_kw,
            self.direction_deg,
            self.cut_in_speed,
            self.rated_speed,
            self.cut_out_speed,
        )
    }
}

/// Solar array parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolarPanelConfig {
    pub name: String,
    #[serde(alias = "rated_power")]
    pub rated_power_kw: f64,
    #[serde(default = "default_temp_coefficient")]
    pub temp_coefficient: f64,
    #[serde(default = "default_stc_temp", alias = "stc_temp")]
    pub stc_temp_c: f64,
}

impl SolarPanelConfig {
    /// # Errors
    ///
    /// See [`SolarPanel::new`].
    pub fn build(&self) -> FleetResult<SolarPanel> {
        SolarPanel::new(
            &self.name,
            self.rated_power_kw,
            self.temp_coefficient,
            self.stc_temp_c,
        )
    }
}

/// Diesel generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DieselGeneratorConfig {
    pub name: String,
    #[serde(alias = "rated_power")]
    pub rated_power_kw: f64,
    #[serde(default = "default_fuel_rate")]
    pub fuel_litres_per_kwh: f64,
}

impl DieselGeneratorConfig {
    /// # Errors
    ///
    /// See [`DieselGenerator::new`].
    pub fn build(&self) -> FleetResult<DieselGenerator> {
        DieselGenerator::new(&self.name, self.rated_power_kw, self.fuel_litres_per_kwh)
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryConfig {
    pub name: String,
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Charge/discharge limit (kW).
    pub max_power_kw: f64,
    #[serde(default = "default_round_trip_efficiency", alias = "efficiency")]
    pub round_trip_efficiency: f64,
    /// Initial state of charge (0.0–1.0).
    #[serde(default = "default_initial_charge")]
    pub initial_charge: f64,
}

impl BatteryConfig {
    /// # Errors
    ///
    /// See [`Battery::new`].
    pub fn build(&self) -> FleetResult<Battery> {
        Battery::new(
            &self.name,
            self.capacity_kwh,
            self.max_power_kw,
            self.round_trip_efficiency,
            self.initial_charge,
        )
    }
}

/// Grid connection tariffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConnectionConfig {
    pub name: String,
    #[serde(alias = "import_price")]
    pub import_price_per_kwh: f64,
    #[serde(alias = "export_price")]
    pub export_price_per_kwh: f64,
}

impl GridConnectionConfig {
    /// # Errors
    ///
    /// See [`GridConnection::new`].
    pub fn build(&self) -> FleetResult<GridConnection> {
        GridConnection::new(
            &self.name,
            self.import_price_per_kwh,
            self.export_price_per_kwh,
        )
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn from_fleet(prefix: &str, err: FleetError) -> Self {
        match err {
            FleetError::Validation { field, message } => {
                // device fields come back as "battery.capacity_kwh"; keep the
                // array index from the config path instead of the kind prefix
                let leaf = field.rsplit('.').next().unwrap_or(&field).to_string();
                Self::new(format!("{prefix}.{leaf}"), message)
            }
            other => Self::new(prefix, other.to_string()),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 600 kW turbine, a 250 kW solar array,
    /// a 2 MWh battery, and a grid connection serving a 6 MWh/day site.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            wind_turbine: vec![WindTurbineConfig {
                name: "WT1".into(),
                rated_power_kw: 600.0,
                direction_deg: 225.0,
                cut_in_speed: DEFAULT_CUT_IN_SPEED,
                rated_speed: DEFAULT_RATED_SPEED,
                cut_out_speed: DEFAULT_CUT_OUT_SPEED,
            }],
            solar_panel: vec![SolarPanelConfig {
                name: "PV1".into(),
                rated_power_kw: 250.0,
                temp_coefficient: DEFAULT_TEMP_COEFFICIENT,
                stc_temp_c: STC_TEMP_C,
            }],
            diesel_generator: Vec::new(),
            battery: vec![BatteryConfig {
                name: "BESS1".into(),
                capacity_kwh: 2000.0,
                max_power_kw: 1000.0,
                round_trip_efficiency: 0.9,
                initial_charge: 0.8,
            }],
            grid_connection: vec![GridConnectionConfig {
                name: "Grid".into(),
                import_price_per_kwh: 0.40,
                export_price_per_kwh: 0.08,
            }],
            manual_setpoints: BTreeMap::new(),
        }
    }

    /// Returns the islanded preset: solar, two diesels, and a battery that the
    /// diesels recharge whenever it runs low.
    pub fn off_grid() -> Self {
        Self {
            simulation: SimulationConfig {
                total_daily_kwh: 3000.0,
                strategy: DieselStrategy::BatteryCharging.as_str().to_string(),
                ..SimulationConfig::default()
            },
            wind_turbine: Vec::new(),
            solar_panel: vec![SolarPanelConfig {
                name: "PV1".into(),
                rated_power_kw: 300.0,
                temp_coefficient: DEFAULT_TEMP_COEFFICIENT,
                stc_temp_c: STC_TEMP_C,
            }],
            diesel_generator: vec![
                DieselGeneratorConfig {
                    name: "DG1".into(),
                    rated_power_kw: 200.0,
                    fuel_litres_per_kwh: 0.3,
                },
                DieselGeneratorConfig {
                    name: "DG2".into(),
                    rated_power_kw: 200.0,
                    fuel_litres_per_kwh: 0.3,
                },
            ],
            battery: vec![BatteryConfig {
                name: "BESS1".into(),
                capacity_kwh: 1000.0,
                max_power_kw: 250.0,
                round_trip_efficiency: 0.9,
                initial_charge: 0.5,
            }],
            grid_connection: Vec::new(),
            manual_setpoints: BTreeMap::new(),
        }
    }

    /// Returns the household preset: 6 kW rooftop PV, a 15 kWh battery, and
    /// a retail grid tariff.
    pub fn solar_home() -> Self {
        Self {
            simulation: SimulationConfig {
                total_daily_kwh: 15.0,
                ..SimulationConfig::default()
            },
            wind_turbine: Vec::new(),
            solar_panel: vec![SolarPanelConfig {
                name: "Solar".into(),
                rated_power_kw: 6.0,
                temp_coefficient: DEFAULT_TEMP_COEFFICIENT,
                stc_temp_c: STC_TEMP_C,
            }],
            diesel_generator: Vec::new(),
            battery: vec![BatteryConfig {
                name: "Battery".into(),
                capacity_kwh: 15.0,
                max_power_kw: 3.5,
                round_trip_efficiency: 0.9,
                initial_charge: 0.5,
            }],
            grid_connection: vec![GridConnectionConfig {
                name: "Grid".into(),
                import_price_per_kwh: 0.40,
                export_price_per_kwh: 0.08,
            }],
            manual_setpoints: BTreeMap::new(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "off_grid", "solar_home"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "off_grid" => Ok(Self::off_grid()),
            "solar_home" => Ok(Self::solar_home()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.steps_per_day == 0 {
            errors.push(ConfigError::new("simulation.steps_per_day", "must be > 0"));
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if !(s.total_daily_kwh.is_finite() && s.total_daily_kwh >= 0.0) {
            errors.push(ConfigError::new(
                "simulation.total_daily_kwh",
                "must be a finite value >= 0",
            ));
        }
        if !(0.0..1.0).contains(&s.demand_noise) {
            errors.push(ConfigError::new(
                "simulation.demand_noise",
                "must be in [0.0, 1.0)",
            ));
        }
        if let Err(e) = s.strategy.parse::<DieselStrategy>() {
            errors.push(ConfigError::new("simulation.strategy", e.to_string()));
        }

        let mut names = BTreeSet::new();
        for (path, device) in self.devices() {
            match device {
                Ok(device) => {
                    if !names.insert(device.name().to_string()) {
                        errors.push(ConfigError::new(
                            format!("{path}.name"),
                            format!("duplicate device name \"{}\"", device.name()),
                        ));
                    }
                }
                Err(e) => errors.push(ConfigError::from_fleet(&path, e)),
            }
        }

        for (name, kw) in &self.manual_setpoints {
            if !self.diesel_generator.iter().any(|g| &g.name == name) {
                errors.push(ConfigError::new(
                    format!("manual_setpoints.{name}"),
                    "no diesel generator with this name",
                ));
            }
            if !(kw.is_finite() && *kw >= 0.0) {
                errors.push(ConfigError::new(
                    format!("manual_setpoints.{name}"),
                    "must be a finite value >= 0",
                ));
            }
        }

        errors
    }

    /// Builds every configured device, paired with its config path.
    fn devices(&self) -> Vec<(String, FleetResult<Device>)> {
        let mut out = Vec::new();
        for (i, c) in self.wind_turbine.iter().enumerate() {
            out.push((format!("wind_turbine[{i}]"), c.build().map(Device::from)));
        }
        for (i, c) in self.solar_panel.iter().enumerate() {
            out.push((format!("solar_panel[{i}]"), c.build().map(Device::from)));
        }
        for (i, c) in self.diesel_generator.iter().enumerate() {
            out.push((format!("diesel_generator[{i}]"), c.build().map(Device::from)));
        }
        for (i, c) in self.battery.iter().enumerate() {
            out.push((format!("battery[{i}]"), c.build().map(Device::from)));
        }
        for (i, c) in self.grid_connection.iter().enumerate() {
            out.push((format!("grid_connection[{i}]"), c.build().map(Device::from)));
        }
        out
    }

    /// Builds the fleet described by the scenario.
    ///
    /// # Errors
    ///
    /// Returns the first [`FleetError`] hit while constructing devices,
    /// adding them, or applying the strategy and setpoints. Run
    /// [`validate`](Self::validate) first for a complete error list.
    pub fn build_fleet(&self) -> FleetResult<Fleet> {
        let mut fleet = Fleet::new();
        for (_, device) in self.devices() {
            fleet.add_device(device?)?;
        }
        fleet.set_strategy(&self.simulation.strategy)?;
        for (name, kw) in &self.manual_setpoints {
            fleet.set_manual_setpoint(name, *kw)?;
        }
        Ok(fleet)
    }

    /// Timing configuration for the run.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero; call
    /// [`validate`](Self::validate) first.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig::new(s.steps_per_day, s.days, s.seed).with_start_time(s.start_time)
    }

    /// Demand profile for the run, seeded independently of the weather.
    pub fn demand_profile(&self) -> DemandProfile {
        let s = &self.simulation;
        DemandProfile::new(s.total_daily_kwh, s.demand_noise, s.seed.wrapping_add(1))
    }

    /// Assembles a ready-to-run engine.
    ///
    /// # Errors
    ///
    /// See [`build_fleet`](Self::build_fleet).
    pub fn build_engine(&self) -> FleetResult<Engine> {
        Ok(Engine::new(
            self.sim_config(),
            self.build_fleet()?,
            self.demand_profile(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceKind;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let e = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert!(e.message.contains("unknown preset"));
        assert!(e.to_string().starts_with("config error: preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
steps_per_day = 48
days = 2
seed = 99
start_time = "2024-07-01T06:00:00"
total_daily_kwh = 800.0
strategy = "manual"

[[wind_turbine]]
name = "WT1"
rated_power_kw = 300.0
direction_deg = 180.0

[[diesel_generator]]
name = "DG1"
rated_power_kw = 150.0

[[battery]]
name = "B1"
capacity_kwh = 500.0
max_power_kw = 100.0

[[grid_connection]]
name = "Grid"
import_price_per_kwh = 0.3
export_price_per_kwh = 0.05

[manual_setpoints]
DG1 = 75.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.simulation.steps_per_day, 48);
        assert_eq!(cfg.simulation.days, 2);
        assert_eq!(cfg.wind_turbine[0].cut_out_speed, 25.0);
        assert_eq!(cfg.battery[0].round_trip_efficiency, 0.9);
        assert_eq!(cfg.diesel_generator[0].fuel_litres_per_kwh, 0.4);
        assert!(cfg.validate().is_empty());

        let fleet = cfg.build_fleet().unwrap();
        assert_eq!(fleet.len(), 4);
        assert_eq!(fleet.strategy(), DieselStrategy::Manual);
        assert_eq!(fleet.manual_setpoints().get("DG1"), Some(&75.0));
        assert_eq!(fleet.devices()[0].kind(), DeviceKind::WindTurbine);
        assert_eq!(cfg.sim_config().dt_hours, 0.5);
    }

    #[test]
    fn aliases_match_legacy_field_names() {
        let toml = r#"
[[battery]]
name = "B1"
capacity_kwh = 10.0
max_power_kw = 5.0
efficiency = 0.81

[[grid_connection]]
name = "G"
import_price = 0.4
export_price = 0.08
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.battery[0].round_trip_efficiency, 0.81);
        assert_eq!(cfg.grid_connection[0].import_price_per_kwh, 0.4);
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
steps_per_day = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_collects_every_error() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.steps_per_day = 0;
        cfg.simulation.strategy = "turbo".into();
        cfg.battery[0].initial_charge = 1.5;
        cfg.wind_turbine[0].cut_in_speed = 20.0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"simulation.steps_per_day"), "{fields:?}");
        assert!(fields.contains(&"simulation.strategy"), "{fields:?}");
        assert!(fields.contains(&"battery[0].initial_charge"), "{fields:?}");
        assert!(fields.contains(&"wind_turbine[0].rated_speed"), "{fields:?}");
    }

    #[test]
    fn validation_catches_duplicate_names() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.solar_panel[0].name = "WT1".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "solar_panel[0].name"));
        assert_eq!(
            cfg.build_fleet().unwrap_err(),
            FleetError::DuplicateName("WT1".into())
        );
    }

    #[test]
    fn validation_catches_orphan_setpoint() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.manual_setpoints.insert("DG9".into(), 10.0);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "manual_setpoints.DG9"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
            assert!(cfg.build_engine().is_ok());
        }
    }

    #[test]
    fn off_grid_has_no_grid() {
        let fleet = ScenarioConfig::off_grid().build_fleet().unwrap();
        assert_eq!(fleet.count(DeviceKind::GridConnection), 0);
        assert_eq!(fleet.strategy(), DieselStrategy::BatteryCharging);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nseed = 99\n").unwrap();
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.simulation.steps_per_day, 24);
        assert_eq!(cfg.simulation.strategy, "demand_following");
        assert!(cfg.battery.is_empty());
    }
}
