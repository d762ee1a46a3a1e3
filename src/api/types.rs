//! API request, response, and error types.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::devices::{Battery, Device, DeviceKind, DieselGenerator, GridConnection, GridStatus};
use crate::environment::Environment;
use crate::error::FleetError;
use crate::sim::fleet::Fleet;
use crate::sim::strategy::DieselStrategy;
use crate::sim::types::StepResult;

/// Daily energy assumed by `/simulate/realistic` when none is given (kWh).
pub const DEFAULT_REALISTIC_DAILY_KWH: f64 = 150.0;

fn one_hour() -> f64 {
    1.0
}

fn default_realistic_daily_kwh() -> f64 {
    DEFAULT_REALISTIC_DAILY_KWH
}

/// One row of the device list.
#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Bus convention: positive = supply, negative = draw.
    pub power_output_kw: f64,
}

impl From<&Device> for DeviceSummary {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name().to_string(),
            kind: d.kind(),
            power_output_kw: d.power_output_kw(),
        }
    }
}

/// `GET /devices`.
#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceSummary>,
    pub total_devices: usize,
    /// Net bus flow of every device.
    pub total_power_kw: f64,
}

impl From<&Fleet> for DeviceListResponse {
    fn from(fleet: &Fleet) -> Self {
        Self {
            devices: fleet.devices().iter().map(DeviceSummary::from).collect(),
            total_devices: fleet.len(),
            total_power_kw: fleet.devices().iter().map(Device::power_output_kw).sum(),
        }
    }
}

/// `GET /`: environment, every device with its full state, and bus totals.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub timestamp: NaiveDateTime,
    pub environment: Environment,
    pub devices: Vec<Device>,
    pub diesel_strategy: DieselStrategy,
    /// Wind, solar, and diesel output (kW).
    pub total_generation_kw: f64,
    pub total_storage_power_kw: f64,
    pub total_grid_power_kw: f64,
    pub device_count: usize,
}

impl StatusResponse {
    pub fn new(fleet: &Fleet, environment: Environment) -> Self {
        let sum_of = |kinds: &[DeviceKind]| -> f64 {
            fleet
                .devices()
                .iter()
                .filter(|d| kinds.contains(&d.kind()))
                .map(Device::power_output_kw)
                .sum()
        };
        Self {
            timestamp: environment.timestamp,
            environment,
            devices: fleet.devices().to_vec(),
            diesel_strategy: fleet.strategy(),
            total_generation_kw: sum_of(&[
                DeviceKind::WindTurbine,
                DeviceKind::SolarPanel,
                DeviceKind::DieselGenerator,
            ]),
            total_storage_power_kw: sum_of(&[DeviceKind::Battery]),
            total_grid_power_kw: sum_of(&[DeviceKind::GridConnection]),
            device_count: fleet.len(),
        }
    }
}

/// `POST /device` body: a device type tag and its parameters.
#[derive(Debug, Deserialize)]
pub struct AddDeviceRequest {
    /// Any spelling accepted by [`DeviceKind`]'s `FromStr`.
    #[serde(rename = "type")]
    pub kind: String,
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AddDeviceResponse {
    pub message: String,
    pub device: Device,
}

#[derive(Debug, Serialize)]
pub struct RemoveDeviceResponse {
    pub message: String,
    pub remaining_devices: usize,
}

/// Environment snapshot with a confirmation message.
#[derive(Debug, Serialize)]
pub struct EnvironmentResponse {
    pub message: String,
    pub environment: Environment,
}

/// `POST /environment/step?hours=`.
#[derive(Debug, Deserialize)]
pub struct AdvanceQuery {
    #[serde(default = "one_hour")]
    pub hours: f64,
}

/// `POST /simulate/step` body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulateStepRequest {
    pub demand_kw: f64,
    #[serde(default = "one_hour")]
    pub timestep_hours: f64,
}

/// `POST /simulate/realistic` query.
#[derive(Debug, Deserialize)]
pub struct RealisticQuery {
    #[serde(default = "default_realistic_daily_kwh")]
    pub total_daily_kwh: f64,
    #[serde(default = "one_hour")]
    pub timestep_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub simulation_results: StepResult,
    /// Demand drawn from the daily profile (realistic steps only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_demand_kw: Option<f64>,
    /// Environment after the step.
    pub environment_state: Environment,
}

/// Operator setpoint of a diesel generator, or `"auto"` when unset.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SetpointView {
    Manual(f64),
    Auto(&'static str),
}

#[derive(Debug, Serialize)]
pub struct DieselGeneratorStatus {
    pub name: String,
    pub rated_power_kw: f64,
    pub current_output_kw: f64,
    pub fuel_litres_per_kwh: f64,
    pub current_fuel_usage_lph: f64,
    pub utilization_percent: f64,
    pub manual_setpoint: SetpointView,
}

#[derive(Debug, Serialize)]
pub struct DieselSummary {
    pub total_generators: usize,
    pub running_generators: usize,
    pub total_diesel_output_kw: f64,
    pub total_diesel_usage_lph: f64,
    pub current_strategy: DieselStrategy,
    pub fleet_utilization: f64,
}

/// `GET /diesel/status`.
#[derive(Debug, Serialize)]
pub struct DieselStatusResponse {
    pub diesel_generators: Vec<DieselGeneratorStatus>,
    pub summary: DieselSummary,
}

impl From<&Fleet> for DieselStatusResponse {
    fn from(fleet: &Fleet) -> Self {
        let setpoints = fleet.manual_setpoints();
        let gens: Vec<&DieselGenerator> = fleet.diesel_generators().collect();
        let diesel_generators = gens
            .iter()
            .map(|g| DieselGeneratorStatus {
                name: g.name().to_string(),
                rated_power_kw: g.rated_power_kw(),
                current_output_kw: g.power_output_kw(),
                fuel_litres_per_kwh: g.fuel_litres_per_kwh(),
                current_fuel_usage_lph: g.fuel_used_l_per_h(),
                utilization_percent: g.utilization_pct(),
                manual_setpoint: setpoints
                    .get(g.name())
                    .map_or(SetpointView::Auto("auto"), |kw| SetpointView::Manual(*kw)),
            })
            .collect();

        let total_output: f64 = gens.iter().map(|g| g.power_output_kw()).sum();
        let total_rated: f64 = gens.iter().map(|g| g.rated_power_kw()).sum();
        let summary = DieselSummary {
            total_generators: gens.len(),
            running_generators: gens.iter().filter(|g| g.power_output_kw() > 0.0).count(),
            total_diesel_output_kw: total_output,
            total_diesel_usage_lph: gens.iter().map(|g| g.fuel_used_l_per_h()).sum(),
            current_strategy: fleet.strategy(),
            fleet_utilization: if total_rated > 0.0 {
                total_output / total_rated * 100.0
            } else {
                0.0
            },
        };

        Self {
            diesel_generators,
            summary,
        }
    }
}

/// `POST /diesel/strategy?strategy=`.
#[derive(Debug, Deserialize)]
pub struct StrategyQuery {
    pub strategy: String,
}

#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub message: String,
    pub strategy: DieselStrategy,
    pub available_strategies: Vec<DieselStrategy>,
}

/// `GET /diesel/strategies`.
#[derive(Debug, Serialize)]
pub struct StrategiesResponse {
    pub current_strategy: DieselStrategy,
    /// Tag to description.
    pub available_strategies: BTreeMap<&'static str, &'static str>,
}

impl StrategiesResponse {
    pub fn new(current: DieselStrategy) -> Self {
        Self {
            current_strategy: current,
            available_strategies: DieselStrategy::ALL
                .iter()
                .map(|s| (s.as_str(), s.description()))
                .collect(),
        }
    }
}

/// `POST /diesel/{name}/setpoint` body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetpointRequest {
    pub setpoint_kw: f64,
}

#[derive(Debug, Serialize)]
pub struct SetpointResponse {
    pub message: String,
    pub generator: String,
    pub setpoint_kw: f64,
    /// Reminder when the stored setpoint is not yet in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BatteryStatus {
    pub name: String,
    pub capacity_kwh: f64,
    pub max_power_kw: f64,
    pub state_of_charge_kwh: f64,
    pub soc_percent: f64,
    pub current_power_kw: f64,
    pub round_trip_efficiency: f64,
}

impl From<&Battery> for BatteryStatus {
    fn from(b: &Battery) -> Self {
        Self {
            name: b.name().to_string(),
            capacity_kwh: b.capacity_kwh(),
            max_power_kw: b.max_power_kw(),
            state_of_charge_kwh: b.state_of_charge_kwh(),
            soc_percent: b.soc_percent(),
            current_power_kw: b.power_output_kw(),
            round_trip_efficiency: b.round_trip_efficiency(),
        }
    }
}

/// `GET /batteries/status`.
#[derive(Debug, Serialize)]
pub struct BatteriesResponse {
    pub batteries: Vec<BatteryStatus>,
    pub total_batteries: usize,
    pub total_capacity_kwh: f64,
    pub total_energy_kwh: f64,
    pub total_power_kw: f64,
}

impl From<&Fleet> for BatteriesResponse {
    fn from(fleet: &Fleet) -> Self {
        let batteries: Vec<BatteryStatus> = fleet.batteries().map(BatteryStatus::from).collect();
        Self {
            total_batteries: batteries.len(),
            total_capacity_kwh: batteries.iter().map(|b| b.capacity_kwh).sum(),
            total_energy_kwh: batteries.iter().map(|b| b.state_of_charge_kwh).sum(),
            total_power_kw: batteries.iter().map(|b| b.current_power_kw).sum(),
            batteries,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GridConnectionStatus {
    pub name: String,
    pub import_price_per_kwh: f64,
    pub export_price_per_kwh: f64,
    pub current_power_kw: f64,
    pub status: GridStatus,
}

impl From<&GridConnection> for GridConnectionStatus {
    fn from(g: &GridConnection) -> Self {
        Self {
            name: g.name().to_string(),
            import_price_per_kwh: g.import_price_per_kwh(),
            export_price_per_kwh: g.export_price_per_kwh(),
            current_power_kw: g.power_output_kw(),
            status: g.status(),
        }
    }
}

/// `GET /grids/status`.
#[derive(Debug, Serialize)]
pub struct GridsResponse {
    pub grid_connections: Vec<GridConnectionStatus>,
    pub total_grids: usize,
    pub total_power_flow_kw: f64,
}

impl From<&Fleet> for GridsResponse {
    fn from(fleet: &Fleet) -> Self {
        let grid_connections: Vec<GridConnectionStatus> = fleet
            .grid_connections()
            .map(GridConnectionStatus::from)
            .collect();
        Self {
            total_grids: grid_connections.len(),
            total_power_flow_kw: grid_connections.iter().map(|g| g.current_power_kw).sum(),
            grid_connections,
        }
    }
}

/// `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub devices_count: usize,
    pub environment_time: NaiveDateTime,
    pub api_version: &'static str,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Handler error carrying its status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        let status = match err {
            FleetError::Validation { .. } | FleetError::InvalidStrategy(_) => {
                StatusCode::BAD_REQUEST
            }
            FleetError::NotFound(_) => StatusCode::NOT_FOUND,
            FleetError::DuplicateName(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
