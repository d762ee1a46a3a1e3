//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::info;

use super::AppState;
use super::types::{
    AddDeviceRequest, AddDeviceResponse, AdvanceQuery, ApiError, BatteriesResponse,
    DeviceListResponse, DieselStatusResponse, EnvironmentResponse, GridsResponse, HealthResponse,
    RealisticQuery, RemoveDeviceResponse, SetpointRequest, SetpointResponse, SimulateResponse,
    SimulateStepRequest, StatusResponse, StrategiesResponse, StrategyQuery, StrategyResponse,
};
use crate::config::{
    BatteryConfig, DieselGeneratorConfig, GridConnectionConfig, SolarPanelConfig,
    WindTurbineConfig,
};
use crate::devices::{Device, DeviceKind};
use crate::environment::{Environment, EnvironmentUpdate};
use crate::error::FleetError;
use crate::sim::analysis::{AnalysisOptions, ScenarioAnalysis, analyze_renewables};
use crate::sim::strategy::DieselStrategy;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Longest environment advance accepted in one call (h).
const MAX_ADVANCE_HOURS: f64 = 24.0;

/// `GET /` → fleet and environment overview.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let fleet = state.fleet.lock();
    let environment = state.weather.lock().snapshot();
    Json(StatusResponse::new(&fleet, environment))
}

/// `GET /devices`
pub async fn list_devices(State(state): State<Arc<AppState>>) -> Json<DeviceListResponse> {
    Json(DeviceListResponse::from(&*state.fleet.lock()))
}

/// `POST /device` → 200, 400 on a bad type or parameters, 409 on a taken name.
pub async fn add_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddDeviceRequest>,
) -> ApiResult<AddDeviceResponse> {
    let kind: DeviceKind = req.kind.parse().map_err(ApiError::bad_request)?;
    let device = build_device(kind, req.params)?;

    let message = format!("{} '{}' added", kind.label(), device.name());
    state.fleet.lock().add_device(device.clone())?;
    Ok(Json(AddDeviceResponse { message, device }))
}

fn build_device(kind: DeviceKind, params: serde_json::Value) -> Result<Device, ApiError> {
    fn parse<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> Result<T, ApiError> {
        serde_json::from_value(v).map_err(|e| ApiError::bad_request(format!("invalid params: {e}")))
    }

    let device: Device = match kind {
        DeviceKind::WindTurbine => parse::<WindTurbineConfig>(params)?.build()?.into(),
        DeviceKind::SolarPanel => parse::<SolarPanelConfig>(params)?.build()?.into(),
        DeviceKind::DieselGenerator => parse::<DieselGeneratorConfig>(params)?.build()?.into(),
        DeviceKind::Battery => parse::<BatteryConfig>(params)?.build()?.into(),
        DeviceKind::GridConnection => parse::<GridConnectionConfig>(params)?.build()?.into(),
    };
    Ok(device)
}

/// `DELETE /device/{name}` → 200, or 404 if no such device.
pub async fn remove_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<RemoveDeviceResponse> {
    let mut fleet = state.fleet.lock();
    fleet.remove_device(&name)?;
    Ok(Json(RemoveDeviceResponse {
        message: format!("device '{name}' removed"),
        remaining_devices: fleet.len(),
    }))
}

/// `GET /environment`
pub async fn get_environment(State(state): State<Arc<AppState>>) -> Json<Environment> {
    Json(state.weather.lock().snapshot())
}

/// `POST /environment/update` → overrides until the next advance; 400 if out of range.
pub async fn update_environment(
    State(state): State<Arc<AppState>>,
    Json(update): Json<EnvironmentUpdate>,
) -> ApiResult<EnvironmentResponse> {
    let environment = state.weather.lock().apply(&update)?;
    Ok(Json(EnvironmentResponse {
        message: "environment updated".to_string(),
        environment,
    }))
}

/// `POST /environment/step?hours=H` with `0 < H <= 24`.
pub async fn advance_environment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdvanceQuery>,
) -> ApiResult<EnvironmentResponse> {
    check_hours("hours", query.hours)?;
    let mut weather = state.weather.lock();
    weather.advance(query.hours);
    Ok(Json(EnvironmentResponse {
        message: format!("environment advanced by {} h", query.hours),
        environment: weather.snapshot(),
    }))
}

/// `POST /environment/reset` → back to the start time with the original seed.
pub async fn reset_environment(
    State(state): State<Arc<AppState>>,
) -> Json<EnvironmentResponse> {
    let mut weather = state.weather.lock();
    weather.reset();
    let environment = weather.snapshot();
    info!(timestamp = %environment.timestamp, "environment reset");
    Json(EnvironmentResponse {
        message: "environment reset to initial state".to_string(),
        environment,
    })
}

fn check_hours(field: &str, hours: f64) -> Result<(), ApiError> {
    if hours.is_finite() && hours > 0.0 && hours <= MAX_ADVANCE_HOURS {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "`{field}` must be in (0, {MAX_ADVANCE_HOURS}], got {hours}"
        )))
    }
}

/// `POST /simulate/step` → one dispatch at the current environment; the
/// environment is not advanced.
pub async fn simulate_step(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateStepRequest>,
) -> ApiResult<SimulateResponse> {
    let mut fleet = state.fleet.lock();
    let environment = state.weather.lock().snapshot();
    let result = fleet.step(&environment, req.demand_kw, req.timestep_hours)?;
    Ok(Json(SimulateResponse {
        simulation_results: result,
        calculated_demand_kw: None,
        environment_state: environment,
    }))
}

/// `POST /simulate/realistic?total_daily_kwh=E&timestep_hours=H` → demand from
/// the daily profile at the current time, one dispatch, then an advance of `H`.
pub async fn simulate_realistic(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RealisticQuery>,
) -> ApiResult<SimulateResponse> {
    if !(query.total_daily_kwh.is_finite() && query.total_daily_kwh >= 0.0) {
        return Err(ApiError::bad_request(format!(
            "`total_daily_kwh` must be a finite value >= 0, got {}",
            query.total_daily_kwh
        )));
    }
    check_hours("timestep_hours", query.timestep_hours)?;

    let mut fleet = state.fleet.lock();
    let mut weather = state.weather.lock();
    let environment = weather.snapshot();
    let demand_kw = {
        let mut demand = state.demand.lock();
        demand.total_daily_kwh = query.total_daily_kwh;
        demand.demand_kw(environment.timestamp)
    };
    let result = fleet.step(&environment, demand_kw, query.timestep_hours)?;
    weather.advance(query.timestep_hours);

    Ok(Json(SimulateResponse {
        simulation_results: result,
        calculated_demand_kw: Some(demand_kw),
        environment_state: weather.snapshot(),
    }))
}

/// `GET /diesel/status`
pub async fn diesel_status(State(state): State<Arc<AppState>>) -> Json<DieselStatusResponse> {
    Json(DieselStatusResponse::from(&*state.fleet.lock()))
}

/// `POST /diesel/strategy?strategy=TAG` → 400 for an unknown tag.
pub async fn set_strategy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StrategyQuery>,
) -> ApiResult<StrategyResponse> {
    let strategy: DieselStrategy = query.strategy.parse()?;
    state.fleet.lock().set_diesel_strategy(strategy);
    Ok(Json(StrategyResponse {
        message: format!("diesel strategy set to '{strategy}'"),
        strategy,
        available_strategies: DieselStrategy::ALL.to_vec(),
    }))
}

/// `GET /diesel/strategies`
pub async fn list_strategies(State(state): State<Arc<AppState>>) -> Json<StrategiesResponse> {
    Json(StrategiesResponse::new(state.fleet.lock().strategy()))
}

/// `POST /diesel/{name}/setpoint` → 404 for an unknown generator, 400 for a
/// setpoint outside `0..=rated`.
pub async fn set_setpoint(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<SetpointRequest>,
) -> ApiResult<SetpointResponse> {
    let mut fleet = state.fleet.lock();
    let rated = fleet
        .diesel_generators()
        .find(|g| g.name() == name)
        .map(|g| g.rated_power_kw())
        .ok_or_else(|| FleetError::NotFound(name.clone()))?;
    if req.setpoint_kw > rated {
        return Err(ApiError::bad_request(format!(
            "setpoint must be within 0-{rated} kW, got {}",
            req.setpoint_kw
        )));
    }
    fleet.set_manual_setpoint(&name, req.setpoint_kw)?;

    let note = (fleet.strategy() != DieselStrategy::Manual)
        .then_some("set the strategy to 'manual' to apply setpoints");
    Ok(Json(SetpointResponse {
        message: format!("setpoint for '{name}' set to {} kW", req.setpoint_kw),
        generator: name,
        setpoint_kw: req.setpoint_kw,
        note,
    }))
}

/// `GET /batteries/status`
pub async fn batteries_status(State(state): State<Arc<AppState>>) -> Json<BatteriesResponse> {
    Json(BatteriesResponse::from(&*state.fleet.lock()))
}

/// `GET /grids/status`
pub async fn grids_status(State(state): State<Arc<AppState>>) -> Json<GridsResponse> {
    Json(GridsResponse::from(&*state.fleet.lock()))
}

/// `POST /analyze/scenario` → twin run on snapshots of the live fleet and
/// weather, executed on the blocking pool.
pub async fn analyze_scenario(
    State(state): State<Arc<AppState>>,
    Json(options): Json<AnalysisOptions>,
) -> ApiResult<ScenarioAnalysis> {
    let fleet = state.fleet.lock().clone();
    let weather = state.weather.lock().clone();
    let days = options.duration_days;
    let report = tokio::task::spawn_blocking(move || analyze_renewables(&fleet, &weather, &options))
        .await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {e}")))??;
    info!(days, "scenario analysis served");
    Ok(Json(report))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let devices_count = state.fleet.lock().len();
    Json(HealthResponse {
        status: "healthy",
        devices_count,
        environment_time: state.weather.lock().snapshot().timestamp,
        api_version: env!("CARGO_PKG_VERSION"),
    })
}
