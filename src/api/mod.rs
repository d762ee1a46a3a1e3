//! REST API over a live fleet and weather generator.
//!
//! Every request locks the shared state it needs for the duration of the
//! call (fleet before weather before demand), so operations never interleave
//! on the same fleet.

mod handlers;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use parking_lot::Mutex;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::demand::{DEFAULT_NOISE_FRAC, DemandProfile};
use crate::environment::WeatherGenerator;
use crate::error::Result;
use crate::sim::fleet::Fleet;

use types::DEFAULT_REALISTIC_DAILY_KWH;

/// Mutable application state shared across all request handlers.
pub struct AppState {
    pub fleet: Mutex<Fleet>,
    pub weather: Mutex<WeatherGenerator>,
    /// Profile sampled by `/simulate/realistic`; its daily target is set per request.
    pub demand: Mutex<DemandProfile>,
}

impl AppState {
    pub fn new(fleet: Fleet, weather: WeatherGenerator, demand_seed: u64) -> Self {
        Self {
            fleet: Mutex::new(fleet),
            weather: Mutex::new(weather),
            demand: Mutex::new(DemandProfile::new(
                DEFAULT_REALISTIC_DAILY_KWH,
                DEFAULT_NOISE_FRAC,
                demand_seed,
            )),
        }
    }

    /// Builds the state from a scenario, with weather at its start time.
    ///
    /// # Errors
    ///
    /// See [`ScenarioConfig::build_fleet`].
    pub fn from_config(cfg: &ScenarioConfig) -> Result<Self> {
        let s = &cfg.simulation;
        Ok(Self::new(
            cfg.build_fleet()?,
            WeatherGenerator::new(s.start_time, s.seed),
            s.seed.wrapping_add(1),
        ))
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_status))
        .route("/health", get(handlers::health))
        .route("/devices", get(handlers::list_devices))
        .route("/device", post(handlers::add_device))
        .route("/device/{name}", delete(handlers::remove_device))
        .route("/environment", get(handlers::get_environment))
        .route("/environment/update", post(handlers::update_environment))
        .route("/environment/step", post(handlers::advance_environment))
        .route("/environment/reset", post(handlers::reset_environment))
        .route("/simulate/step", post(handlers::simulate_step))
        .route("/simulate/realistic", post(handlers::simulate_realistic))
        .route("/diesel/status", get(handlers::diesel_status))
        .route("/diesel/strategy", post(handlers::set_strategy))
        .route("/diesel/strategies", get(handlers::list_strategies))
        .route("/diesel/{name}/setpoint", post(handlers::set_setpoint))
        .route("/batteries/status", get(handlers::batteries_status))
        .route("/grids/status", get(handlers::grids_status))
        .route("/analyze/scenario", post(handlers::analyze_scenario))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns the I/O error if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
