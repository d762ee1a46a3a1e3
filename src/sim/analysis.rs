//! Twin-run comparison of the fleet with and without its renewables.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::engine::Engine;
use super::fleet::Fleet;
use super::kpi::KpiReport;
use super::types::SimConfig;
use crate::demand::{DEFAULT_NOISE_FRAC, DemandProfile};
use crate::environment::WeatherGenerator;
use crate::error::{FleetError, Result};

/// Daily energy target used when none is given (kWh).
pub const DEFAULT_ANALYSIS_DAILY_KWH: f64 = 1500.0;

/// Longest analysis accepted (days); both runs are held in memory at once.
pub const MAX_ANALYSIS_DAYS: usize = 366;

/// Parameters of a renewables scenario analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOptions {
    /// Number of simulated days (hourly steps).
    pub duration_days: usize,
    /// Site demand target (kWh/day).
    pub total_daily_kwh: f64,
    /// Demand noise band (fraction).
    pub demand_noise: f64,
    /// Seed shared by both demand profiles.
    pub seed: u64,
    /// Device left out of the "with renewables" run.
    #[serde(alias = "exclude_device_name")]
    pub exclude_device: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            duration_days: 1,
            total_daily_kwh: DEFAULT_ANALYSIS_DAILY_KWH,
            demand_noise: DEFAULT_NOISE_FRAC,
            seed: 0,
            exclude_device: None,
        }
    }
}

/// Difference between the baseline and the renewable run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Savings {
    pub cost_saved: f64,
    pub co2_saved_kg: f64,
    pub cost_saving_percent: f64,
    pub co2_saving_percent: f64,
}

/// Outcome of [`analyze_renewables`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioAnalysis {
    pub with_renewables: KpiReport,
    pub without_renewables: KpiReport,
    pub savings: Savings,
}

/// Simulates the fleet twice from the same weather and demand: once as it is
/// and once with every wind turbine and solar panel removed.
///
/// Both runs work on clones, so `fleet` and `weather` are left untouched.
///
/// # Errors
///
/// Returns [`FleetError::Validation`] for a duration outside
/// `1..=MAX_ANALYSIS_DAYS` or a bad demand target and [`FleetError::NotFound`] if `exclude_device` names no device.
pub fn analyze_renewables(
    fleet: &Fleet,
    weather: &WeatherGenerator,
    options: &AnalysisOptions,
) -> Result<ScenarioAnalysis> {
    if !(1..=MAX_ANALYSIS_DAYS).contains(&options.duration_days) {
        return Err(FleetError::validation(
            "analysis.duration_days",
            format!(
                "must be in 1..={MAX_ANALYSIS_DAYS}, got {}",
                options.duration_days
            ),
        ));
    }
    if !(options.total_daily_kwh.is_finite() && options.total_daily_kwh >= 0.0) {
        return Err(FleetError::validation(
            "analysis.total_daily_kwh",
            format!("must be a finite value >= 0, got {}", options.total_daily_kwh),
        ));
    }

    let mut with_fleet = fleet.clone();
    if let Some(name) = &options.exclude_device {
        with_fleet.remove_device(name)?;
    }
    let without_fleet = fleet.without_renewables();

    let with_renewables = simulate(with_fleet, weather, options)?;
    let without_renewables = simulate(without_fleet, weather, options)?;

    let cost_saved = without_renewables.total_cost - with_renewables.total_cost;
    let co2_saved_kg = without_renewables.co2_emissions_kg - with_renewables.co2_emissions_kg;
    let savings = Savings {
        cost_saved,
        co2_saved_kg,
        cost_saving_percent: percent_of(cost_saved, without_renewables.total_cost),
        co2_saving_percent: percent_of(co2_saved_kg, without_renewables.co2_emissions_kg),
    };

    info!(
        days = options.duration_days,
        cost_saved, co2_saved_kg, "renewables scenario analysed"
    );

    Ok(ScenarioAnalysis {
        with_renewables,
        without_renewables,
        savings,
    })
}

fn simulate(fleet: Fleet, weather: &WeatherGenerator, options: &AnalysisOptions) -> Result<KpiReport> {
    let config = SimConfig::new(24, options.duration_days, options.seed)
        .with_start_time(weather.snapshot().timestamp);
    let demand = DemandProfile::new(options.total_daily_kwh, options.demand_noise, options.seed);
    let mut engine = Engine::with_weather(config, fleet, weather.clone(), demand);
    let results = engine.run()?;
    Ok(KpiReport::from_results(&results))
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole != 0.0 { part / whole * 100.0 } else { 0.0 }
}
