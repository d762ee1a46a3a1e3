//! Simulation engine that drives a fleet through weather and demand over time.

use tracing::debug;

use super::clock::SimClock;
use super::fleet::Fleet;
use super::types::{SimConfig, StepResult};
use crate::demand::DemandProfile;
use crate::environment::{Environment, WeatherGenerator};
use crate::error::Result;

/// Upper bound on the step records reserved up front by [`Engine::run`].
const MAX_PREALLOCATED_STEPS: usize = 1 << 16;

/// Simulation engine owning the fleet, the weather, and the demand profile.
///
/// Each step reads the current weather snapshot, samples demand at its
/// timestamp, dispatches the fleet, and only then advances the weather.
#[derive(Debug, Clone)]
pub struct Engine {
    config: SimConfig,
    fleet: Fleet,
    weather: WeatherGenerator,
    demand: DemandProfile,
    clock: SimClock,
}

impl Engine {
    /// Creates a new engine positioned at `config.start_time`.
    ///
    /// The weather generator is seeded from `config.seed`.
    pub fn new(config: SimConfig, fleet: Fleet, demand: DemandProfile) -> Self {
        let weather = WeatherGenerator::new(config.start_time, config.seed);
        Self::with_weather(config, fleet, weather, demand)
    }

    /// Creates an engine around an existing weather generator.
    pub fn with_weather(
        config: SimConfig,
        fleet: Fleet,
        weather: WeatherGenerator,
        demand: DemandProfile,
    ) -> Self {
        let clock = SimClock::new(
            weather.snapshot().timestamp,
            config.dt_hours,
            config.total_steps(),
        );
        Self {
            config,
            fleet,
            weather,
            demand,
            clock,
        }
    }

    /// Executes the next timestep, or returns `None` once the run is complete.
    ///
    /// # Errors
    ///
    /// Propagates [`FleetError`](crate::error::FleetError) from the fleet step.
    pub fn step(&mut self) -> Result<Option<StepResult>> {
        let Some((index, _)) = self.clock.tick() else {
            return Ok(None);
        };

        let environment = self.weather.snapshot();
        let demand_kw = self.demand.demand_kw(environment.timestamp);
        let result = self
            .fleet
            .step(&environment, demand_kw, self.config.dt_hours)?;
        self.weather.advance(self.config.dt_hours);

        debug!(step = index, "engine step complete");
        Ok(Some(result))
    }

    /// Executes all remaining timesteps and returns the step records.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step.
    pub fn run(&mut self) -> Result<Vec<StepResult>> {
        let remaining = self.clock.total() - self.clock.current();
        let mut results = Vec::with_capacity(remaining.min(MAX_PREALLOCATED_STEPS));
        while let Some(result) = self.step()? {
            results.push(result);
        }
        Ok(results)
    }

    /// Index of the next step to run.
    pub fn step_index(&self) -> usize {
        self.clock.current()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Current weather snapshot (the environment the next step will see).
    pub fn environment(&self) -> Environment {
        self.weather.snapshot()
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Mutable fleet access, e.g. to change the diesel strategy mid-run.
    pub fn fleet_mut(&mut self) -> &mut Fleet {
        &mut self.fleet
    }

    pub fn weather(&self) -> &WeatherGenerator {
        &self.weather
    }

    pub fn demand(&self) -> &DemandProfile {
        &self.demand
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
