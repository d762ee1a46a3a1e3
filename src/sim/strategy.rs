//! Diesel dispatch strategies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::devices::DieselGenerator;
use crate::error::FleetError;

/// Fleet-average SOC (%) below which `battery_charging` runs the diesels.
pub const LOW_SOC_THRESHOLD_PCT: f64 = 30.0;

/// Policy deciding each diesel generator's output for a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DieselStrategy {
    /// Cover the shortfall left by renewables, generators in fleet order.
    #[default]
    DemandFollowing,
    /// Run flat out (shortfall plus full battery charge power) while the
    /// fleet-average SOC is low; otherwise stay off.
    BatteryCharging,
    /// Follow operator setpoints by generator name.
    Manual,
}

impl DieselStrategy {
    pub const ALL: [DieselStrategy; 3] = [
        DieselStrategy::DemandFollowing,
        DieselStrategy::BatteryCharging,
        DieselStrategy::Manual,
    ];

    /// Wire tag of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DemandFollowing => "demand_following",
            Self::BatteryCharging => "battery_charging",
            Self::Manual => "manual",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DemandFollowing => "Diesel output follows the demand not met by renewables",
            Self::BatteryCharging => {
                "Diesel runs to recharge batteries when average SOC drops below 30%"
            }
            Self::Manual => "Diesel output follows operator setpoints",
        }
    }

    /// Next strategy in [`DieselStrategy::ALL`], wrapping around.
    pub fn cycle(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Sets every generator's output for this step and returns the total (kW).
    ///
    /// # Arguments
    ///
    /// * `generators` - Diesel generators in fleet order
    /// * `net_demand_kw` - Demand minus renewable generation (may be negative)
    /// * `storage` - Aggregate battery state, used by `battery_charging`
    /// * `setpoints` - Operator setpoints by name, used by `manual`
    pub fn dispatch<'a>(
        self,
        generators: impl IntoIterator<Item = &'a mut DieselGenerator>,
        net_demand_kw: f64,
        storage: &StorageState,
        setpoints: &BTreeMap<String, f64>,
    ) -> f64 {
        match self {
            Self::DemandFollowing => dispatch_greedy(generators, net_demand_kw.max(0.0)),
            Self::BatteryCharging => {
                if storage.average_soc_pct() < LOW_SOC_THRESHOLD_PCT {
                    let target = net_demand_kw.max(0.0) + storage.max_power_kw;
                    dispatch_greedy(generators, target)
                } else {
                    generators.into_iter().map(|g| g.update_output(0.0)).sum()
                }
            }
            Self::Manual => generators
                .into_iter()
                .map(|g| {
                    let setpoint = setpoints.get(g.name()).copied().unwrap_or(0.0);
                    g.update_output(setpoint)
                })
                .sum(),
        }
    }
}

/// Serves `target_kw` with each generator in turn, up to its rating.
fn dispatch_greedy<'a>(
    generators: impl IntoIterator<Item = &'a mut DieselGenerator>,
    target_kw: f64,
) -> f64 {
    let mut remaining = target_kw;
    let mut total = 0.0;
    for generator in generators {
        let rated = generator.rated_power_kw();
        let output = generator.update_output(remaining.max(0.0).min(rated));
        remaining -= output;
        total += output;
    }
    total
}

impl fmt::Display for DieselStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DieselStrategy {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| FleetError::InvalidStrategy(s.to_string()))
    }
}

/// Aggregate battery state seen by the strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StorageState {
    /// Energy stored across all batteries (kWh).
    pub soc_kwh: f64,
    /// Combined capacity (kWh).
    pub capacity_kwh: f64,
    /// Sum of battery power limits (kW).
    pub max_power_kw: f64,
}

impl StorageState {
    /// Capacity-weighted average SOC in percent; 0 when there is no storage.
    pub fn average_soc_pct(&self) -> f64 {
        if self.capacity_kwh > 0.0 {
            self.soc_kwh / self.capacity_kwh * 100.0
        } else {
            0.0
        }
    }
}
