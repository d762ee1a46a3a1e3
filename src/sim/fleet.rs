//! The device fleet and its single-timestep dispatch allocator.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::power_balance::{split_by_weight, split_evenly};
use super::strategy::{DieselStrategy, StorageState};
use super::types::{DeviceOutput, StepResult};
use crate::devices::types::{check_finite, check_positive};
use crate::devices::{Battery, Device, DeviceKind, DieselGenerator, GridConnection};
use crate::environment::Environment;
use crate::error::{FleetError, Result};

/// An ordered set of uniquely named devices sharing one bus.
///
/// Insertion order is the tie-break wherever the allocator serves devices in
/// turn (diesel generators under greedy dispatch, per-device output lists).
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    devices: Vec<Device>,
    strategy: DieselStrategy,
    manual_setpoints: BTreeMap<String, f64>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device at the end of the fleet.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateName`] if a device with the same name
    /// already exists; the fleet is unchanged.
    pub fn add_device(&mut self, device: impl Into<Device>) -> Result<()> {
        let device = device.into();
        if self.get(device.name()).is_some() {
            return Err(FleetError::DuplicateName(device.name().to_string()));
        }
        info!(device = device.name(), kind = %device.kind(), "device added");
        self.devices.push(device);
        Ok(())
    }

    /// Removes a device by name and returns it.
    ///
    /// Any manual setpoint stored under that name is dropped as well.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] if no device has that name.
    pub fn remove_device(&mut self, name: &str) -> Result<Device> {
        let idx = self
            .devices
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| FleetError::NotFound(name.to_string()))?;
        let device = self.devices.remove(idx);
        self.manual_setpoints.remove(name);
        info!(device = name, kind = %device.kind(), "device removed");
        Ok(device)
    }

    /// Selects the diesel strategy by its tag.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::InvalidStrategy`] for an unknown tag; the current
    /// strategy is kept.
    pub fn set_strategy(&mut self, tag: &str) -> Result<()> {
        let strategy: DieselStrategy = tag.parse()?;
        self.set_diesel_strategy(strategy);
        Ok(())
    }

    pub fn set_diesel_strategy(&mut self, strategy: DieselStrategy) {
        if strategy != self.strategy {
            info!(from = %self.strategy, to = %strategy, "diesel strategy changed");
        }
        self.strategy = strategy;
    }

    /// Stores an operator setpoint for a diesel generator.
    ///
    /// The setpoint only takes effect under [`DieselStrategy::Manual`] and is
    /// clamped to the generator's rating at dispatch time.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] for a negative or non-finite value
    /// and [`FleetError::NotFound`] if no diesel generator has that name.
    pub fn set_manual_setpoint(&mut self, generator: &str, setpoint_kw: f64) -> Result<()> {
        if !(setpoint_kw.is_finite() && setpoint_kw >= 0.0) {
            return Err(FleetError::validation(
                "diesel_generator.setpoint_kw",
                format!("must be a finite value >= 0, got {setpoint_kw}"),
            ));
        }
        if self.diesel_generators().all(|g| g.name() != generator) {
            return Err(FleetError::NotFound(generator.to_string()));
        }
        info!(generator, setpoint_kw, "manual setpoint stored");
        self.manual_setpoints
            .insert(generator.to_string(), setpoint_kw);
        Ok(())
    }

    /// Runs one dispatch step against an environment snapshot.
    ///
    /// Renewables are updated from the snapshot first, diesel output is then
    /// set by the active strategy, batteries absorb or cover what remains in
    /// proportion to their capacity, and grid connections take the residual
    /// in equal shares. Without a grid the residual is reported as
    /// `unbalanced_kw`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] for non-finite demand or a
    /// non-positive timestep, before any device is touched.
    pub fn step(
        &mut self,
        environment: &Environment,
        demand_kw: f64,
        timestep_hours: f64,
    ) -> Result<StepResult> {
        check_finite("step.demand_kw", demand_kw)?;
        check_positive("step.timestep_hours", timestep_hours)?;

        let mut renewable_kw = 0.0;
        for device in &mut self.devices {
            match device {
                Device::WindTurbine(t) => renewable_kw += t.update_output(environment),
                Device::SolarPanel(p) => renewable_kw += p.update_output(environment),
                _ => {}
            }
        }

        let net_after_renewables = demand_kw - renewable_kw;
        let storage = self.storage_state();
        let diesel_kw = self.strategy.dispatch(
            self.devices.iter_mut().filter_map(Device::as_diesel_mut),
            net_after_renewables,
            &storage,
            &self.manual_setpoints,
        );

        let net_for_storage = demand_kw - renewable_kw - diesel_kw;
        let capacities: Vec<f64> = self.batteries().map(Battery::capacity_kwh).collect();
        let shares = split_by_weight(net_for_storage, &capacities);
        let battery_kw: f64 = self
            .devices
            .iter_mut()
            .filter_map(Device::as_battery_mut)
            .zip(shares)
            .map(|(battery, share)| battery.update_output(share, timestep_hours))
            .sum();

        let final_net = net_for_storage - battery_kw;
        let grid_count = self.grid_connections().count();
        let grid_share = split_evenly(final_net, grid_count);
        let mut grid_kw = 0.0;
        let mut grid_cost = 0.0;
        for grid in self.devices.iter_mut().filter_map(Device::as_grid_mut) {
            grid_kw += grid.update_output(grid_share);
            grid_cost += grid.cost(timestep_hours);
        }
        let unbalanced_kw = if grid_count == 0 { final_net } else { 0.0 };
        if unbalanced_kw != 0.0 {
            debug!(unbalanced_kw, "no grid connection to take the residual");
        }

        let storage_after = self.storage_state();
        let diesel_usage_lph: f64 = self
            .diesel_generators()
            .map(DieselGenerator::fuel_used_l_per_h)
            .sum();

        let result = StepResult {
            timestamp: environment.timestamp,
            timestep_hours,
            demand_kw,
            renewable_generation_kw: renewable_kw,
            diesel_generation_kw: diesel_kw,
            battery_power_kw: battery_kw,
            grid_power_kw: grid_kw,
            unbalanced_kw,
            battery_soc_kwh: storage_after.soc_kwh,
            battery_capacity_kwh: storage_after.capacity_kwh,
            diesel_usage_lph,
            grid_cost,
            diesel_strategy: self.strategy,
            battery_count: capacities.len(),
            grid_count,
            device_outputs: self
                .devices
                .iter()
                .map(|d| DeviceOutput {
                    name: d.name().to_string(),
                    kind: d.kind(),
                    power_kw: d.power_output_kw(),
                })
                .collect(),
        };

        debug!(
            timestamp = %result.timestamp,
            demand_kw,
            renewable_kw,
            diesel_kw,
            battery_kw,
            grid_kw,
            soc_kwh = result.battery_soc_kwh,
            "step dispatched"
        );
        Ok(result)
    }

    /// Aggregate battery state (stored energy, capacity, power limits).
    pub fn storage_state(&self) -> StorageState {
        self.batteries().fold(StorageState::default(), |acc, b| StorageState {
            soc_kwh: acc.soc_kwh + b.state_of_charge_kwh(),
            capacity_kwh: acc.capacity_kwh + b.capacity_kwh(),
            max_power_kw: acc.max_power_kw + b.max_power_kw(),
        })
    }

    /// Copy of the fleet with every wind turbine and solar panel removed.
    pub fn without_renewables(&self) -> Self {
        Self {
            devices: self
                .devices
                .iter()
                .filter(|d| !d.kind().is_renewable())
                .cloned()
                .collect(),
            strategy: self.strategy,
            manual_setpoints: self.manual_setpoints.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name() == name)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of devices of the given kind.
    pub fn count(&self, kind: DeviceKind) -> usize {
        self.devices.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn strategy(&self) -> DieselStrategy {
        self.strategy
    }

    pub fn manual_setpoints(&self) -> &BTreeMap<String, f64> {
        &self.manual_setpoints
    }

    pub fn diesel_generators(&self) -> impl Iterator<Item = &DieselGenerator> {
        self.devices.iter().filter_map(Device::as_diesel)
    }

    pub fn batteries(&self) -> impl Iterator<Item = &Battery> {
        self.devices.iter().filter_map(Device::as_battery)
    }

    pub fn grid_connections(&self) -> impl Iterator<Item = &GridConnection> {
        self.devices.iter().filter_map(Device::as_grid)
    }
}
