use serde::Serialize;
use tracing::warn;

use super::types::{check_name, check_positive};
use crate::error::{FleetError, Result};

/// Default round-trip efficiency.
pub const DEFAULT_ROUND_TRIP_EFFICIENCY: f64 = 0.90;
/// Default initial state of charge as a fraction of capacity.
pub const DEFAULT_INITIAL_CHARGE: f64 = 0.5;

/// Drift beyond this many kWh counts as a real SOC bound violation.
const SOC_CLAMP_TOLERANCE_KWH: f64 = 1e-9;

/// A battery energy storage system that can charge and discharge electricity.
///
/// `Battery` stores energy in kWh and splits its round-trip losses evenly
/// between charging and discharging (`sqrt(round_trip_efficiency)` each way).
///
/// # Power Flow Convention (Bus)
/// - Positive power: Discharging (supplying the bus)
/// - Negative power: Charging (drawing from the bus)
#[derive(Debug, Clone, Serialize)]
pub struct Battery {
    name: String,

    /// Usable capacity in kilowatt-hours.
    capacity_kwh: f64,

    /// Symmetric charge/discharge power limit in kilowatts.
    max_power_kw: f64,

    /// Fraction of energy recovered over a full charge/discharge cycle.
    round_trip_efficiency: f64,

    /// Stored energy in kilowatt-hours, always within `[0, capacity_kwh]`.
    state_of_charge_kwh: f64,

    power_output_kw: f64,
}

impl Battery {
    /// Creates a new battery with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique device name
    /// * `capacity_kwh` - Battery capacity in kWh (must be > 0)
    /// * `max_power_kw` - Charge and discharge power limit in kW (must be > 0)
    /// * `round_trip_efficiency` - Cycle efficiency in `(0, 1]`
    /// * `initial_charge` - Initial state of charge as a fraction (0.0 to 1.0)
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] if capacity or power is not positive,
    /// the efficiency is outside `(0, 1]`, or the initial charge is outside `[0, 1]`.
    pub fn new(
        name: &str,
        capacity_kwh: f64,
        max_power_kw: f64,
        round_trip_efficiency: f64,
        initial_charge: f64,
    ) -> Result<Self> {
        let name = check_name("battery", name)?;
        check_positive("battery.capacity_kwh", capacity_kwh)?;
        check_positive("battery.max_power_kw", max_power_kw)?;
        if !(round_trip_efficiency > 0.0 && round_trip_efficiency <= 1.0) {
            return Err(FleetError::validation(
                "battery.round_trip_efficiency",
                format!("must be in (0, 1], got {round_trip_efficiency}"),
            ));
        }
        if !(0.0..=1.0).contains(&initial_charge) {
            return Err(FleetError::validation(
                "battery.initial_charge",
                format!("must be in [0, 1], got {initial_charge}"),
            ));
        }

        Ok(Self {
            name,
            capacity_kwh,
            max_power_kw,
            round_trip_efficiency,
            state_of_charge_kwh: initial_charge * capacity_kwh,
            power_output_kw: 0.0,
        })
    }

    /// Responds to a bus request and returns the actual power (kW).
    ///
    /// A positive `demand_kw` asks the battery to discharge; a negative one
    /// offers surplus for charging. The response is limited by `max_power_kw`
    /// and by the energy (or headroom) available over `timestep_hours`, with
    /// one-way losses applied on each side.
    pub fn update_output(&mut self, demand_kw: f64, timestep_hours: f64) -> f64 {
        let eta = self.one_way_efficiency();

        if demand_kw > 0.0 {
            let deliverable_kw = (self.state_of_charge_kwh * eta / timestep_hours).min(self.max_power_kw);
            let discharge_kw = demand_kw.min(deliverable_kw);
            self.power_output_kw = discharge_kw;
            self.state_of_charge_kwh -= discharge_kw * timestep_hours / eta;
        } else if demand_kw < 0.0 {
            let room_kw = (self.capacity_kwh - self.state_of_charge_kwh) / eta / timestep_hours;
            let charge_kw = (-demand_kw).min(self.max_power_kw).min(room_kw);
            self.power_output_kw = -charge_kw;
            self.state_of_charge_kwh += charge_kw * timestep_hours * eta;
        } else {
            self.power_output_kw = 0.0;
        }

        self.clamp_soc();
        self.power_output_kw
    }

    fn clamp_soc(&mut self) {
        let clamped = self.state_of_charge_kwh.clamp(0.0, self.capacity_kwh);
        if (clamped - self.state_of_charge_kwh).abs() > SOC_CLAMP_TOLERANCE_KWH {
            warn!(
                battery = %self.name,
                soc_kwh = self.state_of_charge_kwh,
                capacity_kwh = self.capacity_kwh,
                "state of charge left its bounds, clamping"
            );
        }
        self.state_of_charge_kwh = clamped;
    }

    /// Charge/discharge efficiency applied on each side of a cycle.
    pub fn one_way_efficiency(&self) -> f64 {
        self.round_trip_efficiency.sqrt()
    }

    /// State of charge as a percentage of capacity.
    pub fn soc_percent(&self) -> f64 {
        self.state_of_charge_kwh / self.capacity_kwh * 100.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    pub fn max_power_kw(&self) -> f64 {
        self.max_power_kw
    }

    pub fn round_trip_efficiency(&self) -> f64 {
        self.round_trip_efficiency
    }

    pub fn state_of_charge_kwh(&self) -> f64 {
        self.state_of_charge_kwh
    }

    pub fn power_output_kw(&self) -> f64 {
        self.power_output_kw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_battery() {
        let battery = Battery::new("B1", 10.0, 5.0, 0.81, 0.5).unwrap();
        assert_eq!(battery.capacity_kwh(), 10.0);
        assert_eq!(battery.state_of_charge_kwh(), 5.0);
        assert_eq!(battery.max_power_kw(), 5.0);
        assert!((battery.one_way_efficiency() - 0.9).abs() < 1e-12);
        assert_eq!(battery.soc_percent(), 50.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Battery::new("B", 0.0, 5.0, 0.9, 0.5).is_err());
        assert!(Battery::new("B", 10.0, 0.0, 0.9, 0.5).is_err());
        assert!(Battery::new("B", 10.0, 5.0, 0.0, 0.5).is_err());
        assert!(Battery::new("B", 10.0, 5.0, 1.1, 0.5).is_err());
        assert!(Battery::new("B", 10.0, 5.0, 0.9, 1.1).is_err());
        assert!(Battery::new("B", 10.0, 5.0, 0.9, -0.1).is_err());
        assert!(Battery::new("B", 10.0, 5.0, f64::NAN, 0.5).is_err());
        assert!(Battery::new("B", 10.0, 5.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_charge_power_limit() {
        let mut battery = Battery::new("B1", 10.0, 5.0, 1.0, 0.5).unwrap();
        assert_eq!(battery.update_output(-10.0, 0.25), -5.0);
    }

    #[test]
    fn test_discharge_power_limit() {
        let mut battery = Battery::new("B1", 10.0, 5.0, 1.0, 0.5).unwrap();
        assert_eq!(battery.update_output(10.0, 0.25), 5.0);
    }

    #[test]
    fn test_discharge_soc_limit() {
        // 1 kWh stored, 0.25 h step, lossless: at most 4 kW
        let mut battery = Battery::new("B1", 10.0, 5.0, 1.0, 0.1).unwrap();
        let kw = battery.update_output(5.0, 0.25);
        assert!((kw - 4.0).abs() < 1e-9);
        assert!(battery.state_of_charge_kwh() < 1e-9);
    }

    #[test]
    fn test_charge_soc_limit() {
        // 1 kWh of headroom, 0.25 h step, lossless: at most 4 kW
        let mut battery = Battery::new("B1", 10.0, 5.0, 1.0, 0.9).unwrap();
        let kw = battery.update_output(-5.0, 0.25);
        assert!((kw + 4.0).abs() < 1e-9);
        assert!((battery.state_of_charge_kwh() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_demand_is_idle() {
        let mut battery = Battery::new("B1", 10.0, 5.0, 0.9, 0.5).unwrap();
        assert_eq!(battery.update_output(0.0, 1.0), 0.0);
        assert_eq!(battery.state_of_charge_kwh(), 5.0);
    }

    #[test]
    fn test_efficiency_charge() {
        // 0.81 round trip = 0.9 each way: 1 kW for 6 h stores 5.4 kWh
        let mut battery = Battery::new("B1", 10.0, 5.0, 0.81, 0.0).unwrap();
        battery.update_output(-1.0, 6.0);
        assert!((battery.state_of_charge_kwh() - 5.4).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_discharge() {
        // 0.64 round trip = 0.8 each way: 1 kW for 2 h pulls 2.5 kWh
        let mut battery = Battery::new("B1", 10.0, 5.0, 0.64, 0.5).unwrap();
        let kw = battery.update_output(1.0, 2.0);
        assert_eq!(kw, 1.0);
        assert!((battery.state_of_charge_kwh() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_battery_delivers_everything_it_has() {
        // 5 kWh * 0.8 / 6 h caps discharge at 0.667 kW
        let mut battery = Battery::new("B1", 10.0, 5.0, 0.64, 0.5).unwrap();
        let kw = battery.update_output(1.0, 6.0);
        assert!((kw - 5.0 * 0.8 / 6.0).abs() < 1e-9);
        assert!(battery.state_of_charge_kwh().abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_loss() {
        let rte = 0.9;
        let mut battery = Battery::new("B1", 100.0, 50.0, rte, 0.0).unwrap();
        let charged = -battery.update_output(-10.0, 2.0) * 2.0;
        assert!((charged - 20.0).abs() < 1e-9);

        let mut delivered = 0.0;
        while battery.state_of_charge_kwh() > 1e-9 {
            delivered += battery.update_output(10.0, 1.0);
        }
        assert!((delivered - 20.0 * rte).abs() < 1e-6);
    }

    #[test]
    fn test_soc_stays_bounded() {
        let mut battery = Battery::new("B1", 10.0, 8.0, 0.85, 0.3).unwrap();
        let requests = [7.0, -12.0, 3.5, -1.0, 40.0, -0.5, 0.0, 8.0, -8.0, -8.0, -8.0];
        for (i, demand) in requests.iter().cycle().take(200).enumerate() {
            let h = [0.25, 1.0, 3.0][i % 3];
            battery.update_output(*demand, h);
            let soc = battery.state_of_charge_kwh();
            assert!((0.0..=10.0).contains(&soc), "soc {soc} out of bounds at step {i}");
            assert!(battery.power_output_kw().abs() <= 8.0 + 1e-9);
        }
    }
}
