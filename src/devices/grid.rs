use std::fmt;

use serde::Serialize;

use super::types::{check_name, check_non_negative};
use crate::error::Result;

/// Direction of the power flow at a grid connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridStatus {
    Importing,
    Exporting,
    Idle,
}

impl fmt::Display for GridStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Importing => "importing",
            Self::Exporting => "exporting",
            Self::Idle => "idle",
        })
    }
}

/// A point of common coupling with the upstream network.
///
/// Acts as the slack bus: it takes whatever residual the rest of the fleet
/// leaves. Positive output is import, negative is export.
#[derive(Debug, Clone, Serialize)]
pub struct GridConnection {
    name: String,
    import_price_per_kwh: f64,
    export_price_per_kwh: f64,
    power_output_kw: f64,
}

impl GridConnection {
    /// Creates a new grid connection with the given tariffs ($/kWh).
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`](crate::error::FleetError::Validation)
    /// for an empty name or a negative or non-finite price.
    pub fn new(name: &str, import_price_per_kwh: f64, export_price_per_kwh: f64) -> Result<Self> {
        Ok(Self {
            name: check_name("grid_connection", name)?,
            import_price_per_kwh: check_non_negative(
                "grid_connection.import_price_per_kwh",
                import_price_per_kwh,
            )?,
            export_price_per_kwh: check_non_negative(
                "grid_connection.export_price_per_kwh",
                export_price_per_kwh,
            )?,
            power_output_kw: 0.0,
        })
    }

    /// Takes the residual net flow (kW) and returns it unchanged.
    pub fn update_output(&mut self, net_flow_kw: f64) -> f64 {
        self.power_output_kw = net_flow_kw;
        self.power_output_kw
    }

    /// Cost of the current flow over `timestep_hours`; negative is revenue.
    pub fn cost(&self, timestep_hours: f64) -> f64 {
        let price = if self.power_output_kw > 0.0 {
            self.import_price_per_kwh
        } else {
            self.export_price_per_kwh
        };
        self.power_output_kw * price * timestep_hours
    }

    pub fn status(&self) -> GridStatus {
        if self.power_output_kw > 0.0 {
            GridStatus::Importing
        } else if self.power_output_kw < 0.0 {
            GridStatus::Exporting
        } else {
            GridStatus::Idle
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn import_price_per_kwh(&self) -> f64 {
        self.import_price_per_kwh
    }

    pub fn export_price_per_kwh(&self) -> f64 {
        self.export_price_per_kwh
    }

    pub fn power_output_kw(&self) -> f64 {
        self.power_output_kw
    }
}
