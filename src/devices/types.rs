//! Common device types: the closed device sum type and parameter validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Battery, DieselGenerator, GridConnection, SolarPanel, WindTurbine};
use crate::error::{FleetError, Result};

/// Technology tag of a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    WindTurbine,
    SolarPanel,
    DieselGenerator,
    Battery,
    GridConnection,
}

impl DeviceKind {
    /// All device kinds, in the order the allocator visits them.
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::WindTurbine,
        DeviceKind::SolarPanel,
        DeviceKind::DieselGenerator,
        DeviceKind::Battery,
        DeviceKind::GridConnection,
    ];

    /// Returns the display name of the technology.
    pub fn label(self) -> &'static str {
        match self {
            Self::WindTurbine => "WindTurbine",
            Self::SolarPanel => "SolarPanel",
            Self::DieselGenerator => "DieselGenerator",
            Self::Battery => "Battery",
            Self::GridConnection => "GridConnection",
        }
    }

    /// Returns `true` for weather-driven generation (wind and solar).
    pub fn is_renewable(self) -> bool {
        matches!(self, Self::WindTurbine | Self::SolarPanel)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    /// Accepts the class-style name in any case, with or without underscores
    /// (`"WindTurbine"`, `"windturbine"`, `"wind_turbine"`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().to_ascii_lowercase() == key)
            .ok_or_else(|| {
                format!(
                    "unknown device type \"{s}\", expected one of: windturbine, solarpanel, \
                     dieselgenerator, battery, gridconnection"
                )
            })
    }
}

/// A microgrid asset connected to the common bus.
///
/// Closed over the five supported technologies; each variant carries only its
/// own parameters and state. `power_output_kw` follows the bus convention:
/// positive = supply to the bus, negative = draw from the bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Device {
    WindTurbine(WindTurbine),
    SolarPanel(SolarPanel),
    DieselGenerator(DieselGenerator),
    Battery(Battery),
    GridConnection(GridConnection),
}

impl Device {
    /// Unique name of the device within its fleet.
    pub fn name(&self) -> &str {
        match self {
            Self::WindTurbine(d) => d.name(),
            Self::SolarPanel(d) => d.name(),
            Self::DieselGenerator(d) => d.name(),
            Self::Battery(d) => d.name(),
            Self::GridConnection(d) => d.name(),
        }
    }

    /// Technology tag.
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::WindTurbine(_) => DeviceKind::WindTurbine,
            Self::SolarPanel(_) => DeviceKind::SolarPanel,
            Self::DieselGenerator(_) => DeviceKind::DieselGenerator,
            Self::Battery(_) => DeviceKind::Battery,
            Self::GridConnection(_) => DeviceKind::GridConnection,
        }
    }

    /// Power output from the most recent update (kW, bus convention).
    pub fn power_output_kw(&self) -> f64 {
        match self {
            Self::WindTurbine(d) => d.power_output_kw(),
            Self::SolarPanel(d) => d.power_output_kw(),
            Self::DieselGenerator(d) => d.power_output_kw(),
            Self::Battery(d) => d.power_output_kw(),
            Self::GridConnection(d) => d.power_output_kw(),
        }
    }

    pub fn as_diesel(&self) -> Option<&DieselGenerator> {
        match self {
            Self::DieselGenerator(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_diesel_mut(&mut self) -> Option<&mut DieselGenerator> {
        match self {
            Self::DieselGenerator(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_battery(&self) -> Option<&Battery> {
        match self {
            Self::Battery(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_battery_mut(&mut self) -> Option<&mut Battery> {
        match self {
            Self::Battery(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_grid(&self) -> Option<&GridConnection> {
        match self {
            Self::GridConnection(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_grid_mut(&mut self) -> Option<&mut GridConnection> {
        match self {
            Self::GridConnection(g) => Some(g),
            _ => None,
        }
    }
}

impl From<WindTurbine> for Device {
    fn from(d: WindTurbine) -> Self {
        Self::WindTurbine(d)
    }
}

impl From<SolarPanel> for Device {
    fn from(d: SolarPanel) -> Self {
        Self::SolarPanel(d)
    }
}

impl From<DieselGenerator> for Device {
    fn from(d: DieselGenerator) -> Self {
        Self::DieselGenerator(d)
    }
}

impl From<Battery> for Device {
    fn from(d: Battery) -> Self {
        Self::Battery(d)
    }
}

impl From<GridConnection> for Device {
    fn from(d: GridConnection) -> Self {
        Self::GridConnection(d)
    }
}

pub(crate) fn check_name(kind: &str, name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(FleetError::validation(
            format!("{kind}.name"),
            "must not be empty",
        ));
    }
    Ok(name.to_string())
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FleetError::validation(
            field,
            format!("must be a finite value >= 0, got {value}"),
        ))
    }
}

pub(crate) fn check_positive(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FleetError::validation(
            field,
            format!("must be a finite value > 0, got {value}"),
        ))
    }
}

pub(crate) fn check_finite(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FleetError::validation(field, "must be finite"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_loose_spellings() {
        assert_eq!("windturbine".parse::<DeviceKind>(), Ok(DeviceKind::WindTurbine));
        assert_eq!("WindTurbine".parse::<DeviceKind>(), Ok(DeviceKind::WindTurbine));
        assert_eq!("grid_connection".parse::<DeviceKind>(), Ok(DeviceKind::GridConnection));
        assert!("flywheel".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn renewable_kinds() {
        assert!(DeviceKind::WindTurbine.is_renewable());
        assert!(DeviceKind::SolarPanel.is_renewable());
        assert!(!DeviceKind::DieselGenerator.is_renewable());
        assert!(!DeviceKind::Battery.is_renewable());
        assert!(!DeviceKind::GridConnection.is_renewable());
    }

    #[test]
    fn device_accessors_follow_variant() {
        let device: Device = Battery::new("B1", 10.0, 5.0, 0.9, 0.5).unwrap().into();
        assert_eq!(device.name(), "B1");
        assert_eq!(device.kind(), DeviceKind::Battery);
        assert!(device.as_battery().is_some());
        assert!(device.as_diesel().is_none());
        assert_eq!(device.power_output_kw(), 0.0);
    }

    #[test]
    fn validators_reject_nan_and_sign() {
        assert!(check_positive("x", 0.0).is_err());
        assert!(check_positive("x", f64::NAN).is_err());
        assert!(check_non_negative("x", -0.1).is_err());
        assert!(check_non_negative("x", 0.0).is_ok());
        assert!(check_finite("x", f64::INFINITY).is_err());
        assert!(check_name("battery", "  ").is_err());
    }
}
