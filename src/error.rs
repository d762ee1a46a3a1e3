//! Error taxonomy for fleet management and dispatch.

use thiserror::Error;

/// Result alias used across the device and fleet APIs.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors raised synchronously by device construction and fleet operations.
///
/// Every variant is local to the call that produced it: the fleet is left
/// exactly as it was before the failing call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FleetError {
    /// A parameter is out of range, non-finite, or otherwise malformed.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Dotted parameter path (e.g. `"battery.capacity_kwh"`).
        field: String,
        /// Human-readable constraint description.
        message: String,
    },
    /// A device with this name is already part of the fleet.
    #[error("device '{0}' already exists")]
    DuplicateName(String),
    /// No (matching) device with this name exists.
    #[error("device '{0}' not found")]
    NotFound(String),
    /// The strategy tag is not one of the supported diesel strategies.
    #[error(
        "unknown diesel strategy \"{0}\", expected one of: demand_following, battery_charging, manual"
    )]
    InvalidStrategy(String),
}

impl FleetError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
