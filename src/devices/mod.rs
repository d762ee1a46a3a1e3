//! Per-technology power models for the assets on the microgrid bus.

/// Stationary battery storage model.
pub mod battery;
/// Dispatchable diesel generator model.
pub mod diesel;
/// Grid connection (slack) model.
pub mod grid;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;
/// Wind turbine generation model.
pub mod wind;

// Re-export the main types for convenience
pub use battery::Battery;
pub use diesel::DieselGenerator;
pub use grid::{GridConnection, GridStatus};
pub use solar::SolarPanel;
pub use types::{Device, DeviceKind};
pub use wind::WindTurbine;
