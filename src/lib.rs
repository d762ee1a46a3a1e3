//! Microgrid dispatch simulator: device models, a single-timestep fleet
//! allocator with selectable diesel strategies, and multi-step runs driven
//! by a seeded weather generator and demand profile.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod demand;
pub mod devices;
pub mod environment;
pub mod error;
/// Telemetry export.
pub mod io;
/// Engine, fleet allocator, strategies, KPIs, and scenario analysis.
pub mod sim;
#[cfg(feature = "tui")]
pub mod tui;
