/// Renewables scenario analysis (twin runs).
pub mod analysis;
/// Simulation clock for timestep management.
pub mod clock;
pub mod engine;
/// Device fleet and the per-step dispatch allocator.
pub mod fleet;
pub mod kpi;
pub mod power_balance;
/// Diesel dispatch strategies.
pub mod strategy;
pub mod types;
