//! Bus power balance helpers.

/// Total supply on the bus from all device groups, in bus convention.
///
/// All inputs must already follow the bus sign convention:
/// - Positive = supply to the bus (generation, battery discharge, grid import)
/// - Negative = draw from the bus (battery charge, grid export)
///
/// This function performs pure summation with **no sign flipping**.
pub fn bus_supply_kw(renewable_kw: f64, diesel_kw: f64, battery_kw: f64, grid_kw: f64) -> f64 {
    renewable_kw + diesel_kw + battery_kw + grid_kw
}

/// Splits `total_kw` proportionally to `weights`.
///
/// Returns all zeros when the weights sum to zero. The parts always sum to
/// `total_kw` up to floating-point rounding.
pub fn split_by_weight(total_kw: f64, weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|w| total_kw * w / sum).collect()
}

/// Splits `total_kw` evenly across `n` slots; 0 for `n == 0`.
pub fn split_evenly(total_kw: f64, n: usize) -> f64 {
    if n == 0 { 0.0 } else { total_kw / n as f64 }
}
