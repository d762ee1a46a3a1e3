//! Synthetic site demand driven by a daily energy target.

use chrono::{NaiveDateTime, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default relative noise band (±5%).
pub const DEFAULT_NOISE_FRAC: f64 = 0.05;

/// Demand never drops below this fraction of the average power.
const MIN_LOAD_FRAC: f64 = 0.7;

/// Per-unit hourly shape of a 24/7 industrial site, dipping at shift changes.
const INDUSTRIAL_SHAPE: [f64; 24] = [
    0.9, 0.85, 0.85, 0.85, 0.9, 0.95, 1.0, 1.0, 1.0, 1.0, 0.95, 0.9, //
    0.9, 0.95, 1.0, 1.0, 1.0, 0.95, 0.9, 0.85, 0.85, 0.85, 0.9, 0.95,
];

/// A demand generator that scales an industrial load shape to a daily target.
///
/// The hourly shape is interpolated linearly between hours, scaled so the
/// average power equals `total_daily_kwh / 24`, and perturbed by uniform noise
/// of ±`noise_frac`. Results are floored at 70% of the average power.
///
/// # Examples
///
/// ```
/// use microgrid_sim::demand::DemandProfile;
/// use microgrid_sim::environment::default_start_time;
///
/// let mut profile = DemandProfile::new(2400.0, 0.0, 42);
/// let kw = profile.demand_kw(default_start_time());
/// assert!((kw - 90.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct DemandProfile {
    /// Energy the site consumes over a day (kWh).
    pub total_daily_kwh: f64,

    /// Half-width of the uniform noise band as a fraction of demand.
    pub noise_frac: f64,

    /// Random number generator for noise generation.
    rng: StdRng,
}

impl DemandProfile {
    /// Creates a new profile.
    ///
    /// Negative or non-finite targets and noise fractions are treated as 0.
    pub fn new(total_daily_kwh: f64, noise_frac: f64, seed: u64) -> Self {
        let sanitize = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            total_daily_kwh: sanitize(total_daily_kwh),
            noise_frac: sanitize(noise_frac),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Average power needed to meet the daily target (kW).
    pub fn average_kw(&self) -> f64 {
        self.total_daily_kwh / 24.0
    }

    /// Noise-free demand at `time` (kW).
    pub fn base_kw(&self, time: NaiveDateTime) -> f64 {
        let hour = f64::from(time.hour()) + f64::from(time.minute()) / 60.0;
        let floor = hour.floor() as usize % 24;
        let ceil = (floor + 1) % 24;
        let frac = hour - hour.floor();
        let shape = INDUSTRIAL_SHAPE[floor] * (1.0 - frac) + INDUSTRIAL_SHAPE[ceil] * frac;
        shape * self.average_kw()
    }

    /// Demand at `time` including noise (kW, never below the minimum load).
    pub fn demand_kw(&mut self, time: NaiveDateTime) -> f64 {
        let base = self.base_kw(time);
        let noise = if self.noise_frac > 0.0 {
            self.rng.random_range(-self.noise_frac..=self.noise_frac) * base
        } else {
            0.0
        };
        (base + noise).max(self.average_kw() * MIN_LOAD_FRAC)
    }
}
