//! Environment snapshot consumed by the device models, and a seeded
//! climatological weather generator that advances it between steps.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};

/// Read-only weather state for one simulation step.
///
/// Constructed through [`Environment::new`] or [`Environment::apply`], both of
/// which validate every field, so device models can read the values without
/// re-checking them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Ambient temperature (°C, -50..=50).
    pub temperature: f64,
    /// Wind speed at hub height (m/s, 0..=100).
    pub wind_speed: f64,
    /// Direction the wind blows from (degrees, [0, 360)).
    pub wind_direction: f64,
    /// Global horizontal irradiance (W/m², 0..=1000).
    pub solar_radiation: f64,
    /// Cloud cover (okta, 0..=9).
    pub cloud_cover: f64,
    /// Wall-clock time of the snapshot.
    pub timestamp: NaiveDateTime,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            wind_speed: 0.0,
            wind_direction: 0.0,
            solar_radiation: 0.0,
            cloud_cover: 0.0,
            timestamp: default_start_time(),
        }
    }
}

/// Midnight on 2024-01-01, the default simulation start.
pub fn default_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl Environment {
    /// Builds a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] naming the first field that is
    /// non-finite or outside its physical range.
    pub fn new(
        temperature: f64,
        wind_speed: f64,
        wind_direction: f64,
        solar_radiation: f64,
        cloud_cover: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Self> {
        let env = Self {
            temperature,
            wind_speed,
            wind_direction,
            solar_radiation,
            cloud_cover,
            timestamp,
        };
        env.validate()?;
        Ok(env)
    }

    /// Checks every field against its physical range.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_closed("environment.temperature", self.temperature, -50.0, 50.0)?;
        check_closed("environment.wind_speed", self.wind_speed, 0.0, 100.0)?;
        if !(self.wind_direction.is_finite() && (0.0..360.0).contains(&self.wind_direction)) {
            return Err(FleetError::validation(
                "environment.wind_direction",
                format!("must be in [0, 360), got {}", self.wind_direction),
            ));
        }
        check_closed(
            "environment.solar_radiation",
            self.solar_radiation,
            0.0,
            1000.0,
        )?;
        check_closed("environment.cloud_cover", self.cloud_cover, 0.0, 9.0)?;
        Ok(())
    }

    /// Returns a copy with the given overrides applied, validated as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] if any overridden value is out of
    /// range; `self` is never modified.
    pub fn apply(&self, update: &EnvironmentUpdate) -> Result<Self> {
        let next = Self {
            temperature: update.temperature.unwrap_or(self.temperature),
            wind_speed: update.wind_speed.unwrap_or(self.wind_speed),
            wind_direction: update.wind_direction.unwrap_or(self.wind_direction),
            solar_radiation: update.solar_radiation.unwrap_or(self.solar_radiation),
            cloud_cover: update.cloud_cover.unwrap_or(self.cloud_cover),
            timestamp: self.timestamp,
        };
        next.validate()?;
        Ok(next)
    }
}

/// Partial override of an [`Environment`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentUpdate {
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub solar_radiation: Option<f64>,
    pub cloud_cover: Option<f64>,
}

fn check_closed(field: &str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(FleetError::validation(
            field,
            format!("must be in [{lo}, {hi}], got {value}"),
        ))
    }
}

// Monthly climatology for a Perth-like coastal site, indexed by month - 1.
const CLOUD_MEAN_OKTA: [f64; 12] = [0.0, 1.0, 3.0, 4.0, 4.0, 5.5, 6.0, 4.5, 3.0, 2.0, 0.0, 0.0];
const TEMP_MIN_C: [f64; 12] = [
    18.0, 18.0, 16.0, 13.0, 10.0, 8.0, 8.0, 9.0, 10.0, 12.0, 15.0, 17.0,
];
const TEMP_MAX_C: [f64; 12] = [
    32.0, 31.0, 29.0, 25.0, 22.0, 19.0, 18.0, 19.0, 21.0, 24.0, 27.0, 30.0,
];
const SOLAR_SEASONAL: [f64; 12] = [
    0.95, 0.90, 0.80, 0.70, 0.60, 0.50, 0.55, 0.65, 0.75, 0.85, 0.90, 0.95,
];
const SUNRISE_HOUR: [f64; 12] = [5.5, 6.0, 6.5, 7.0, 7.2, 7.5, 7.5, 7.0, 6.5, 6.0, 5.5, 5.2];
const SUNSET_HOUR: [f64; 12] = [
    19.5, 19.0, 18.5, 17.8, 17.3, 17.2, 17.3, 17.8, 18.0, 18.5, 19.0, 19.5,
];
const WIND_MEAN_MS: [f64; 12] = [5.5, 5.0, 5.2, 4.8, 4.5, 4.0, 4.2, 4.8, 5.0, 5.3, 5.6, 5.8];

/// Peak clear-sky irradiance (W/m²).
const MAX_RADIATION: f64 = 1000.0;

/// Seeded weather stepper producing plausible snapshots hour by hour.
///
/// Each call to [`advance`](Self::advance) moves the clock forward and
/// resamples cloud cover, wind, temperature, and irradiance from monthly
/// climatology plus Gaussian noise. Identical seeds and start times produce
/// identical sequences.
#[derive(Debug, Clone)]
pub struct WeatherGenerator {
    current: Environment,
    rng: StdRng,
    start: NaiveDateTime,
    seed: u64,
}

impl WeatherGenerator {
    /// Creates a generator positioned at `start` and samples the first snapshot.
    pub fn new(start: NaiveDateTime, seed: u64) -> Self {
        let mut generator = Self {
            current: Environment {
                timestamp: start,
                ..Environment::default()
            },
            rng: StdRng::seed_from_u64(seed),
            start,
            seed,
        };
        generator.resample();
        generator
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Environment {
        self.current
    }

    /// Advances the clock by `hours` and resamples the weather.
    pub fn advance(&mut self, hours: f64) {
        let millis = (hours.max(0.0) * 3_600_000.0).round() as i64;
        self.current.timestamp += Duration::milliseconds(millis);
        self.resample();
    }

    /// Overrides selected fields of the current snapshot until the next advance.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] if an override is out of range; the
    /// current snapshot is kept unchanged in that case.
    pub fn apply(&mut self, update: &EnvironmentUpdate) -> Result<Environment> {
        self.current = self.current.apply(update)?;
        Ok(self.current)
    }

    /// Rewinds to the start time and re-seeds, so the generator replays the
    /// same sequence it produced after [`new`](Self::new). Overrides are dropped.
    pub fn reset(&mut self) {
        *self = Self::new(self.start, self.seed);
    }

    /// Time of the first snapshot.
    pub fn start_time(&self) -> NaiveDateTime {
        self.start
    }

    fn resample(&mut self) {
        let time = self.current.timestamp;
        let month = time.month0() as usize;
        let hour = f64::from(time.hour()) + f64::from(time.minute()) / 60.0;

        let cloud_cover = (CLOUD_MEAN_OKTA[month] + gaussian_noise(&mut self.rng, 0.8)).clamp(0.0, 9.0);

        let diurnal_boost = if (12.0..=18.0).contains(&hour) {
            1.2
        } else {
            0.8
        };
        let mean_speed = WIND_MEAN_MS[month] * diurnal_boost;
        let wind_speed = round_to((mean_speed + gaussian_noise(&mut self.rng, 1.5)).clamp(0.0, 100.0), 1);

        let raw_direction = match time.month() {
            12 | 1 | 2 => 230.0 + gaussian_noise(&mut self.rng, 20.0),
            6..=8 => self.rng.random_range(0.0..360.0),
            _ => 200.0 + gaussian_noise(&mut self.rng, 60.0),
        };
        let wind_direction = raw_direction.rem_euclid(360.0).round() % 360.0;

        let base = (TEMP_MIN_C[month] + TEMP_MAX_C[month]) / 2.0;
        let amplitude = (TEMP_MAX_C[month] - TEMP_MIN_C[month]) / 2.0;
        let diurnal = amplitude * ((hour - 6.0) / 24.0 * 2.0 * PI).sin();
        let temperature = round_to(
            (base + diurnal + gaussian_noise(&mut self.rng, 1.0)).clamp(-50.0, 50.0),
            1,
        );

        let sunrise = SUNRISE_HOUR[month];
        let sunset = SUNSET_HOUR[month];
        let daylight = if (sunrise..=sunset).contains(&hour) {
            (PI * (hour - sunrise) / (sunset - sunrise)).sin()
        } else {
            0.0
        };
        let cloud_factor = 1.0 - cloud_cover / 9.0;
        let solar_radiation = round_to(
            (MAX_RADIATION * SOLAR_SEASONAL[month] * cloud_factor * daylight).clamp(0.0, MAX_RADIATION),
            1,
        );

        self.current = Environment {
            temperature,
            wind_speed,
            wind_direction,
            solar_radiation,
            cloud_cover,
            timestamp: time,
        };
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// Zero-mean Gaussian sample via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(month: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, 15)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn new_rejects_out_of_range_fields() {
        let t = default_start_time();
        assert!(Environment::new(20.0, 5.0, 180.0, 500.0, 2.0, t).is_ok());
        assert!(Environment::new(60.0, 5.0, 180.0, 500.0, 2.0, t).is_err());
        assert!(Environment::new(20.0, -1.0, 180.0, 500.0, 2.0, t).is_err());
        assert!(Environment::new(20.0, 5.0, 360.0, 500.0, 2.0, t).is_err());
        assert!(Environment::new(20.0, 5.0, 180.0, 1200.0, 2.0, t).is_err());
        assert!(Environment::new(20.0, 5.0, 180.0, 500.0, 9.5, t).is_err());
        assert!(Environment::new(f64::NAN, 5.0, 180.0, 500.0, 2.0, t).is_err());
    }

    #[test]
    fn apply_keeps_unset_fields_and_is_atomic() {
        let env = Environment::default();
        let update = EnvironmentUpdate {
            wind_speed: Some(12.0),
            ..EnvironmentUpdate::default()
        };
        let next = env.apply(&update).unwrap();
        assert_eq!(next.wind_speed, 12.0);
        assert_eq!(next.temperature, env.temperature);

        let bad = EnvironmentUpdate {
            wind_speed: Some(8.0),
            cloud_cover: Some(-1.0),
            ..EnvironmentUpdate::default()
        };
        let err = env.apply(&bad).unwrap_err();
        assert!(matches!(err, FleetError::Validation { ref field, .. } if field == "environment.cloud_cover"));
    }

    #[test]
    fn generated_snapshots_are_always_valid() {
        let mut weather = WeatherGenerator::new(at(1, 0), 7);
        for _ in 0..(24 * 60) {
            let env = weather.snapshot();
            assert!(env.validate().is_ok(), "invalid snapshot: {env:?}");
            weather.advance(6.0);
        }
    }

    #[test]
    fn no_sun_at_night() {
        let weather = WeatherGenerator::new(at(1, 2), 1);
        assert_eq!(weather.snapshot().solar_radiation, 0.0);
        let weather = WeatherGenerator::new(at(6, 22), 1);
        assert_eq!(weather.snapshot().solar_radiation, 0.0);
    }

    #[test]
    fn summer_noon_is_sunny() {
        // January has zero mean cloud cover; noon sits near the daylight peak.
        let mut total = 0.0;
        for seed in 0..10 {
            total += WeatherGenerator::new(at(1, 12), seed).snapshot().solar_radiation;
        }
        assert!(total / 10.0 > 600.0);
    }

    #[test]
    fn advance_moves_the_clock() {
        let mut weather = WeatherGenerator::new(at(3, 0), 3);
        weather.advance(1.5);
        assert_eq!(weather.snapshot().timestamp, at(3, 1) + Duration::minutes(30));
    }

    #[test]
    fn deterministic_with_same_seed() {
        let mut a = WeatherGenerator::new(at(4, 0), 42);
        let mut b = WeatherGenerator::new(at(4, 0), 42);
        for _ in 0..48 {
            assert_eq!(a.snapshot(), b.snapshot());
            a.advance(1.0);
            b.advance(1.0);
        }
    }

    #[test]
    fn reset_replays_from_the_start() {
        let mut weather = WeatherGenerator::new(at(5, 0), 11);
        let first = weather.snapshot();
        weather.advance(7.0);
        weather
            .apply(&EnvironmentUpdate {
                wind_speed: Some(30.0),
                ..EnvironmentUpdate::default()
            })
            .unwrap();

        weather.reset();
        assert_eq!(weather.snapshot(), first);
        assert_eq!(weather.start_time(), at(5, 0));
        weather.advance(1.0);
        let mut fresh = WeatherGenerator::new(at(5, 0), 11);
        fresh.advance(1.0);
        assert_eq!(weather.snapshot(), fresh.snapshot());
    }
}
