use chrono::{Duration, NaiveDateTime};

/// A simulation clock that tracks steps and wall-clock time over a fixed run.
///
/// The `SimClock` hands out `(step, timestamp)` pairs, starting at
/// `start` and moving forward by `dt_hours` per tick.
///
/// # Examples
///
/// ```
/// use microgrid_sim::environment::default_start_time;
/// use microgrid_sim::sim::clock::SimClock;
///
/// let mut clock = SimClock::new(default_start_time(), 1.0, 3);
/// let mut steps = Vec::new();
///
/// clock.run(|step, _| steps.push(step));
/// assert_eq!(steps, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    start: NaiveDateTime,
    step_length: Duration,
    /// Current step of the simulation
    current: usize,
    /// Total steps to run in the simulation
    total: usize,
}

impl SimClock {
    /// Creates a new clock.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of step 0
    /// * `dt_hours` - Step length in hours (rounded to the millisecond)
    /// * `total` - The total number of steps the clock will run
    pub fn new(start: NaiveDateTime, dt_hours: f64, total: usize) -> Self {
        let millis = (dt_hours.max(0.0) * 3_600_000.0).round() as i64;
        Self {
            start,
            step_length: Duration::milliseconds(millis),
            current: 0,
            total,
        }
    }

    /// Timestamp of an arbitrary step index, saturating at
    /// [`NaiveDateTime::MAX`] when the offset does not fit.
    pub fn time_at(&self, step: usize) -> NaiveDateTime {
        i32::try_from(step)
            .ok()
            .and_then(|n| self.step_length.checked_mul(n))
            .and_then(|offset| self.start.checked_add_signed(offset))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Timestamp of the next step to be handed out.
    pub fn now(&self) -> NaiveDateTime {
        self.time_at(self.current)
    }

    /// Index of the next step to be handed out.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.total
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some((step, time))` - The step number and its timestamp before advancing
    /// * `None` - If the clock has reached its total steps
    pub fn tick(&mut self) -> Option<(usize, NaiveDateTime)> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some((step, self.time_at(step)))
        } else {
            None
        }
    }

    /// Runs a function for each remaining step in the clock.
    pub fn run(&mut self, mut f: impl FnMut(usize, NaiveDateTime)) {
        while let Some((step, time)) = self.tick() {
            f(step, time);
        }
    }

    /// Rewinds to step 0.
    pub fn reset(&mut self) {
        self.current = 0;
    }
}
