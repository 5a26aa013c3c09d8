//! Decibel conversions and parameter smoothing.

/// Floor used when converting silence to decibels.
pub const MIN_DB: f32 = -144.0;

/// Convert decibels to a linear amplitude factor (`10^(dB/20)`).
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels, floored at [`MIN_DB`].
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return MIN_DB;
    }
    (20.0 * linear.log10()).max(MIN_DB)
}

/// One-pole coefficient reaching ~63% of a step after `time_seconds`.
#[inline]
pub fn time_to_coeff(time_seconds: f32, sample_rate: f32) -> f32 {
    if time_seconds <= 0.0 || sample_rate <= 0.0 {
        return 0.0;
    }
    (-1.0 / (time_seconds * sample_rate)).exp()
}

/// One-pole smoother for control values (gains, ratios).
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    coeff: f32,
    current: f32,
    initial: f32,
}

impl Smoother {
    pub fn new(initial: f32, time_seconds: f32, sample_rate: f32) -> Self {
        Self {
            coeff: time_to_coeff(time_seconds, sample_rate),
            current: initial,
            initial,
        }
    }

    /// Advance one step toward `target`.
    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        self.current = target + self.coeff * (self.current - target);
        self.current
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Return to the value the smoother was built with.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
