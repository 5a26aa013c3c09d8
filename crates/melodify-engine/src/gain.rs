//! Voice gain controls shared between the control thread and `process()`.

use melodify_core::{db_to_linear, linear_to_db, AtomicFlag, AtomicFloat};

/// Lock-free voice gain settings.
///
/// Obtained from [`Melodifyer::gain_controls`](crate::Melodifyer::gain_controls).
/// Values are read once at the start of every `process()` call.
#[derive(Debug)]
pub struct VoiceGainControls {
    automatic: AtomicFlag,
    extra: AtomicFloat,
}

impl VoiceGainControls {
    pub fn new() -> Self {
        Self {
            automatic: AtomicFlag::new(false),
            extra: AtomicFloat::new(1.0),
        }
    }

    /// Match the voice level to the background automatically.
    pub fn set_automatic(&self, enabled: bool) {
        self.automatic.set(enabled);
    }

    pub fn automatic(&self) -> bool {
        self.automatic.get()
    }

    /// Extra linear gain on the corrected voice. Negative values clamp to
    /// zero; NaN and infinities are ignored.
    pub fn set_extra(&self, linear: f32) {
        if linear.is_finite() {
            self.extra.set(linear.max(0.0));
        }
    }

    /// Extra gain in decibels (`10^(dB/20)`).
    pub fn set_extra_db(&self, db: f32) {
        if !db.is_nan() {
            self.set_extra(db_to_linear(db));
        }
    }

    pub fn extra(&self) -> f32 {
        self.extra.get()
    }

    pub fn extra_db(&self) -> f32 {
        linear_to_db(self.extra.get())
    }
}

impl Default for VoiceGainControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let controls = VoiceGainControls::new();
        assert!(!controls.automatic());
        assert_eq!(controls.extra(), 1.0);
        assert_relative_eq!(controls.extra_db(), 0.0);
    }

    #[test]
    fn test_db_round_trip() {
        let controls = VoiceGainControls::new();
        controls.set_extra_db(-6.0);
        assert_relative_eq!(controls.extra(), 0.501_187, epsilon = 1e-5);
        controls.set_extra_db(0.0);
        assert_relative_eq!(controls.extra(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_bad_values() {
        let controls = VoiceGainControls::new();
        controls.set_extra(f32::NAN);
        controls.set_extra(f32::INFINITY);
        assert_eq!(controls.extra(), 1.0);
        controls.set_extra(-2.0);
        assert_eq!(controls.extra(), 0.0);
        controls.set_extra_db(f32::NEG_INFINITY);
        assert_eq!(controls.extra(), 0.0);
    }
}
