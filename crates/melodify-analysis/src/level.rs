//! RMS level follower.

use melodify_core::time_to_coeff;

/// One-pole mean-square follower reporting RMS amplitude.
#[derive(Debug, Clone, Copy)]
pub struct LevelFollower {
    coeff: f32,
    mean_square: f32,
}

impl LevelFollower {
    /// `time_seconds` is the averaging time constant.
    pub fn new(time_seconds: f32, sample_rate: f32) -> Self {
        Self {
            coeff: time_to_coeff(time_seconds, sample_rate),
            mean_square: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) {
        self.mean_square = sample * sample + self.coeff * (self.mean_square - sample * sample);
    }

    pub fn process_block(&mut self, samples: &[f32]) {
        for &s in samples {
            self.process(s);
        }
    }

    /// Current RMS amplitude.
    #[inline]
    pub fn rms(&self) -> f32 {
        self.mean_square.max(0.0).sqrt()
    }

    pub fn reset(&mut self) {
        self.mean_square = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sine_rms() {
        let sr = 48000.0;
        let mut follower = LevelFollower::new(0.05, sr);
        for i in 0..48000 {
            let t = i as f32 / sr;
            follower.process((2.0 * std::f32::consts::PI * 440.0 * t).sin());
        }
        assert_relative_eq!(follower.rms(), std::f32::consts::FRAC_1_SQRT_2, epsilon = 0.02);
    }

    #[test]
    fn test_decays_to_silence() {
        let mut follower = LevelFollower::new(0.01, 48000.0);
        follower.process_block(&[1.0; 4800]);
        assert!(follower.rms() > 0.9);
        follower.process_block(&[0.0; 48000]);
        assert!(follower.rms() < 1e-3);
        follower.reset();
        assert_eq!(follower.rms(), 0.0);
    }
}
