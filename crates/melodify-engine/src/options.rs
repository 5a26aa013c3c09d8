//! Melodifier tuning options.

use crate::{Error, Result};
use melodify_midi::MelodyEndPolicy;
use serde::{Deserialize, Serialize};

/// Tuning for [`Melodifyer`](crate::Melodifyer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodifyerOptions {
    /// Target behaviour after the last melody note.
    pub end_policy: MelodyEndPolicy,
    /// Keep the voice's spectral envelope in place while shifting.
    pub preserve_formants: bool,
    /// Lowest tracked voice pitch in Hz.
    pub min_frequency: f32,
    /// Highest tracked voice pitch in Hz.
    pub max_frequency: f32,
    /// Pitch estimates below this confidence (0-1) count as unvoiced.
    pub voicing_threshold: f32,
}

impl Default for MelodifyerOptions {
    fn default() -> Self {
        Self {
            end_policy: MelodyEndPolicy::Hold,
            preserve_formants: true,
            min_frequency: 80.0,
            max_frequency: 1000.0,
            voicing_threshold: 0.6,
        }
    }
}

impl MelodifyerOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_frequency.is_finite() && self.min_frequency >= 20.0) {
            return Err(Error::InvalidOptions(format!(
                "min_frequency {} below 20 Hz",
                self.min_frequency
            )));
        }
        if !(self.max_frequency.is_finite() && self.max_frequency > self.min_frequency) {
            return Err(Error::InvalidOptions(format!(
                "max_frequency {} must exceed min_frequency {}",
                self.max_frequency, self.min_frequency
            )));
        }
        if !(0.0..=1.0).contains(&self.voicing_threshold) {
            return Err(Error::InvalidOptions(format!(
                "voicing_threshold {} out of range (0-1)",
                self.voicing_threshold
            )));
        }
        Ok(())
    }

    /// Check the tracking range against a sample rate.
    pub(crate) fn validate_for(&self, sample_rate: u32) -> Result<()> {
        self.validate()?;
        if self.max_frequency * 4.0 > sample_rate as f32 {
            return Err(Error::InvalidOptions(format!(
                "max_frequency {} too high for {} Hz",
                self.max_frequency, sample_rate
            )));
        }
        Ok(())
    }

    pub(crate) fn same_tracking_range(&self, other: &Self) -> bool {
        self.min_frequency == other.min_frequency && self.max_frequency == other.max_frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = MelodifyerOptions::default();
        assert!(options.preserve_formants);
        assert_eq!(options.end_policy, MelodyEndPolicy::Hold);
        assert!(options.validate().is_ok());
        assert!(options.validate_for(8000).is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let inverted = MelodifyerOptions {
            min_frequency: 500.0,
            max_frequency: 400.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let threshold = MelodifyerOptions {
            voicing_threshold: 1.5,
            ..Default::default()
        };
        assert!(threshold.validate().is_err());

        let high = MelodifyerOptions {
            max_frequency: 3000.0,
            ..Default::default()
        };
        assert!(high.validate().is_ok());
        assert!(high.validate_for(8000).is_err());
    }
}
