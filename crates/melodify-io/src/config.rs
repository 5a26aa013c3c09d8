//! Device configuration.

use crate::{Error, Result};
use melodify_core::{MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use serde::{Deserialize, Serialize};

/// Requested device format. A zero field lets the backend choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub channels: u16,
    pub sample_rate: u32,
    /// Preferred frames per callback.
    pub latency_hint: u32,
}

impl DeviceConfig {
    pub fn new(channels: u16, sample_rate: u32, latency_hint: u32) -> Self {
        Self {
            channels,
            sample_rate,
            latency_hint,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate != 0 && !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate)
        {
            return Err(Error::InvalidFormat(format!(
                "sample_rate {} out of range ({}-{} Hz)",
                self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            )));
        }
        if self.channels > MAX_CHANNELS {
            return Err(Error::InvalidFormat(format!(
                "channels {} out of range (1-{})",
                self.channels, MAX_CHANNELS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_lets_backend_choose() {
        let config = DeviceConfig::default();
        assert_eq!(config.channels, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(DeviceConfig::new(2, 44100, 256).validate().is_ok());
        assert!(DeviceConfig::new(2, 1000, 256).validate().is_err());
        assert!(DeviceConfig::new(MAX_CHANNELS + 1, 48000, 0).validate().is_err());
    }
}
