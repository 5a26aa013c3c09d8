//! # Melodify Core
//!
//! Shared building blocks for the melodify crates.
//!
//! ## Primary API
//!
//! - [`FileSystem`] / [`SpecialLocation`] - resolve symbolic roots to files
//! - [`AtomicFloat`], [`AtomicFlag`], [`AtomicCounter`] - controls shared with the render thread
//! - [`DelayLine`] - interleaved fixed delay used for latency alignment
//! - [`db_to_linear`], [`linear_to_db`], [`Smoother`] - gain helpers
//! - [`try_zeroed`] - fallible buffer allocation for setup paths

pub mod alloc;
pub mod delay;
pub mod error;
pub mod gain;
pub mod location;
pub mod lockfree;

pub use alloc::try_zeroed;
pub use delay::DelayLine;
pub use error::{Error, Result};
pub use gain::{db_to_linear, linear_to_db, time_to_coeff, Smoother, MIN_DB};
pub use location::{AssetBundle, FileSystem, FileSystemBuilder, ReadSeek, SpecialLocation};
pub use lockfree::{AtomicCounter, AtomicFlag, AtomicFloat};

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Highest channel count any component accepts.
pub const MAX_CHANNELS: u16 = 32;

/// Check a (sample rate, channels) pair against the supported range.
pub fn validate_format(sample_rate: u32, channels: u16) -> Result<()> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(Error::InvalidConfig(format!(
            "sample_rate {} out of range ({}-{} Hz)",
            sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
        )));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(Error::InvalidConfig(format!(
            "channels {} out of range (1-{})",
            channels, MAX_CHANNELS
        )));
    }
    Ok(())
}
