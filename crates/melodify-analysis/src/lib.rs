//! # Melodify Analysis
//!
//! Signal analysis used by the melodifier: YIN pitch tracking and RMS level
//! following. Both run allocation-free once constructed.

pub mod level;
pub mod pitch;

pub use level::LevelFollower;
pub use pitch::{freq_to_midi, median_filter, midi_to_freq, PitchDetector, PitchResult};
