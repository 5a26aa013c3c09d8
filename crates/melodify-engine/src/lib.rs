//! # Melodify Engine
//!
//! Corrects a singing voice toward a melody loaded from a MIDI file and mixes
//! it with a background track delayed to match.
//!
//! - [`Melodifyer`] - setup, melody binding, interleaved `process()`
//! - [`VoiceGainControls`] - lock-free extra/automatic voice gain
//! - [`PitchShifter`] - per-channel phase vocoder with formant preservation
//! - [`MelodifyerOptions`] - end-of-melody policy and pitch tracking range

pub mod error;
pub use error::{Error, Result};

pub mod gain;
pub use gain::VoiceGainControls;

pub mod melodifyer;
pub use melodifyer::{Melodifyer, LATENCY_IN_SAMPLES};

pub mod options;
pub use options::MelodifyerOptions;

pub mod shifter;
pub use shifter::{PitchShifter, FRAME_SIZE, HOP_SIZE};

pub use melodify_midi::{MelodyEndPolicy, MelodyNote, MelodyTimeline};
