//! # Melodify - Karaoke Voice Correction
//!
//! Pitch-corrects a live or recorded voice toward a melody read from a MIDI
//! file and mixes it with the background track.
//!
//! ## Architecture
//!
//! Melodify is an umbrella crate over:
//! - **melodify-core** - filesystem locations, lock-free controls, delay line, gain helpers
//! - **melodify-analysis** - YIN pitch tracking, level following
//! - **melodify-midi** - Standard MIDI File to melody timeline
//! - **melodify-io** - callback audio devices, blocking wrapper, WAVE files
//! - **melodify-engine** - phase-vocoder shifter and the [`Melodifyer`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use melodify::prelude::*;
//!
//! let fs = FileSystem::platform("karaoke");
//! let mut melodifyer = Melodifyer::new();
//! melodifyer.setup(48000, 2)?;
//! melodifyer.set_melody_midi_file(&fs, SpecialLocation::Documents, "song.mid", 0, 0)?;
//!
//! let mut device = Device::new();
//! device.setup(2, 48000, 256)?;
//! device.set_callback(Callback::interleaved_input_output(move |input, output, _frames| {
//!     melodifyer.process(input, None, output);
//! }))?;
//! device.start()?;
//! # Ok::<(), melodify::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - `cpal` + `wav`
//! - `cpal` - hardware devices through CPAL
//! - `wav` - [`InputWaveFile`] / [`OutputWaveFile`]

pub use melodify_analysis as analysis;
pub use melodify_core as core;
pub use melodify_engine as engine;
pub use melodify_io as io;
pub use melodify_midi as midi;

// Core types
pub use melodify_core::{
    db_to_linear, linear_to_db, AssetBundle, AtomicFlag, AtomicFloat, DelayLine, FileSystem,
    FileSystemBuilder, SpecialLocation,
};

// Engine
pub use melodify_engine::{
    Melodifyer, MelodifyerOptions, PitchShifter, VoiceGainControls, LATENCY_IN_SAMPLES,
};

// Melody
pub use melodify_midi::{MelodyEndPolicy, MelodyNote, MelodyTimeline};

// Analysis
pub use melodify_analysis::{LevelFollower, PitchDetector, PitchResult};

// Audio I/O
pub use melodify_io::{
    AudioBackend, BlockingDevice, BlockingStopHandle, Callback, Channels, ChannelsMut,
    ClockBackend, Device, DeviceConfig, DeviceState, Direction, LatencyAndBufferSize, Layout,
    Pacing, StopHandle, StreamFormat,
};

#[cfg(feature = "cpal")]
pub use melodify_io::CpalBackend;

#[cfg(feature = "wav")]
pub use melodify_io::{InputWaveFile, OutputWaveFile};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        BlockingDevice, Callback, Device, DeviceConfig, FileSystem, MelodyEndPolicy,
        MelodyTimeline, Melodifyer, MelodifyerOptions, SpecialLocation,
    };

    #[cfg(feature = "wav")]
    pub use crate::{InputWaveFile, OutputWaveFile};

    pub use crate::{Error, Result};
}
