//! Error types for melody loading.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("MIDI file could not be read: {0}")]
    Unreadable(String),

    #[error("MIDI parse error: {0}")]
    MidiFileParse(String),

    #[error("Track {track} does not exist (file has {tracks} tracks)")]
    TrackOutOfRange { track: usize, tracks: usize },

    #[error("MIDI channel {0} out of range (0-15)")]
    InvalidChannel(u8),

    #[error("No notes on track {track}, channel {channel}")]
    NoAudibleData { track: usize, channel: u8 },

    #[error("Track {track}, channel {channel} has simultaneous notes at {seconds:.3}s; a melody must be monophonic")]
    AmbiguousMelody {
        track: usize,
        channel: u8,
        seconds: f64,
    },

    #[error("Track {other_track}, channel {other_channel} also has notes; the file must hold a single audible track and channel (requested track {track}, channel {channel})")]
    MultipleAudibleTracks {
        track: usize,
        channel: u8,
        other_track: usize,
        other_channel: u8,
    },

    #[error("Invalid melody note: {0}")]
    InvalidNote(String),
}

impl From<midly::Error> for Error {
    fn from(e: midly::Error) -> Self {
        Error::MidiFileParse(e.to_string())
    }
}

impl From<melodify_core::Error> for Error {
    fn from(e: melodify_core::Error) -> Self {
        match e {
            melodify_core::Error::NotFound(path) => Error::NotFound(path),
            other => Error::Unreadable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
