//! Centralized error type for the melodify umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] melodify_core::Error),

    #[error("Melody: {0}")]
    Melody(#[from] melodify_midi::Error),

    #[error("Audio I/O: {0}")]
    Io(#[from] melodify_io::Error),

    #[error(transparent)]
    Engine(#[from] melodify_engine::Error),

    #[error(transparent)]
    Std(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
