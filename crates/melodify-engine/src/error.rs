//! Error types for the melodifier.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Core(#[from] melodify_core::Error),

    #[error(transparent)]
    Melody(#[from] melodify_midi::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
