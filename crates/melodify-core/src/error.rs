//! Error types for melodify-core.

use crate::location::SpecialLocation;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for melodify-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Out of memory while allocating {0} samples")]
    OutOfMemory(usize),

    #[error("Location {0:?} is not available on this platform")]
    LocationUnavailable(SpecialLocation),

    #[error("Location {0:?} is read-only")]
    ReadOnlyLocation(SpecialLocation),

    #[error("Location {0:?} is backed by an asset bundle and has no filesystem path")]
    NotAPath(SpecialLocation),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
