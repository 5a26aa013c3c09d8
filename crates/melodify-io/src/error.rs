//! Error types for device and file I/O.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The call is not allowed in the device's current state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Audio device not available: {0}")]
    DeviceUnavailable(String),

    #[error("Audio device access denied: {0}")]
    PermissionDenied(String),

    #[error("Audio backend error: {0}")]
    Backend(String),

    #[cfg(feature = "cpal")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal")]
    #[error("Failed to query device configurations")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "cpal")]
    #[error("Audio device has no default configuration")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal")]
    #[error("Failed to enumerate devices")]
    Devices(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal")]
    #[error("Failed to get device name")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[cfg(feature = "wav")]
    #[error("WAVE file error: {0}")]
    Wave(#[from] hound::Error),

    #[error(transparent)]
    Location(#[from] melodify_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
