//! Audio I/O for melodify.
//!
//! Callback-driven devices over CPAL or a software clock, a blocking wrapper,
//! and WAVE file helpers.
//!
//! Feature gates: `cpal` (hardware backend), `wav` (WAVE reader/writer).

pub mod error;
pub use error::{Error, Result};

pub mod backend;
pub use backend::{AudioBackend, ClockBackend, Pacing, StreamFormat};

#[cfg(feature = "cpal")]
pub use backend::CpalBackend;

pub mod buffers;
pub use buffers::{deinterleave, interleave, Channels, ChannelsMut};

pub mod callback;
pub use callback::{Callback, Direction, Layout};

pub mod config;
pub use config::DeviceConfig;

pub(crate) mod render;
pub use render::Renderer;

pub mod device;
pub use device::{Device, DeviceState, LatencyAndBufferSize, StopHandle};

pub mod blocking;
pub use blocking::{BlockingDevice, BlockingStopHandle};

#[cfg(feature = "wav")]
pub mod wave;

#[cfg(feature = "wav")]
pub use wave::{InputWaveFile, OutputWaveFile};
