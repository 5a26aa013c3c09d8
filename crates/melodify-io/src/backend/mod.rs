//! Platform backends behind [`Device`](crate::Device).

mod clock;
#[cfg(feature = "cpal")]
mod cpal_backend;

pub use clock::{ClockBackend, Pacing};
#[cfg(feature = "cpal")]
pub use cpal_backend::CpalBackend;

use crate::callback::Direction;
use crate::config::DeviceConfig;
use crate::render::Renderer;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Buffer size chosen when the caller passes a latency hint of zero.
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Largest buffer size any backend will negotiate.
pub const MAX_BUFFER_SIZE: u32 = 8192;

/// Smallest buffer size any backend will negotiate.
pub const MIN_BUFFER_SIZE: u32 = 16;

/// A negotiated stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub channels: u16,
    pub sample_rate: u32,
    /// Maximum frames per callback invocation.
    pub buffer_size: u32,
}

/// Platform glue driven by the device state machine.
///
/// `negotiate` is only called while stopped. `start` hands the backend a
/// [`Renderer`] to call from its audio thread; after `stop` returns the
/// backend must no longer call it.
pub trait AudioBackend: Send {
    fn name(&self) -> &str;

    /// Resolve a requested configuration (zeros mean "backend default").
    fn negotiate(&mut self, request: &DeviceConfig) -> Result<StreamFormat>;

    /// Check that the streams `direction` needs exist for `format`.
    fn supports(&self, _format: &StreamFormat, _direction: Direction) -> Result<()> {
        Ok(())
    }

    /// Approximate end-to-end latency in frames.
    fn latency(&self, format: &StreamFormat, direction: Direction) -> u32 {
        match direction {
            Direction::Duplex => format.buffer_size * 2,
            _ => format.buffer_size,
        }
    }

    fn start(&mut self, format: &StreamFormat, direction: Direction, renderer: Renderer)
        -> Result<()>;

    fn stop(&mut self);
}

/// Clamp a latency hint to the supported buffer range.
pub(crate) fn buffer_size_for_hint(hint: u32, min: u32, max: u32) -> u32 {
    let wanted = if hint == 0 { DEFAULT_BUFFER_SIZE } else { hint };
    let lo = min.max(MIN_BUFFER_SIZE);
    let hi = max.min(MAX_BUFFER_SIZE).max(lo);
    wanted.clamp(lo, hi)
}
