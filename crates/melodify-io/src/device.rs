//! Callback-driven audio device.
//!
//! ```no_run
//! use melodify_io::{Callback, Device};
//!
//! let mut device = Device::new();
//! device.setup(2, 48000, 256)?;
//! device.set_callback(Callback::interleaved_output(|out, _frames| out.fill(0.0)))?;
//! device.start()?;
//! // ...
//! device.stop();
//! # Ok::<(), melodify_io::Error>(())
//! ```

use crate::backend::{AudioBackend, ClockBackend, StreamFormat};
use crate::callback::{Callback, Direction};
use crate::config::DeviceConfig;
use crate::render::{RenderShared, Renderer};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Latency report for the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyAndBufferSize {
    /// Approximate input-to-output latency in frames.
    pub latency: u32,
    /// No callback invocation receives more frames than this.
    pub max_buffer_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Stopped,
    Started,
}

/// Stops callbacks from any thread, including from inside the callback.
///
/// Unlike [`Device::stop`] it does not wait for an in-flight invocation, and
/// the device still reports [`DeviceState::Started`] until `stop` is called.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<RenderShared>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.shared.request_halt();
    }

    pub fn is_stopped(&self) -> bool {
        !self.shared.is_running()
    }
}

/// Audio device state machine.
///
/// `setup` → `set_callback` → `start` / `stop` (repeatable). `setup` and
/// `set_callback` are only valid while stopped. Dropping a started device
/// stops it.
pub struct Device {
    backend: Box<dyn AudioBackend>,
    shared: Arc<RenderShared>,
    format: Option<StreamFormat>,
    direction: Option<Direction>,
    state: DeviceState,
}

impl Device {
    /// Device on the default hardware backend.
    #[cfg(feature = "cpal")]
    pub fn new() -> Self {
        Self::with_backend(crate::backend::CpalBackend::new())
    }

    /// Device on a real-time software clock (no hardware).
    #[cfg(not(feature = "cpal"))]
    pub fn new() -> Self {
        Self::with_backend(ClockBackend::new())
    }

    pub fn with_backend(backend: impl AudioBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            shared: RenderShared::new(),
            format: None,
            direction: None,
            state: DeviceState::Stopped,
        }
    }

    /// Device on a free-running software clock, useful for tests and
    /// offline rendering.
    pub fn offline() -> Self {
        Self::with_backend(ClockBackend::new().pacing(crate::backend::Pacing::Freerun))
    }

    /// Configure the device. Zero for any argument lets the backend choose.
    ///
    /// On failure the previous configuration is kept.
    pub fn setup(&mut self, channels: u16, sample_rate: u32, latency_hint: u32) -> Result<()> {
        self.setup_with(&DeviceConfig::new(channels, sample_rate, latency_hint))
    }

    pub fn setup_with(&mut self, config: &DeviceConfig) -> Result<()> {
        if self.state == DeviceState::Started {
            return Err(Error::InvalidState("setup requires a stopped device"));
        }
        config.validate()?;

        let format = self.backend.negotiate(config)?;
        if let Some(direction) = self.direction {
            self.backend.supports(&format, direction)?;
        }

        info!(
            "Device configured on {}: {} ch, {} Hz, {} frames",
            self.backend.name(),
            format.channels,
            format.sample_rate,
            format.buffer_size
        );
        self.format = Some(format);
        Ok(())
    }

    /// Register the render callback, replacing any previous one.
    pub fn set_callback(&mut self, callback: Callback) -> Result<()> {
        if self.state == DeviceState::Started {
            return Err(Error::InvalidState("set_callback requires a stopped device"));
        }
        let format = self
            .format
            .ok_or(Error::InvalidState("set_callback requires a successful setup"))?;

        let direction = callback.direction();
        self.backend.supports(&format, direction)?;

        debug!("Callback registered: {:?}", callback);
        self.shared.set_callback(callback);
        self.direction = Some(direction);
        Ok(())
    }

    /// Begin invoking the callback. Returns without waiting for the first
    /// invocation.
    pub fn start(&mut self) -> Result<()> {
        if self.state == DeviceState::Started {
            return Err(Error::InvalidState("device already started"));
        }
        let (format, direction) = match (self.format, self.direction) {
            (Some(format), Some(direction)) if self.shared.has_callback() => (format, direction),
            _ => return Err(Error::InvalidState("start requires a registered callback")),
        };

        let channels = format.channels as usize;
        let max_frames = format.buffer_size as usize;
        self.shared.arm(channels, max_frames)?;

        let renderer = Renderer::new(Arc::clone(&self.shared), channels, max_frames);
        if let Err(e) = self.backend.start(&format, direction, renderer) {
            self.shared.halt();
            return Err(e);
        }

        self.state = DeviceState::Started;
        info!("Device started");
        Ok(())
    }

    /// Stop invoking the callback. Idempotent.
    ///
    /// When this returns, any in-flight invocation has completed and no new
    /// one will begin.
    pub fn stop(&mut self) {
        if self.state == DeviceState::Stopped {
            return;
        }
        self.shared.halt();
        self.backend.stop();
        self.state = DeviceState::Stopped;
        info!(
            "Device stopped after {} callbacks",
            self.shared.invocations()
        );
    }

    /// Latency and maximum block size for the current configuration.
    pub fn latency(&self) -> Result<LatencyAndBufferSize> {
        match (self.format, self.direction) {
            (Some(format), Some(direction)) => Ok(LatencyAndBufferSize {
                latency: self.backend.latency(&format, direction),
                max_buffer_size: format.buffer_size,
            }),
            _ => Err(Error::InvalidState("latency requires a registered callback")),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == DeviceState::Started
    }

    /// Negotiated format, once `setup` has succeeded.
    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Callback invocations since the last `start`.
    pub fn callback_count(&self) -> u64 {
        self.shared.invocations()
    }

    /// Stream faults reported by the backend. Faults never stop the device.
    pub fn stream_error_count(&self) -> u64 {
        self.shared.stream_errors()
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.stop();
    }
}
