//! Software clock backend.
//!
//! Drives the callback from a plain thread instead of audio hardware: paced
//! in real time (a null device) or as fast as possible (offline rendering).
//! An optional source fills each input block and an optional sink receives
//! each output block.

use super::{buffer_size_for_hint, AudioBackend, StreamFormat};
use crate::callback::Direction;
use crate::config::DeviceConfig;
use crate::render::Renderer;
use crate::{Error, Result};
use melodify_core::{try_zeroed, validate_format, AtomicFlag};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// How the clock thread advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// One block per buffer period.
    #[default]
    Realtime,
    /// Blocks back to back.
    Freerun,
}

pub type SourceFn = Box<dyn FnMut(&mut [f32]) + Send>;
pub type SinkFn = Box<dyn FnMut(&[f32]) + Send>;

struct ClockIo {
    source: Option<SourceFn>,
    sink: Option<SinkFn>,
}

pub struct ClockBackend {
    default_format: StreamFormat,
    pacing: Pacing,
    has_input: bool,
    io: Option<ClockIo>,
    stop_flag: Arc<AtomicFlag>,
    thread: Option<JoinHandle<ClockIo>>,
}

impl ClockBackend {
    /// Real-time clock with a stereo 48 kHz default format.
    pub fn new() -> Self {
        Self {
            default_format: StreamFormat {
                channels: 2,
                sample_rate: 48_000,
                buffer_size: super::DEFAULT_BUFFER_SIZE,
            },
            pacing: Pacing::Realtime,
            has_input: true,
            io: Some(ClockIo {
                source: None,
                sink: None,
            }),
            stop_flag: Arc::new(AtomicFlag::new(false)),
            thread: None,
        }
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Format used for fields the caller leaves at zero.
    pub fn default_format(mut self, channels: u16, sample_rate: u32, buffer_size: u32) -> Self {
        self.default_format = StreamFormat {
            channels,
            sample_rate,
            buffer_size,
        };
        self
    }

    /// Behave like hardware with no capture device.
    pub fn without_input(mut self) -> Self {
        self.has_input = false;
        self
    }

    /// Fill each input block (interleaved). Silence when unset.
    pub fn with_source(mut self, source: impl FnMut(&mut [f32]) + Send + 'static) -> Self {
        if let Some(io) = self.io.as_mut() {
            io.source = Some(Box::new(source));
        }
        self
    }

    /// Receive each rendered output block (interleaved).
    pub fn with_sink(mut self, sink: impl FnMut(&[f32]) + Send + 'static) -> Self {
        if let Some(io) = self.io.as_mut() {
            io.sink = Some(Box::new(sink));
        }
        self
    }
}

impl Default for ClockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for ClockBackend {
    fn name(&self) -> &str {
        match self.pacing {
            Pacing::Realtime => "clock",
            Pacing::Freerun => "clock (freerun)",
        }
    }

    fn negotiate(&mut self, request: &DeviceConfig) -> Result<StreamFormat> {
        let channels = match request.channels {
            0 => self.default_format.channels,
            n => n,
        };
        let sample_rate = match request.sample_rate {
            0 => self.default_format.sample_rate,
            n => n,
        };
        validate_format(sample_rate, channels).map_err(|e| Error::InvalidFormat(e.to_string()))?;

        let hint = match request.latency_hint {
            0 => self.default_format.buffer_size,
            n => n,
        };

        Ok(StreamFormat {
            channels,
            sample_rate,
            buffer_size: buffer_size_for_hint(hint, 0, u32::MAX),
        })
    }

    fn supports(&self, _format: &StreamFormat, direction: Direction) -> Result<()> {
        if direction.has_input() && !self.has_input {
            return Err(Error::DeviceUnavailable("no input device".into()));
        }
        Ok(())
    }

    fn start(
        &mut self,
        format: &StreamFormat,
        direction: Direction,
        renderer: Renderer,
    ) -> Result<()> {
        let mut io = self
            .io
            .take()
            .ok_or(Error::InvalidState("clock thread already running"))?;

        let len = format.channels as usize * format.buffer_size as usize;
        let mut input: Vec<f32> = try_zeroed(len)?;
        let mut output: Vec<f32> = try_zeroed(len)?;
        let period =
            Duration::from_secs_f64(format.buffer_size as f64 / format.sample_rate as f64);
        let pacing = self.pacing;

        self.stop_flag.set(false);
        let stop_flag = Arc::clone(&self.stop_flag);

        let spawned = std::thread::Builder::new()
            .name("melodify-clock".into())
            .spawn(move || {
                let mut next = Instant::now();
                while !stop_flag.get() {
                    if direction.has_input() {
                        match io.source.as_mut() {
                            Some(source) => source(&mut input),
                            None => input.fill(0.0),
                        }
                    }

                    renderer.render(
                        direction.has_input().then_some(&input[..]),
                        direction.has_output().then_some(&mut output[..]),
                    );

                    if direction.has_output() {
                        if let Some(sink) = io.sink.as_mut() {
                            sink(&output);
                        }
                    }

                    match pacing {
                        Pacing::Realtime => {
                            next += period;
                            let now = Instant::now();
                            if next > now {
                                std::thread::sleep(next - now);
                            } else {
                                next = now;
                            }
                        }
                        Pacing::Freerun => std::thread::yield_now(),
                    }
                }
                io
            });

        match spawned {
            Ok(handle) => {
                debug!(
                    "Clock backend started: {} ch, {} Hz, {} frames",
                    format.channels, format.sample_rate, format.buffer_size
                );
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.io = Some(ClockIo {
                    source: None,
                    sink: None,
                });
                Err(Error::Io(e))
            }
        }
    }

    fn stop(&mut self) {
        self.stop_flag.set(true);
        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(io) => self.io = Some(io),
                Err(_) => {
                    self.io = Some(ClockIo {
                        source: None,
                        sink: None,
                    })
                }
            }
            debug!("Clock backend stopped");
        }
    }
}

impl Drop for ClockBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
