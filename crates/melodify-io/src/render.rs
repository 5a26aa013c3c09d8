//! Render-thread side of a device.
//!
//! The callback and its scratch buffers live behind a mutex shared with the
//! control thread. The render thread only ever calls `try_lock`, and checks
//! the running flag while holding the lock. `halt` clears the flag and then
//! takes the lock once, so when it returns any in-flight invocation has
//! finished and no later one can start.

use crate::buffers::{deinterleave, interleave, Channels, ChannelsMut};
use crate::callback::Callback;
use melodify_core::{try_zeroed, AtomicCounter, AtomicFlag};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub(crate) struct RenderShared {
    running: AtomicFlag,
    state: Mutex<RenderState>,
    invocations: AtomicCounter,
    stream_errors: AtomicCounter,
}

struct RenderState {
    callback: Option<Callback>,
    channels: usize,
    max_frames: usize,
    input_planar: Vec<f32>,
    output_planar: Vec<f32>,
    silence: Vec<f32>,
}

impl RenderShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicFlag::new(false),
            state: Mutex::new(RenderState {
                callback: None,
                channels: 0,
                max_frames: 0,
                input_planar: Vec::new(),
                output_planar: Vec::new(),
                silence: Vec::new(),
            }),
            invocations: AtomicCounter::new(),
            stream_errors: AtomicCounter::new(),
        })
    }

    /// Install a callback. Only called while stopped.
    pub(crate) fn set_callback(&self, callback: Callback) {
        self.state.lock().callback = Some(callback);
    }

    pub(crate) fn has_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    /// Size scratch space for a stream and open the gate.
    pub(crate) fn arm(&self, channels: usize, max_frames: usize) -> melodify_core::Result<()> {
        let mut state = self.state.lock();
        let len = channels * max_frames;
        if state.input_planar.len() != len {
            state.input_planar = try_zeroed(len)?;
            state.output_planar = try_zeroed(len)?;
            state.silence = try_zeroed(len)?;
        }
        state.channels = channels;
        state.max_frames = max_frames;
        self.invocations.reset();
        self.running.set(true);
        Ok(())
    }

    /// Close the gate and wait for any in-flight invocation.
    pub(crate) fn halt(&self) {
        self.running.set(false);
        drop(self.state.lock());
    }

    /// Close the gate without waiting. Safe from inside the callback.
    pub(crate) fn request_halt(&self) {
        self.running.set(false);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.get()
    }

    pub(crate) fn invocations(&self) -> u64 {
        self.invocations.get()
    }

    pub(crate) fn stream_errors(&self) -> u64 {
        self.stream_errors.get()
    }
}

/// Handle a backend uses to drive the registered callback.
///
/// Cheap to clone; every clone drives the same callback.
#[derive(Clone)]
pub struct Renderer {
    shared: Arc<RenderShared>,
    channels: usize,
    max_frames: usize,
}

impl Renderer {
    pub(crate) fn new(shared: Arc<RenderShared>, channels: usize, max_frames: usize) -> Self {
        Self {
            shared,
            channels,
            max_frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Largest block handed to the callback in one invocation.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Record a stream fault reported by the platform.
    pub fn report_error(&self) {
        self.shared.stream_errors.increment();
    }

    /// Run the callback over interleaved blocks.
    ///
    /// Pass `None` for a stream the callback does not use. When both are
    /// given they must hold the same number of frames. Blocks larger than
    /// [`max_frames`](Self::max_frames) are split. Output is silenced if the
    /// device is stopping or the callback panics.
    pub fn render(&self, input: Option<&[f32]>, mut output: Option<&mut [f32]>) {
        let Some(mut state) = self.shared.state.try_lock() else {
            if let Some(out) = output {
                out.fill(0.0);
            }
            return;
        };
        if !self.shared.running.get() || state.channels == 0 {
            if let Some(out) = output {
                out.fill(0.0);
            }
            return;
        }

        let channels = state.channels;
        let total = output
            .as_deref()
            .map(|o| o.len())
            .or(input.map(|i| i.len()))
            .unwrap_or(0);
        let chunk = state.max_frames * channels;

        let mut offset = 0;
        while offset < total {
            let len = chunk.min(total - offset);
            let input_chunk = input.map(|i| &i[offset..offset + len]);
            let output_chunk = output.as_deref_mut().map(|o| &mut o[offset..offset + len]);

            let result = catch_unwind(AssertUnwindSafe(|| {
                state.invoke(input_chunk, output_chunk, len / channels)
            }));
            if result.is_err() {
                if let Some(out) = output.as_deref_mut() {
                    out[offset..].fill(0.0);
                }
                self.shared.request_halt();
                return;
            }

            self.shared.invocations.increment();
            offset += len;
            if !self.shared.running.get() {
                // Stop requested from inside the callback.
                if let Some(out) = output.as_deref_mut() {
                    out[offset..].fill(0.0);
                }
                return;
            }
        }
    }
}

impl RenderState {
    fn invoke(&mut self, input: Option<&[f32]>, output: Option<&mut [f32]>, frames: usize) {
        let len = frames * self.channels;
        let RenderState {
            callback,
            channels,
            input_planar,
            output_planar,
            silence,
            ..
        } = self;
        let channels = *channels;
        let input = input.unwrap_or(&silence[..len]);

        match callback.as_mut() {
            None => {
                if let Some(out) = output {
                    out.fill(0.0);
                }
            }
            Some(Callback::Input(f)) => {
                deinterleave(input, channels, &mut input_planar[..len]);
                f(Channels::new(&input_planar[..len], frames));
            }
            Some(Callback::Output(f)) => {
                let planar = &mut output_planar[..len];
                planar.fill(0.0);
                f(ChannelsMut::new(planar, frames));
                if let Some(out) = output {
                    interleave(planar, channels, out);
                }
            }
            Some(Callback::InputOutput(f)) => {
                deinterleave(input, channels, &mut input_planar[..len]);
                let planar = &mut output_planar[..len];
                planar.fill(0.0);
                f(
                    Channels::new(&input_planar[..len], frames),
                    ChannelsMut::new(planar, frames),
                );
                if let Some(out) = output {
                    interleave(planar, channels, out);
                }
            }
            Some(Callback::InterleavedInput(f)) => f(input, frames),
            Some(Callback::InterleavedOutput(f)) => {
                if let Some(out) = output {
                    out.fill(0.0);
                    f(out, frames);
                }
            }
            Some(Callback::InterleavedInputOutput(f)) => {
                if let Some(out) = output {
                    out.fill(0.0);
                    f(input, out, frames);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(callback: Callback, channels: usize, max_frames: usize) -> Renderer {
        let shared = RenderShared::new();
        shared.set_callback(callback);
        shared.arm(channels, max_frames).unwrap();
        Renderer::new(shared, channels, max_frames)
    }

    #[test]
    fn test_separated_output() {
        let renderer = armed(
            Callback::output(|mut out| {
                out.channel_mut(0).fill(0.5);
                out.channel_mut(1).fill(-0.5);
            }),
            2,
            64,
        );
        let mut out = vec![0.0; 8];
        renderer.render(None, Some(&mut out));
        assert_eq!(out, [0.5, -0.5, 0.5, -0.5, 0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_large_blocks_are_split() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sizes);
        let renderer = armed(
            Callback::interleaved_output(move |_, frames| seen.lock().push(frames)),
            1,
            100,
        );
        let mut out = vec![0.0; 250];
        renderer.render(None, Some(&mut out));
        assert_eq!(*sizes.lock(), vec![100, 100, 50]);
    }

    #[test]
    fn test_duplex_passthrough() {
        let renderer = armed(
            Callback::input_output(|input, mut output| {
                for c in 0..input.channels() {
                    output.channel_mut(c).copy_from_slice(input.channel(c));
                }
            }),
            2,
            16,
        );
        let input = [1.0, 2.0, 3.0, 4.0];
        let mut out = [0.0; 4];
        renderer.render(Some(&input), Some(&mut out));
        assert_eq!(out, input);
    }

    #[test]
    fn test_halted_renders_silence() {
        let shared = RenderShared::new();
        shared.set_callback(Callback::interleaved_output(|out, _| out.fill(1.0)));
        shared.arm(1, 8).unwrap();
        let renderer = Renderer::new(Arc::clone(&shared), 1, 8);
        shared.halt();

        let mut out = [0.7; 8];
        renderer.render(None, Some(&mut out));
        assert_eq!(out, [0.0; 8]);
        assert_eq!(shared.invocations(), 0);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let shared = RenderShared::new();
        shared.set_callback(Callback::interleaved_output(|_, _| panic!("boom")));
        shared.arm(1, 8).unwrap();
        let renderer = Renderer::new(Arc::clone(&shared), 1, 8);

        let mut out = [0.7; 8];
        renderer.render(None, Some(&mut out));
        assert_eq!(out, [0.0; 8]);
        assert!(!shared.is_running());
    }
}
