//! Render callback shapes.
//!
//! A device drives exactly one callback. Closures capture whatever state they
//! need; they run on the render thread and must not block or allocate.

use crate::buffers::{Channels, ChannelsMut};

/// Which streams a callback needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Duplex,
}

impl Direction {
    pub fn has_input(self) -> bool {
        matches!(self, Direction::Input | Direction::Duplex)
    }

    pub fn has_output(self) -> bool {
        matches!(self, Direction::Output | Direction::Duplex)
    }
}

/// Sample layout handed to a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Separated,
    Interleaved,
}

pub type InputFn = Box<dyn FnMut(Channels<'_>) + Send>;
pub type OutputFn = Box<dyn FnMut(ChannelsMut<'_>) + Send>;
pub type InputOutputFn = Box<dyn FnMut(Channels<'_>, ChannelsMut<'_>) + Send>;
pub type InterleavedInputFn = Box<dyn FnMut(&[f32], usize) + Send>;
pub type InterleavedOutputFn = Box<dyn FnMut(&mut [f32], usize) + Send>;
pub type InterleavedInputOutputFn = Box<dyn FnMut(&[f32], &mut [f32], usize) + Send>;

/// A registered render callback.
///
/// Interleaved variants receive the frame count as the last argument. Output
/// buffers arrive zeroed, so a callback that writes nothing produces silence.
pub enum Callback {
    Input(InputFn),
    Output(OutputFn),
    InputOutput(InputOutputFn),
    InterleavedInput(InterleavedInputFn),
    InterleavedOutput(InterleavedOutputFn),
    InterleavedInputOutput(InterleavedInputOutputFn),
}

impl Callback {
    pub fn input(f: impl FnMut(Channels<'_>) + Send + 'static) -> Self {
        Callback::Input(Box::new(f))
    }

    pub fn output(f: impl FnMut(ChannelsMut<'_>) + Send + 'static) -> Self {
        Callback::Output(Box::new(f))
    }

    pub fn input_output(f: impl FnMut(Channels<'_>, ChannelsMut<'_>) + Send + 'static) -> Self {
        Callback::InputOutput(Box::new(f))
    }

    pub fn interleaved_input(f: impl FnMut(&[f32], usize) + Send + 'static) -> Self {
        Callback::InterleavedInput(Box::new(f))
    }

    pub fn interleaved_output(f: impl FnMut(&mut [f32], usize) + Send + 'static) -> Self {
        Callback::InterleavedOutput(Box::new(f))
    }

    pub fn interleaved_input_output(
        f: impl FnMut(&[f32], &mut [f32], usize) + Send + 'static,
    ) -> Self {
        Callback::InterleavedInputOutput(Box::new(f))
    }

    pub fn direction(&self) -> Direction {
        match self {
            Callback::Input(_) | Callback::InterleavedInput(_) => Direction::Input,
            Callback::Output(_) | Callback::InterleavedOutput(_) => Direction::Output,
            Callback::InputOutput(_) | Callback::InterleavedInputOutput(_) => Direction::Duplex,
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Callback::Input(_) | Callback::Output(_) | Callback::InputOutput(_) => {
                Layout::Separated
            }
            _ => Layout::Interleaved,
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("direction", &self.direction())
            .field("layout", &self.layout())
            .finish()
    }
}
