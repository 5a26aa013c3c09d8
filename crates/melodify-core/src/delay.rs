//! Multichannel delay line for latency alignment.

use crate::alloc::try_zeroed;
use crate::Result;

/// Fixed delay over interleaved frames.
///
/// Storage holds exactly `delay_frames` frames; every frame pushed returns the
/// frame written `delay_frames` pushes earlier (zeros while filling).
pub struct DelayLine {
    buffer: Vec<f32>,
    channels: usize,
    delay_frames: usize,
    write_frame: usize,
}

impl DelayLine {
    /// Allocate a delay line. Fails instead of aborting when memory is short.
    pub fn new(channels: usize, delay_frames: usize) -> Result<Self> {
        let channels = channels.max(1);
        Ok(Self {
            buffer: try_zeroed(channels * delay_frames.max(1))?,
            channels,
            delay_frames,
            write_frame: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Push one interleaved frame and read the delayed frame into `output`.
    #[inline]
    pub fn process_frame(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.channels);
        debug_assert_eq!(output.len(), self.channels);

        if self.delay_frames == 0 {
            output.copy_from_slice(input);
            return;
        }

        let start = self.write_frame * self.channels;
        let slot = &mut self.buffer[start..start + self.channels];
        for ((stored, &x), y) in slot.iter_mut().zip(input).zip(output.iter_mut()) {
            *y = *stored;
            *stored = x;
        }
        self.write_frame = (self.write_frame + 1) % self.delay_frames;
    }

    /// Push a silent frame and read the delayed frame into `output`.
    #[inline]
    pub fn process_silent_frame(&mut self, output: &mut [f32]) {
        if self.delay_frames == 0 {
            output.fill(0.0);
            return;
        }

        let start = self.write_frame * self.channels;
        let slot = &mut self.buffer[start..start + self.channels];
        for (stored, y) in slot.iter_mut().zip(output.iter_mut()) {
            *y = *stored;
            *stored = 0.0;
        }
        self.write_frame = (self.write_frame + 1) % self.delay_frames;
    }

    /// Process a whole interleaved block. Lengths must match.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), output.len(), "delay line block length mismatch");
        let channels = self.channels;
        for (x, y) in input
            .chunks_exact(channels)
            .zip(output.chunks_exact_mut(channels))
        {
            self.process_frame(x, y);
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_frame = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_is_exact() {
        let mut delay = DelayLine::new(2, 3).unwrap();
        let input: Vec<f32> = (1..=10).flat_map(|i| [i as f32, -(i as f32)]).collect();
        let mut output = vec![0.0; input.len()];
        delay.process_block(&input, &mut output);

        assert_eq!(&output[..6], &[0.0; 6]);
        assert_eq!(&output[6..8], &[1.0, -1.0]);
        assert_eq!(&output[18..20], &[7.0, -7.0]);
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let mut delay = DelayLine::new(1, 0).unwrap();
        let mut out = [0.0];
        delay.process_frame(&[0.25], &mut out);
        assert_eq!(out, [0.25]);
    }

    #[test]
    fn test_silent_frames_keep_alignment() {
        let mut delay = DelayLine::new(1, 2).unwrap();
        let mut out = [0.0];
        delay.process_frame(&[1.0], &mut out);
        delay.process_silent_frame(&mut out);
        delay.process_frame(&[3.0], &mut out);
        assert_eq!(out, [1.0]);
        delay.process_silent_frame(&mut out);
        assert_eq!(out, [0.0]);
        delay.process_silent_frame(&mut out);
        assert_eq!(out, [3.0]);
    }

    #[test]
    fn test_clear() {
        let mut delay = DelayLine::new(1, 4).unwrap();
        let mut out = [0.0];
        for _ in 0..4 {
            delay.process_frame(&[1.0], &mut out);
        }
        delay.clear();
        for _ in 0..4 {
            delay.process_frame(&[0.0], &mut out);
            assert_eq!(out, [0.0]);
        }
    }
}
