//! Separated (one slice per channel) buffer views.
//!
//! Backing storage is planar: channel `c` occupies
//! `data[c * frames..(c + 1) * frames]`.

use std::slice::{ChunksExact, ChunksExactMut};

/// Read-only separated channels.
#[derive(Debug, Clone, Copy)]
pub struct Channels<'a> {
    data: &'a [f32],
    frames: usize,
}

impl<'a> Channels<'a> {
    /// Wrap planar storage. `data.len()` must be a multiple of `frames`.
    pub fn new(data: &'a [f32], frames: usize) -> Self {
        assert!(
            frames == 0 || data.len() % frames == 0,
            "planar buffer length {} is not a multiple of {} frames",
            data.len(),
            frames
        );
        Self { data, frames }
    }

    pub fn channels(&self) -> usize {
        if self.frames == 0 {
            0
        } else {
            self.data.len() / self.frames
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &'a [f32] {
        &self.data[index * self.frames..(index + 1) * self.frames]
    }

    pub fn iter(&self) -> ChunksExact<'a, f32> {
        self.data.chunks_exact(self.frames.max(1))
    }

    /// Planar storage, channel after channel.
    pub fn as_planar(&self) -> &'a [f32] {
        self.data
    }
}

/// Writable separated channels.
#[derive(Debug)]
pub struct ChannelsMut<'a> {
    data: &'a mut [f32],
    frames: usize,
}

impl<'a> ChannelsMut<'a> {
    /// Wrap planar storage. `data.len()` must be a multiple of `frames`.
    pub fn new(data: &'a mut [f32], frames: usize) -> Self {
        assert!(
            frames == 0 || data.len() % frames == 0,
            "planar buffer length {} is not a multiple of {} frames",
            data.len(),
            frames
        );
        Self { data, frames }
    }

    pub fn channels(&self) -> usize {
        if self.frames == 0 {
            0
        } else {
            self.data.len() / self.frames
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.data[index * self.frames..(index + 1) * self.frames]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index * self.frames..(index + 1) * self.frames]
    }

    pub fn iter_mut(&mut self) -> ChunksExactMut<'_, f32> {
        self.data.chunks_exact_mut(self.frames.max(1))
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn as_planar_mut(&mut self) -> &mut [f32] {
        &mut *self.data
    }
}

/// Split interleaved frames into planar storage.
pub fn deinterleave(interleaved: &[f32], channels: usize, planar: &mut [f32]) {
    let frames = interleaved.len() / channels.max(1);
    for (f, frame) in interleaved.chunks_exact(channels).enumerate() {
        for (c, &sample) in frame.iter().enumerate() {
            planar[c * frames + f] = sample;
        }
    }
}

/// Merge planar storage into interleaved frames.
pub fn interleave(planar: &[f32], channels: usize, interleaved: &mut [f32]) {
    let frames = interleaved.len() / channels.max(1);
    for (f, frame) in interleaved.chunks_exact_mut(channels).enumerate() {
        for (c, sample) in frame.iter_mut().enumerate() {
            *sample = planar[c * frames + f];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_views() {
        let data = [1.0, 2.0, 3.0, 10.0, 20.0, 30.0];
        let channels = Channels::new(&data, 3);
        assert_eq!(channels.channels(), 2);
        assert_eq!(channels.channel(1), &[10.0, 20.0, 30.0]);
        assert_eq!(channels.iter().count(), 2);
    }

    #[test]
    fn test_channels_mut() {
        let mut data = [0.0; 4];
        let mut channels = ChannelsMut::new(&mut data, 2);
        channels.channel_mut(1).copy_from_slice(&[5.0, 6.0]);
        for ch in channels.iter_mut() {
            ch[0] += 1.0;
        }
        assert_eq!(data, [1.0, 0.0, 6.0, 6.0]);
    }

    #[test]
    fn test_interleave_round_trip() {
        let interleaved = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let mut planar = [0.0; 6];
        deinterleave(&interleaved, 2, &mut planar);
        assert_eq!(planar, [1.0, 2.0, 3.0, -1.0, -2.0, -3.0]);

        let mut back = [0.0; 6];
        interleave(&planar, 2, &mut back);
        assert_eq!(back, interleaved);
    }

    #[test]
    fn test_empty_block() {
        let channels = Channels::new(&[], 0);
        assert_eq!(channels.channels(), 0);
        assert_eq!(channels.frames(), 0);
    }
}
