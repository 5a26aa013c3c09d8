//! Uncompressed WAVE file reader and writer.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use melodify_core::{FileSystem, ReadSeek, SpecialLocation};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// Reads interleaved `f32` frames from a PCM or float WAVE file.
#[derive(Default)]
pub struct InputWaveFile {
    reader: Option<WavReader<Box<dyn ReadSeek>>>,
    spec: Option<WavSpec>,
    position: u32,
    length: u32,
}

impl InputWaveFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file, closing any file already open.
    pub fn open(
        &mut self,
        fs: &FileSystem,
        location: SpecialLocation,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.close();
        let path = path.as_ref();
        let source = fs.open_read(location, path)?;
        let reader = WavReader::new(source)?;
        let spec = reader.spec();

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) | (SampleFormat::Int, 8..=32) => {}
            (format, bits) => {
                return Err(Error::InvalidFormat(format!(
                    "{:?} samples with {} bits are not supported",
                    format, bits
                )));
            }
        }

        self.length = reader.duration();
        self.position = 0;
        self.spec = Some(spec);
        self.reader = Some(reader);

        info!(
            "Opened {}: {} ch, {} Hz, {} frames",
            path.display(),
            spec.channels,
            spec.sample_rate,
            self.length
        );
        Ok(())
    }

    pub fn close(&mut self) {
        self.reader = None;
        self.spec = None;
        self.position = 0;
        self.length = 0;
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Channel count, or 0 when closed.
    pub fn channels(&self) -> u16 {
        self.spec.map(|s| s.channels).unwrap_or(0)
    }

    /// Sample rate in Hz, or 0 when closed.
    pub fn sample_rate(&self) -> u32 {
        self.spec.map(|s| s.sample_rate).unwrap_or(0)
    }

    /// Total length in frames.
    pub fn length_in_samples(&self) -> u32 {
        self.length
    }

    /// Frames left from the current position.
    pub fn remaining_samples(&self) -> u32 {
        self.length.saturating_sub(self.position)
    }

    /// Read up to `frames` interleaved frames into `buffer`. Returns the
    /// number of frames read; zero at end of file.
    pub fn read(&mut self, buffer: &mut [f32], frames: usize) -> Result<usize> {
        let (Some(reader), Some(spec)) = (self.reader.as_mut(), self.spec) else {
            return Err(Error::InvalidState("no WAVE file open"));
        };
        let channels = spec.channels as usize;
        let frames = frames
            .min(buffer.len() / channels)
            .min(self.length.saturating_sub(self.position) as usize);
        let wanted = frames * channels;

        let mut read = 0;
        match spec.sample_format {
            SampleFormat::Float => {
                for (dst, sample) in buffer[..wanted].iter_mut().zip(reader.samples::<f32>()) {
                    *dst = sample?;
                    read += 1;
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
                for (dst, sample) in buffer[..wanted].iter_mut().zip(reader.samples::<i32>()) {
                    *dst = sample? as f32 * scale;
                    read += 1;
                }
            }
        }

        let frames_read = read / channels;
        self.position += frames_read as u32;
        Ok(frames_read)
    }

    /// Seek to a frame position, clamped to the file length.
    pub fn set_sample_position(&mut self, frame: u32) -> Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or(Error::InvalidState("no WAVE file open"))?;
        let frame = frame.min(self.length);
        reader.seek(frame)?;
        self.position = frame;
        Ok(())
    }

    /// Seek to a time in milliseconds.
    pub fn set_time_position(&mut self, ms: f64) -> Result<()> {
        let frame = (ms.max(0.0) / 1000.0 * self.sample_rate() as f64).round() as u32;
        self.set_sample_position(frame)
    }

    pub fn restart(&mut self) -> Result<()> {
        self.set_sample_position(0)
    }
}

/// Writes interleaved `f32` frames as 16-bit PCM.
#[derive(Default)]
pub struct OutputWaveFile {
    writer: Option<WavWriter<BufWriter<File>>>,
    channels: u16,
    written: u64,
}

impl OutputWaveFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a file, finalizing any file already open.
    pub fn create(
        &mut self,
        fs: &FileSystem,
        location: SpecialLocation,
        path: impl AsRef<Path>,
        channels: u16,
        sample_rate: u32,
    ) -> Result<()> {
        self.close()?;
        melodify_core::validate_format(sample_rate, channels)
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;

        let path = path.as_ref();
        let file = fs.create(location, path)?;
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        self.writer = Some(WavWriter::new(BufWriter::new(file), spec)?);
        self.channels = channels;
        self.written = 0;

        debug!(
            "Created {}: {} ch, {} Hz",
            path.display(),
            channels,
            sample_rate
        );
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Append `frames` interleaved frames from `buffer`, clipping to ±1.
    pub fn write(&mut self, buffer: &[f32], frames: usize) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(Error::InvalidState("no WAVE file open"))?;
        let len = (frames * self.channels as usize).min(buffer.len());

        for &sample in &buffer[..len] {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }

        self.written += (len / self.channels as usize) as u64;
        Ok(())
    }

    /// Frames written since `create`.
    pub fn frames_written(&self) -> u64 {
        self.written
    }

    /// Finalize the header and close the file.
    pub fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!("Finalized WAVE file ({} frames)", self.written);
        }
        Ok(())
    }
}

impl Drop for OutputWaveFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
