//! CPAL hardware backend.

use super::{buffer_size_for_hint, AudioBackend, StreamFormat};
use crate::callback::Direction;
use crate::config::DeviceConfig;
use crate::render::Renderer;
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, SupportedBufferSize};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tracing::{debug, info, warn};

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` on some platforms. The backend lives inside a
/// `Device`, which is only mutated through `&mut` (or behind the
/// `BlockingDevice` mutex), so the stream is never accessed concurrently and
/// is dropped by whichever thread stops the device.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: see above; access is serialized by the owning Device.
unsafe impl Send for StreamHandle {}

/// Blocks of input buffered between the capture and playback streams.
const DUPLEX_RING_BLOCKS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Negotiated {
    output: Option<SampleFormat>,
    input: Option<SampleFormat>,
}

/// Default-host backend using the default input and output devices (or the
/// devices at the given enumeration indices).
pub struct CpalBackend {
    output_device_index: Option<usize>,
    input_device_index: Option<usize>,
    negotiated: Option<Negotiated>,
    streams: Vec<StreamHandle>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            output_device_index: None,
            input_device_index: None,
            negotiated: None,
            streams: Vec::new(),
        }
    }

    pub fn with_output_device(mut self, index: usize) -> Self {
        self.output_device_index = Some(index);
        self
    }

    pub fn with_input_device(mut self, index: usize) -> Self {
        self.input_device_index = Some(index);
        self
    }

    /// Names of the default host's output devices, in index order.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let names: Result<Vec<String>> = host
            .output_devices()?
            .map(|device| Ok(device.name()?))
            .collect();
        names
    }

    /// Names of the default host's input devices, in index order.
    pub fn list_input_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let names: Result<Vec<String>> = host
            .input_devices()?
            .map(|device| Ok(device.name()?))
            .collect();
        names
    }

    fn output_device(&self) -> Result<Option<cpal::Device>> {
        let host = cpal::default_host();
        match self.output_device_index {
            Some(idx) => Ok(Some(host.output_devices()?.nth(idx).ok_or_else(|| {
                Error::DeviceUnavailable(format!("output device index {} out of range", idx))
            })?)),
            None => Ok(host.default_output_device()),
        }
    }

    fn input_device(&self) -> Result<Option<cpal::Device>> {
        let host = cpal::default_host();
        match self.input_device_index {
            Some(idx) => Ok(Some(host.input_devices()?.nth(idx).ok_or_else(|| {
                Error::DeviceUnavailable(format!("input device index {} out of range", idx))
            })?)),
            None => Ok(host.default_input_device()),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a supported config range for (channels, rate), preferring f32.
fn pick_range(
    ranges: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    channels: u16,
    sample_rate: u32,
) -> Option<cpal::SupportedStreamConfigRange> {
    ranges
        .filter(|r| r.channels() == channels)
        .filter(|r| (r.min_sample_rate().0..=r.max_sample_rate().0).contains(&sample_rate))
        .filter(|r| {
            matches!(
                r.sample_format(),
                SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
            )
        })
        .max_by_key(|r| r.sample_format() == SampleFormat::F32)
}

fn buffer_limits(range: &cpal::SupportedStreamConfigRange) -> (u32, u32) {
    match *range.buffer_size() {
        SupportedBufferSize::Range { min, max } => (min, max),
        SupportedBufferSize::Unknown => (0, u32::MAX),
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn negotiate(&mut self, request: &DeviceConfig) -> Result<StreamFormat> {
        let output = self.output_device()?;
        let input = self.input_device()?;

        let (channels, sample_rate) = match (&output, &input) {
            (Some(device), _) => {
                let default = device.default_output_config()?;
                (default.channels(), default.sample_rate().0)
            }
            (None, Some(device)) => {
                let default = device.default_input_config()?;
                (default.channels(), default.sample_rate().0)
            }
            (None, None) => {
                return Err(Error::DeviceUnavailable("no audio devices found".into()));
            }
        };
        let channels = if request.channels == 0 {
            channels
        } else {
            request.channels
        };
        let sample_rate = if request.sample_rate == 0 {
            sample_rate
        } else {
            request.sample_rate
        };

        let output_range = match &output {
            Some(device) => pick_range(device.supported_output_configs()?, channels, sample_rate),
            None => None,
        };
        let input_range = match &input {
            Some(device) => pick_range(device.supported_input_configs()?, channels, sample_rate),
            None => None,
        };

        let (min, max) = match (&output_range, &input_range) {
            (Some(o), Some(i)) => {
                let (omin, omax) = buffer_limits(o);
                let (imin, imax) = buffer_limits(i);
                (omin.max(imin), omax.min(imax))
            }
            (Some(r), None) | (None, Some(r)) => buffer_limits(r),
            (None, None) => {
                return Err(Error::InvalidFormat(format!(
                    "{} channels at {} Hz not supported by the audio devices",
                    channels, sample_rate
                )));
            }
        };

        let format = StreamFormat {
            channels,
            sample_rate,
            buffer_size: buffer_size_for_hint(request.latency_hint, min, max),
        };
        self.negotiated = Some(Negotiated {
            output: output_range.map(|r| r.sample_format()),
            input: input_range.map(|r| r.sample_format()),
        });

        info!(
            "Negotiated {} ch, {} Hz, {} frames (output: {}, input: {})",
            format.channels,
            format.sample_rate,
            format.buffer_size,
            output_range.is_some(),
            input_range.is_some()
        );
        Ok(format)
    }

    fn supports(&self, format: &StreamFormat, direction: Direction) -> Result<()> {
        let negotiated = self
            .negotiated
            .ok_or(Error::InvalidState("backend not negotiated"))?;
        if direction.has_output() && negotiated.output.is_none() {
            return Err(Error::DeviceUnavailable(format!(
                "no output device supports {} ch at {} Hz",
                format.channels, format.sample_rate
            )));
        }
        if direction.has_input() && negotiated.input.is_none() {
            return Err(Error::DeviceUnavailable(format!(
                "no input device supports {} ch at {} Hz",
                format.channels, format.sample_rate
            )));
        }
        Ok(())
    }

    fn start(
        &mut self,
        format: &StreamFormat,
        direction: Direction,
        renderer: Renderer,
    ) -> Result<()> {
        self.supports(format, direction)?;
        let negotiated = self
            .negotiated
            .ok_or(Error::InvalidState("backend not negotiated"))?;

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(format.buffer_size),
        };
        let block = format.buffer_size as usize * format.channels as usize;

        let mut streams = Vec::new();
        match direction {
            Direction::Output => {
                let device = self.output_device()?.ok_or_else(no_output)?;
                let sample_format = negotiated.output.ok_or_else(no_output)?;
                streams.push(build_output(
                    &device,
                    &config,
                    sample_format,
                    renderer,
                    None,
                    block,
                )?);
            }
            Direction::Input => {
                let device = self.input_device()?.ok_or_else(no_input)?;
                let sample_format = negotiated.input.ok_or_else(no_input)?;
                streams.push(build_input(
                    &device,
                    &config,
                    sample_format,
                    InputSink::Render(renderer),
                    block,
                )?);
            }
            Direction::Duplex => {
                let out_device = self.output_device()?.ok_or_else(no_output)?;
                let in_device = self.input_device()?.ok_or_else(no_input)?;
                let (producer, consumer) = HeapRb::<f32>::new(block * DUPLEX_RING_BLOCKS).split();

                streams.push(build_input(
                    &in_device,
                    &config,
                    negotiated.input.ok_or_else(no_input)?,
                    InputSink::Ring(producer, renderer.clone()),
                    block,
                )?);
                streams.push(build_output(
                    &out_device,
                    &config,
                    negotiated.output.ok_or_else(no_output)?,
                    renderer,
                    Some(consumer),
                    block,
                )?);
            }
        }

        for stream in &streams {
            stream.play()?;
        }
        self.streams = streams.into_iter().map(StreamHandle).collect();
        debug!("CPAL streams running ({:?})", direction);
        Ok(())
    }

    fn stop(&mut self) {
        if !self.streams.is_empty() {
            for StreamHandle(stream) in &self.streams {
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause stream: {}", e);
                }
            }
            self.streams.clear();
            debug!("CPAL streams closed");
        }
    }
}

fn no_output() -> Error {
    Error::DeviceUnavailable("no output device".into())
}

fn no_input() -> Error {
    Error::DeviceUnavailable("no input device".into())
}

enum InputSink {
    Render(Renderer),
    Ring(ringbuf::HeapProd<f32>, Renderer),
}

fn build_output(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: SampleFormat,
    renderer: Renderer,
    ring: Option<ringbuf::HeapCons<f32>>,
    block: usize,
) -> Result<cpal::Stream> {
    match format {
        SampleFormat::F32 => build_output_typed::<f32>(device, config, renderer, ring, block),
        SampleFormat::I16 => build_output_typed::<i16>(device, config, renderer, ring, block),
        SampleFormat::U16 => build_output_typed::<u16>(device, config, renderer, ring, block),
        other => Err(Error::InvalidFormat(format!(
            "unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_output_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    renderer: Renderer,
    mut ring: Option<ringbuf::HeapCons<f32>>,
    block: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut output = vec![0.0f32; block];
    let mut input = vec![0.0f32; block];
    let error_renderer = renderer.clone();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for chunk in data.chunks_mut(block) {
                let out = &mut output[..chunk.len()];
                match ring.as_mut() {
                    Some(consumer) => {
                        let inp = &mut input[..chunk.len()];
                        let got = consumer.pop_slice(inp);
                        inp[got..].fill(0.0);
                        renderer.render(Some(&*inp), Some(&mut *out));
                    }
                    None => renderer.render(None, Some(&mut *out)),
                }
                for (dst, &src) in chunk.iter_mut().zip(out.iter()) {
                    *dst = T::from_sample(src);
                }
            }
        },
        move |_err| error_renderer.report_error(),
        None,
    )?;
    Ok(stream)
}

fn build_input(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: SampleFormat,
    sink: InputSink,
    block: usize,
) -> Result<cpal::Stream> {
    match format {
        SampleFormat::F32 => build_input_typed::<f32>(device, config, sink, block),
        SampleFormat::I16 => build_input_typed::<i16>(device, config, sink, block),
        SampleFormat::U16 => build_input_typed::<u16>(device, config, sink, block),
        other => Err(Error::InvalidFormat(format!(
            "unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_input_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut sink: InputSink,
    block: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut scratch = vec![0.0f32; block];
    let error_renderer = match &sink {
        InputSink::Render(r) | InputSink::Ring(_, r) => r.clone(),
    };

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for chunk in data.chunks(block) {
                let converted = &mut scratch[..chunk.len()];
                for (dst, &src) in converted.iter_mut().zip(chunk) {
                    *dst = src.to_sample::<f32>();
                }
                match &mut sink {
                    InputSink::Render(renderer) => renderer.render(Some(converted), None),
                    // Overflow drops the newest samples; playback catches up.
                    InputSink::Ring(producer, _) => {
                        producer.push_slice(converted);
                    }
                }
            }
        },
        move |_err| error_renderer.report_error(),
        None,
    )?;
    Ok(stream)
}
