//! Phase-vocoder pitch shifter.
//!
//! One instance per channel. Samples stream through [`PitchShifter::push`];
//! every [`HOP_SIZE`] samples the caller runs [`PitchShifter::process_frame`]
//! with the current ratio. The last [`FRAME_SIZE`] inputs are analysed under a
//! periodic Hann window, the bins are moved to `k · ratio` with their true
//! frequencies scaled, and the resynthesised frame is overlap-added so that at
//! ratio 1 every input sample comes back exactly `FRAME_SIZE` samples later.

use melodify_core::{try_zeroed, Result};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Analysis window length, and the shifter's latency in samples.
pub const FRAME_SIZE: usize = 1024;

/// Samples between analysis frames.
pub const HOP_SIZE: usize = 256;

const OVERLAP: usize = FRAME_SIZE / HOP_SIZE;
const BINS: usize = FRAME_SIZE / 2 + 1;

/// Sum of the squared window over the overlapping frames.
const WINDOW_GAIN: f32 = 1.5;

/// Half width (in bins) of the moving average used as spectral envelope.
const ENVELOPE_RADIUS: usize = 8;
const ENVELOPE_FLOOR: f32 = 1e-9;

/// Ratios this close to 1 pass the spectrum through untouched.
const UNITY_TOLERANCE: f32 = 1e-4;

const TWO_PI: f32 = 2.0 * PI;

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    phase - TWO_PI * (phase / TWO_PI).round()
}

pub struct PitchShifter {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,

    // Last FRAME_SIZE inputs, oldest at `input_pos`
    input: Vec<f32>,
    input_pos: usize,
    // Overlap-add accumulator, next output at `output_pos`
    output: Vec<f32>,
    output_pos: usize,

    last_phase: Vec<f32>,
    sum_phase: Vec<f32>,
    magnitude: Vec<f32>,
    frequency: Vec<f32>,
    synth_magnitude: Vec<f32>,
    synth_frequency: Vec<f32>,
    envelope: Vec<f32>,
}

impl PitchShifter {
    /// Allocate a shifter. Plans are shared through `planner`.
    pub fn new(planner: &mut FftPlanner<f32>) -> Result<Self> {
        let fft = planner.plan_fft_forward(FRAME_SIZE);
        let ifft = planner.plan_fft_inverse(FRAME_SIZE);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        let mut window: Vec<f32> = try_zeroed(FRAME_SIZE)?;
        for (i, w) in window.iter_mut().enumerate() {
            *w = 0.5 * (1.0 - (TWO_PI * i as f32 / FRAME_SIZE as f32).cos());
        }

        Ok(Self {
            fft,
            ifft,
            window,
            spectrum: try_zeroed(FRAME_SIZE)?,
            scratch: try_zeroed(scratch_len)?,
            input: try_zeroed(FRAME_SIZE)?,
            input_pos: 0,
            output: try_zeroed(FRAME_SIZE)?,
            output_pos: 0,
            last_phase: try_zeroed(BINS)?,
            sum_phase: try_zeroed(BINS)?,
            magnitude: try_zeroed(BINS)?,
            frequency: try_zeroed(BINS)?,
            synth_magnitude: try_zeroed(BINS)?,
            synth_frequency: try_zeroed(BINS)?,
            envelope: try_zeroed(BINS)?,
        })
    }

    /// Feed one input sample and take one output sample.
    #[inline]
    pub fn push(&mut self, sample: f32) -> f32 {
        let out = self.output[self.output_pos];
        self.output[self.output_pos] = 0.0;
        self.output_pos = (self.output_pos + 1) % FRAME_SIZE;

        self.input[self.input_pos] = sample;
        self.input_pos = (self.input_pos + 1) % FRAME_SIZE;
        out
    }

    /// Analyse the last `FRAME_SIZE` inputs, shift by `ratio` and overlap-add
    /// the result into the output. Call once every `HOP_SIZE` pushes.
    pub fn process_frame(&mut self, ratio: f32, preserve_formants: bool) {
        for (i, (bin, &w)) in self.spectrum.iter_mut().zip(&self.window).enumerate() {
            let sample = self.input[(self.input_pos + i) % FRAME_SIZE];
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        if (ratio - 1.0).abs() < UNITY_TOLERANCE {
            // Keep phase tracking current so a later shift starts coherent
            for k in 0..BINS {
                let phase = self.spectrum[k].arg();
                self.last_phase[k] = phase;
                self.sum_phase[k] = phase;
            }
        } else {
            self.shift_bins(ratio, preserve_formants);
        }

        self.ifft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 1.0 / (FRAME_SIZE as f32 * WINDOW_GAIN);
        for (i, (bin, &w)) in self.spectrum.iter().zip(&self.window).enumerate() {
            let slot = (self.output_pos + i) % FRAME_SIZE;
            self.output[slot] += bin.re * w * scale;
        }
    }

    fn shift_bins(&mut self, ratio: f32, preserve_formants: bool) {
        let expected = TWO_PI * HOP_SIZE as f32 / FRAME_SIZE as f32;

        for k in 0..BINS {
            let bin = self.spectrum[k];
            let phase = bin.arg();
            let delta = wrap_phase(phase - self.last_phase[k] - k as f32 * expected);
            self.last_phase[k] = phase;

            self.magnitude[k] = bin.norm();
            self.frequency[k] = k as f32 + delta * OVERLAP as f32 / TWO_PI;
        }

        if preserve_formants {
            self.compute_envelope();
        }

        self.synth_magnitude.fill(0.0);
        self.synth_frequency.fill(0.0);
        for k in 0..BINS {
            let target = (k as f32 * ratio).round() as usize;
            if target >= BINS {
                break;
            }
            let magnitude = if preserve_formants {
                self.magnitude[k] / self.envelope[k] * self.envelope[target]
            } else {
                self.magnitude[k]
            };
            self.synth_magnitude[target] += magnitude;
            self.synth_frequency[target] = self.frequency[k] * ratio;
        }

        for k in 0..BINS {
            let deviation = self.synth_frequency[k] - k as f32;
            let advance = k as f32 * expected + deviation * TWO_PI / OVERLAP as f32;
            self.sum_phase[k] = wrap_phase(self.sum_phase[k] + advance);
            self.spectrum[k] = Complex::from_polar(self.synth_magnitude[k], self.sum_phase[k]);
        }

        // Real output: mirror the upper half
        self.spectrum[0].im = 0.0;
        self.spectrum[BINS - 1].im = 0.0;
        for k in 1..BINS - 1 {
            self.spectrum[FRAME_SIZE - k] = self.spectrum[k].conj();
        }
    }

    fn compute_envelope(&mut self) {
        for k in 0..BINS {
            let lo = k.saturating_sub(ENVELOPE_RADIUS);
            let hi = (k + ENVELOPE_RADIUS).min(BINS - 1);
            let sum: f32 = self.magnitude[lo..=hi].iter().sum();
            self.envelope[k] = sum / (hi - lo + 1) as f32 + ENVELOPE_FLOOR;
        }
    }

    /// Clear all history. Allocation-free.
    pub fn reset(&mut self) {
        self.spectrum.fill(Complex::default());
        self.input.fill(0.0);
        self.input_pos = 0;
        self.output.fill(0.0);
        self.output_pos = 0;
        self.last_phase.fill(0.0);
        self.sum_phase.fill(0.0);
        self.magnitude.fill(0.0);
        self.frequency.fill(0.0);
        self.synth_magnitude.fill(0.0);
        self.synth_frequency.fill(0.0);
        self.envelope.fill(0.0);
    }
}
