//! Pitch detection using the YIN algorithm
//!
//! Monophonic pitch tracking for vocal correction. All working buffers are
//! sized at construction, so [`PitchDetector::detect`] can run on the audio
//! thread.
//!
//! ## Algorithm
//!
//! YIN (de Cheveigné & Kawahara, 2002):
//!
//! 1. **Difference function** - d(τ) = Σ(x[j] - x[j+τ])²
//! 2. **Cumulative mean normalized difference** - d'(τ)
//! 3. **Absolute threshold** - first local minimum of d'(τ) below threshold
//! 4. **Parabolic interpolation** - sub-sample period
//!
//! Cost is O(max_period²) per call, so callers running at high sample rates
//! should feed a decimated signal.

use melodify_core::{try_zeroed, Error, Result};

/// Result of pitch detection for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PitchResult {
    /// Detected frequency in Hz (0.0 if unvoiced/uncertain)
    pub frequency: f32,
    /// Confidence/clarity of detection (0.0 - 1.0)
    pub confidence: f32,
    /// Nearest MIDI note number (if voiced)
    pub midi_note: Option<u8>,
    /// Cents deviation from nearest note (-50 to +50)
    pub cents_offset: f32,
}

impl PitchResult {
    /// Check if a pitch was detected at all
    pub fn is_voiced(&self) -> bool {
        self.frequency > 0.0 && self.confidence > 0.0
    }

    /// Note name with sharp notation (e.g., "A4", "C#5")
    pub fn note_name(&self) -> Option<String> {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        self.midi_note.map(|note| {
            let octave = (note / 12) as i32 - 1;
            format!("{}{}", NAMES[(note % 12) as usize], octave)
        })
    }
}

/// Pitch detector using the YIN algorithm
pub struct PitchDetector {
    sample_rate: f64,
    min_freq: f32,
    max_freq: f32,
    threshold: f32,

    // Pre-allocated buffers
    difference: Vec<f32>,
    cumulative_mean: Vec<f32>,
    energy: Vec<f64>,
}

impl PitchDetector {
    /// Create a detector covering 50-2000 Hz
    pub fn new(sample_rate: f64) -> Self {
        Self::with_range(sample_rate, 50.0, 2000.0)
    }

    /// Create with a custom frequency range
    ///
    /// `min_freq` sets the analysis window: [`buffer_size`](Self::buffer_size)
    /// is two periods of the lowest detectable pitch.
    pub fn with_range(sample_rate: f64, min_freq: f32, max_freq: f32) -> Self {
        let max_period = (sample_rate / min_freq as f64) as usize;

        Self {
            sample_rate,
            min_freq,
            max_freq,
            threshold: 0.1,
            difference: vec![0.0; max_period + 1],
            cumulative_mean: vec![0.0; max_period + 1],
            energy: vec![0.0; max_period * 2 + 1],
        }
    }

    /// Like [`with_range`](Self::with_range), but reports a window that cannot
    /// be allocated as [`Error::OutOfMemory`] instead of aborting.
    pub fn try_with_range(sample_rate: f64, min_freq: f32, max_freq: f32) -> Result<Self> {
        let max_period = (sample_rate / min_freq as f64) as usize;
        let lags = max_period
            .checked_add(1)
            .ok_or(Error::OutOfMemory(max_period))?;
        let prefix = max_period
            .checked_mul(2)
            .and_then(|n| n.checked_add(1))
            .ok_or(Error::OutOfMemory(max_period))?;

        Ok(Self {
            sample_rate,
            min_freq,
            max_freq,
            threshold: 0.1,
            difference: try_zeroed(lags)?,
            cumulative_mean: try_zeroed(lags)?,
            energy: try_zeroed(prefix)?,
        })
    }

    /// Set YIN threshold (0.01 - 0.5)
    ///
    /// Lower values are stricter and may miss quiet notes. Default is 0.1.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 0.5);
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn frequency_range(&self) -> (f32, f32) {
        (self.min_freq, self.max_freq)
    }

    /// Samples needed per detection
    pub fn buffer_size(&self) -> usize {
        let max_period = (self.sample_rate / self.min_freq as f64) as usize;
        max_period * 2
    }

    /// Detect pitch in a single frame of audio
    ///
    /// `samples` should hold at least [`buffer_size`](Self::buffer_size)
    /// samples; shorter input limits the lowest detectable pitch. Does not
    /// allocate.
    pub fn detect(&mut self, samples: &[f32]) -> PitchResult {
        let min_period = ((self.sample_rate / self.max_freq as f64) as usize).max(2);
        let max_period = ((self.sample_rate / self.min_freq as f64) as usize)
            .min(samples.len() / 2)
            .min(self.difference.len() - 1);

        if max_period <= min_period {
            return PitchResult::default();
        }

        let samples = &samples[..max_period * 2];
        self.compute_difference(samples, max_period);
        self.compute_cumulative_mean(max_period);

        let (period, aperiodicity) = self.find_best_period(min_period, max_period);
        if period == 0 {
            return PitchResult::default();
        }

        let refined_period = self.parabolic_interpolation(period, max_period);
        let frequency = (self.sample_rate / refined_period) as f32;
        let confidence = (1.0 - aperiodicity).clamp(0.0, 1.0);
        let (midi_note, cents_offset) = freq_to_midi(frequency);

        PitchResult {
            frequency,
            confidence,
            midi_note: Some(midi_note),
            cents_offset,
        }
    }

    /// Detect a pitch track over an entire buffer, one result per hop
    pub fn detect_track(&mut self, samples: &[f32], hop_size: usize) -> Vec<PitchResult> {
        let frame_size = self.buffer_size();
        if samples.len() < frame_size || hop_size == 0 {
            return Vec::new();
        }

        (0..=(samples.len() - frame_size) / hop_size)
            .map(|i| {
                let start = i * hop_size;
                self.detect(&samples[start..start + frame_size])
            })
            .collect()
    }

    /// d(τ) = energy(0, W) + energy(τ, W) - 2·r(τ), with W = max_period
    fn compute_difference(&mut self, samples: &[f32], max_period: usize) {
        let window = max_period;

        self.energy[0] = 0.0;
        for (i, &s) in samples.iter().enumerate() {
            self.energy[i + 1] = self.energy[i] + (s as f64) * (s as f64);
        }

        let e0 = self.energy[window] - self.energy[0];
        self.difference[0] = 0.0;

        for tau in 1..=max_period {
            let autocorr: f64 = samples[..window]
                .iter()
                .zip(&samples[tau..tau + window])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum();

            let e_tau = self.energy[tau + window] - self.energy[tau];
            self.difference[tau] = (e0 + e_tau - 2.0 * autocorr).max(0.0) as f32;
        }
    }

    /// d'(τ) = d(τ) / ((1/τ) Σ d(j)), d'(0) = 1
    fn compute_cumulative_mean(&mut self, max_period: usize) {
        self.cumulative_mean[0] = 1.0;

        let mut running_sum = 0.0f32;
        for tau in 1..=max_period {
            running_sum += self.difference[tau];
            self.cumulative_mean[tau] = if running_sum > 1e-10 {
                self.difference[tau] * tau as f32 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First local minimum under the threshold, else the global minimum if
    /// it is still reasonably periodic. Returns (period, aperiodicity).
    fn find_best_period(&self, min_period: usize, max_period: usize) -> (usize, f32) {
        let mut tau = min_period;

        while tau < max_period {
            if self.cumulative_mean[tau] < self.threshold {
                while tau + 1 < max_period
                    && self.cumulative_mean[tau + 1] < self.cumulative_mean[tau]
                {
                    tau += 1;
                }
                return (tau, self.cumulative_mean[tau]);
            }
            tau += 1;
        }

        let (best_tau, best_val) = (min_period..=max_period)
            .map(|t| (t, self.cumulative_mean[t]))
            .fold((min_period, f32::MAX), |best, cur| {
                if cur.1 < best.1 {
                    cur
                } else {
                    best
                }
            });

        if best_val < 0.5 {
            (best_tau, best_val)
        } else {
            (0, 1.0)
        }
    }

    fn parabolic_interpolation(&self, tau: usize, max_period: usize) -> f64 {
        if tau < 1 || tau >= max_period {
            return tau as f64;
        }

        let s0 = self.cumulative_mean[tau - 1] as f64;
        let s1 = self.cumulative_mean[tau] as f64;
        let s2 = self.cumulative_mean[tau + 1] as f64;
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);

        if denominator.abs() > 1e-10 {
            tau as f64 + (s2 - s0) / denominator
        } else {
            tau as f64
        }
    }
}

/// Convert frequency to MIDI note and cents offset
pub fn freq_to_midi(freq: f32) -> (u8, f32) {
    if freq <= 0.0 {
        return (0, 0.0);
    }

    let note = (69.0 + 12.0 * (freq / 440.0).log2()).round() as i32;
    let note = note.clamp(0, 127) as u8;
    let cents = 1200.0 * (freq / midi_to_freq(note)).log2();

    (note, cents)
}

/// Convert MIDI note to frequency (A4 = 440 Hz)
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

/// Median filter for smoothing pitch tracks
///
/// Replaces each voiced frequency with the median of the voiced frequencies in
/// its neighborhood, removing isolated octave jumps.
pub fn median_filter(pitches: &[PitchResult], window_size: usize) -> Vec<PitchResult> {
    if pitches.is_empty() || window_size < 2 {
        return pitches.to_vec();
    }

    let half = window_size / 2;
    let mut freqs = Vec::with_capacity(window_size + 1);

    (0..pitches.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(pitches.len());

            freqs.clear();
            freqs.extend(
                pitches[start..end]
                    .iter()
                    .filter(|p| p.is_voiced())
                    .map(|p| p.frequency),
            );

            if freqs.is_empty() {
                return PitchResult::default();
            }
            freqs.sort_by(f32::total_cmp);
            let median = freqs[freqs.len() / 2];
            let (midi_note, cents_offset) = freq_to_midi(median);
            PitchResult {
                frequency: median,
                confidence: pitches[i].confidence,
                midi_note: Some(midi_note),
                cents_offset,
            }
        })
        .collect()
}
