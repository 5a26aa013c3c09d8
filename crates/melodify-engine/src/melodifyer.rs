//! Melody-driven voice correction.

use crate::gain::VoiceGainControls;
use crate::options::MelodifyerOptions;
use crate::shifter::{PitchShifter, FRAME_SIZE, HOP_SIZE};
use crate::Result;
use melodify_analysis::{midi_to_freq, LevelFollower, PitchDetector, PitchResult};
use melodify_core::{try_zeroed, validate_format, DelayLine, FileSystem, Smoother, SpecialLocation};
use melodify_midi::MelodyTimeline;
use rustfft::FftPlanner;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Samples between input and output, for every configuration.
pub const LATENCY_IN_SAMPLES: usize = FRAME_SIZE;

/// Time constant of the voice and background level followers.
const LEVEL_TIME: f32 = 0.4;
/// Smoothing of the automatic gain.
const AUTO_GAIN_TIME: f32 = 0.05;
/// Glide of the correction ratio, in the log domain.
const GLIDE_TIME: f32 = 0.015;

/// Background RMS below this (-60 dBFS) disables automatic gain.
const BACKGROUND_FLOOR: f32 = 1e-3;
/// Voice RMS below this (-80 dBFS) disables automatic gain.
const VOICE_FLOOR: f32 = 1e-4;
/// Voice sits about 3 dB above the background.
const VOICE_HEADROOM: f32 = 1.41;
const MIN_AUTO_GAIN: f32 = 0.25;
const MAX_AUTO_GAIN: f32 = 4.0;

/// Pitch analysis runs at no less than this rate, decimated from the device
/// rate, so YIN cost stays flat as the sample rate grows.
const ANALYSIS_RATE: f64 = 16000.0;

/// Device samples averaged into one analysis sample.
fn analysis_decimation(sample_rate: u32, max_frequency: f32) -> usize {
    let lowest = ANALYSIS_RATE.max(4.0 * max_frequency as f64);
    ((sample_rate as f64 / lowest) as usize).max(1)
}

/// Per-configuration DSP state. Built whole by `setup` and swapped in.
struct EngineState {
    sample_rate: u32,
    channels: usize,

    shifters: Vec<PitchShifter>,
    detector: PitchDetector,
    decimation: usize,
    decimation_count: usize,
    decimation_sum: f32,
    anti_alias: Smoother,
    analysis: Vec<f32>,
    analysis_pos: usize,
    analysis_frame: Vec<f32>,
    background_delay: DelayLine,

    voice_level: LevelFollower,
    background_level: LevelFollower,
    auto_gain: Smoother,
    log_ratio: Smoother,

    shifted: Vec<f32>,
    delayed: Vec<f32>,
    hop_counter: usize,
    position: u64,
}

impl EngineState {
    fn new(sample_rate: u32, channels: u16, options: &MelodifyerOptions) -> Result<Self> {
        validate_format(sample_rate, channels)?;
        options.validate_for(sample_rate)?;

        let channels = channels as usize;
        let rate = sample_rate as f32;
        let decimation = analysis_decimation(sample_rate, options.max_frequency);
        let analysis_rate = sample_rate as f64 / decimation as f64;
        let detector =
            PitchDetector::try_with_range(analysis_rate, options.min_frequency, options.max_frequency)?;
        let analysis_len = detector.buffer_size();
        // One pole at a quarter of the analysis rate ahead of the box average
        let anti_alias_time = if decimation > 1 {
            2.0 / (std::f32::consts::PI * analysis_rate as f32)
        } else {
            0.0
        };
        debug!(
            "Pitch analysis at {:.0} Hz ({}x decimation), window {} samples",
            analysis_rate, decimation, analysis_len
        );

        let mut planner = FftPlanner::new();
        let shifters = (0..channels)
            .map(|_| PitchShifter::new(&mut planner))
            .collect::<melodify_core::Result<Vec<_>>>()?;

        Ok(Self {
            sample_rate,
            channels,
            shifters,
            detector,
            decimation,
            decimation_count: 0,
            decimation_sum: 0.0,
            anti_alias: Smoother::new(0.0, anti_alias_time, rate),
            analysis: try_zeroed(analysis_len)?,
            analysis_pos: 0,
            analysis_frame: try_zeroed(analysis_len)?,
            background_delay: DelayLine::new(channels, LATENCY_IN_SAMPLES)?,
            voice_level: LevelFollower::new(LEVEL_TIME, rate),
            background_level: LevelFollower::new(LEVEL_TIME, rate),
            auto_gain: Smoother::new(1.0, AUTO_GAIN_TIME, rate),
            log_ratio: Smoother::new(0.0, GLIDE_TIME, rate / HOP_SIZE as f32),
            shifted: try_zeroed(channels)?,
            delayed: try_zeroed(channels)?,
            hop_counter: 0,
            position: 0,
        })
    }

    fn reset(&mut self) {
        for shifter in &mut self.shifters {
            shifter.reset();
        }
        self.decimation_count = 0;
        self.decimation_sum = 0.0;
        self.anti_alias.reset();
        self.analysis.fill(0.0);
        self.analysis_pos = 0;
        self.analysis_frame.fill(0.0);
        self.background_delay.clear();
        self.voice_level.reset();
        self.background_level.reset();
        self.auto_gain.reset();
        self.log_ratio.reset();
        self.shifted.fill(0.0);
        self.delayed.fill(0.0);
        self.hop_counter = 0;
        self.position = 0;
    }

    #[allow(clippy::too_many_arguments)]
    fn process(
        &mut self,
        voice: &[f32],
        background: Option<&[f32]>,
        output: &mut [f32],
        melody: Option<&MelodyTimeline>,
        options: &MelodifyerOptions,
        extra_gain: f32,
        automatic: bool,
    ) {
        let channels = self.channels;
        let inv_channels = 1.0 / channels as f32;

        for (frame, (voice_frame, out_frame)) in voice
            .chunks_exact(channels)
            .zip(output.chunks_exact_mut(channels))
            .enumerate()
        {
            let mut mono = 0.0;
            for ((shifted, shifter), &v) in self
                .shifted
                .iter_mut()
                .zip(&mut self.shifters)
                .zip(voice_frame)
            {
                *shifted = shifter.push(v);
                mono += v;
            }
            mono *= inv_channels;
            self.voice_level.process(mono);
            self.push_analysis(mono);

            match background {
                Some(background) => {
                    let bg_frame = &background[frame * channels..(frame + 1) * channels];
                    let bg_mono: f32 = bg_frame.iter().sum::<f32>() * inv_channels;
                    self.background_level.process(bg_mono);
                    self.background_delay
                        .process_frame(bg_frame, &mut self.delayed);
                }
                None => {
                    self.background_level.process(0.0);
                    self.background_delay
                        .process_silent_frame(&mut self.delayed);
                }
            }

            self.position += 1;
            self.hop_counter += 1;
            if self.hop_counter == HOP_SIZE {
                self.hop_counter = 0;
                let ratio = self.next_ratio(melody, options);
                for shifter in &mut self.shifters {
                    shifter.process_frame(ratio, options.preserve_formants);
                }
            }

            let gain = extra_gain * self.next_auto_gain(automatic);
            for ((y, &s), &d) in out_frame.iter_mut().zip(&self.shifted).zip(&self.delayed) {
                *y = s * gain + d;
            }
        }
    }

    #[inline]
    fn push_analysis(&mut self, mono: f32) {
        self.decimation_sum += self.anti_alias.next(mono);
        self.decimation_count += 1;
        if self.decimation_count == self.decimation {
            self.analysis[self.analysis_pos] = self.decimation_sum / self.decimation as f32;
            self.analysis_pos = (self.analysis_pos + 1) % self.analysis.len();
            self.decimation_count = 0;
            self.decimation_sum = 0.0;
        }
    }

    /// Correction ratio for the hop that just completed.
    fn next_ratio(&mut self, melody: Option<&MelodyTimeline>, options: &MelodifyerOptions) -> f32 {
        let target = self.target_octaves(melody, options);
        self.log_ratio.next(target).exp2()
    }

    /// Shift toward the melody in octaves, folded into ±half an octave.
    /// Zero when there is no target or no voiced pitch.
    fn target_octaves(&mut self, melody: Option<&MelodyTimeline>, options: &MelodifyerOptions) -> f32 {
        let seconds = self.position as f64 / self.sample_rate as f64;
        let Some(key) = melody.and_then(|m| m.key_at(seconds, options.end_policy)) else {
            return 0.0;
        };

        let pitch = self.detect_voice();
        if !pitch.is_voiced() || pitch.confidence < options.voicing_threshold {
            return 0.0;
        }

        let octaves = (midi_to_freq(key) / pitch.frequency).log2();
        octaves - octaves.round()
    }

    /// Pitch of the most recent analysis window.
    fn detect_voice(&mut self) -> PitchResult {
        // Oldest sample sits at the write position
        let (newer, older) = self.analysis.split_at(self.analysis_pos);
        self.analysis_frame[..older.len()].copy_from_slice(older);
        self.analysis_frame[older.len()..].copy_from_slice(newer);
        self.detector.detect(&self.analysis_frame)
    }

    #[inline]
    fn next_auto_gain(&mut self, automatic: bool) -> f32 {
        let voice = self.voice_level.rms();
        let background = self.background_level.rms();
        let target = if automatic && background > BACKGROUND_FLOOR && voice > VOICE_FLOOR {
            (background * VOICE_HEADROOM / voice).clamp(MIN_AUTO_GAIN, MAX_AUTO_GAIN)
        } else {
            1.0
        };
        self.auto_gain.next(target)
    }
}

/// Pitch-corrects a singing voice toward a melody and mixes it with a
/// latency-aligned background.
///
/// ```no_run
/// use melodify_core::{FileSystem, SpecialLocation};
/// use melodify_engine::Melodifyer;
///
/// let fs = FileSystem::platform("karaoke");
/// let mut melodifyer = Melodifyer::new();
/// melodifyer.setup(44100, 2)?;
/// melodifyer.set_melody_midi_file(&fs, SpecialLocation::Documents, "song.mid", 0, 0)?;
///
/// let voice = vec![0.0; 2 * 512];
/// let background = vec![0.0; 2 * 512];
/// let mut output = vec![0.0; 2 * 512];
/// melodifyer.process(&voice, Some(&background), &mut output);
/// # Ok::<(), melodify_engine::Error>(())
/// ```
pub struct Melodifyer {
    state: Option<EngineState>,
    controls: Arc<VoiceGainControls>,
    melody: Option<MelodyTimeline>,
    options: MelodifyerOptions,
}

impl Melodifyer {
    pub fn new() -> Self {
        Self::with_options(MelodifyerOptions::default())
    }

    /// Options are checked at `setup`.
    pub fn with_options(options: MelodifyerOptions) -> Self {
        Self {
            state: None,
            controls: Arc::new(VoiceGainControls::new()),
            melody: None,
            options,
        }
    }

    /// Configure for a format, discarding all DSP history. On error the
    /// previous configuration stays in place.
    pub fn setup(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let state = EngineState::new(sample_rate, channels, &self.options)?;
        self.state = Some(state);
        info!(
            "Melodifyer ready: {} ch, {} Hz, latency {} samples",
            channels, sample_rate, LATENCY_IN_SAMPLES
        );
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.sample_rate)
    }

    pub fn channels(&self) -> Option<u16> {
        self.state.as_ref().map(|s| s.channels as u16)
    }

    pub fn latency_in_samples(&self) -> usize {
        LATENCY_IN_SAMPLES
    }

    /// Shared handle to the voice gain settings.
    pub fn gain_controls(&self) -> Arc<VoiceGainControls> {
        Arc::clone(&self.controls)
    }

    pub fn set_automatic_voice_gain_correction(&self, enabled: bool) {
        self.controls.set_automatic(enabled);
    }

    pub fn set_extra_voice_gain_correction(&self, linear: f32) {
        self.controls.set_extra(linear);
    }

    pub fn set_extra_voice_gain_correction_db(&self, db: f32) {
        self.controls.set_extra_db(db);
    }

    /// Load a melody from one track and channel of a Standard MIDI File,
    /// replacing the current one. On error the current melody is kept.
    pub fn set_melody_midi_file(
        &mut self,
        fs: &FileSystem,
        location: SpecialLocation,
        path: impl AsRef<Path>,
        track: usize,
        channel: u8,
    ) -> Result<()> {
        let melody = MelodyTimeline::load(fs, location, path, track, channel)?;
        self.set_melody(melody);
        Ok(())
    }

    pub fn set_melody(&mut self, melody: MelodyTimeline) {
        debug!(
            "Melody bound: {} notes, {:.2}s",
            melody.len(),
            melody.duration()
        );
        self.melody = Some(melody);
    }

    /// Remove the melody; the voice passes through uncorrected.
    pub fn clear_melody(&mut self) {
        self.melody = None;
    }

    pub fn melody(&self) -> Option<&MelodyTimeline> {
        self.melody.as_ref()
    }

    pub fn options(&self) -> &MelodifyerOptions {
        &self.options
    }

    /// Replace the options. A new tracking range rebuilds the DSP state,
    /// which discards history; other fields apply from the next `process()`.
    pub fn set_options(&mut self, options: MelodifyerOptions) -> Result<()> {
        options.validate()?;
        if let Some(state) = &self.state {
            options.validate_for(state.sample_rate)?;
            if !options.same_tracking_range(&self.options) {
                let rebuilt = EngineState::new(state.sample_rate, state.channels as u16, &options)?;
                self.state = Some(rebuilt);
                debug!(
                    "Pitch tracking range now {}-{} Hz",
                    options.min_frequency, options.max_frequency
                );
            }
        }
        self.options = options;
        Ok(())
    }

    /// Process interleaved audio. `voice`, `background` and `output` must have
    /// the same length, a multiple of the channel count. Writes silence
    /// before `setup`.
    ///
    /// # Panics
    ///
    /// On mismatched lengths.
    pub fn process(&mut self, voice: &[f32], background: Option<&[f32]>, output: &mut [f32]) {
        assert_eq!(
            voice.len(),
            output.len(),
            "voice and output buffers must have the same length"
        );
        if let Some(background) = background {
            assert_eq!(
                background.len(),
                output.len(),
                "background and output buffers must have the same length"
            );
        }

        let Some(state) = self.state.as_mut() else {
            output.fill(0.0);
            return;
        };
        assert_eq!(
            output.len() % state.channels,
            0,
            "buffer length must be a multiple of the channel count"
        );

        let extra = self.controls.extra();
        let automatic = self.controls.automatic();
        state.process(
            voice,
            background,
            output,
            self.melody.as_ref(),
            &self.options,
            extra,
            automatic,
        );
    }

    /// Clear history so the next `process()` behaves like the first after
    /// `setup`. Does not allocate.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.reset();
        }
    }
}

impl Default for Melodifyer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Melodifyer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Melodifyer")
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels())
            .field("melody_notes", &self.melody.as_ref().map(|m| m.len()))
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melodify_midi::{MelodyEndPolicy, MelodyNote};
    use proptest::prelude::*;

    fn voice_signal(channels: usize, frames: usize, freq: f32, sample_rate: f32) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin();
                std::iter::repeat(s).take(channels)
            })
            .collect()
    }

    fn melody(notes: &[(f64, f64, u8)]) -> MelodyTimeline {
        MelodyTimeline::from_notes(
            notes
                .iter()
                .map(|&(start, end, key)| MelodyNote { start, end, key })
                .collect(),
        )
        .unwrap()
    }

    fn configured(sample_rate: u32, channels: u16) -> Melodifyer {
        let mut m = Melodifyer::new();
        m.setup(sample_rate, channels).unwrap();
        m.set_melody(melody(&[(0.0, 0.5, 60), (0.5, 1.0, 64)]));
        m
    }

    #[test]
    fn test_silence_before_setup() {
        let mut m = Melodifyer::new();
        let mut output = vec![1.0; 64];
        m.process(&[0.5; 64], None, &mut output);
        assert!(output.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn test_latency_is_constant() {
        let mut m = Melodifyer::new();
        assert_eq!(m.latency_in_samples(), 1024);
        for (rate, channels) in [(8000, 1), (44100, 2), (96000, 6)] {
            m.setup(rate, channels).unwrap();
            assert_eq!(m.latency_in_samples(), LATENCY_IN_SAMPLES);
        }
    }

    #[test]
    fn test_zeros_give_finite_deterministic_output() {
        for (rate, channels) in [(8000u32, 1u16), (22050, 2), (48000, 4)] {
            let mut a = configured(rate, channels);
            let mut b = configured(rate, channels);
            let input = vec![0.0; channels as usize * 3000];
            let mut out_a = vec![0.0; input.len()];
            let mut out_b = vec![0.0; input.len()];
            a.process(&input, Some(&input), &mut out_a);
            b.process(&input, Some(&input), &mut out_b);
            assert!(out_a.iter().all(|y| y.is_finite()));
            assert_eq!(out_a, out_b);
        }
    }

    #[test]
    fn test_failed_setup_keeps_previous_state() {
        let mut m = configured(44100, 2);
        assert!(m.setup(1000, 2).is_err());
        assert!(m.setup(44100, 0).is_err());
        assert_eq!(m.sample_rate(), Some(44100));
        assert_eq!(m.channels(), Some(2));
    }

    #[test]
    fn test_background_is_delayed_by_latency() {
        let mut m = Melodifyer::new();
        m.setup(48000, 2).unwrap();

        let frames = 4096;
        let background: Vec<f32> = (0..frames * 2).map(|i| (i % 97) as f32 / 97.0).collect();
        let voice = vec![0.0; frames * 2];
        let mut output = vec![0.0; frames * 2];
        m.process(&voice, Some(&background), &mut output);

        let lag = LATENCY_IN_SAMPLES * 2;
        assert!(output[..lag].iter().all(|&y| y.abs() < 1e-5));
        for i in lag..output.len() {
            assert!((output[i] - background[i - lag]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_voice_passes_through_without_melody() {
        let mut m = Melodifyer::new();
        m.setup(44100, 1).unwrap();

        let voice = voice_signal(1, 8192, 220.0, 44100.0);
        let mut output = vec![0.0; voice.len()];
        m.process(&voice, None, &mut output);

        for t in 2 * LATENCY_IN_SAMPLES..voice.len() {
            assert!((output[t] - voice[t - LATENCY_IN_SAMPLES]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_extra_gain_scales_voice() {
        let mut m = Melodifyer::new();
        m.setup(44100, 1).unwrap();
        m.set_extra_voice_gain_correction(0.5);

        let voice = voice_signal(1, 8192, 220.0, 44100.0);
        let mut output = vec![0.0; voice.len()];
        m.process(&voice, None, &mut output);

        for t in 2 * LATENCY_IN_SAMPLES..voice.len() {
            assert!((output[t] - 0.5 * voice[t - LATENCY_IN_SAMPLES]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_automatic_gain_follows_background() {
        let rate = 44100.0;
        let mut m = Melodifyer::new();
        m.setup(rate as u32, 1).unwrap();
        m.set_automatic_voice_gain_correction(true);

        let frames = 3 * 44100;
        let voice = voice_signal(1, frames, 220.0, rate);
        let background: Vec<f32> = voice_signal(1, frames, 97.0, rate)
            .iter()
            .map(|s| s * 0.5)
            .collect();
        let mut output = vec![0.0; frames];
        m.process(&voice, Some(&background), &mut output);

        // Voice RMS ~0.283, background ~0.141 → target gain ~0.705
        let state = m.state.as_ref().unwrap();
        assert!((state.auto_gain.value() - 0.705).abs() < 0.05);
    }

    #[test]
    fn test_automatic_gain_ignores_quiet_background() {
        let mut m = Melodifyer::new();
        m.setup(44100, 1).unwrap();
        m.set_automatic_voice_gain_correction(true);

        let voice = voice_signal(1, 44100, 220.0, 44100.0);
        let background = vec![1e-5; voice.len()];
        let mut output = vec![0.0; voice.len()];
        m.process(&voice, Some(&background), &mut output);

        let state = m.state.as_ref().unwrap();
        assert!((state.auto_gain.value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_matches_fresh_instance() {
        let voice = voice_signal(2, 6000, 300.0, 44100.0);
        let background = voice_signal(2, 6000, 110.0, 44100.0);

        let mut fresh = configured(44100, 2);
        let mut used = configured(44100, 2);
        used.set_automatic_voice_gain_correction(true);
        fresh.set_automatic_voice_gain_correction(true);

        let mut scratch = vec![0.0; voice.len()];
        used.process(&voice, Some(&background), &mut scratch);
        used.reset();

        let mut out_fresh = vec![0.0; voice.len()];
        let mut out_used = vec![0.0; voice.len()];
        fresh.process(&voice, Some(&background), &mut out_fresh);
        used.process(&voice, Some(&background), &mut out_used);
        assert_eq!(out_fresh, out_used);
    }

    #[test]
    fn test_set_options_rebuilds_for_new_range() {
        let mut m = configured(44100, 1);
        let options = MelodifyerOptions {
            min_frequency: 100.0,
            end_policy: MelodyEndPolicy::Release,
            ..Default::default()
        };
        m.set_options(options).unwrap();
        assert_eq!(m.options().end_policy, MelodyEndPolicy::Release);
        assert!(m.is_configured());

        let bad = MelodifyerOptions {
            max_frequency: 12000.0,
            ..Default::default()
        };
        assert!(m.set_options(bad).is_err());
        assert_eq!(m.options().min_frequency, 100.0);
    }

    #[test]
    fn test_analysis_window_bounded_at_high_rates() {
        let options = MelodifyerOptions::default();
        let ceiling = 2 * (2.0 * ANALYSIS_RATE / options.min_frequency as f64) as usize;
        let at_48k = EngineState::new(48000, 1, &options).unwrap();

        for rate in [44100, 96000, 176400, 192000] {
            let state = EngineState::new(rate, 1, &options).unwrap();
            assert!(
                state.analysis.len() <= ceiling,
                "{} Hz analysis window {} exceeds {}",
                rate,
                state.analysis.len(),
                ceiling
            );
        }

        let at_192k = EngineState::new(192000, 2, &options).unwrap();
        assert_eq!(at_192k.decimation, 12);
        assert_eq!(at_192k.analysis.len(), at_48k.analysis.len());

        // Low rates are analysed undecimated
        assert_eq!(EngineState::new(22050, 1, &options).unwrap().decimation, 1);
    }

    #[test]
    fn test_high_tracking_range_limits_decimation() {
        let options = MelodifyerOptions {
            max_frequency: 6000.0,
            ..Default::default()
        };
        let state = EngineState::new(192000, 1, &options).unwrap();
        assert_eq!(state.decimation, 8);
    }

    #[test]
    fn test_tracks_voice_pitch_at_192k() {
        let rate = 192000;
        let options = MelodifyerOptions::default();
        let mut state = EngineState::new(rate, 1, &options).unwrap();

        let voice = voice_signal(1, rate as usize / 4, 220.0, rate as f32);
        let mut output = vec![0.0; voice.len()];
        state.process(&voice, None, &mut output, None, &options, 1.0, false);

        let pitch = state.detect_voice();
        assert!(pitch.confidence >= options.voicing_threshold);
        assert!(
            (pitch.frequency - 220.0).abs() < 220.0 * 0.015,
            "expected ~220 Hz, got {} Hz",
            pitch.frequency
        );
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_mismatched_buffers_panic() {
        let mut m = configured(44100, 2);
        let mut output = vec![0.0; 8];
        m.process(&[0.0; 6], None, &mut output);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_output_independent_of_block_sizes(
            splits in proptest::collection::vec(1usize..700, 1..12)
        ) {
            let channels = 2;
            let frames = 3000;
            let voice = voice_signal(channels, frames, 250.0, 44100.0);
            let background = voice_signal(channels, frames, 90.0, 44100.0);

            let mut whole = configured(44100, channels as u16);
            let mut expected = vec![0.0; voice.len()];
            whole.process(&voice, Some(&background), &mut expected);

            let mut split = configured(44100, channels as u16);
            let mut actual = vec![0.0; voice.len()];
            let mut start = 0;
            let mut sizes = splits.iter().cycle();
            while start < frames {
                let len = (*sizes.next().unwrap()).min(frames - start);
                let range = start * channels..(start + len) * channels;
                split.process(
                    &voice[range.clone()],
                    Some(&background[range.clone()]),
                    &mut actual[range],
                );
                start += len;
            }

            prop_assert_eq!(expected, actual);
        }
    }
}
