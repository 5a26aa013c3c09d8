//! Test helpers and fixtures for melodify integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): Spectral round trips
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use melodify::PitchDetector;
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::{Path, PathBuf};

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Ticks per quarter note in generated MIDI fixtures.
pub const TICKS_PER_BEAT: u16 = 480;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Sine wave at `frequency` for `num_samples` samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Copy a mono signal into every channel of an interleaved buffer.
pub fn to_interleaved(mono: &[f32], channels: usize) -> Vec<f32> {
    mono.iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect()
}

/// Extract one channel from an interleaved buffer.
pub fn channel(interleaved: &[f32], channels: usize, index: usize) -> Vec<f32> {
    interleaved
        .iter()
        .skip(index)
        .step_by(channels)
        .copied()
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Nearest MIDI note of the dominant pitch in a mono window starting at
/// `start`, or `None` when the window is unvoiced.
pub fn detect_note(mono: &[f32], sample_rate: u32, start: usize) -> Option<u8> {
    let mut detector = PitchDetector::with_range(sample_rate as f64, 80.0, 1000.0);
    let window = detector.buffer_size();
    let result = detector.detect(&mono[start..start + window]);
    if result.is_voiced() && result.confidence > 0.6 {
        result.midi_note
    } else {
        None
    }
}

/// A melody note in beats: (start, length, key).
pub type BeatNote = (f64, f64, u8);

/// Build a single-track Standard MIDI File holding `notes` on `channel` at a
/// constant `bpm`.
pub fn melody_smf(notes: &[BeatNote], channel: u8, bpm: f64) -> Vec<u8> {
    let ticks = |beats: f64| (beats * TICKS_PER_BEAT as f64).round() as u32;

    let mut events: Vec<(u32, MidiMessage)> = Vec::new();
    for &(start, length, key) in notes {
        events.push((
            ticks(start),
            MidiMessage::NoteOn {
                key: key.into(),
                vel: 100.into(),
            },
        ));
        events.push((
            ticks(start + length),
            MidiMessage::NoteOff {
                key: key.into(),
                vel: 0.into(),
            },
        ));
    }
    // Note-offs before note-ons at the same tick
    events.sort_by_key(|(tick, message)| (*tick, matches!(message, MidiMessage::NoteOn { .. })));

    let tempo = (60_000_000.0 / bpm).round() as u32;
    let mut track = vec![TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo.into())),
    }];
    let mut last = 0;
    for (tick, message) in events {
        track.push(TrackEvent {
            delta: (tick - last).into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message,
            },
        });
        last = tick;
    }
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(
            Format::SingleTrack,
            Timing::Metrical(TICKS_PER_BEAT.into()),
        ),
        tracks: vec![track],
    };
    let mut data = Vec::new();
    smf.write_std(&mut data)
        .expect("Failed to serialize MIDI fixture");
    data
}

/// Write a fixture file into `dir` and return its path.
pub fn write_fixture(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("Failed to write fixture");
    path
}
