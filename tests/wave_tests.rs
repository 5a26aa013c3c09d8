//! Offline rendering through WAVE files
//!
//! Voice and background files are read with `InputWaveFile`, run through the
//! melodifier and written with `OutputWaveFile`.
//!
//! Run with:
//! ```bash
//! cargo test -p melodify --test wave_tests --features wav
//! ```

#![cfg(feature = "wav")]

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::tolerances::*;
use helpers::{
    channel, detect_note, generate_sine, init_tracing, melody_smf, to_interleaved, write_fixture,
    TEST_SAMPLE_RATE,
};
use melodify::prelude::*;
use melodify::LATENCY_IN_SAMPLES;
use std::path::Path;

const CHANNELS: u16 = 2;
const BLOCK: usize = 1000;

fn write_wave(fs: &FileSystem, name: &str, interleaved: &[f32]) {
    let mut file = OutputWaveFile::new();
    file.create(fs, SpecialLocation::Temporaries, name, CHANNELS, TEST_SAMPLE_RATE)
        .unwrap();
    file.write(interleaved, interleaved.len() / CHANNELS as usize)
        .unwrap();
    file.close().unwrap();
}

fn temp_fs(dir: &Path) -> FileSystem {
    FileSystem::builder()
        .root(SpecialLocation::Temporaries, dir)
        .build()
}

#[test]
fn test_offline_render_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fs = temp_fs(dir.path());

    let seconds = 2.0;
    let frames = (seconds * TEST_SAMPLE_RATE as f64) as usize;
    let voice_mono: Vec<f32> = generate_sine(300.0, TEST_SAMPLE_RATE as f64, frames)
        .iter()
        .map(|s| s * 0.5)
        .collect();
    write_wave(&fs, "voice.wav", &to_interleaved(&voice_mono, 2));
    write_wave(&fs, "background.wav", &vec![0.0; frames * 2]);
    write_fixture(
        dir.path(),
        "melody.mid",
        &melody_smf(&[(0.0, 4.0, 59)], 0, 120.0),
    );

    let mut melodifyer = Melodifyer::new();
    melodifyer.setup(TEST_SAMPLE_RATE, CHANNELS).unwrap();
    melodifyer
        .set_melody_midi_file(&fs, SpecialLocation::Temporaries, "melody.mid", 0, 0)
        .unwrap();

    let mut voice = InputWaveFile::new();
    voice
        .open(&fs, SpecialLocation::Temporaries, "voice.wav")
        .unwrap();
    let mut background = InputWaveFile::new();
    background
        .open(&fs, SpecialLocation::Temporaries, "background.wav")
        .unwrap();
    let mut output = OutputWaveFile::new();
    output
        .create(&fs, SpecialLocation::Temporaries, "out.wav", CHANNELS, TEST_SAMPLE_RATE)
        .unwrap();

    let mut voice_block = vec![0.0; BLOCK * 2];
    let mut background_block = vec![0.0; BLOCK * 2];
    let mut out_block = vec![0.0; BLOCK * 2];
    loop {
        let n = voice.read(&mut voice_block, BLOCK).unwrap();
        if n == 0 {
            break;
        }
        let m = background.read(&mut background_block, n).unwrap();
        assert_eq!(m, n);
        let len = n * 2;
        melodifyer.process(
            &voice_block[..len],
            Some(&background_block[..len]),
            &mut out_block[..len],
        );
        output.write(&out_block[..len], n).unwrap();
    }
    assert_eq!(voice.remaining_samples(), 0);
    assert_eq!(output.frames_written(), frames as u64);
    output.close().unwrap();

    let mut rendered = InputWaveFile::new();
    rendered
        .open(&fs, SpecialLocation::Temporaries, "out.wav")
        .unwrap();
    assert_eq!(rendered.length_in_samples() as usize, frames);
    let mut data = vec![0.0; frames * 2];
    assert_eq!(rendered.read(&mut data, frames).unwrap(), frames);

    let left = channel(&data, 2, 0);
    assert!(left[..LATENCY_IN_SAMPLES].iter().all(|s| s.is_finite()));
    // 300 Hz steered to B3
    assert_eq!(detect_note(&left, TEST_SAMPLE_RATE, TEST_SAMPLE_RATE as usize), Some(59));
}

#[test]
fn test_seek_and_restart_bookkeeping() {
    let dir = tempfile::tempdir().unwrap();
    let fs = temp_fs(dir.path());

    let frames = 4410;
    let ramp: Vec<f32> = (0..frames * 2)
        .map(|i| (i / 2) as f32 / frames as f32 - 0.5)
        .collect();
    write_wave(&fs, "ramp.wav", &ramp);

    let mut file = InputWaveFile::new();
    file.open(&fs, SpecialLocation::Temporaries, "ramp.wav")
        .unwrap();
    assert_eq!(file.channels(), CHANNELS);
    assert_eq!(file.sample_rate(), TEST_SAMPLE_RATE);

    // 50 ms = 2205 frames
    file.set_time_position(50.0).unwrap();
    assert_eq!(file.remaining_samples(), (frames - 2205) as u32);

    let mut block = [0.0; 2];
    file.read(&mut block, 1).unwrap();
    assert!((block[0] - ramp[2205 * 2]).abs() <= INT16_EPSILON * 2.0);

    file.set_sample_position(u32::MAX).unwrap();
    assert_eq!(file.remaining_samples(), 0);
    assert_eq!(file.read(&mut block, 1).unwrap(), 0);

    file.restart().unwrap();
    assert_eq!(file.remaining_samples(), frames as u32);

    file.close();
    assert!(!file.is_open());
}

#[test]
fn test_bundled_resources_refuse_writes() {
    let mut bundle = melodify::AssetBundle::new();
    bundle.insert("song.mid", melody_smf(&[(0.0, 1.0, 60)], 0, 120.0));
    let fs = FileSystem::builder().resources_bundle(bundle).build();

    let mut melodifyer = Melodifyer::new();
    melodifyer
        .set_melody_midi_file(&fs, SpecialLocation::Resources, "song.mid", 0, 0)
        .unwrap();
    assert_eq!(melodifyer.melody().unwrap().notes()[0].key, 60);

    let mut output = OutputWaveFile::new();
    assert!(output
        .create(&fs, SpecialLocation::Resources, "out.wav", 2, TEST_SAMPLE_RATE)
        .is_err());
}
