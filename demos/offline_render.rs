//! # Offline Render
//!
//! Correct a recorded voice toward a MIDI melody and mix it with a backing
//! track, file to file.
//!
//! **Concepts:** InputWaveFile, OutputWaveFile, FileSystem locations, Melodifyer
//!
//! ```bash
//! cargo run --example offline_render -- voice.wav backing.wav melody.mid out.wav [track] [channel]
//! ```

use melodify::prelude::*;

const BLOCK: usize = 1024;

fn main() -> melodify::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 5 {
        eprintln!("usage: offline_render <voice.wav> <backing.wav> <melody.mid> <out.wav> [track] [channel]");
        std::process::exit(2);
    }
    let track = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0);
    let midi_channel = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(0);

    let fs = FileSystem::platform("melodify");
    let here = SpecialLocation::Cwd;

    let mut voice = InputWaveFile::new();
    voice.open(&fs, here, &args[1])?;
    let mut backing = InputWaveFile::new();
    backing.open(&fs, here, &args[2])?;

    let channels = voice.channels();
    let sample_rate = voice.sample_rate();
    if backing.channels() != channels || backing.sample_rate() != sample_rate {
        eprintln!("voice and backing must share channel count and sample rate");
        std::process::exit(1);
    }

    let mut melodifyer = Melodifyer::new();
    melodifyer.setup(sample_rate, channels)?;
    melodifyer.set_melody_midi_file(&fs, here, &args[3], track, midi_channel)?;
    melodifyer.set_automatic_voice_gain_correction(true);

    let mut output = OutputWaveFile::new();
    output.create(&fs, here, &args[4], channels, sample_rate)?;

    let width = channels as usize;
    let mut voice_block = vec![0.0; BLOCK * width];
    let mut backing_block = vec![0.0; BLOCK * width];
    let mut out_block = vec![0.0; BLOCK * width];

    // Run the latency out so the tail is not cut
    let mut flush = melodifyer.latency_in_samples();
    loop {
        let frames = voice.read(&mut voice_block, BLOCK)?;
        let frames = if frames == 0 {
            if flush == 0 {
                break;
            }
            let n = flush.min(BLOCK);
            flush -= n;
            voice_block[..n * width].fill(0.0);
            n
        } else {
            frames
        };

        let len = frames * width;
        let got = backing.read(&mut backing_block, frames)?;
        backing_block[got * width..len].fill(0.0);

        melodifyer.process(
            &voice_block[..len],
            Some(&backing_block[..len]),
            &mut out_block[..len],
        );
        output.write(&out_block[..len], frames)?;
    }

    let written = output.frames_written();
    output.close()?;
    println!(
        "Rendered {:.2}s to {}",
        written as f64 / sample_rate as f64,
        args[4]
    );
    Ok(())
}
