//! # Live Karaoke
//!
//! Sing into the default input; the voice is pulled toward the melody of a
//! MIDI file and played back in real time. Press Enter to stop.
//!
//! **Concepts:** duplex interleaved callback, gain controls across threads
//!
//! ```bash
//! cargo run --example live_karaoke -- melody.mid [track] [channel]
//! ```

use melodify::prelude::*;
use std::io::BufRead;

fn main() -> melodify::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: live_karaoke <melody.mid> [track] [channel]");
        std::process::exit(2);
    };
    let track = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let midi_channel = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0);

    let mut device = Device::new();
    device.setup(0, 0, 256)?;
    let format = device
        .format()
        .ok_or(melodify::io::Error::InvalidState("device has no format"))?;

    let fs = FileSystem::platform("melodify");
    let mut melodifyer = Melodifyer::new();
    melodifyer.setup(format.sample_rate, format.channels)?;
    melodifyer.set_melody_midi_file(&fs, SpecialLocation::Cwd, path, track, midi_channel)?;
    let gains = melodifyer.gain_controls();
    gains.set_extra_db(3.0);

    device.set_callback(Callback::interleaved_input_output(
        move |input, output, _frames| {
            melodifyer.process(input, None, output);
        },
    ))?;

    let latency = device.latency()?;
    println!(
        "{} ch @ {} Hz, device latency {} + correction {} frames",
        format.channels,
        format.sample_rate,
        latency.latency,
        melodify::LATENCY_IN_SAMPLES
    );

    device.start()?;
    println!("Sing! Press Enter to stop.");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    device.stop();

    println!(
        "{} callbacks, {} stream errors",
        device.callback_count(),
        device.stream_error_count()
    );
    Ok(())
}
