//! # Device Tone
//!
//! Play a 440Hz sine through the default device using the separated-buffer
//! output callback, stopping it from the callback after three seconds.
//!
//! **Concepts:** Device setup, callback shapes, BlockingDevice, stop handles
//!
//! ```bash
//! cargo run --example device_tone
//! ```

use melodify::prelude::*;

fn main() -> melodify::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut device = Device::new();
    device.setup(2, 0, 256)?;
    let format = device
        .format()
        .ok_or(melodify::io::Error::InvalidState("device has no format"))?;
    println!(
        "{}: {} ch @ {} Hz, {} frames per block",
        device.backend_name(),
        format.channels,
        format.sample_rate,
        format.buffer_size
    );

    let mut blocking = BlockingDevice::new(&mut device);
    let stop = blocking.stop_handle();

    let sample_rate = format.sample_rate as f32;
    let total = (sample_rate * 3.0) as usize;
    let mut phase = 0.0f32;
    let mut elapsed = 0usize;
    blocking
        .device()
        .set_callback(Callback::output(move |mut out| {
            let frames = out.frames();
            let step = 440.0 / sample_rate;
            for channel in out.iter_mut() {
                let mut p = phase;
                for sample in channel.iter_mut() {
                    *sample = 0.2 * (2.0 * std::f32::consts::PI * p).sin();
                    p = (p + step).fract();
                }
            }
            phase = (phase + step * frames as f32).fract();
            elapsed += frames;
            if elapsed >= total {
                stop.stop();
            }
        }))?;

    let latency = blocking.device().latency()?;
    println!(
        "Latency {} frames, at most {} frames per callback",
        latency.latency, latency.max_buffer_size
    );

    blocking.start_and_wait()?;
    println!("Done");
    Ok(())
}
