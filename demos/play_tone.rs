//! # Play Tone
//!
//! Play a tone on the default output device and change it while it plays.
//!
//! **Concepts:** Engine setup, live parameter control, start/stop
//!
//! ```bash
//! cargo run --example play_tone
//! ```

use std::time::Duration;
use tonewave::prelude::*;

fn main() -> tonewave::Result<()> {
    tracing_subscriber::fmt::init();

    for device in tonewave::list_output_devices()? {
        println!("{device}");
    }

    let engine = ToneEngine::builder().build()?;
    engine.set_frequency(440.0);
    engine.set_amplitude(30.0);

    engine.start();
    if !engine.is_playing() {
        eprintln!(
            "Could not start playback: {}",
            engine.last_error().unwrap_or_default()
        );
        return Ok(());
    }

    for kind in WaveformKind::all() {
        println!("Playing 440Hz {kind}...");
        engine.set_waveform_kind(*kind);
        std::thread::sleep(Duration::from_secs(1));
    }

    println!("Sweeping 220Hz -> 880Hz...");
    engine.set_waveform_kind(WaveformKind::Sine);
    for step in 0..=100 {
        engine.set_frequency(220.0 * 4f64.powf(step as f64 / 100.0));
        std::thread::sleep(Duration::from_millis(20));
    }

    engine.stop();
    Ok(())
}
