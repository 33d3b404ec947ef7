use crossbeam_channel::bounded;
use rauschlab::audio::AudioCapture;
use rauschlab::config::DenoiseConfig;
use rauschlab::constants::MIN_RMS_THRESHOLD;
use rauschlab::synth::signal_power;
use std::time::{Duration, Instant};

fn main() -> anyhow::Result<()> {
    println!("=== Microphone Level Meter ===");
    println!("This demo captures mono audio and displays RMS and peak levels.");
    println!("Press Ctrl+C to stop.\n");

    let config = DenoiseConfig::default();

    println!("Configuration:");
    println!("  Sample rate: {} Hz", config.audio.sample_rate);
    println!("  Buffer size: {} samples", config.audio.buffer_size);
    println!("  Channels: {}\n", config.audio.channels);

    // Create channel for audio data
    let (audio_tx, audio_rx) = bounded(10);

    // Start audio capture
    println!("Starting audio capture...\n");
    let _capture = AudioCapture::new(&config.audio, audio_tx, None)?;

    println!("Capturing audio... (Ctrl+C to stop)");
    println!(
        "{:<10} {:<10} {:<10} {:<10}",
        "Time (s)", "RMS", "Peak", "dBFS"
    );
    println!("{}", "-".repeat(40));

    let start = Instant::now();
    let mut window_peak = 0.0f32;
    let mut last_row = Instant::now();

    loop {
        // Drain promptly so no capture buffers get dropped
        let data = match audio_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(data) => data,
            Err(_) => continue,
        };

        let rms = signal_power(&data).sqrt();
        window_peak = data.iter().fold(window_peak, |a, &b| a.max(b.abs()));

        // One printed row per 100 ms, whichever buffer lands on it
        if last_row.elapsed() >= Duration::from_millis(100) {
            let dbfs = 20.0 * rms.max(MIN_RMS_THRESHOLD).log10();
            println!(
                "{:<10.2} {:<10.4} {:<10.4} {:<10.1}",
                start.elapsed().as_secs_f32(),
                rms,
                window_peak,
                dbfs
            );
            window_peak = 0.0;
            last_row = Instant::now();
        }
    }
}
