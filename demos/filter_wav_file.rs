use rauschlab::config::DenoiseConfig;
use rauschlab::signal_processing::FirBandpass;
use rauschlab::synth::signal_power;
use rauschlab::wav::{load_wav, save_wav};
use std::env;
use std::path::Path;

fn filtered_name(input: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir
            .join(format!("{}_filtered.wav", stem))
            .display()
            .to_string(),
        _ => format!("{}_filtered.wav", stem),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <wav_file>", args[0]);
        eprintln!("\nExample:");
        eprintln!("  cargo run --example filter_wav_file noisy.wav");
        eprintln!("\nGenerate test material with:");
        eprintln!("  cargo run --bin mixfilter -- --source synth");
        std::process::exit(1);
    }

    let filename = &args[1];

    println!("=== WAV Bandpass Walkthrough ===");
    println!("File: {}\n", filename);

    // Open WAV file (stereo is folded down to mono)
    let (samples, sample_rate) = load_wav(filename)?;

    println!("WAV file info:");
    println!("  Sample rate: {} Hz", sample_rate);
    println!("  Samples: {}", samples.len());
    println!(
        "  Duration: {:.2}s\n",
        samples.len() as f32 / sample_rate as f32
    );

    let config = DenoiseConfig::default();

    println!("Filter:");
    println!("  Band: {}", config.offline.band);
    println!("  Taps: {}\n", config.offline.fir_taps);

    let mut filter = FirBandpass::new(
        config.offline.band,
        sample_rate as f32,
        config.offline.fir_taps,
    )?;

    // Process the clip buffer by buffer, the way the live pipeline would
    println!("Processing...\n");
    println!("{:<10} {:<12} {:<12}", "Time (s)", "In RMS", "Out RMS");
    println!("{}", "-".repeat(34));

    let chunk_size = config.audio.buffer_size;
    let mut filtered = Vec::with_capacity(samples.len());
    let mut sample_count = 0usize;
    let mut next_row = 0usize;

    for chunk in samples.chunks(chunk_size) {
        let mut buffer = chunk.to_vec();
        let in_rms = signal_power(&buffer).sqrt();
        filter.process_buffer(&mut buffer);
        let out_rms = signal_power(&buffer).sqrt();
        filtered.extend_from_slice(&buffer);

        // One row per second of audio
        if sample_count >= next_row {
            println!(
                "{:<10.2} {:<12.4} {:<12.4}",
                sample_count as f32 / sample_rate as f32,
                in_rms,
                out_rms
            );
            next_row += sample_rate as usize;
        }
        sample_count += chunk.len();
    }

    let output = filtered_name(filename);
    save_wav(&output, &filtered, sample_rate)?;

    println!("\n{}", "=".repeat(34));
    println!("Statistics:");
    println!("  Input power:  {:.6}", signal_power(&samples));
    println!("  Output power: {:.6}", signal_power(&filtered));
    println!("  Saved: {}", output);

    Ok(())
}
