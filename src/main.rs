use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::bounded;
use rolling_stats::Stats;

use rauschlab::audio::{AudioCapture, AudioPlayback, list_input_devices, list_output_devices};
use rauschlab::config::{DenoiseConfig, FilterKind, FrequencyBand};
use rauschlab::constants::MIN_RMS_THRESHOLD;
use rauschlab::processing::{LiveProcessor, SharedFilterParams};

#[derive(Parser, Debug)]
#[command(name = "rauschlab")]
#[command(about = "Live bandpass passthrough (microphone to speaker)", long_about = None)]
struct Args {
    /// Input device name substring (default device if omitted)
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// Output device name substring (default device if omitted)
    #[arg(long)]
    output_device: Option<String>,

    /// Passband, e.g. "300-3000" or "0.3khz-3khz"
    #[arg(short = 'b', long, default_value = "300-3000")]
    band: FrequencyBand,

    /// Filter length: FIR tap count, or Butterworth order for --filter iir
    #[arg(short = 't', long, default_value = "5")]
    taps: usize,

    /// Filter realization: fir, iir
    #[arg(short = 'f', long, value_enum, default_value = "fir")]
    filter: FilterKind,

    /// Stop after this many seconds (runs until the stream closes if omitted)
    #[arg(long)]
    duration: Option<f32>,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if args.list_devices {
        println!("Input devices:");
        for name in list_input_devices()? {
            println!("  {}", name);
        }
        println!("Output devices:");
        for name in list_output_devices()? {
            println!("  {}", name);
        }
        return Ok(());
    }

    let mut config = DenoiseConfig::default();
    config.live.band = args.band;
    config.live.num_taps = args.taps;
    config.live.kind = args.filter;

    println!("=== Rauschlab - Live Bandpass Passthrough ===");
    println!("Sample rate: {} Hz", config.audio.sample_rate);
    println!("Buffer size: {} samples", config.audio.buffer_size);
    println!("Passband: {}", config.live.band);
    println!(
        "Filter: {:?}, length {}",
        config.live.kind, config.live.num_taps
    );
    println!();

    let params = Arc::new(SharedFilterParams::new(&config.live));
    let processor = LiveProcessor::new(&config.audio, &config.live, Arc::clone(&params))?;

    let (capture_tx, capture_rx) = bounded(10);
    let (playback_tx, playback_rx) = bounded(10);

    println!("Starting audio passthrough...");
    let _capture = AudioCapture::new(&config.audio, capture_tx, args.device.as_deref())?;
    let playback = AudioPlayback::new(&config.audio, playback_rx, args.output_device.as_deref())?;

    println!("Passthrough running. Press Ctrl+C to stop.\n");

    run_processing_loop(capture_rx, playback_tx, processor, &playback, args.duration)?;

    Ok(())
}

fn run_processing_loop(
    capture_rx: crossbeam_channel::Receiver<Vec<f32>>,
    playback_tx: crossbeam_channel::Sender<Vec<f32>>,
    mut processor: LiveProcessor,
    playback: &AudioPlayback,
    duration: Option<f32>,
) -> anyhow::Result<()> {
    let mut level_stats: Stats<f32> = Stats::new();
    let mut last_status = Instant::now();
    let status_interval = Duration::from_secs(1);

    loop {
        // Receive audio data (blocking)
        let mut buffer = match capture_rx.recv() {
            Ok(data) => data,
            Err(_) => {
                eprintln!("Audio stream closed");
                break;
            }
        };

        processor.process_buffer(&mut buffer);
        level_stats.update(processor.rms_out());

        if playback_tx.send(buffer).is_err() {
            eprintln!("Playback stream closed");
            break;
        }

        if last_status.elapsed() >= status_interval {
            let band = processor.applied_params();
            println!(
                "[{:>7.1}s] in {:>6.1} dB  out {:>6.1} dB  band {:.0}-{:.0} Hz  underruns {}",
                processor.elapsed_secs(),
                level_db(processor.rms_in()),
                level_db(processor.rms_out()),
                band.low_hz,
                band.high_hz,
                playback.underruns()
            );
            last_status = Instant::now();
        }

        if let Some(limit) = duration {
            if processor.elapsed_secs() >= limit as f64 {
                println!("\nDuration reached, stopping.");
                break;
            }
        }
    }

    if level_stats.count > 0 {
        println!(
            "Output level: mean {:.1} dB, min {:.1} dB, max {:.1} dB over {} buffers",
            level_db(level_stats.mean),
            level_db(level_stats.min),
            level_db(level_stats.max),
            level_stats.count
        );
    }

    Ok(())
}

/// RMS level in dBFS, floored to keep silence finite
fn level_db(rms: f32) -> f32 {
    20.0 * rms.max(MIN_RMS_THRESHOLD).log10()
}
