use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rolling_stats::Stats;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use rauschlab::audio::{play_clip, record_clip};
use rauschlab::config::{DenoiseConfig, DenoiseMethod, FrequencyBand, OfflineConfig};
use rauschlab::constants::MIN_RMS_THRESHOLD;
use rauschlab::signal_processing::{FirBandpass, cancel_noise};
use rauschlab::synth::{
    NoiseConfig, add_noise, generate_brown_noise, generate_tone, mean_squared_error, signal_power,
};
use rauschlab::wav::load_wav;
use rauschlab::save_wav;

#[derive(Parser, Debug)]
#[command(name = "mixfilter")]
#[command(about = "Offline denoising workbench: clip + Brown noise -> FIR/LMS -> WAVs + report")]
struct Args {
    /// Load the clip from a WAV file instead of recording
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Synthesize a test tone of this frequency instead of recording
    #[arg(long)]
    synth: Option<f32>,

    /// Input device name substring for recording (default device if omitted)
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// TOML configuration file ([noise], [filter], [lms] sections)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Clip length in seconds (also truncates a loaded WAV when given)
    #[arg(long)]
    duration: Option<f32>,

    /// Peak amplitude of the added Brown noise
    #[arg(short = 'a', long)]
    noise_amplitude: Option<f32>,

    /// Noise RNG seed for reproducible runs
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Denoising method: fir, lms, both
    #[arg(short = 'm', long, value_enum, default_value = "both")]
    method: MethodChoice,

    /// FIR tap count
    #[arg(short = 't', long)]
    taps: Option<usize>,

    /// FIR passband, e.g. "100-5000"
    #[arg(short = 'b', long)]
    band: Option<FrequencyBand>,

    /// LMS learning rate
    #[arg(long)]
    mu: Option<f32>,

    /// LMS filter order
    #[arg(long)]
    lms_order: Option<usize>,

    /// Output directory (timestamped "mixfilter_..." directory when omitted)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Audition each filtered clip on the output device
    #[arg(long)]
    play: bool,

    /// Output device name substring for audition
    #[arg(long)]
    output_device: Option<String>,

    /// Report format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MethodChoice {
    Fir,
    Lms,
    Both,
}

impl MethodChoice {
    fn methods(self) -> Vec<DenoiseMethod> {
        match self {
            Self::Fir => vec![DenoiseMethod::Fir],
            Self::Lms => vec![DenoiseMethod::Lms],
            Self::Both => vec![DenoiseMethod::Fir, DenoiseMethod::Lms],
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    noise: Option<NoiseConfig>,
    filter: Option<FilterSection>,
    lms: Option<LmsSection>,
}

#[derive(Debug, Deserialize)]
struct FilterSection {
    taps: Option<usize>,
    low_hz: Option<f32>,
    high_hz: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct LmsSection {
    mu: Option<f32>,
    order: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct SignalLevels {
    rms_db: f32,
    peak: f32,
    dc_offset: f32,
}

impl SignalLevels {
    fn measure(samples: &[f32]) -> Self {
        let mut stats: Stats<f32> = Stats::new();
        for &s in samples {
            stats.update(s);
        }
        let peak = samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        Self {
            rms_db: level_db(signal_power(samples).sqrt()),
            peak,
            dc_offset: if stats.count > 0 { stats.mean } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct DenoiseReport {
    method: String,
    output_file: String,
    filtered: SignalLevels,
    mse_filtered: f32,
    snr_before_db: f32,
    snr_after_db: f32,
    snr_gain_db: f32,
}

fn level_db(rms: f32) -> f32 {
    20.0 * rms.max(MIN_RMS_THRESHOLD).log10()
}

/// Positionwise SNR of `degraded` against `clean` in dB
fn snr_db(clean: &[f32], degraded: &[f32]) -> f32 {
    let signal = signal_power(clean).max(1e-12);
    let error = mean_squared_error(clean, degraded).max(1e-12);
    10.0 * (signal / error).log10()
}

fn load_toml_config(path: &PathBuf) -> Result<TomlConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

/// Merge settings: CLI flags win over the TOML file, which wins over defaults
fn apply_settings(
    offline: &mut OfflineConfig,
    toml: &TomlConfig,
    args: &Args,
) -> Result<NoiseConfig> {
    if let Some(ref filter) = toml.filter {
        if let Some(taps) = filter.taps {
            offline.fir_taps = taps;
        }
        match (filter.low_hz, filter.high_hz) {
            (Some(low), Some(high)) => offline.band = FrequencyBand::new(low, high),
            (None, None) => {}
            _ => anyhow::bail!("[filter] needs both low_hz and high_hz, or neither"),
        }
    }
    if let Some(ref lms) = toml.lms {
        if let Some(mu) = lms.mu {
            offline.mu = mu;
        }
        if let Some(order) = lms.order {
            offline.lms_order = order;
        }
    }

    if let Some(duration) = args.duration {
        offline.clip_secs = duration;
    }
    if let Some(taps) = args.taps {
        offline.fir_taps = taps;
    }
    if let Some(band) = args.band {
        offline.band = band;
    }
    if let Some(mu) = args.mu {
        offline.mu = mu;
    }
    if let Some(order) = args.lms_order {
        offline.lms_order = order;
    }

    let mut noise = toml.noise.clone().unwrap_or_default();
    if let Some(amplitude) = args.noise_amplitude {
        noise.amplitude = amplitude;
    }
    if let Some(seed) = args.seed {
        noise.seed = Some(seed);
    }
    Ok(noise)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(format!("mixfilter_{}", Utc::now().format("%Y%m%d_%H%M%S")))
}

fn acquire_clip(args: &Args, config: &DenoiseConfig) -> Result<(Vec<f32>, String)> {
    if let Some(ref path) = args.input {
        let (mut samples, rate) = load_wav(path)?;
        if rate != config.audio.sample_rate {
            log::warn!(
                "{} is {} Hz, pipeline runs at {} Hz",
                path.display(),
                rate,
                config.audio.sample_rate
            );
        }
        if args.duration.is_some() {
            samples.truncate(config.audio.clip_samples(config.offline.clip_secs));
        }
        Ok((samples, path.display().to_string()))
    } else if let Some(freq) = args.synth {
        let samples = generate_tone(
            config.offline.clip_secs,
            config.audio.sample_rate,
            freq,
            0.5,
        );
        Ok((samples, format!("synthesized {:.0} Hz tone", freq)))
    } else {
        let samples = record_clip(
            &config.audio,
            config.offline.clip_secs,
            args.device.as_deref(),
        )?;
        Ok((samples, "recorded clip".to_string()))
    }
}

fn apply_method(
    method: DenoiseMethod,
    offline: &OfflineConfig,
    sample_rate: f32,
    clean: &[f32],
    noisy: &[f32],
) -> rauschlab::Result<Vec<f32>> {
    match method {
        DenoiseMethod::Fir => {
            let mut filter = FirBandpass::new(offline.band, sample_rate, offline.fir_taps)?;
            Ok(filter.apply(noisy))
        }
        DenoiseMethod::Lms => cancel_noise(clean, noisy, offline.lms_order, offline.mu),
    }
}

fn method_name(method: DenoiseMethod) -> &'static str {
    match method {
        DenoiseMethod::Fir => "fir",
        DenoiseMethod::Lms => "lms",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let toml_config = if let Some(ref config_path) = args.config {
        load_toml_config(config_path)?
    } else {
        TomlConfig::default()
    };

    let mut config = DenoiseConfig::default();
    let noise_config = apply_settings(&mut config.offline, &toml_config, &args)?;

    let output_dir = args.output_dir.clone().unwrap_or_else(default_output_dir);
    fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    let (clean, source_desc) = acquire_clip(&args, &config)?;
    log::info!("Clip source: {} ({} samples)", source_desc, clean.len());

    let noise = generate_brown_noise(clean.len(), &noise_config);
    let noisy = add_noise(&clean, &noise);

    let sample_rate = config.audio.sample_rate;
    save_wav(output_dir.join("clean.wav"), &clean, sample_rate)
        .context("Failed to write clean.wav")?;
    save_wav(output_dir.join("noisy.wav"), &noisy, sample_rate)
        .context("Failed to write noisy.wav")?;

    let snr_before = snr_db(&clean, &noisy);
    let mut reports = Vec::new();

    for method in args.method.methods() {
        let name = method_name(method);
        eprintln!("Applying {} filter...", name);
        let filtered = apply_method(method, &config.offline, sample_rate as f32, &clean, &noisy)?;

        let filename = format!("filtered_{}.wav", name);
        save_wav(output_dir.join(&filename), &filtered, sample_rate)
            .with_context(|| format!("Failed to write {}", filename))?;

        let snr_after = snr_db(&clean, &filtered);
        reports.push(DenoiseReport {
            method: name.to_string(),
            output_file: filename,
            filtered: SignalLevels::measure(&filtered),
            mse_filtered: mean_squared_error(&clean, &filtered),
            snr_before_db: snr_before,
            snr_after_db: snr_after,
            snr_gain_db: snr_after - snr_before,
        });

        if args.play {
            play_clip(&config.audio, &filtered, args.output_device.as_deref())?;
        }
    }

    match args.format {
        OutputFormat::Text => print_text(&reports, &source_desc, &clean, &noisy, &config.offline),
        OutputFormat::Csv => print_csv(&reports),
        OutputFormat::Json => print_json(&reports)?,
    }

    eprintln!("Output written to {}", output_dir.display());
    Ok(())
}

fn print_text(
    reports: &[DenoiseReport],
    source_desc: &str,
    clean: &[f32],
    noisy: &[f32],
    offline: &OfflineConfig,
) {
    let clean_levels = SignalLevels::measure(clean);
    let noisy_levels = SignalLevels::measure(noisy);

    eprintln!("Clip: {} ({} samples)", source_desc, clean.len());
    eprintln!(
        "Clean: {:.1} dB RMS, peak {:.3}; noisy: {:.1} dB RMS, peak {:.3}",
        clean_levels.rms_db, clean_levels.peak, noisy_levels.rms_db, noisy_levels.peak
    );
    eprintln!(
        "FIR: {} taps, {}; LMS: order {}, mu {}",
        offline.fir_taps, offline.band, offline.lms_order, offline.mu
    );
    eprintln!();

    println!(
        "{:<8} {:>12} {:>10} {:>12} {:>12} {:>10}",
        "Method", "MSE", "RMS dB", "SNR before", "SNR after", "Gain dB"
    );
    println!("{}", "-".repeat(69));
    for report in reports {
        println!(
            "{:<8} {:>12.6} {:>10.1} {:>12.1} {:>12.1} {:>10.1}",
            report.method,
            report.mse_filtered,
            report.filtered.rms_db,
            report.snr_before_db,
            report.snr_after_db,
            report.snr_gain_db
        );
    }
}

fn print_csv(reports: &[DenoiseReport]) {
    println!("method,output_file,mse_filtered,rms_db,peak,dc_offset,snr_before_db,snr_after_db,snr_gain_db");
    for report in reports {
        println!(
            "{},{},{:.8},{:.2},{:.6},{:.6},{:.2},{:.2},{:.2}",
            report.method,
            report.output_file,
            report.mse_filtered,
            report.filtered.rms_db,
            report.filtered.peak,
            report.filtered.dc_offset,
            report.snr_before_db,
            report.snr_after_db,
            report.snr_gain_db
        );
    }
}

fn print_json(reports: &[DenoiseReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> Args {
        Args::parse_from(["mixfilter"])
    }

    #[test]
    fn test_settings_defaults() {
        let mut offline = OfflineConfig::default();
        let noise = apply_settings(&mut offline, &TomlConfig::default(), &bare_args()).unwrap();

        assert_eq!(offline.fir_taps, 101);
        assert_eq!(offline.lms_order, 32);
        assert!((noise.amplitude - 0.05).abs() < 1e-6);
        assert!(noise.seed.is_none());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml: TomlConfig = toml::from_str(
            "[noise]\namplitude = 0.2\n\n[filter]\ntaps = 51\nlow_hz = 200.0\nhigh_hz = 2000.0\n\n[lms]\nmu = 0.05\n",
        )
        .unwrap();

        let args = Args::parse_from(["mixfilter", "--taps", "75", "--noise-amplitude", "0.3"]);
        let mut offline = OfflineConfig::default();
        let noise = apply_settings(&mut offline, &toml, &args).unwrap();

        // CLI wins
        assert_eq!(offline.fir_taps, 75);
        assert!((noise.amplitude - 0.3).abs() < 1e-6);
        // TOML fills what the CLI left alone
        assert!((offline.band.low_hz() - 200.0).abs() < 1e-3);
        assert!((offline.mu - 0.05).abs() < 1e-6);
        // Untouched values stay at defaults
        assert_eq!(offline.lms_order, 32);
    }

    #[test]
    fn test_half_band_rejected() {
        let toml: TomlConfig = toml::from_str("[filter]\nlow_hz = 200.0\n").unwrap();
        let mut offline = OfflineConfig::default();
        assert!(apply_settings(&mut offline, &toml, &bare_args()).is_err());
    }

    #[test]
    fn test_method_choice_expansion() {
        assert_eq!(MethodChoice::Both.methods().len(), 2);
        assert_eq!(MethodChoice::Fir.methods(), vec![DenoiseMethod::Fir]);
    }
}
