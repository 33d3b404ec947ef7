use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use rauschlab::audio::{play_clip, record_clip};
use rauschlab::config::{DenoiseConfig, DenoiseMethod, FrequencyBand};
use rauschlab::signal_processing::{FirBandpass, cancel_noise};
use rauschlab::synth::{NoiseConfig, add_noise, generate_brown_noise, generate_tone};
use rauschlab::wav::load_wav;

#[derive(Parser, Debug)]
#[command(name = "mixfilter_gui")]
#[command(about = "Offline denoising workbench - GUI", long_about = None)]
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

    /// Output device name substring for audition
    #[arg(long)]
    output_device: Option<String>,

    /// Clip length in seconds
    #[arg(long)]
    duration: Option<f32>,

    /// Peak amplitude of the added Brown noise
    #[arg(short = 'a', long)]
    noise_amplitude: Option<f32>,

    /// Noise RNG seed for reproducible runs
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Initial filter length (FIR taps / LMS order slider)
    #[arg(short = 't', long)]
    taps: Option<usize>,

    /// Initial FIR passband, e.g. "100-5000"
    #[arg(short = 'b', long)]
    band: Option<FrequencyBand>,

    /// Initial LMS learning rate
    #[arg(long)]
    mu: Option<f32>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct GuiLogger {
    tx: Sender<String>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(msg);
        }
    }

    fn flush(&self) {}
}

const MAX_ORDER: usize = 500;
const MIN_MU: f64 = 0.001;
const MAX_MU: f64 = 0.1;
const MU_STEP: f64 = 0.001;
const MAX_LOG_LINES: usize = 1000;

const MAX_PLOT_POINTS: usize = 4096;
const PLOT_HEIGHT: f32 = 160.0;
const CLEAN_COLOR: (u8, u8, u8) = (100, 200, 255);
const NOISY_COLOR: (u8, u8, u8) = (255, 150, 50);
const FILTERED_COLOR: (u8, u8, u8) = (30, 255, 60);

/// Thin the clip for display; x stays the original sample index
fn decimate(samples: &[f32], max_points: usize) -> PlotPoints {
    let step = (samples.len() / max_points).max(1);
    samples
        .iter()
        .step_by(step)
        .enumerate()
        .map(|(k, &s)| [(k * step) as f64, s as f64])
        .collect()
}

struct WorkbenchApp {
    rx: Receiver<String>,
    config: DenoiseConfig,
    output_device: Option<String>,
    clean: Vec<f32>,
    noisy: Vec<f32>,
    filtered: Option<Vec<f32>>,
    filtered_desc: Option<String>,
    method: DenoiseMethod,
    order: usize,
    low_hz: f32,
    high_hz: f32,
    mu: f64,
    show_plots: bool,
    log_lines: VecDeque<String>,
}

impl WorkbenchApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        rx: Receiver<String>,
        config: DenoiseConfig,
        output_device: Option<String>,
        clean: Vec<f32>,
        noisy: Vec<f32>,
    ) -> Self {
        let offline = config.offline.clone();
        Self {
            rx,
            config,
            output_device,
            clean,
            noisy,
            filtered: None,
            filtered_desc: None,
            method: DenoiseMethod::Fir,
            order: offline.fir_taps,
            low_hz: offline.band.low_hz(),
            high_hz: offline.band.high_hz(),
            mu: offline.mu as f64,
            show_plots: false,
            log_lines: VecDeque::new(),
        }
    }

    /// Runs synchronously on the UI thread; a rejected design keeps the
    /// previous filtered buffer
    fn apply_filter(&mut self) {
        let sample_rate = self.config.audio.sample_rate as f32;
        match self.method {
            DenoiseMethod::Fir => {
                let band = FrequencyBand::new(self.low_hz, self.high_hz);
                match FirBandpass::new(band, sample_rate, self.order) {
                    Ok(mut filter) => {
                        self.filtered = Some(filter.apply(&self.noisy));
                        let desc = format!("FIR {} taps, {}", filter.num_taps(), band);
                        log::info!("Applied {}", desc);
                        self.filtered_desc = Some(desc);
                    }
                    Err(e) => log::error!("FIR design rejected: {}", e),
                }
            }
            DenoiseMethod::Lms => {
                match cancel_noise(&self.clean, &self.noisy, self.order, self.mu as f32) {
                    Ok(filtered) => {
                        self.filtered = Some(filtered);
                        let desc = format!("LMS order {}, mu {:.3}", self.order, self.mu);
                        log::info!("Applied {}", desc);
                        self.filtered_desc = Some(desc);
                    }
                    Err(e) => log::error!("LMS rejected: {}", e),
                }
            }
        }
    }

    /// Blocks the UI thread for the clip duration, like the bench it mimics
    fn play_filtered(&self) {
        let Some(ref filtered) = self.filtered else {
            log::warn!("Apply a filter first");
            return;
        };
        log::info!("Playing filtered clip...");
        if let Err(e) = play_clip(&self.config.audio, filtered, self.output_device.as_deref()) {
            log::error!("Playback failed: {}", e);
        } else {
            log::info!("Playback finished");
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        egui::ComboBox::from_label("Method")
            .selected_text(match self.method {
                DenoiseMethod::Fir => "FIR bandpass",
                DenoiseMethod::Lms => "LMS adaptive",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.method, DenoiseMethod::Fir, "FIR bandpass");
                ui.selectable_value(&mut self.method, DenoiseMethod::Lms, "LMS adaptive");
            });

        ui.add_space(4.0);
        ui.label(egui::RichText::new("Order / taps").color(egui::Color32::LIGHT_GRAY));
        ui.add(egui::Slider::new(&mut self.order, 1..=MAX_ORDER));

        let nyquist = self.config.audio.nyquist_hz();
        ui.label(egui::RichText::new("Low cutoff").color(egui::Color32::LIGHT_GRAY));
        ui.add(egui::Slider::new(&mut self.low_hz, 0.0..=nyquist).suffix(" Hz"));
        ui.label(egui::RichText::new("High cutoff").color(egui::Color32::LIGHT_GRAY));
        ui.add(egui::Slider::new(&mut self.high_hz, 0.0..=nyquist).suffix(" Hz"));

        ui.label(egui::RichText::new("Mu (LMS)").color(egui::Color32::LIGHT_GRAY));
        ui.add(egui::Slider::new(&mut self.mu, MIN_MU..=MAX_MU).step_by(MU_STEP));

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.apply_filter();
            }
            if ui.button("Play").clicked() {
                self.play_filtered();
            }
            if ui.button("Visualize").clicked() {
                self.show_plots = !self.show_plots;
            }
        });

        ui.add_space(8.0);
        ui.separator();
        ui.label(
            egui::RichText::new(format!(
                "Clip: {} samples ({:.1} s)",
                self.clean.len(),
                self.clean.len() as f32 / self.config.audio.sample_rate as f32
            ))
            .color(egui::Color32::from_rgb(160, 160, 180)),
        );
        match self.filtered_desc {
            Some(ref desc) => {
                ui.label(
                    egui::RichText::new(format!("Filtered: {}", desc))
                        .color(egui::Color32::from_rgb(100, 255, 100)),
                );
            }
            None => {
                ui.label(
                    egui::RichText::new("Filtered: none yet").color(egui::Color32::DARK_GRAY),
                );
            }
        }
    }

    fn draw_plots(&self, ui: &mut egui::Ui) {
        let panes: [(&str, &str, Option<&[f32]>, (u8, u8, u8)); 3] = [
            ("original_plot", "Original", Some(&self.clean), CLEAN_COLOR),
            ("noisy_plot", "Noisy", Some(&self.noisy), NOISY_COLOR),
            (
                "filtered_plot",
                "Filtered",
                self.filtered.as_deref(),
                FILTERED_COLOR,
            ),
        ];

        for (id, title, samples, color) in panes {
            ui.label(
                egui::RichText::new(title)
                    .color(egui::Color32::LIGHT_GRAY)
                    .small(),
            );
            let Some(samples) = samples else {
                ui.label(egui::RichText::new("apply a filter first").color(egui::Color32::DARK_GRAY));
                ui.add_space(4.0);
                continue;
            };
            let points = decimate(samples, MAX_PLOT_POINTS);
            Plot::new(id)
                .height(PLOT_HEIGHT)
                .include_x(0.0)
                .include_x(samples.len().max(1) as f64)
                .include_y(-1.0)
                .include_y(1.0)
                .y_axis_min_width(60.0)
                .allow_drag(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new(title, points)
                            .color(egui::Color32::from_rgb(color.0, color.1, color.2)),
                    );
                });
            ui.add_space(4.0);
        }
    }
}

impl eframe::App for WorkbenchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(msg) = self.rx.try_recv() {
            self.log_lines.push_back(msg);
            while self.log_lines.len() > MAX_LOG_LINES {
                self.log_lines.pop_front();
            }
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Log")
                            .color(egui::Color32::LIGHT_GRAY)
                            .strong(),
                    );
                    if ui.small_button("Clear").clicked() {
                        self.log_lines.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_rgb(180, 180, 180)),
                            );
                        }
                    });
            });

        egui::SidePanel::left("controls_panel")
            .default_width(260.0)
            .resizable(false)
            .show(ctx, |ui| {
                self.draw_controls(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.show_plots {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_plots(ui);
                });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("Apply a filter, then Visualize")
                            .color(egui::Color32::DARK_GRAY),
                    );
                });
            }
        });
    }
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

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let (tx, rx) = crossbeam_channel::unbounded::<String>();

    let logger = GuiLogger {
        tx,
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = DenoiseConfig::default();
    if let Some(duration) = args.duration {
        config.offline.clip_secs = duration;
    }
    if let Some(taps) = args.taps {
        config.offline.fir_taps = taps;
    }
    if let Some(band) = args.band {
        config.offline.band = band;
    }
    if let Some(mu) = args.mu {
        config.offline.mu = mu;
    }

    let mut noise_config = NoiseConfig::default();
    if let Some(amplitude) = args.noise_amplitude {
        noise_config.amplitude = amplitude;
    }
    if let Some(seed) = args.seed {
        noise_config.seed = Some(seed);
    }

    // The clip is captured before the window opens; the bench starts with
    // its material already on the table
    eprintln!("Acquiring clip ({:.1} s)...", config.offline.clip_secs);
    let (clean, source_desc) = acquire_clip(&args, &config)?;
    eprintln!("Clip ready: {} ({} samples)", source_desc, clean.len());

    let noise = generate_brown_noise(clean.len(), &noise_config);
    let noisy = add_noise(&clean, &noise);
    log::info!(
        "Added Brown noise, peak amplitude {:.3}",
        noise_config.amplitude
    );

    let output_device = args.output_device.clone();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([700.0, 450.0])
            .with_title("Mixfilter - Offline Denoising Workbench"),
        ..Default::default()
    };

    eframe::run_native(
        "Mixfilter",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(WorkbenchApp::new(
                cc,
                rx,
                config,
                output_device,
                clean,
                noisy,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimate_respects_budget() {
        let samples = vec![0.1f32; 100_000];
        let points = decimate(&samples, MAX_PLOT_POINTS);
        let points: Vec<[f64; 2]> = points.points().iter().map(|p| [p.x, p.y]).collect();
        assert!(points.len() <= MAX_PLOT_POINTS * 2);
        // Index spacing survives thinning
        assert_eq!(points[0][0], 0.0);
        assert!(points[1][0] >= 1.0);
    }

    #[test]
    fn test_decimate_short_clip_untouched() {
        let samples = vec![0.5f32, -0.5, 0.25];
        let points = decimate(&samples, MAX_PLOT_POINTS);
        assert_eq!(points.points().len(), 3);
    }
}
