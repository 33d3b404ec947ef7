use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded};
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use rauschlab::audio::{AudioPlayback, AudioSource, DeviceSource, WavFileSource, list_input_devices};
use rauschlab::config::{DenoiseConfig, FilterKind, FrequencyBand};
use rauschlab::constants::{MAX_IIR_ORDER, MIN_RMS_THRESHOLD};
use rauschlab::processing::{LiveProcessor, SharedFilterParams};
use rauschlab::signal_processing::SpectrumAnalyzer;

#[derive(Parser, Debug)]
#[command(name = "rauschlab_gui")]
#[command(about = "Live bandpass passthrough - GUI", long_about = None)]
struct Args {
    /// Input device name substring (default device if omitted)
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// Output device name substring (default device if omitted)
    #[arg(long)]
    output_device: Option<String>,

    /// Process a WAV file instead of the microphone
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Initial passband, e.g. "300-3000"
    #[arg(short = 'b', long, default_value = "300-3000")]
    band: FrequencyBand,

    /// Initial filter length: FIR tap count, or Butterworth order for --filter iir
    #[arg(short = 't', long, default_value = "5")]
    taps: usize,

    /// Filter realization: fir, iir
    #[arg(short = 'f', long, value_enum, default_value = "fir")]
    filter: FilterKind,

    /// Start with the speaker muted (avoids mic-to-speaker feedback)
    #[arg(short = 'm', long)]
    muted: bool,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

enum GuiUpdate {
    Data {
        time_secs: f64,
        scope: Vec<f32>,
        rms_in: f32,
        rms_out: f32,
        applied_low_hz: f32,
        applied_high_hz: f32,
        applied_len: usize,
    },
    Log(String),
    Stopped,
}

struct GuiLogger {
    tx: Sender<GuiUpdate>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(GuiUpdate::Log(msg));
        }
    }

    fn flush(&self) {}
}

struct StartResult {
    handle: thread::JoinHandle<()>,
    params: Arc<SharedFilterParams>,
    muted: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

fn start_processing(
    args: &Args,
    config: &DenoiseConfig,
    tx: Sender<GuiUpdate>,
) -> anyhow::Result<StartResult> {
    let params = Arc::new(SharedFilterParams::new(&config.live));
    let muted = Arc::new(AtomicBool::new(args.muted));
    let stop_requested = Arc::new(AtomicBool::new(false));

    let processor = LiveProcessor::new(&config.audio, &config.live, Arc::clone(&params))?;

    let source: Box<dyn AudioSource> = match &args.input {
        Some(path) => Box::new(WavFileSource::new(path, config.audio.buffer_size)?),
        None => Box::new(DeviceSource::new(&config.audio, args.device.as_deref())?),
    };
    if source.sample_rate() != config.audio.sample_rate {
        log::warn!(
            "Input rate {} Hz differs from pipeline rate {} Hz",
            source.sample_rate(),
            config.audio.sample_rate
        );
    }

    let (playback_tx, playback_rx) = bounded(10);
    let playback = AudioPlayback::new(&config.audio, playback_rx, args.output_device.as_deref())?;

    let muted_clone = Arc::clone(&muted);
    let stop_clone = Arc::clone(&stop_requested);

    let handle = thread::spawn(move || {
        if let Err(e) = run_processing(
            source,
            processor,
            playback,
            playback_tx,
            muted_clone,
            stop_clone,
            tx.clone(),
        ) {
            let _ = tx.send(GuiUpdate::Log(format!("Processing error: {}", e)));
        }
        let _ = tx.send(GuiUpdate::Stopped);
    });

    Ok(StartResult {
        handle,
        params,
        muted,
        stop_requested,
    })
}

fn run_processing(
    mut source: Box<dyn AudioSource>,
    mut processor: LiveProcessor,
    playback: AudioPlayback,
    playback_tx: Sender<Vec<f32>>,
    muted: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    tx: Sender<GuiUpdate>,
) -> anyhow::Result<()> {
    loop {
        if stop_requested.load(Ordering::Relaxed) {
            break;
        }

        let Some(mut buffer) = source.next_buffer()? else {
            break;
        };

        processor.process_buffer(&mut buffer);

        let applied = processor.applied_params();
        let update = GuiUpdate::Data {
            time_secs: processor.elapsed_secs(),
            scope: processor.scope_frame(),
            rms_in: processor.rms_in(),
            rms_out: processor.rms_out(),
            applied_low_hz: applied.low_hz,
            applied_high_hz: applied.high_hz,
            applied_len: processor.realized_len(),
        };
        if tx.send(update).is_err() {
            break;
        }

        if muted.load(Ordering::Relaxed) {
            buffer.iter_mut().for_each(|s| *s = 0.0);
        }
        // The output device drains this channel at real-time rate, so the
        // bounded send also paces file input
        if playback_tx.send(buffer).is_err() {
            break;
        }
    }

    log::debug!("Playback underruns: {}", playback.underruns());
    Ok(())
}

const MAX_HISTORY_SECS: f64 = 120.0;
const DEFAULT_WINDOW_SECS: f64 = 10.0;
const MIN_WINDOW_SECS: f64 = 1.0;
const MAX_WINDOW_SECS: f64 = 120.0;
const MAX_LOG_LINES: usize = 1000;

const MIN_CUTOFF_HZ: f32 = 20.0;
const MAX_CUTOFF_HZ: f32 = 10_000.0;
const MAX_FIR_TAPS: usize = 1000;

const PLOT_HEIGHT: f32 = 190.0;
const LEVEL_PLOT_HEIGHT: f32 = 120.0;
const SPECTRUM_Y_MAX: f64 = 0.1;
const SCOPE_COLOR: (u8, u8, u8) = (30, 255, 60);
const SPECTRUM_COLOR: (u8, u8, u8) = (100, 200, 255);
const LEVEL_IN_COLOR: (u8, u8, u8) = (255, 200, 50);
const LEVEL_OUT_COLOR: (u8, u8, u8) = (100, 255, 100);

struct History {
    rms_in: VecDeque<[f64; 2]>,
    rms_out: VecDeque<[f64; 2]>,
}

impl History {
    fn new() -> Self {
        Self {
            rms_in: VecDeque::new(),
            rms_out: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: f64) {
        let cutoff = now - MAX_HISTORY_SECS;
        for buf in [&mut self.rms_in, &mut self.rms_out] {
            while let Some(front) = buf.front() {
                if front[0] < cutoff {
                    buf.pop_front();
                } else {
                    break;
                }
            }
        }
    }
}

struct DenoiseGuiApp {
    rx: Receiver<GuiUpdate>,
    params: Arc<SharedFilterParams>,
    muted: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    processing_handle: Option<thread::JoinHandle<()>>,
    kind: FilterKind,
    sample_rate: f32,
    // Slider mirrors; the atomics are written on change
    low_hz: f32,
    high_hz: f32,
    num_taps: usize,
    scope_frame: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    history: History,
    log_lines: VecDeque<String>,
    latest_time: f64,
    latest_rms_in: Option<f32>,
    latest_rms_out: Option<f32>,
    applied: Option<(f32, f32, usize)>,
    history_window: f64,
    processing_stopped: bool,
}

impl DenoiseGuiApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        rx: Receiver<GuiUpdate>,
        config: &DenoiseConfig,
        result: StartResult,
    ) -> Self {
        Self {
            rx,
            params: result.params,
            muted: result.muted,
            stop_requested: result.stop_requested,
            processing_handle: Some(result.handle),
            kind: config.live.kind,
            sample_rate: config.audio.sample_rate as f32,
            low_hz: config.live.band.low_hz(),
            high_hz: config.live.band.high_hz(),
            num_taps: config.live.num_taps,
            scope_frame: Vec::new(),
            spectrum: SpectrumAnalyzer::new(config.audio.buffer_size),
            history: History::new(),
            log_lines: VecDeque::new(),
            latest_time: 0.0,
            latest_rms_in: None,
            latest_rms_out: None,
            applied: None,
            history_window: DEFAULT_WINDOW_SECS,
            processing_stopped: false,
        }
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.rx.try_recv() {
            match update {
                GuiUpdate::Data {
                    time_secs,
                    scope,
                    rms_in,
                    rms_out,
                    applied_low_hz,
                    applied_high_hz,
                    applied_len,
                } => {
                    self.latest_time = time_secs;
                    self.scope_frame = scope;
                    self.latest_rms_in = Some(rms_in);
                    self.latest_rms_out = Some(rms_out);
                    self.applied = Some((applied_low_hz, applied_high_hz, applied_len));

                    self.history
                        .rms_in
                        .push_back([time_secs, level_db(rms_in) as f64]);
                    self.history
                        .rms_out
                        .push_back([time_secs, level_db(rms_out) as f64]);
                    self.history.prune(time_secs);
                }
                GuiUpdate::Log(msg) => {
                    self.log_lines.push_back(msg);
                    while self.log_lines.len() > MAX_LOG_LINES {
                        self.log_lines.pop_front();
                    }
                }
                GuiUpdate::Stopped => {
                    self.processing_stopped = true;
                }
            }
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Low cutoff:").color(egui::Color32::LIGHT_GRAY));
            if ui
                .add(
                    egui::Slider::new(&mut self.low_hz, MIN_CUTOFF_HZ..=MAX_CUTOFF_HZ)
                        .suffix(" Hz"),
                )
                .changed()
            {
                self.params.set_low_hz(self.low_hz);
            }

            ui.label(egui::RichText::new("High cutoff:").color(egui::Color32::LIGHT_GRAY));
            if ui
                .add(
                    egui::Slider::new(&mut self.high_hz, MIN_CUTOFF_HZ..=MAX_CUTOFF_HZ)
                        .suffix(" Hz"),
                )
                .changed()
            {
                self.params.set_high_hz(self.high_hz);
            }
        });

        ui.horizontal(|ui| {
            let (label, max_len) = match self.kind {
                FilterKind::Fir => ("Taps:", MAX_FIR_TAPS),
                FilterKind::Iir => ("Order:", MAX_IIR_ORDER),
            };
            ui.label(egui::RichText::new(label).color(egui::Color32::LIGHT_GRAY));
            if ui
                .add(egui::Slider::new(&mut self.num_taps, 1..=max_len))
                .changed()
            {
                self.params.set_num_taps(self.num_taps);
            }

            if self.low_hz >= self.high_hz {
                ui.label(
                    egui::RichText::new("invalid band, keeping previous filter")
                        .color(egui::Color32::from_rgb(255, 100, 100)),
                );
            } else if let Some((low, high, len)) = self.applied {
                ui.label(
                    egui::RichText::new(format!(
                        "running: {:.0}-{:.0} Hz, length {}",
                        low, high, len
                    ))
                    .color(egui::Color32::from_rgb(160, 160, 180)),
                );
            }
        });
    }

    fn draw_plots(&mut self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new("Scope (filtered)")
                .color(egui::Color32::LIGHT_GRAY)
                .small(),
        );
        let scope_len = self.scope_frame.len().max(1);
        let scope_pts: PlotPoints = self
            .scope_frame
            .iter()
            .enumerate()
            .map(|(i, &s)| [i as f64, s as f64])
            .collect();
        Plot::new("scope_plot")
            .height(PLOT_HEIGHT)
            .include_x(0.0)
            .include_x(scope_len as f64)
            .include_y(-1.0)
            .include_y(1.0)
            .y_axis_min_width(60.0)
            .x_axis_label("sample")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("Waveform", scope_pts).color(egui::Color32::from_rgb(
                    SCOPE_COLOR.0,
                    SCOPE_COLOR.1,
                    SCOPE_COLOR.2,
                )));
            });

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new("Spectrum (filtered)")
                .color(egui::Color32::LIGHT_GRAY)
                .small(),
        );
        let magnitudes = self.spectrum.magnitudes(&self.scope_frame);
        let freqs = self.spectrum.bin_frequencies(self.sample_rate);
        let spectrum_pts: PlotPoints = freqs
            .iter()
            .zip(magnitudes.iter())
            .map(|(&f, &m)| [f as f64, m as f64])
            .collect();
        Plot::new("spectrum_plot")
            .height(PLOT_HEIGHT)
            .include_x(0.0)
            .include_x((self.sample_rate / 2.0) as f64)
            .include_y(0.0)
            .include_y(SPECTRUM_Y_MAX)
            .y_axis_min_width(60.0)
            .x_axis_label("Hz")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("Magnitude", spectrum_pts).color(
                    egui::Color32::from_rgb(SPECTRUM_COLOR.0, SPECTRUM_COLOR.1, SPECTRUM_COLOR.2),
                ));
            });

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new("Levels")
                .color(egui::Color32::LIGHT_GRAY)
                .small(),
        );
        let x_max = self.latest_time.max(self.history_window);
        let x_min = x_max - self.history_window;
        let in_window = |pts: &VecDeque<[f64; 2]>| -> PlotPoints {
            pts.iter().copied().filter(|p| p[0] >= x_min).collect()
        };
        let in_pts = in_window(&self.history.rms_in);
        let out_pts = in_window(&self.history.rms_out);
        Plot::new("level_plot")
            .height(LEVEL_PLOT_HEIGHT)
            .include_x(x_min)
            .include_x(x_max)
            .y_axis_label("dB")
            .y_axis_min_width(60.0)
            .x_axis_label("s")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("In", in_pts).color(egui::Color32::from_rgb(
                    LEVEL_IN_COLOR.0,
                    LEVEL_IN_COLOR.1,
                    LEVEL_IN_COLOR.2,
                )));
                plot_ui.line(Line::new("Out", out_pts).color(egui::Color32::from_rgb(
                    LEVEL_OUT_COLOR.0,
                    LEVEL_OUT_COLOR.1,
                    LEVEL_OUT_COLOR.2,
                )));
            });
    }
}

impl eframe::App for DenoiseGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        ctx.request_repaint();

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::M)) {
            let muted = self.muted.load(Ordering::Relaxed);
            self.muted.store(!muted, Ordering::Relaxed);
        }

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.processing_stopped {
                    ui.label(
                        egui::RichText::new("STOPPED")
                            .color(egui::Color32::from_rgb(255, 80, 80))
                            .strong(),
                    );
                    ui.separator();
                }

                let muted = self.muted.load(Ordering::Relaxed);
                let mute_btn = egui::Button::new(egui::RichText::new("Mute").color(if muted {
                    egui::Color32::BLACK
                } else {
                    egui::Color32::LIGHT_GRAY
                }));
                let mute_btn = if muted {
                    mute_btn.fill(egui::Color32::from_rgb(255, 200, 50))
                } else {
                    mute_btn
                };
                if ui.add(mute_btn).clicked() {
                    self.muted.store(!muted, Ordering::Relaxed);
                }

                ui.separator();

                ui.label(egui::RichText::new("In:").color(egui::Color32::LIGHT_GRAY));
                level_label(ui, self.latest_rms_in);
                ui.label(egui::RichText::new("Out:").color(egui::Color32::LIGHT_GRAY));
                level_label(ui, self.latest_rms_out);

                ui.separator();
                let total_secs = self.latest_time;
                let minutes = (total_secs / 60.0) as u64;
                let secs = total_secs % 60.0;
                ui.label(
                    egui::RichText::new(format!("{:02}:{:04.1}", minutes, secs))
                        .color(egui::Color32::WHITE)
                        .strong(),
                );

                ui.separator();
                ui.label(egui::RichText::new("Window:").color(egui::Color32::LIGHT_GRAY));
                ui.add(
                    egui::Slider::new(&mut self.history_window, MIN_WINDOW_SECS..=MAX_WINDOW_SECS)
                        .suffix("s")
                        .logarithmic(true),
                );
            });
        });

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Debug Log")
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

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_controls(ui);
            ui.add_space(2.0);
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_plots(ui);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.stop_requested.store(true, Ordering::Relaxed);
        if let Some(handle) = self.processing_handle.take() {
            let _ = handle.join();
        }
    }
}

fn level_label(ui: &mut egui::Ui, rms: Option<f32>) {
    match rms {
        Some(rms) => {
            ui.label(
                egui::RichText::new(format!("{:>6.1} dB", level_db(rms)))
                    .monospace()
                    .color(egui::Color32::WHITE),
            );
        }
        None => {
            ui.label(
                egui::RichText::new("  ---.- dB")
                    .monospace()
                    .color(egui::Color32::DARK_GRAY),
            );
        }
    }
}

/// RMS level in dBFS, floored to keep silence finite
fn level_db(rms: f32) -> f32 {
    20.0 * rms.max(MIN_RMS_THRESHOLD).log10()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.list_devices {
        let devices = list_input_devices()?;
        if devices.is_empty() {
            eprintln!("No input devices found.");
        } else {
            for name in &devices {
                println!("{}", name);
            }
        }
        return Ok(());
    }

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let (tx, rx) = crossbeam_channel::unbounded::<GuiUpdate>();

    let logger = GuiLogger {
        tx: tx.clone(),
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = DenoiseConfig::default();
    config.live.band = args.band;
    config.live.num_taps = args.taps;
    config.live.kind = args.filter;

    let result = start_processing(&args, &config, tx)?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 800.0])
            .with_min_inner_size([700.0, 500.0])
            .with_title("Rauschlab - Live Bandpass"),
        ..Default::default()
    };

    eframe::run_native(
        "Rauschlab",
        native_options,
        Box::new(move |cc| Ok(Box::new(DenoiseGuiApp::new(cc, rx, &config, result)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
