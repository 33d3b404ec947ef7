use std::sync::Arc;

use rauschlab::config::{AudioConfig, FilterKind, FrequencyBand, LiveFilterConfig};
use rauschlab::processing::{LiveProcessor, SharedFilterParams};
use rauschlab::signal_processing::SpectrumAnalyzer;
use rauschlab::synth::generate_tone;

/// Phase-continuous tone chopped into callback-sized buffers
fn tone_buffers(freq_hz: f32, audio: &AudioConfig, num_buffers: usize) -> Vec<Vec<f32>> {
    let total = audio.buffer_size * num_buffers;
    let tone = generate_tone(
        (total + audio.buffer_size) as f32 / audio.sample_rate as f32,
        audio.sample_rate,
        freq_hz,
        0.5,
    );
    tone[..total]
        .chunks(audio.buffer_size)
        .map(<[f32]>::to_vec)
        .collect()
}

fn run_buffers(processor: &mut LiveProcessor, buffers: &[Vec<f32>]) -> f32 {
    let mut rms = 0.0;
    for chunk in buffers {
        let mut buffer = chunk.clone();
        processor.process_buffer(&mut buffer);
        rms = processor.rms_out();
    }
    rms
}

#[test]
fn test_retuning_away_from_tone_silences_output() {
    let audio = AudioConfig::default();
    let live = LiveFilterConfig {
        band: FrequencyBand::new(300.0, 3000.0),
        num_taps: 101,
        kind: FilterKind::Fir,
    };
    let params = Arc::new(SharedFilterParams::new(&live));
    let mut processor = LiveProcessor::new(&audio, &live, Arc::clone(&params)).unwrap();

    let buffers = tone_buffers(1000.0, &audio, 40);
    let in_band_rms = run_buffers(&mut processor, &buffers[..20]);
    assert!(
        in_band_rms > 0.3,
        "in-band tone should pass, rms {}",
        in_band_rms
    );

    // Drag both cutoffs well above the tone mid-stream
    params.set_low_hz(4000.0);
    params.set_high_hz(8000.0);
    let moved_rms = run_buffers(&mut processor, &buffers[20..]);
    assert!(
        moved_rms < in_band_rms * 0.05,
        "tone should vanish after retune: {} -> {}",
        in_band_rms,
        moved_rms
    );

    let applied = processor.applied_params();
    assert_eq!(applied.low_hz, 4000.0);
    assert_eq!(applied.high_hz, 8000.0);
}

#[test]
fn test_crossed_sliders_keep_audio_flowing() {
    let audio = AudioConfig::default();
    let live = LiveFilterConfig {
        num_taps: 101,
        ..LiveFilterConfig::default()
    };
    let params = Arc::new(SharedFilterParams::new(&live));
    let mut processor = LiveProcessor::new(&audio, &live, Arc::clone(&params)).unwrap();

    let buffers = tone_buffers(1000.0, &audio, 30);
    let before_rms = run_buffers(&mut processor, &buffers[..10]);
    let before = processor.applied_params();

    // One slider dragged past the other; the previous filter keeps running
    params.set_low_hz(5000.0);
    params.set_high_hz(300.0);
    let rejected_rms = run_buffers(&mut processor, &buffers[10..20]);
    assert_eq!(processor.applied_params(), before);
    assert!(
        rejected_rms > before_rms * 0.9,
        "audio died on a rejected snapshot: {} -> {}",
        before_rms,
        rejected_rms
    );

    // A consistent pair recovers
    params.set_low_hz(200.0);
    params.set_high_hz(4000.0);
    run_buffers(&mut processor, &buffers[20..]);
    assert_eq!(processor.applied_params().low_hz, 200.0);
    assert_eq!(processor.applied_params().high_hz, 4000.0);
}

#[test]
fn test_scope_frame_feeds_spectrum_at_tone_bin() {
    let audio = AudioConfig::default();
    let live = LiveFilterConfig {
        num_taps: 101,
        ..LiveFilterConfig::default()
    };
    let params = Arc::new(SharedFilterParams::new(&live));
    let mut processor = LiveProcessor::new(&audio, &live, params).unwrap();

    // Exactly 32 cycles per display frame, so every frame hits bin 32 clean
    let bin = 32;
    let freq_hz = bin as f32 * audio.sample_rate as f32 / audio.buffer_size as f32;
    let buffers = tone_buffers(freq_hz, &audio, 10);
    run_buffers(&mut processor, &buffers);

    let frame = processor.scope_frame();
    assert_eq!(frame.len(), audio.buffer_size);

    let mut analyzer = SpectrumAnalyzer::new(audio.buffer_size);
    let mags = analyzer.magnitudes(&frame);
    assert_eq!(mags.len(), audio.buffer_size / 2 + 1);

    let peak_bin = mags
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(peak_bin, bin, "spectrum peak landed in the wrong bin");
    assert!(mags[bin] > 0.2, "tone bin too weak: {}", mags[bin]);
    assert!(mags[bin * 4] < 0.01, "out-of-band bin not quiet");
}

#[test]
fn test_iir_realization_passes_band_center() {
    let audio = AudioConfig::default();
    let live = LiveFilterConfig {
        band: FrequencyBand::new(300.0, 3000.0),
        num_taps: 4,
        kind: FilterKind::Iir,
    };
    let params = Arc::new(SharedFilterParams::new(&live));
    let mut processor = LiveProcessor::new(&audio, &live, params).unwrap();
    assert_eq!(processor.realized_len(), 4);

    let buffers = tone_buffers(1000.0, &audio, 20);
    let rms = run_buffers(&mut processor, &buffers);
    assert!(
        rms > 0.25 && rms < 0.45,
        "in-band tone should pass near unity, rms {}",
        rms
    );
}
