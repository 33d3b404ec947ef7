use std::f32::consts::PI;

/// Generate a pure sine tone
pub fn generate_tone(
    duration_secs: f32,
    sample_rate: u32,
    freq_hz: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let omega = 2.0 * PI * freq_hz;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (omega * t).sin()
        })
        .collect()
}

/// Generate a chord of equal-weight tones with the given total amplitude
///
/// Handy stand-in for a recording when no microphone is available: put one
/// component inside the passband and one outside to hear a filter work.
pub fn generate_chord(
    duration_secs: f32,
    sample_rate: u32,
    freqs_hz: &[f32],
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    if freqs_hz.is_empty() {
        return vec![0.0; num_samples];
    }

    let component_amplitude = amplitude / freqs_hz.len() as f32;
    let mut samples = vec![0.0f32; num_samples];

    for &freq in freqs_hz {
        let omega = 2.0 * PI * freq;
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f32 / sample_rate as f32;
            *sample += component_amplitude * (omega * t).sin();
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_length() {
        let signal = generate_tone(1.0, 44100, 440.0, 0.5);
        assert_eq!(signal.len(), 44100);
    }

    #[test]
    fn test_tone_amplitude_bounded() {
        let signal = generate_tone(0.5, 44100, 440.0, 0.5);
        assert!(signal.iter().all(|&x| x.abs() <= 0.5 + 1e-6));

        let peak = signal.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!(peak > 0.49, "tone should reach its amplitude, got {}", peak);
    }

    #[test]
    fn test_tone_starts_at_zero() {
        let signal = generate_tone(0.1, 44100, 440.0, 0.5);
        assert_eq!(signal[0], 0.0);
    }

    #[test]
    fn test_chord_length_and_bound() {
        let signal = generate_chord(0.5, 44100, &[440.0, 6000.0], 0.6);
        assert_eq!(signal.len(), 22050);
        assert!(signal.iter().all(|&x| x.abs() <= 0.6 + 1e-6));
    }

    #[test]
    fn test_empty_chord_is_silence() {
        let signal = generate_chord(0.1, 44100, &[], 0.5);
        assert_eq!(signal.len(), 4410);
        assert!(signal.iter().all(|&x| x == 0.0));
    }
}
