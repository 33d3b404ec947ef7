//! Single-sided FFT magnitude for the live spectrum view
//!
//! Plain magnitude of the forward transform scaled by 1/N, no window. The
//! display shows the latest filtered frame, so bin leakage wobble is part of
//! the expected picture.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Reusable FFT plan plus scratch buffer for one display frame size
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    size: usize,
}

impl SpectrumAnalyzer {
    /// Plan a forward FFT of `size` points
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            size,
        }
    }

    /// Single-sided magnitudes of the most recent `size` samples, scaled 1/size
    ///
    /// Longer input is truncated to its tail, shorter input is zero-padded.
    /// Returns `size/2 + 1` bins (DC through Nyquist).
    pub fn magnitudes(&mut self, samples: &[f32]) -> Vec<f32> {
        let start = samples.len().saturating_sub(self.size);
        let recent = &samples[start..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let value = recent.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(value, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.size as f32;
        self.buffer[..self.size / 2 + 1]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }

    /// Center frequency of each returned bin in Hz
    pub fn bin_frequencies(&self, sample_rate: f32) -> Vec<f32> {
        (0..=self.size / 2)
            .map(|k| k as f32 * sample_rate / self.size as f32)
            .collect()
    }

    /// Frame size the analyzer was planned for
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_dc_level_lands_in_bin_zero() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        let mags = analyzer.magnitudes(&vec![0.25f32; 1024]);

        assert_eq!(mags.len(), 513);
        assert_relative_eq!(mags[0], 0.25, epsilon = 1e-4);
        assert!(mags[1] < 1e-4);
    }

    #[test]
    fn test_unit_sine_on_exact_bin() {
        let size = 1024;
        let bin = 8;
        let signal: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin())
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(size);
        let mags = analyzer.magnitudes(&signal);

        assert_relative_eq!(mags[bin], 0.5, epsilon = 1e-3);
        assert!(mags[bin - 2] < 1e-3);
        assert!(mags[bin + 2] < 1e-3);
    }

    #[test]
    fn test_short_input_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(1024);
        let mags = analyzer.magnitudes(&[0.5f32; 100]);
        assert_eq!(mags.len(), 513);
    }

    #[test]
    fn test_bin_frequencies_span_dc_to_nyquist() {
        let analyzer = SpectrumAnalyzer::new(1024);
        let freqs = analyzer.bin_frequencies(44100.0);

        assert_eq!(freqs.len(), 513);
        assert_eq!(freqs[0], 0.0);
        assert_relative_eq!(freqs[512], 22050.0, epsilon = 1e-3);
    }
}
