//! LMS adaptive noise cancellation
//!
//! The textbook least-mean-squares filter: predict the desired signal from
//! the most recent `order` input samples, then nudge the taps along the
//! instantaneous error gradient. Used by the offline workbench with the clean
//! recording as the desired signal and the corrupted clip as input.

use crate::error::{DenoiseError, Result};

/// Least-mean-squares adaptive filter
///
/// A small stateful core exposing a single per-sample operation. Taps start
/// at zero. The first `order` samples only charge the input window and
/// produce zero output; from then on each call predicts, adapts, and absorbs
/// the new input. The prediction window holds the `order` inputs *before*
/// the current one, newest first.
///
/// Stability is the caller's responsibility: `mu` must be small relative to
/// the input power or the taps diverge.
pub struct LmsFilter {
    taps: Vec<f32>,
    window: Vec<f32>,
    pos: usize,
    warmup: usize,
    mu: f32,
}

impl LmsFilter {
    /// Create a new LMS filter
    ///
    /// # Errors
    /// Returns `DenoiseError::Config` if `order` is 0.
    pub fn new(order: usize, mu: f32) -> Result<Self> {
        if order == 0 {
            return Err(DenoiseError::Config(
                "LMS order must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            taps: vec![0.0; order],
            window: vec![0.0; order],
            pos: 0,
            warmup: 0,
            mu,
        })
    }

    /// Process one input/desired sample pair, returning the prediction
    pub fn process(&mut self, input: f32, desired: f32) -> f32 {
        let n = self.taps.len();

        if self.warmup < n {
            self.push(input);
            self.warmup += 1;
            return 0.0;
        }

        // Walk the past-input ring newest first: back from the write position,
        // then wrapping to the top of the buffer.
        let newest_first = (0..self.pos).rev().chain((self.pos..n).rev());

        let mut predicted = 0.0f32;
        for (tap, idx) in self.taps.iter().zip(newest_first.clone()) {
            predicted += tap * self.window[idx];
        }

        let err = desired - predicted;
        let step = 2.0 * self.mu * err;
        for (tap, idx) in self.taps.iter_mut().zip(newest_first) {
            *tap += step * self.window[idx];
        }

        self.push(input);
        predicted
    }

    fn push(&mut self, input: f32) {
        self.window[self.pos] = input;
        self.pos += 1;
        if self.pos == self.window.len() {
            self.pos = 0;
        }
    }

    /// Zero the taps and the input window
    pub fn reset(&mut self) {
        self.taps.fill(0.0);
        self.window.fill(0.0);
        self.pos = 0;
        self.warmup = 0;
    }

    /// Get the filter order (prediction window length)
    pub fn order(&self) -> usize {
        self.taps.len()
    }

    /// Get the learning rate
    pub fn mu(&self) -> f32 {
        self.mu
    }

    /// Get access to the adapted tap weights
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }
}

/// Run LMS noise cancellation over a whole clip
///
/// Streams `noisy` through a fresh filter with `desired` as the reference,
/// position by position, and returns the predictions. The output length is
/// the shorter of the two inputs; its first `order` samples are exactly zero
/// (warmup).
pub fn cancel_noise(desired: &[f32], noisy: &[f32], order: usize, mu: f32) -> Result<Vec<f32>> {
    let mut filter = LmsFilter::new(order, mu)?;
    let n = desired.len().min(noisy.len());

    let mut output = Vec::with_capacity(n);
    for i in 0..n {
        output.push(filter.process(noisy[i], desired[i]));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(n: usize, freq: f32, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn mse(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            / a.len() as f32
    }

    #[test]
    fn test_order_zero_rejected() {
        assert!(LmsFilter::new(0, 0.01).is_err());
        assert!(LmsFilter::new(1, 0.01).is_ok());
    }

    #[test]
    fn test_zero_mu_freezes_taps_and_output() {
        let signal = tone(4000, 440.0, 0.5);
        let mut filter = LmsFilter::new(32, 0.0).unwrap();

        for &s in &signal {
            let out = filter.process(s, s);
            assert_eq!(out, 0.0);
        }
        assert!(filter.taps().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_warmup_emits_zeros() {
        let signal = tone(200, 440.0, 0.5);
        let output = cancel_noise(&signal, &signal, 32, 0.01).unwrap();

        assert!(output[..32].iter().all(|&s| s == 0.0));
        assert!(output[32..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_prediction_error_shrinks_on_correlated_pair() {
        let signal = tone(44100, 440.0, 0.5);
        let output = cancel_noise(&signal, &signal, 32, 0.01).unwrap();

        let early = mse(&signal[32..2032], &output[32..2032]);
        let late = mse(&signal[42000..44000], &output[42000..44000]);
        assert!(
            late < early,
            "prediction error grew: early {} late {}",
            early,
            late
        );
    }

    #[test]
    fn test_output_truncated_to_common_length() {
        let desired = tone(1000, 440.0, 0.5);
        let noisy = tone(800, 440.0, 0.5);
        let output = cancel_noise(&desired, &noisy, 16, 0.01).unwrap();
        assert_eq!(output.len(), 800);
    }

    #[test]
    fn test_clip_shorter_than_order_stays_zero() {
        let signal = tone(20, 440.0, 0.5);
        let output = cancel_noise(&signal, &signal, 32, 0.01).unwrap();
        assert_eq!(output.len(), 20);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let signal = tone(500, 440.0, 0.5);
        let mut filter = LmsFilter::new(16, 0.01).unwrap();
        for &s in &signal {
            filter.process(s, s);
        }
        assert!(filter.taps().iter().any(|&w| w != 0.0));

        filter.reset();
        assert!(filter.taps().iter().all(|&w| w == 0.0));
        assert_eq!(filter.process(1.0, 1.0), 0.0);
    }
}
