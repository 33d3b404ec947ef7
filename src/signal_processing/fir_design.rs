//! Windowed-sinc FIR design
//!
//! Bandpass kernels built as the difference of two sinc lowpass prototypes,
//! shaped by a Hamming window and scaled for exactly unity gain at the band
//! center. Design math runs in f64; the realized tap count is always odd so
//! the kernel stays symmetric around an integer group delay.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::constants::{DESIGN_GAIN_EPSILON, MAX_NORMALIZED_FREQ, MIN_NORMALIZED_FREQ};
use crate::error::{DenoiseError, Result};

/// Normalized sinc: sin(pi x) / (pi x), with sinc(0) = 1
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Hamming window coefficient for position `i` of a length-`len` window
fn hamming(i: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }
    0.54 - 0.46 * (2.0 * PI * i as f64 / (len - 1) as f64).cos()
}

/// Tap count actually realized for a request: even requests are bumped to the
/// next odd count, odd requests pass through.
pub fn realized_taps(requested: usize) -> usize {
    if requested.is_multiple_of(2) {
        requested + 1
    } else {
        requested
    }
}

/// Design a Hamming-windowed sinc bandpass kernel
///
/// Band edges are given in Hz and must lie strictly inside (0, Nyquist) with
/// `low_hz < high_hz`; anything else is a design error. The returned kernel
/// has `realized_taps(num_taps)` coefficients and unity magnitude response at
/// the arithmetic center of the band.
pub fn design_bandpass(
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
    num_taps: usize,
) -> Result<Vec<f64>> {
    if sample_rate <= 0.0 {
        return Err(DenoiseError::FilterDesign(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if num_taps == 0 {
        return Err(DenoiseError::FilterDesign(
            "tap count must be at least 1".to_string(),
        ));
    }

    let nyquist = sample_rate / 2.0;
    let f_low = low_hz / nyquist;
    let f_high = high_hz / nyquist;

    if f_low < MIN_NORMALIZED_FREQ {
        return Err(DenoiseError::FilterDesign(format!(
            "low cutoff {:.1}Hz is at or below DC",
            low_hz
        )));
    }
    if f_high > MAX_NORMALIZED_FREQ {
        return Err(DenoiseError::FilterDesign(format!(
            "high cutoff {:.1}Hz is at or above Nyquist ({:.1}Hz)",
            high_hz, nyquist
        )));
    }
    if f_low >= f_high {
        return Err(DenoiseError::FilterDesign(format!(
            "low cutoff {:.1}Hz must be below high cutoff {:.1}Hz",
            low_hz, high_hz
        )));
    }

    let n = realized_taps(num_taps);
    let alpha = (n - 1) as f64 / 2.0;

    // Ideal bandpass = highpass-edge lowpass minus lowpass-edge lowpass,
    // evaluated on the symmetric index m = i - alpha.
    let mut taps = Vec::with_capacity(n);
    for i in 0..n {
        let m = i as f64 - alpha;
        let ideal = f_high * sinc(f_high * m) - f_low * sinc(f_low * m);
        taps.push(ideal * hamming(i, n));
    }

    // Scale so the response at the band center is exactly unity. For a
    // symmetric kernel the center response is the cosine-weighted tap sum.
    let f_center = 0.5 * (f_low + f_high);
    let mut center_gain = 0.0;
    for (i, tap) in taps.iter().enumerate() {
        let m = i as f64 - alpha;
        center_gain += tap * (PI * m * f_center).cos();
    }
    if center_gain.abs() < DESIGN_GAIN_EPSILON {
        return Err(DenoiseError::FilterDesign(format!(
            "degenerate band {:.1}-{:.1}Hz with {} taps has no usable passband",
            low_hz, high_hz, n
        )));
    }
    for tap in taps.iter_mut() {
        *tap /= center_gain;
    }

    Ok(taps)
}

/// Magnitude response of a tap vector at a single frequency
pub fn magnitude_response(taps: &[f64], freq_hz: f64, sample_rate: f64) -> f64 {
    let omega = 2.0 * PI * freq_hz / sample_rate;
    let mut acc = Complex64::new(0.0, 0.0);
    for (k, tap) in taps.iter().enumerate() {
        acc += *tap * Complex64::cis(-omega * k as f64);
    }
    acc.norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_request_bumped_to_odd() {
        let taps = design_bandpass(300.0, 3000.0, 44100.0, 64).unwrap();
        assert_eq!(taps.len(), 65);

        let taps = design_bandpass(300.0, 3000.0, 44100.0, 65).unwrap();
        assert_eq!(taps.len(), 65);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let taps = design_bandpass(100.0, 5000.0, 44100.0, 101).unwrap();
        let n = taps.len();
        for i in 0..n / 2 {
            assert!(
                (taps[i] - taps[n - 1 - i]).abs() < 1e-12,
                "tap {} not mirrored: {} vs {}",
                i,
                taps[i],
                taps[n - 1 - i]
            );
        }
    }

    #[test]
    fn test_unity_gain_at_band_center() {
        let taps = design_bandpass(300.0, 3000.0, 44100.0, 101).unwrap();
        let gain = magnitude_response(&taps, 1650.0, 44100.0);
        assert!((gain - 1.0).abs() < 1e-9, "center gain {}", gain);
    }

    #[test]
    fn test_stopband_attenuation() {
        let taps = design_bandpass(300.0, 3000.0, 44100.0, 101).unwrap();
        let low_stop = magnitude_response(&taps, 30.0, 44100.0);
        let high_stop = magnitude_response(&taps, 10000.0, 44100.0);
        assert!(low_stop < 0.05, "low stopband gain {}", low_stop);
        assert!(high_stop < 0.05, "high stopband gain {}", high_stop);
    }

    #[test]
    fn test_single_tap_design() {
        // A one-tap "kernel" is flat but still unity at the band center.
        let taps = design_bandpass(300.0, 3000.0, 44100.0, 1).unwrap();
        assert_eq!(taps.len(), 1);
        assert!((taps[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_edges_rejected() {
        assert!(design_bandpass(0.0, 3000.0, 44100.0, 65).is_err());
        assert!(design_bandpass(300.0, 22050.0, 44100.0, 65).is_err());
        assert!(design_bandpass(3000.0, 300.0, 44100.0, 65).is_err());
        assert!(design_bandpass(300.0, 300.0, 44100.0, 65).is_err());
        assert!(design_bandpass(300.0, 3000.0, 44100.0, 0).is_err());
    }
}
