//! Numeric constants for signal processing stability
//!
//! These constants define thresholds and epsilon values used throughout
//! the signal processing pipeline to ensure numerical stability.

/// Smallest normalized frequency (as a fraction of Nyquist) accepted by the
/// filter designers. Band edges at or below this are rejected as degenerate.
pub const MIN_NORMALIZED_FREQ: f64 = 1e-4;

/// Largest normalized frequency (as a fraction of Nyquist) accepted by the
/// filter designers. Band edges at or above this are rejected as degenerate.
pub const MAX_NORMALIZED_FREQ: f64 = 1.0 - 1e-4;

/// Epsilon guarding the passband-gain normalization in FIR design.
/// A design whose center response falls below this has no usable passband.
pub const DESIGN_GAIN_EPSILON: f64 = 1e-12;

/// Highest Butterworth order the IIR bandpass will realize. Section cascades
/// above this become numerically fragile.
pub const MAX_IIR_ORDER: usize = 8;

/// Minimum RMS treated as signal rather than silence in level reports.
pub const MIN_RMS_THRESHOLD: f32 = 1e-6;
