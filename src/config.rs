//! Configuration for the rauschlab denoising pipelines.
//!
//! The live pipeline (microphone passthrough with a tunable bandpass) and the
//! offline workbench (record, corrupt, denoise) share `AudioConfig` and keep
//! their own parameter blocks.
//!
//! ```
//! use rauschlab::config::DenoiseConfig;
//!
//! let mut config = DenoiseConfig::default();
//! // Customize as needed
//! config.live.num_taps = 63;
//! ```

use std::fmt;
use std::str::FromStr;

/// Passband specification for the bandpass filters
///
/// Parsed from `LOW-HIGH` with optional unit suffixes on either edge.
///
/// # Parsing formats
/// - `300-3000` - edges in Hz (no suffix)
/// - `300hz-3000Hz` - edges in Hz (explicit)
/// - `0.3khz-3khz` - edges in kHz
///
/// # Example
/// ```
/// use rauschlab::config::FrequencyBand;
///
/// let band: FrequencyBand = "0.3khz-3khz".parse().unwrap();
/// assert!((band.low_hz() - 300.0).abs() < 0.001);
/// assert!((band.high_hz() - 3000.0).abs() < 0.001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    low_hz: f32,
    high_hz: f32,
}

impl FrequencyBand {
    /// Create from edge frequencies in Hz
    pub fn new(low_hz: f32, high_hz: f32) -> Self {
        Self { low_hz, high_hz }
    }

    /// Lower edge in Hz
    pub fn low_hz(&self) -> f32 {
        self.low_hz
    }

    /// Upper edge in Hz
    pub fn high_hz(&self) -> f32 {
        self.high_hz
    }

    /// Arithmetic center of the band in Hz
    pub fn center_hz(&self) -> f32 {
        0.5 * (self.low_hz + self.high_hz)
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}-{:.0}hz", self.low_hz, self.high_hz)
    }
}

fn parse_edge_hz(s: &str) -> Result<f32, String> {
    let s = s.trim();

    // Check for kilohertz suffix first; "khz" also ends in "hz"
    if let Some(num) = s
        .strip_suffix("khz")
        .or_else(|| s.strip_suffix("kHz"))
        .or_else(|| s.strip_suffix("KHZ"))
        .or_else(|| s.strip_suffix("k"))
    {
        let khz: f32 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid frequency: {}", s))?;
        return Ok(khz * 1000.0);
    }

    let num = s
        .strip_suffix("hz")
        .or_else(|| s.strip_suffix("Hz"))
        .or_else(|| s.strip_suffix("HZ"))
        .unwrap_or(s);

    num.trim()
        .parse()
        .map_err(|_| format!("invalid frequency: {}", s))
}

impl FromStr for FrequencyBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected LOW-HIGH band, got: {}", s))?;

        let low_hz = parse_edge_hz(low)?;
        let high_hz = parse_edge_hz(high)?;

        if low_hz <= 0.0 {
            return Err("band low edge must be positive".to_string());
        }
        if high_hz <= low_hz {
            return Err("band high edge must be above low edge".to_string());
        }
        Ok(Self::new(low_hz, high_hz))
    }
}

/// Band filter realization for the live pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FilterKind {
    /// Windowed-sinc FIR bandpass (linear phase, higher CPU at large tap counts)
    Fir,
    /// Butterworth IIR bandpass (lower CPU, order-limited)
    Iir,
}

/// Denoising method for the offline workbench
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DenoiseMethod {
    /// Fixed windowed-sinc FIR bandpass over the whole clip
    Fir,
    /// LMS adaptive canceller trained against the clean recording
    Lms,
}

/// System-wide denoising configuration
///
/// Contains the parameters of both pipelines. Use `DenoiseConfig::default()`
/// for the stock setup (44.1 kHz mono, speech-band live filter, 5 s offline
/// clips).
#[derive(Debug, Clone, Default)]
pub struct DenoiseConfig {
    /// Audio stream configuration
    pub audio: AudioConfig,
    /// Live pipeline filter parameters
    pub live: LiveFilterConfig,
    /// Offline workbench parameters
    pub offline: OfflineConfig,
}

/// Audio stream configuration
///
/// Both pipelines run mono at a fixed rate; the buffer size is the requested
/// callback granularity and the display frame length.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Requested callback buffer size in samples
    pub buffer_size: usize,
    /// Number of audio channels (must be 1)
    pub channels: u16,
}

impl AudioConfig {
    /// Nyquist frequency in Hz
    pub fn nyquist_hz(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Number of samples in a clip of the given duration
    pub fn clip_samples(&self, duration_secs: f32) -> usize {
        (duration_secs * self.sample_rate as f32).round() as usize
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 1024,
            channels: 1,
        }
    }
}

/// Live pipeline filter parameters
///
/// Initial values only; the GUI sliders retune the band and length while
/// audio is flowing.
#[derive(Debug, Clone)]
pub struct LiveFilterConfig {
    /// Initial passband
    pub band: FrequencyBand,
    /// Initial filter length: FIR tap count (bumped to odd at design time),
    /// or Butterworth order when `kind` is `Iir`
    pub num_taps: usize,
    /// Filter realization, fixed at startup
    pub kind: FilterKind,
}

impl Default for LiveFilterConfig {
    fn default() -> Self {
        Self {
            band: FrequencyBand::new(300.0, 3000.0),
            num_taps: 5,
            kind: FilterKind::Fir,
        }
    }
}

/// Offline workbench parameters
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Clip length in seconds
    pub clip_secs: f32,
    /// FIR tap count for the fixed bandpass
    pub fir_taps: usize,
    /// FIR passband
    pub band: FrequencyBand,
    /// LMS learning rate
    pub mu: f32,
    /// LMS filter order (prediction window length)
    pub lms_order: usize,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            clip_secs: 5.0,
            fir_taps: 101,
            band: FrequencyBand::new(100.0, 5000.0),
            mu: 0.01,
            lms_order: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_plain() {
        let band: FrequencyBand = "300-3000".parse().unwrap();
        assert!((band.low_hz() - 300.0).abs() < 0.001);
        assert!((band.high_hz() - 3000.0).abs() < 0.001);
    }

    #[test]
    fn test_band_hz_suffix() {
        let band: FrequencyBand = "100hz-5000Hz".parse().unwrap();
        assert!((band.low_hz() - 100.0).abs() < 0.001);
        assert!((band.high_hz() - 5000.0).abs() < 0.001);
    }

    #[test]
    fn test_band_khz_suffix() {
        let band: FrequencyBand = "0.3khz-3khz".parse().unwrap();
        assert!((band.low_hz() - 300.0).abs() < 0.001);
        assert!((band.high_hz() - 3000.0).abs() < 0.001);
    }

    #[test]
    fn test_band_center() {
        let band = FrequencyBand::new(100.0, 5000.0);
        assert!((band.center_hz() - 2550.0).abs() < 0.001);
    }

    #[test]
    fn test_band_invalid() {
        assert!("abc".parse::<FrequencyBand>().is_err());
        assert!("3000".parse::<FrequencyBand>().is_err());
        assert!("3000-300".parse::<FrequencyBand>().is_err());
        assert!("0-3000".parse::<FrequencyBand>().is_err());
    }

    #[test]
    fn test_band_display_roundtrip() {
        let band = FrequencyBand::new(300.0, 3000.0);
        let parsed: FrequencyBand = band.to_string().parse().unwrap();
        assert_eq!(parsed, band);
    }

    #[test]
    fn test_clip_samples() {
        let audio = AudioConfig::default();
        assert_eq!(audio.clip_samples(5.0), 220_500);
        assert_eq!(audio.clip_samples(0.0), 0);
    }
}
