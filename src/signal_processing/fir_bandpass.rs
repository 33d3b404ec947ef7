use crate::config::FrequencyBand;
use crate::error::Result;
use crate::signal_processing::fir_design::design_bandpass;
use crate::signal_processing::{Filter, FirFilterCore};

/// FIR bandpass filter with linear phase response
///
/// Windowed-sinc design (Hamming window), unity gain at the band center.
/// Linear phase ensures all frequency components are delayed equally, which
/// keeps the filtered waveform shape intact on the scope display. The delay
/// line persists across successive buffers; swap in a freshly designed
/// filter (or call `reset`) for a clean start.
pub struct FirBandpass {
    core: FirFilterCore,
    band: FrequencyBand,
    sample_rate: f32,
}

impl FirBandpass {
    /// Create a new FIR bandpass filter
    ///
    /// # Arguments
    /// * `band` - Passband edges in Hz, strictly inside (0, Nyquist)
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `num_taps` - Requested filter length (even counts are bumped to odd)
    ///
    /// # Errors
    /// Returns `DenoiseError::FilterDesign` if the band or tap count is invalid
    pub fn new(band: FrequencyBand, sample_rate: f32, num_taps: usize) -> Result<Self> {
        let taps = design_bandpass(
            band.low_hz() as f64,
            band.high_hz() as f64,
            sample_rate as f64,
            num_taps,
        )?;

        Ok(Self {
            core: FirFilterCore::new(taps),
            band,
            sample_rate,
        })
    }

    /// Process a single audio sample through the filter
    pub fn process(&mut self, sample: f32) -> f32 {
        self.core.process(sample)
    }

    /// Process an entire buffer of audio samples in-place
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        self.core.process_buffer(buffer)
    }

    /// Filter a whole clip from a cleared delay line, leaving the input intact
    pub fn apply(&mut self, input: &[f32]) -> Vec<f32> {
        self.core.reset();
        let mut output = input.to_vec();
        self.core.process_buffer(&mut output);
        output
    }

    /// Clear the delay line without redesigning the coefficients
    pub fn reset(&mut self) {
        self.core.reset();
    }

    /// Get the realized number of taps (filter length)
    pub fn num_taps(&self) -> usize {
        self.core.num_taps()
    }

    /// Get the group delay in samples (half the filter length for linear phase)
    pub fn group_delay_samples(&self) -> usize {
        self.core.group_delay_samples()
    }

    /// Get the designed passband
    pub fn band(&self) -> FrequencyBand {
        self.band
    }

    /// Get the sample rate the filter was designed for
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Get access to the tap coefficients
    pub fn taps(&self) -> &[f64] {
        self.core.taps()
    }
}

impl Filter for FirBandpass {
    fn process(&mut self, sample: f32) -> f32 {
        FirBandpass::process(self, sample)
    }
}
