use iir_filters::filter::{DirectForm2Transposed, Filter as IirFilter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::zpk2sos;

use crate::config::FrequencyBand;
use crate::constants::{MAX_IIR_ORDER, MAX_NORMALIZED_FREQ, MIN_NORMALIZED_FREQ};
use crate::error::{DenoiseError, Result};

/// Butterworth IIR bandpass filter
///
/// The cheap alternative to the FIR path in the live pipeline: a few
/// second-order sections instead of hundreds of taps, at the cost of a
/// nonlinear phase response. Order is capped at `MAX_IIR_ORDER`.
pub struct IirBandpass {
    filter: DirectForm2Transposed,
    band: FrequencyBand,
    order: usize,
}

impl IirBandpass {
    /// Create a new Butterworth bandpass filter
    ///
    /// # Errors
    /// Returns `DenoiseError::FilterDesign` if the band edges fall outside
    /// (0, Nyquist) or the order is 0 or above `MAX_IIR_ORDER`.
    pub fn new(band: FrequencyBand, sample_rate: f32, order: usize) -> Result<Self> {
        if order == 0 || order > MAX_IIR_ORDER {
            return Err(DenoiseError::FilterDesign(format!(
                "Butterworth order must be 1-{}, got {}",
                MAX_IIR_ORDER, order
            )));
        }

        let nyquist = sample_rate as f64 / 2.0;
        let f_low = band.low_hz() as f64 / nyquist;
        let f_high = band.high_hz() as f64 / nyquist;
        if f_low < MIN_NORMALIZED_FREQ || f_high > MAX_NORMALIZED_FREQ || f_low >= f_high {
            return Err(DenoiseError::FilterDesign(format!(
                "Invalid band {} for sample rate {}",
                band, sample_rate
            )));
        }

        let zpk = butter(
            order as u32,
            FilterType::BandPass(band.low_hz() as f64, band.high_hz() as f64),
            sample_rate as f64,
        )
        .map_err(|e| DenoiseError::FilterDesign(format!("{:?}", e)))?;

        let sos =
            zpk2sos(&zpk, None).map_err(|e| DenoiseError::FilterDesign(format!("{:?}", e)))?;

        Ok(Self {
            filter: DirectForm2Transposed::new(&sos),
            band,
            order,
        })
    }

    /// Filter single sample
    pub fn process(&mut self, sample: f32) -> f32 {
        self.filter.filter(sample as f64) as f32
    }

    /// Filter entire buffer in-place
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Get the designed passband
    pub fn band(&self) -> FrequencyBand {
        self.band
    }

    /// Get the Butterworth order
    pub fn order(&self) -> usize {
        self.order
    }
}

impl crate::signal_processing::Filter for IirBandpass {
    fn process(&mut self, sample: f32) -> f32 {
        IirBandpass::process(self, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_iir_bandpass_design() {
        let filter = IirBandpass::new(FrequencyBand::new(300.0, 3000.0), 44100.0, 4);
        assert!(filter.is_ok());
        assert_eq!(filter.unwrap().order(), 4);
    }

    #[test]
    fn test_iir_bandpass_rejects_bad_parameters() {
        assert!(IirBandpass::new(FrequencyBand::new(300.0, 3000.0), 44100.0, 0).is_err());
        assert!(IirBandpass::new(FrequencyBand::new(300.0, 3000.0), 44100.0, 9).is_err());
        assert!(IirBandpass::new(FrequencyBand::new(3000.0, 300.0), 44100.0, 4).is_err());
        assert!(IirBandpass::new(FrequencyBand::new(300.0, 23000.0), 44100.0, 4).is_err());
    }

    #[test]
    fn test_iir_bandpass_passes_center_frequency() {
        let mut filter = IirBandpass::new(FrequencyBand::new(300.0, 3000.0), 44100.0, 4).unwrap();

        let input: Vec<f32> = (0..4410)
            .map(|i| (2.0 * PI * 1650.0 * i as f32 / 44100.0).sin())
            .collect();

        let mut output = input.clone();
        filter.process_buffer(&mut output);

        let input_rms: f32 = (input.iter().skip(1000).map(|x| x * x).sum::<f32>()
            / (input.len() - 1000) as f32)
            .sqrt();
        let output_rms: f32 = (output.iter().skip(1000).map(|x| x * x).sum::<f32>()
            / (output.len() - 1000) as f32)
            .sqrt();

        let attenuation_db = 20.0 * (output_rms / input_rms).log10();
        assert!(
            attenuation_db > -3.0,
            "Center frequency too attenuated: {} dB",
            attenuation_db
        );
    }

    #[test]
    fn test_iir_bandpass_attenuates_out_of_band() {
        let mut filter = IirBandpass::new(FrequencyBand::new(300.0, 3000.0), 44100.0, 4).unwrap();

        let input: Vec<f32> = (0..4410)
            .map(|i| (2.0 * PI * 30.0 * i as f32 / 44100.0).sin())
            .collect();

        let mut output = input.clone();
        filter.process_buffer(&mut output);

        let input_rms: f32 = (input.iter().skip(1000).map(|x| x * x).sum::<f32>()
            / (input.len() - 1000) as f32)
            .sqrt();
        let output_rms: f32 = (output.iter().skip(1000).map(|x| x * x).sum::<f32>()
            / (output.len() - 1000) as f32)
            .sqrt();

        let attenuation_db = 20.0 * (output_rms / input_rms).log10();
        assert!(
            attenuation_db < -20.0,
            "Out-of-band frequency not attenuated enough: {} dB",
            attenuation_db
        );
    }
}
