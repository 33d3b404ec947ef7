/// Core FIR filter engine shared by the designed filters
///
/// Contains the delay line, tap coefficients, and direct-form convolution.
/// Filter types (bandpass and friends) wrap this and provide their own
/// coefficient design.
pub struct FirFilterCore {
    taps: Vec<f64>,
    delay_line: Vec<f64>,
    pos: usize,
}

impl FirFilterCore {
    /// Create a new FIR filter core with the given tap coefficients
    ///
    /// The delay line starts zeroed, so running one whole clip through a
    /// fresh core is equivalent to single-shot convolution of the clip with
    /// the taps.
    pub fn new(taps: Vec<f64>) -> Self {
        Self {
            delay_line: vec![0.0; taps.len()],
            taps,
            pos: 0,
        }
    }

    /// Process a single sample through the filter
    pub fn process(&mut self, sample: f32) -> f32 {
        self.delay_line[self.pos] = sample as f64;

        let mut output = 0.0f64;
        let n = self.taps.len();

        // Iterate the ring buffer in two contiguous reverse ranges to avoid
        // modulo arithmetic in the inner convolution loop.
        let mut tap_i = 0usize;
        for delay_idx in (0..=self.pos).rev() {
            output += self.taps[tap_i] * self.delay_line[delay_idx];
            tap_i += 1;
        }
        for delay_idx in ((self.pos + 1)..n).rev() {
            output += self.taps[tap_i] * self.delay_line[delay_idx];
            tap_i += 1;
        }
        debug_assert_eq!(tap_i, n);

        self.pos += 1;
        if self.pos == n {
            self.pos = 0;
        }
        output as f32
    }

    /// Process an entire buffer of samples in-place
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clear the delay line without touching the coefficients
    pub fn reset(&mut self) {
        self.delay_line.fill(0.0);
        self.pos = 0;
    }

    /// Get the number of taps (filter length)
    pub fn num_taps(&self) -> usize {
        self.taps.len()
    }

    /// Get the group delay in samples (half the filter length for linear phase)
    pub fn group_delay_samples(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Get access to the tap coefficients
    pub fn taps(&self) -> &[f64] {
        &self.taps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_response_replays_taps() {
        let taps = vec![0.5, -0.25, 0.125];
        let mut core = FirFilterCore::new(taps.clone());

        let mut buffer = vec![0.0f32; taps.len()];
        buffer[0] = 1.0;
        core.process_buffer(&mut buffer);

        for (out, tap) in buffer.iter().zip(taps.iter()) {
            assert!((*out as f64 - tap).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_buffer_stays_zero() {
        let mut core = FirFilterCore::new(vec![0.2; 31]);
        let mut buffer = vec![0.0f32; 256];
        core.process_buffer(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut core = FirFilterCore::new(vec![1.0, 1.0, 1.0]);
        core.process(1.0);
        core.process(1.0);
        core.reset();

        // With a cleared delay line a zero input must produce zero output.
        assert_eq!(core.process(0.0), 0.0);
    }

    #[test]
    fn test_group_delay() {
        let core = FirFilterCore::new(vec![0.0; 101]);
        assert_eq!(core.group_delay_samples(), 50);
        assert_eq!(core.num_taps(), 101);
    }
}
