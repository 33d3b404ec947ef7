use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::audio::ScopeBuffer;
use crate::config::{AudioConfig, FilterKind, FrequencyBand, LiveFilterConfig};
use crate::error::Result;
use crate::signal_processing::{Filter, FirBandpass, IirBandpass};
use crate::synth::signal_power;

/// Parameter snapshot the processing loop designs filters from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParams {
    pub low_hz: f32,
    pub high_hz: f32,
    pub num_taps: usize,
}

impl BandParams {
    pub fn band(&self) -> FrequencyBand {
        FrequencyBand::new(self.low_hz, self.high_hz)
    }
}

/// Lock-free tunable filter parameters shared between GUI and processing
///
/// Each value lives in its own atomic cell (f32 bits for the cutoffs), so a
/// snapshot taken mid-drag can mix one slider's new value with another's old
/// one. Such mixed snapshots are tolerated: an invalid combination is
/// rejected by the designer and the previous filter keeps running.
pub struct SharedFilterParams {
    low_bits: AtomicU32,
    high_bits: AtomicU32,
    num_taps: AtomicUsize,
}

impl SharedFilterParams {
    pub fn new(config: &LiveFilterConfig) -> Self {
        Self {
            low_bits: AtomicU32::new(config.band.low_hz().to_bits()),
            high_bits: AtomicU32::new(config.band.high_hz().to_bits()),
            num_taps: AtomicUsize::new(config.num_taps),
        }
    }

    pub fn low_hz(&self) -> f32 {
        f32::from_bits(self.low_bits.load(Ordering::Relaxed))
    }

    pub fn high_hz(&self) -> f32 {
        f32::from_bits(self.high_bits.load(Ordering::Relaxed))
    }

    pub fn num_taps(&self) -> usize {
        self.num_taps.load(Ordering::Relaxed)
    }

    pub fn set_low_hz(&self, hz: f32) {
        self.low_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn set_high_hz(&self, hz: f32) {
        self.high_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn set_num_taps(&self, num_taps: usize) {
        self.num_taps.store(num_taps, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BandParams {
        BandParams {
            low_hz: self.low_hz(),
            high_hz: self.high_hz(),
            num_taps: self.num_taps(),
        }
    }
}

/// Either bandpass realization behind one seam
enum BandFilter {
    Fir(FirBandpass),
    Iir(IirBandpass),
}

impl BandFilter {
    /// Design a fresh filter for the snapshot; `num_taps` is the tap count
    /// for the FIR realization and the Butterworth order for the IIR one
    fn design(kind: FilterKind, params: &BandParams, sample_rate: f32) -> Result<Self> {
        match kind {
            FilterKind::Fir => Ok(Self::Fir(FirBandpass::new(
                params.band(),
                sample_rate,
                params.num_taps,
            )?)),
            FilterKind::Iir => Ok(Self::Iir(IirBandpass::new(
                params.band(),
                sample_rate,
                params.num_taps,
            )?)),
        }
    }

    fn process_buffer(&mut self, buffer: &mut [f32]) {
        match self {
            Self::Fir(f) => f.process_buffer(buffer),
            Self::Iir(f) => Filter::process_buffer(f, buffer),
        }
    }

    /// Realized length: tap count after the odd bump, or Butterworth order
    fn realized_len(&self) -> usize {
        match self {
            Self::Fir(f) => f.num_taps(),
            Self::Iir(f) => f.order(),
        }
    }
}

/// Per-buffer engine of the live pipeline
///
/// Polls the shared parameters once per buffer, swaps in a freshly designed
/// filter when they changed, filters in place, and keeps the display frame
/// and level readings current. Redesign happens here on the processing
/// thread, never in the audio callbacks.
pub struct LiveProcessor {
    filter: BandFilter,
    kind: FilterKind,
    applied: BandParams,
    rejected: Option<BandParams>,
    params: Arc<SharedFilterParams>,
    scope: ScopeBuffer,
    display_len: usize,
    sample_rate: f32,
    samples_processed: u64,
    rms_in: f32,
    rms_out: f32,
}

impl LiveProcessor {
    pub fn new(
        config: &AudioConfig,
        live: &LiveFilterConfig,
        params: Arc<SharedFilterParams>,
    ) -> Result<Self> {
        let initial = params.snapshot();
        let filter = BandFilter::design(live.kind, &initial, config.sample_rate as f32)?;

        Ok(Self {
            filter,
            kind: live.kind,
            applied: initial,
            rejected: None,
            params,
            scope: ScopeBuffer::new(config.buffer_size),
            display_len: config.buffer_size,
            sample_rate: config.sample_rate as f32,
            samples_processed: 0,
            rms_in: 0.0,
            rms_out: 0.0,
        })
    }

    /// Apply pending parameter changes, then filter the buffer in place
    pub fn process_buffer(&mut self, buffer: &mut [f32]) {
        self.refresh_filter();

        self.rms_in = signal_power(buffer).sqrt();
        self.filter.process_buffer(buffer);
        self.rms_out = signal_power(buffer).sqrt();

        self.scope.push(buffer);
        self.samples_processed += buffer.len() as u64;
    }

    /// Redesign the filter if the shared parameters moved since the last
    /// applied (or last rejected) snapshot
    fn refresh_filter(&mut self) {
        let snapshot = self.params.snapshot();
        if snapshot == self.applied || Some(snapshot) == self.rejected {
            return;
        }

        match BandFilter::design(self.kind, &snapshot, self.sample_rate) {
            Ok(filter) => {
                self.filter = filter;
                self.applied = snapshot;
                self.rejected = None;
                log::debug!(
                    "Filter redesigned: {:.0}-{:.0}Hz, length {}",
                    snapshot.low_hz,
                    snapshot.high_hz,
                    snapshot.num_taps
                );
            }
            Err(e) => {
                log::warn!("Keeping previous filter: {}", e);
                self.rejected = Some(snapshot);
            }
        }
    }

    /// Latest filtered display frame (up to one buffer)
    pub fn scope_frame(&self) -> Vec<f32> {
        self.scope.latest(self.display_len)
    }

    /// Parameters of the filter currently running
    pub fn applied_params(&self) -> BandParams {
        self.applied
    }

    /// Length of the running filter (FIR taps after the odd bump, IIR order)
    pub fn realized_len(&self) -> usize {
        self.filter.realized_len()
    }

    /// Audio time processed so far in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.samples_processed as f64 / self.sample_rate as f64
    }

    pub fn rms_in(&self) -> f32 {
        self.rms_in
    }

    pub fn rms_out(&self) -> f32 {
        self.rms_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn passband_buffer(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * 1000.0 * i as f32 / 44100.0).sin())
            .collect()
    }

    fn make_processor(params: Arc<SharedFilterParams>) -> LiveProcessor {
        LiveProcessor::new(
            &AudioConfig::default(),
            &LiveFilterConfig::default(),
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_shared_params_snapshot() {
        let params = SharedFilterParams::new(&LiveFilterConfig::default());
        params.set_low_hz(150.0);
        params.set_high_hz(4500.0);
        params.set_num_taps(63);

        let snapshot = params.snapshot();
        assert_eq!(snapshot.low_hz, 150.0);
        assert_eq!(snapshot.high_hz, 4500.0);
        assert_eq!(snapshot.num_taps, 63);
    }

    #[test]
    fn test_processor_passes_in_band_signal() {
        let params = Arc::new(SharedFilterParams::new(&LiveFilterConfig::default()));
        let mut processor = make_processor(Arc::clone(&params));

        let mut buffer = passband_buffer(4096);
        processor.process_buffer(&mut buffer);

        assert!(processor.rms_in() > 0.0);
        assert!(processor.rms_out() > 0.0);
        assert_eq!(processor.scope_frame().len(), 1024);
    }

    #[test]
    fn test_parameter_change_redesigns_filter() {
        let params = Arc::new(SharedFilterParams::new(&LiveFilterConfig::default()));
        let mut processor = make_processor(Arc::clone(&params));
        assert_eq!(processor.applied_params().num_taps, 5);

        params.set_num_taps(101);
        let mut buffer = passband_buffer(1024);
        processor.process_buffer(&mut buffer);

        assert_eq!(processor.applied_params().num_taps, 101);
        assert_eq!(processor.realized_len(), 101);

        // Even requests realize one tap longer
        params.set_num_taps(100);
        let mut buffer = passband_buffer(1024);
        processor.process_buffer(&mut buffer);
        assert_eq!(processor.realized_len(), 101);
        assert_eq!(processor.applied_params().num_taps, 100);
    }

    #[test]
    fn test_invalid_snapshot_keeps_previous_filter() {
        let params = Arc::new(SharedFilterParams::new(&LiveFilterConfig::default()));
        let mut processor = make_processor(Arc::clone(&params));
        let before = processor.applied_params();

        // Crossed edges, as when one slider is dragged past the other
        params.set_low_hz(5000.0);
        params.set_high_hz(300.0);
        let mut buffer = passband_buffer(1024);
        processor.process_buffer(&mut buffer);
        assert_eq!(processor.applied_params(), before);

        // A valid snapshot recovers
        params.set_low_hz(200.0);
        params.set_high_hz(4000.0);
        let mut buffer = passband_buffer(1024);
        processor.process_buffer(&mut buffer);
        let after = processor.applied_params();
        assert_eq!(after.low_hz, 200.0);
        assert_eq!(after.high_hz, 4000.0);
    }

    #[test]
    fn test_zero_buffer_stays_zero() {
        let params = Arc::new(SharedFilterParams::new(&LiveFilterConfig::default()));
        let mut processor = make_processor(params);

        let mut buffer = vec![0.0f32; 2048];
        processor.process_buffer(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
        assert_eq!(processor.rms_out(), 0.0);
    }

    #[test]
    fn test_elapsed_time_accumulates() {
        let params = Arc::new(SharedFilterParams::new(&LiveFilterConfig::default()));
        let mut processor = make_processor(params);

        let mut buffer = vec![0.0f32; 44100];
        processor.process_buffer(&mut buffer);
        assert!((processor.elapsed_secs() - 1.0).abs() < 1e-9);
    }
}
