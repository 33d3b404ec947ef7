pub mod filter;
pub mod fir_bandpass;
pub mod fir_core;
pub mod fir_design;
pub mod iir_bandpass;
pub mod lms;
pub mod spectrum;

pub use filter::Filter;
pub use fir_bandpass::FirBandpass;
pub use fir_core::FirFilterCore;
pub use fir_design::{design_bandpass, magnitude_response, realized_taps};
pub use iir_bandpass::IirBandpass;
pub use lms::{LmsFilter, cancel_noise};
pub use spectrum::SpectrumAnalyzer;
