pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod processing;
pub mod signal_processing;
pub mod synth;
pub mod wav;

pub use config::DenoiseConfig;
pub use error::{DenoiseError, Result};
pub use wav::save_wav;
