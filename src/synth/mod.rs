//! Signal and noise synthesis for the offline workbench and tests

pub mod noise;
pub mod signal;

pub use noise::{NoiseConfig, add_noise, generate_brown_noise, mean_squared_error, signal_power};
pub use signal::{generate_chord, generate_tone};
