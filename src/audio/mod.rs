pub mod buffer;
pub mod capture;
pub mod playback;
pub mod source;

pub use buffer::ScopeBuffer;
pub use capture::{AudioCapture, list_input_devices, list_output_devices, record_clip};
pub use playback::{AudioPlayback, play_clip};
pub use source::{AudioSource, DeviceSource, WavFileSource};
