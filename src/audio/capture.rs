use crate::config::AudioConfig;
use crate::error::{DenoiseError, Result};
use audio_thread_priority::RtPriorityHandle;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};

/// Human-readable label for a device, for logs and `--list-devices`
fn device_label(device: &cpal::Device) -> String {
    match device.description() {
        Ok(desc) => format!("{:?}", desc),
        Err(_) => "Unknown".to_string(),
    }
}

pub(crate) fn find_input_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| DenoiseError::AudioDevice(format!("{}", e)))?
            .find(|d| device_label(d).contains(name))
            .ok_or_else(|| {
                DenoiseError::AudioDevice(format!("No input device matching '{}'", name))
            }),
        None => host
            .default_input_device()
            .ok_or_else(|| DenoiseError::AudioDevice("No input device found".into())),
    }
}

pub(crate) fn find_output_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| DenoiseError::AudioDevice(format!("{}", e)))?
            .find(|d| device_label(d).contains(name))
            .ok_or_else(|| {
                DenoiseError::AudioDevice(format!("No output device matching '{}'", name))
            }),
        None => host
            .default_output_device()
            .ok_or_else(|| DenoiseError::AudioDevice("No output device found".into())),
    }
}

/// List the labels of all available input devices
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| DenoiseError::AudioDevice(format!("{}", e)))?;
    Ok(devices.map(|d| device_label(&d)).collect())
}

/// List the labels of all available output devices
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| DenoiseError::AudioDevice(format!("{}", e)))?;
    Ok(devices.map(|d| device_label(&d)).collect())
}

pub struct AudioCapture {
    stream: cpal::Stream,
    _rt_handle: Option<RtPriorityHandle>,
}

impl AudioCapture {
    /// Start capturing mono samples into the channel
    ///
    /// Each callback buffer is forwarded as one `Vec<f32>`. When the channel
    /// is full the buffer is dropped, never blocking the audio callback; a
    /// consumer that wants every sample must drain promptly.
    pub fn new(
        config: &AudioConfig,
        tx: Sender<Vec<f32>>,
        device_name: Option<&str>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_input_device(&host, device_name)?;

        match device.description() {
            Ok(desc) => log::info!("Input device: {:?}", desc),
            Err(_) => log::info!("Input device: Unknown"),
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as u32),
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Send audio data to the processing thread
                    match tx.try_send(data.to_vec()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => log::trace!("Capture buffer dropped"),
                        Err(TrySendError::Disconnected(_)) => log::warn!("Audio receiver dropped"),
                    }
                },
                |err| eprintln!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| DenoiseError::AudioStream(format!("{}", e)))?;

        // Attempt to promote to real-time priority
        let rt_handle = audio_thread_priority::promote_current_thread_to_real_time(
            config.buffer_size as u32,
            config.sample_rate,
        );

        let rt_handle = match rt_handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Could not set real-time priority: {}", e);
                None
            }
        };

        stream
            .play()
            .map_err(|e| DenoiseError::AudioStream(format!("{}", e)))?;

        Ok(Self {
            stream,
            _rt_handle: rt_handle,
        })
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        let _ = self.stream.pause();
    }
}

/// Record a clip of fixed duration, blocking until it is complete
///
/// Returns exactly `config.clip_samples(duration_secs)` samples, or an
/// `InsufficientData` error if the stream ends early.
pub fn record_clip(
    config: &AudioConfig,
    duration_secs: f32,
    device_name: Option<&str>,
) -> Result<Vec<f32>> {
    let target = config.clip_samples(duration_secs);
    if target == 0 {
        return Ok(Vec::new());
    }

    let (tx, rx) = crossbeam_channel::bounded(10);
    let _capture = AudioCapture::new(config, tx, device_name)?;

    log::info!("Recording {:.1}s clip...", duration_secs);

    let mut samples = Vec::with_capacity(target);
    while samples.len() < target {
        match rx.recv() {
            Ok(buffer) => samples.extend(buffer),
            Err(_) => {
                return Err(DenoiseError::InsufficientData {
                    needed: target,
                    available: samples.len(),
                });
            }
        }
    }

    samples.truncate(target);
    log::info!("Recording complete ({} samples)", samples.len());
    Ok(samples)
}
