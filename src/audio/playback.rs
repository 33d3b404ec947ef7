use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use audio_thread_priority::RtPriorityHandle;
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, TryRecvError};

use super::capture::find_output_device;
use crate::config::AudioConfig;
use crate::error::{DenoiseError, Result};

pub struct AudioPlayback {
    stream: cpal::Stream,
    samples_played: Arc<AtomicUsize>,
    underruns: Arc<AtomicUsize>,
    _rt_handle: Option<RtPriorityHandle>,
}

impl AudioPlayback {
    /// Start playing mono samples pulled from the channel
    ///
    /// The output callback never blocks: it tops up from the channel with
    /// `try_recv` and fills any shortfall with silence. Once the sender side
    /// is dropped and the queue drains, the stream keeps running silently
    /// without counting underruns.
    pub fn new(
        config: &AudioConfig,
        rx: Receiver<Vec<f32>>,
        device_name: Option<&str>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_output_device(&host, device_name)?;

        match device.description() {
            Ok(desc) => log::info!("Output device: {:?}", desc),
            Err(_) => log::info!("Output device: Unknown"),
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as u32),
        };

        let samples_played = Arc::new(AtomicUsize::new(0));
        let underruns = Arc::new(AtomicUsize::new(0));

        let played = Arc::clone(&samples_played);
        let starved = Arc::clone(&underruns);
        let mut pending: VecDeque<f32> = VecDeque::new();
        let mut disconnected = false;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    while pending.len() < data.len() && !disconnected {
                        match rx.try_recv() {
                            Ok(chunk) => pending.extend(chunk),
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => disconnected = true,
                        }
                    }

                    let mut filled = 0usize;
                    for slot in data.iter_mut() {
                        match pending.pop_front() {
                            Some(sample) => {
                                *slot = sample;
                                filled += 1;
                            }
                            None => *slot = 0.0,
                        }
                    }

                    played.fetch_add(filled, Ordering::Relaxed);
                    if filled < data.len() && !disconnected {
                        starved.fetch_add(1, Ordering::Relaxed);
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
            samples_played,
            underruns,
            _rt_handle: rt_handle,
        })
    }

    /// Total samples delivered to the device so far
    pub fn samples_played(&self) -> usize {
        self.samples_played.load(Ordering::Relaxed)
    }

    /// Number of callbacks that ran short while the sender was still alive
    pub fn underruns(&self) -> usize {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        let _ = self.stream.pause();
    }
}

/// Play a whole clip, blocking until audition completes
///
/// Feeds the clip through a bounded channel (the send side paces itself
/// against the device) and returns once every sample has been delivered,
/// plus a small latency margin.
pub fn play_clip(config: &AudioConfig, samples: &[f32], device_name: Option<&str>) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let (tx, rx) = crossbeam_channel::bounded(10);
    let playback = AudioPlayback::new(config, rx, device_name)?;

    let clip_secs = samples.len() as f32 / config.sample_rate as f32;
    log::info!("Playing {:.1}s clip...", clip_secs);

    for chunk in samples.chunks(config.buffer_size) {
        tx.send(chunk.to_vec())
            .map_err(|_| DenoiseError::AudioStream("Playback stream closed".into()))?;
    }
    drop(tx);

    // The device should need clip length plus startup slack; treat anything
    // well past that as a stalled stream rather than waiting forever.
    let deadline = Instant::now() + Duration::from_secs_f32(clip_secs + 2.0);
    while playback.samples_played() < samples.len() {
        if Instant::now() > deadline {
            return Err(DenoiseError::AudioStream(
                "Playback stalled before the clip finished".into(),
            ));
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    std::thread::sleep(Duration::from_millis(50));

    if playback.underruns() > 0 {
        log::debug!("Playback finished with {} underruns", playback.underruns());
    }
    Ok(())
}
