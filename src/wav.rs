use std::path::Path;

use hound::{WavSpec, WavWriter};

use crate::audio::{AudioSource, WavFileSource};

/// Write a mono float clip to a WAV file
pub fn save_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Read a WAV file as one mono clip, returning the samples and their rate
///
/// Stereo files are averaged down to mono; integer formats are normalized to
/// [-1, 1].
pub fn load_wav<P: AsRef<Path>>(path: P) -> anyhow::Result<(Vec<f32>, u32)> {
    let source = WavFileSource::new(path, 4096)?;
    let sample_rate = source.sample_rate();
    Ok((source.into_samples(), sample_rate))
}
