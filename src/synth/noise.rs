use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Brown-noise synthesis configuration
///
/// Deserializable so the offline CLI can take a `[noise]` TOML section.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct NoiseConfig {
    /// Peak amplitude of the rescaled noise; the largest sample magnitude
    /// equals this value exactly
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    /// RNG seed for reproducible noise; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_amplitude() -> f32 {
    0.05
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            seed: None,
        }
    }
}

impl NoiseConfig {
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Generate Brown noise by integrating white noise
///
/// Cumulative sum of unit normal samples, rescaled so the peak magnitude
/// equals `config.amplitude` exactly. The random walk concentrates energy at
/// low frequencies (1/f² spectrum), which makes it an audible low rumble.
pub fn generate_brown_noise(num_samples: usize, config: &NoiseConfig) -> Vec<f32> {
    let mut rng = create_rng(config.seed);
    let normal = Normal::new(0.0, 1.0).unwrap();

    // Walk in f64: the sum of hundreds of thousands of steps would lose
    // low-order bits in f32 long before the rescale.
    let mut acc = 0.0f64;
    let walk: Vec<f64> = (0..num_samples)
        .map(|_| {
            acc += normal.sample(&mut rng);
            acc
        })
        .collect();

    let peak = walk.iter().fold(0.0f64, |a, &b| a.max(b.abs()));
    if peak == 0.0 {
        return vec![0.0; num_samples];
    }

    let amplitude = config.amplitude as f64;
    walk.iter().map(|&x| (amplitude * x / peak) as f32).collect()
}

/// Element-wise sum over the common length of the two signals
pub fn add_noise(clean: &[f32], noise: &[f32]) -> Vec<f32> {
    clean
        .iter()
        .zip(noise.iter())
        .map(|(c, n)| c + n)
        .collect()
}

/// Mean-square power of a signal
pub fn signal_power(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f32>() / signal.len() as f32
}

/// Mean squared error over the common length of the two signals
pub fn mean_squared_error(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_equals_amplitude_exactly() {
        let config = NoiseConfig::default().with_seed(42).with_amplitude(0.05);
        let noise = generate_brown_noise(44100, &config);

        let peak = noise.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert_eq!(peak, 0.05);
    }

    #[test]
    fn test_no_sample_exceeds_amplitude() {
        let config = NoiseConfig::default().with_seed(7).with_amplitude(0.2);
        let noise = generate_brown_noise(10000, &config);
        assert!(noise.iter().all(|&x| x.abs() <= 0.2));
    }

    #[test]
    fn test_seeded_rng_reproducibility() {
        let config = NoiseConfig::default().with_seed(12345);
        let a = generate_brown_noise(5000, &config);
        let b = generate_brown_noise(5000, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_brown_noise(5000, &NoiseConfig::default().with_seed(1));
        let b = generate_brown_noise(5000, &NoiseConfig::default().with_seed(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_request_yields_empty_noise() {
        let noise = generate_brown_noise(0, &NoiseConfig::default().with_seed(42));
        assert!(noise.is_empty());
    }

    #[test]
    fn test_low_frequency_energy_dominates() {
        // A random walk should carry far more energy in slow movements than
        // in sample-to-sample differences.
        let config = NoiseConfig::default().with_seed(99).with_amplitude(1.0);
        let noise = generate_brown_noise(44100, &config);

        let walk_power = signal_power(&noise);
        let diff: Vec<f32> = noise.windows(2).map(|w| w[1] - w[0]).collect();
        let diff_power = signal_power(&diff);

        assert!(
            walk_power > diff_power * 10.0,
            "walk power {} vs step power {}",
            walk_power,
            diff_power
        );
    }

    #[test]
    fn test_add_noise_common_length() {
        let clean = vec![0.5f32; 100];
        let noise = vec![0.25f32; 80];
        let noisy = add_noise(&clean, &noise);

        assert_eq!(noisy.len(), 80);
        assert!(noisy.iter().all(|&x| (x - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_signal_power_empty() {
        assert_eq!(signal_power(&[]), 0.0);
    }

    #[test]
    fn test_mean_squared_error() {
        let a = vec![1.0f32, 2.0, 3.0];
        let b = vec![1.0f32, 0.0, 3.0];
        assert!((mean_squared_error(&a, &b) - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(mean_squared_error(&a, &[]), 0.0);
    }
}
