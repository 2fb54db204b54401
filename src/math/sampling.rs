//! Noise and secret sampling

use rand::seq::index;
use rand::Rng;

/// Rounded continuous Gaussian with standard deviation σ
#[derive(Debug, Clone)]
pub struct GaussianSampler {
    sigma: f64,
}

impl GaussianSampler {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Box-Muller sample rounded to the nearest integer
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let radius = (-2.0 * rng.gen_range(f64::MIN_POSITIVE..1.0f64).ln()).sqrt();
        let angle = std::f64::consts::TAU * rng.gen::<f64>();
        (self.sigma * radius * angle.cos()).round() as i64
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

/// Sparse ternary vector: exactly `min(weight, dim)` entries in {-1, 1}
pub fn sample_hamming_weight<R: Rng + ?Sized>(dim: usize, weight: usize, rng: &mut R) -> Vec<i64> {
    let mut out = vec![0i64; dim];
    for pos in index::sample(rng, dim, weight.min(dim)) {
        out[pos] = if rng.gen::<bool>() { 1 } else { -1 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_gaussian_moments() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(42);
        let sampler = GaussianSampler::new(3.2);

        let n = 20_000;
        let (sum, sum_sq) = (0..n).fold((0i64, 0i64), |(s, sq), _| {
            let x = sampler.sample(&mut rng);
            (s + x, sq + x * x)
        });
        let mean = sum as f64 / n as f64;
        let std_dev = (sum_sq as f64 / n as f64 - mean * mean).sqrt();
        assert!(mean.abs() < 0.2, "mean {}", mean);
        assert!((std_dev - sampler.sigma()).abs() < 0.3, "std dev {}", std_dev);
    }

    #[test]
    fn test_hamming_weight() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(7);
        let s = sample_hamming_weight(128, 64, &mut rng);
        assert_eq!(s.iter().filter(|&&x| x != 0).count(), 64);
        assert!(s.iter().all(|&x| (-1..=1).contains(&x)));

        let capped = sample_hamming_weight(16, 64, &mut rng);
        assert_eq!(capped.iter().filter(|&&x| x != 0).count(), 16);
    }
}
