//! Parameter sets for the reference encryption engine

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};
use crate::keys::DEFAULT_HAMMING_WEIGHT;
use crate::lwe::CIPHERTEXT_MODULUS;

/// Parameters of the per-coefficient LWE engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// LWE dimension n
    pub lwe_dim: usize,

    /// Ciphertext modulus q
    /// q = 2^60 - 2^14 + 1 = 1152921504606830593
    pub q: u64,

    /// Standard deviation for Gaussian error sampling
    pub sigma: f64,

    /// Number of non-zero (±1) secret key coefficients
    pub hamming_weight: usize,
}

impl EngineParams {
    /// Default parameters: n = 64, σ = 3.2, Hamming weight 64
    pub fn standard() -> Self {
        Self {
            lwe_dim: 64,
            q: CIPHERTEXT_MODULUS,
            sigma: 3.2,
            hamming_weight: DEFAULT_HAMMING_WEIGHT,
        }
    }

    /// Small LWE dimension for tests and benchmarks
    pub fn fast() -> Self {
        Self {
            lwe_dim: 16,
            ..Self::standard()
        }
    }

    /// Scaling factor Δ = ⌊q/t⌋ for plaintext modulus t
    pub fn delta(&self, t: u64) -> u64 {
        self.q / t
    }

    /// Check if parameters are valid for plaintext modulus t
    pub fn validate(&self, t: u64) -> Result<()> {
        if self.lwe_dim == 0 {
            return Err(config_err!("lwe_dim must be positive"));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(config_err!("sigma must be positive, got {}", self.sigma));
        }
        if self.hamming_weight == 0 {
            return Err(config_err!("hamming_weight must be positive"));
        }
        if self.q >= 1 << 62 {
            return Err(config_err!("q must be below 2^62"));
        }
        // Δ must leave room for the noise growth of a transform
        if t == 0 || self.q / t < 1 << 20 {
            return Err(config_err!(
                "plaintext modulus {} too large for q = {}",
                t,
                self.q
            ));
        }
        Ok(())
    }

    /// Worst-case noise of one transform over slots of degree `d`, `n` slots
    ///
    /// A term goes through at most two Z_t-linear maps with centered
    /// coefficients (a Frobenius map, then a constant), and a transform
    /// sums at most n·d terms. Each map also carries the q mod t rounding
    /// of Δ·t.
    pub fn noise_bound(&self, t: u64, d: usize, n: usize) -> f64 {
        let growth = d as f64 * (t / 2 + 1) as f64;
        let fresh = NOISE_TAIL * self.sigma + t as f64;
        growth * growth * (n * d) as f64 * fresh
    }

    /// Reject parameters whose transforms could decrypt incorrectly
    pub fn check_noise_budget(&self, t: u64, d: usize, n: usize) -> Result<()> {
        let bound = self.noise_bound(t, d, n);
        let budget = (self.delta(t) / 2) as f64;
        if bound >= budget {
            return Err(config_err!(
                "noise bound {:.3e} exceeds Δ/2 = {:.3e} (t = {}, d = {}, n = {})",
                bound,
                budget,
                t,
                d,
                n
            ));
        }
        Ok(())
    }
}

/// Fresh errors are bounded by this many standard deviations
const NOISE_TAIL: f64 = 8.0;

impl Default for EngineParams {
    fn default() -> Self {
        Self::standard()
    }
}
