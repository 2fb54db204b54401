//! LWE encryption of individual slot coefficients.
//!
//! A ciphertext (a, b) encrypts a coefficient m ∈ Z_t (t = p^r) as:
//!
//! ```text
//! b = -<a, s> + e + Δ·m,    Δ = ⌊q/t⌋
//! ```
//!
//! The scheme is linearly homomorphic, which is all the reference engine
//! needs: slot permutations (rotations) move ciphertexts around, and
//! per-slot constants and Frobenius maps are Z_t-linear maps on the `d`
//! coefficient ciphertexts of a slot.
//!
//! # Example
//!
//! ```
//! use hcube_matmul::lwe::{LweCiphertext, LweSecretKey, CIPHERTEXT_MODULUS};
//! use rand::SeedableRng;
//!
//! let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(1);
//! let sk = LweSecretKey::generate(32, 16, CIPHERTEXT_MODULUS, &mut rng);
//! let delta = CIPHERTEXT_MODULUS / 4;
//! let ct = LweCiphertext::encrypt(&sk, 3, delta, 2, &mut rng);
//! assert_eq!(ct.decrypt(&sk, 4), 3);
//! ```

mod enc;
mod types;

pub use types::{LweCiphertext, LweSecretKey};

/// Ciphertext modulus q = 2^60 - 2^14 + 1
pub const CIPHERTEXT_MODULUS: u64 = 1152921504606830593;
