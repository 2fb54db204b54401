//! Per-coefficient encryption, decryption and linear homomorphisms

use rand::Rng;

use super::types::{LweCiphertext, LweSecretKey};
use crate::math::sampling::sample_hamming_weight;
use crate::math::ModQ;

/// Accumulators are reduced once they pass this bound (products are < 2^122)
const LAZY_REDUCE_BOUND: u128 = 1 << 126;

impl LweSecretKey {
    /// Sample a ternary secret with exactly `min(weight, dim)` non-zero entries
    pub fn generate<R: Rng + ?Sized>(dim: usize, weight: usize, q: u64, rng: &mut R) -> Self {
        let coeffs = sample_hamming_weight(dim, weight, rng)
            .into_iter()
            .map(|s| ModQ::from_signed(s, q))
            .collect();
        Self { coeffs, dim, q }
    }

    /// Wrap coefficients already reduced mod q
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let dim = coeffs.len();
        Self { coeffs, dim, q }
    }

    /// Number of non-zero coefficients
    pub fn hamming_weight(&self) -> usize {
        self.coeffs.iter().filter(|&&c| c != 0).count()
    }
}

impl LweCiphertext {
    /// Encrypt `message` with a fresh uniform `a`
    ///
    /// b = Δ·m + e - <a, s>
    pub fn encrypt<R: Rng + ?Sized>(
        sk: &LweSecretKey,
        message: u64,
        delta: u64,
        error: i64,
        rng: &mut R,
    ) -> Self {
        let q = sk.q;
        let a: Vec<u64> = (0..sk.dim).map(|_| rng.gen_range(0..q)).collect();

        let neg_inner = ModQ::negate(inner_product_mod(&a, &sk.coeffs, q), q);
        let e_mod = ModQ::from_signed(error, q);
        let delta_m = ModQ::mul(delta, message, q);

        let b = ModQ::add(neg_inner, ModQ::add(e_mod, delta_m, q), q);

        Self { a, b, q }
    }

    /// Decrypt to Z_t
    ///
    /// Computes: m = round(t/q · (b + <a, s>)) mod t
    pub fn decrypt(&self, sk: &LweSecretKey, t: u64) -> u64 {
        let q = self.q;
        let noisy = ModQ::add(self.b, inner_product_mod(&self.a, &sk.coeffs, q), q);
        round_decode(noisy, q, t)
    }

    /// Slot-coefficient sum
    pub fn add(&self, other: &LweCiphertext) -> Self {
        debug_assert_eq!(self.q, other.q);
        debug_assert_eq!(self.a.len(), other.a.len());

        let q = self.q;
        let a: Vec<u64> = self
            .a
            .iter()
            .zip(other.a.iter())
            .map(|(&x, &y)| ModQ::add(x, y, q))
            .collect();

        let b = ModQ::add(self.b, other.b, q);

        Self { a, b, q }
    }

    /// In-place homomorphic addition
    pub fn add_assign(&mut self, other: &LweCiphertext) {
        debug_assert_eq!(self.a.len(), other.a.len());
        let q = self.q;
        for (x, &y) in self.a.iter_mut().zip(&other.a) {
            *x = ModQ::add(*x, y, q);
        }
        self.b = ModQ::add(self.b, other.b, q);
    }

    /// Slot-coefficient difference
    pub fn sub(&self, other: &LweCiphertext) -> Self {
        debug_assert_eq!(self.q, other.q);
        debug_assert_eq!(self.a.len(), other.a.len());

        let q = self.q;
        let a: Vec<u64> = self
            .a
            .iter()
            .zip(other.a.iter())
            .map(|(&x, &y)| ModQ::sub(x, y, q))
            .collect();

        let b = ModQ::sub(self.b, other.b, q);

        Self { a, b, q }
    }

    /// Scalar multiplication by a signed integer
    pub fn scalar_mul(&self, scalar: i64) -> Self {
        let q = self.q;
        let s = ModQ::from_signed(scalar, q);
        let a: Vec<u64> = self.a.iter().map(|&x| ModQ::mul(x, s, q)).collect();
        let b = ModQ::mul(self.b, s, q);

        Self { a, b, q }
    }

    /// Σ c_i · ct_i with small signed coefficients, reduced lazily
    ///
    /// Zero coefficients are skipped; an empty combination is the
    /// trivial encryption of zero.
    pub fn linear_combination(dim: usize, q: u64, terms: &[(&LweCiphertext, i64)]) -> Self {
        let q128 = q as u128;
        let mut pos = vec![0u128; dim + 1];
        let mut neg = vec![0u128; dim + 1];

        for &(ct, c) in terms {
            if c == 0 {
                continue;
            }
            debug_assert_eq!(ct.a.len(), dim);
            let acc = if c > 0 { &mut pos } else { &mut neg };
            let c = c.unsigned_abs() as u128;
            for (slot, &x) in acc.iter_mut().zip(ct.a.iter().chain(std::iter::once(&ct.b))) {
                if *slot >= LAZY_REDUCE_BOUND {
                    *slot %= q128;
                }
                *slot += c * x as u128;
            }
        }

        let mut coords = pos
            .into_iter()
            .zip(neg)
            .map(|(p, n)| ModQ::sub((p % q128) as u64, (n % q128) as u64, q));
        let a: Vec<u64> = coords.by_ref().take(dim).collect();
        let b = coords.next().unwrap_or(0);

        Self { a, b, q }
    }

    /// Trivial encryption of zero: a = 0, b = 0
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            a: vec![0; dim],
            b: 0,
            q,
        }
    }
}

/// <a, s> mod q
fn inner_product_mod(a: &[u64], b: &[u64], q: u64) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .fold(0u64, |acc, (&x, &y)| ModQ::add(acc, ModQ::mul(x, y, q), q))
}

/// Decode noisy = e + Δ·m (|e| < Δ/2) back to m ∈ Z_t
fn round_decode(noisy: u64, q: u64, t: u64) -> u64 {
    let scaled = (noisy as u128) * (t as u128);
    let divided = scaled / (q as u128);
    let remainder = scaled % (q as u128);

    let rounded = if remainder >= (q as u128) / 2 {
        divided + 1
    } else {
        divided
    };

    (rounded % (t as u128)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lwe::CIPHERTEXT_MODULUS as Q;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const DIM: usize = 64;
    const T: u64 = 289;

    fn delta() -> u64 {
        Q / T
    }

    fn gen_small_error<R: Rng>(rng: &mut R) -> i64 {
        (rng.gen::<u8>() % 5) as i64 - 2
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha20Rng::seed_from_u64(12345);
        let sk = LweSecretKey::generate(DIM, 32, Q, &mut rng);
        assert_eq!(sk.hamming_weight(), 32);

        for message in [0, 1, 100, T - 1] {
            let error = gen_small_error(&mut rng);
            let ct = LweCiphertext::encrypt(&sk, message, delta(), error, &mut rng);
            assert_eq!(ct.decrypt(&sk, T), message, "Failed for message {}", message);
        }
    }

    #[test]
    fn test_homomorphic_add_sub() {
        let mut rng = ChaCha20Rng::seed_from_u64(54321);
        let sk = LweSecretKey::generate(DIM, 32, Q, &mut rng);

        let ct1 = LweCiphertext::encrypt(&sk, 200, delta(), 1, &mut rng);
        let ct2 = LweCiphertext::encrypt(&sk, 150, delta(), -2, &mut rng);

        assert_eq!(ct1.add(&ct2).decrypt(&sk, T), (200 + 150) % T);
        assert_eq!(ct2.sub(&ct1).decrypt(&sk, T), T - 50);

        let mut acc = ct1.clone();
        acc.add_assign(&ct2);
        assert_eq!(acc, ct1.add(&ct2));
    }

    #[test]
    fn test_scalar_multiplication() {
        let mut rng = ChaCha20Rng::seed_from_u64(11111);
        let sk = LweSecretKey::generate(DIM, 32, Q, &mut rng);

        let ct = LweCiphertext::encrypt(&sk, 100, delta(), 1, &mut rng);
        assert_eq!(ct.scalar_mul(5).decrypt(&sk, T), 500 % T);
        assert_eq!(ct.scalar_mul(-1).decrypt(&sk, T), T - 100);
    }

    #[test]
    fn test_linear_combination_matches_naive() {
        let mut rng = ChaCha20Rng::seed_from_u64(22222);
        let sk = LweSecretKey::generate(DIM, 32, Q, &mut rng);

        let cts: Vec<LweCiphertext> = [7u64, 11, 13]
            .iter()
            .map(|&m| LweCiphertext::encrypt(&sk, m, delta(), gen_small_error(&mut rng), &mut rng))
            .collect();
        let coeffs = [3i64, -144, 0];

        let terms: Vec<(&LweCiphertext, i64)> = cts.iter().zip(coeffs).collect();
        let combined = LweCiphertext::linear_combination(DIM, Q, &terms);

        let naive = cts[0].scalar_mul(3).add(&cts[1].scalar_mul(-144));
        assert_eq!(combined, naive);

        let expected = (3 * 7 + (T as i64 - 144) * 11).rem_euclid(T as i64) as u64;
        assert_eq!(combined.decrypt(&sk, T), expected);

        let empty = LweCiphertext::linear_combination(DIM, Q, &[]);
        assert_eq!(empty, LweCiphertext::zero(DIM, Q));
    }
}
