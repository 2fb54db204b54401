//! Reference ciphertext engine
//!
//! A [`Ctxt`] encrypts a whole [`PlaintextArray`] as one LWE ciphertext per
//! slot coefficient, slot `t` occupying positions `t·d .. (t+1)·d`. The
//! scheme only supports Z_{p^r}-linear operations, which is exactly what
//! a linear transform needs:
//!
//! - rotations permute slot blocks; they are gated by the key set and
//!   charged one key switch per step (two on non-native dimensions),
//! - Frobenius maps and per-slot constant multiplications apply a d×d
//!   matrix to the coefficient ciphertexts of every slot.
//!
//! Per-slot work runs on the current `rayon` pool.

use std::sync::Arc;

use rand::Rng;
use rayon::prelude::*;

use crate::algebra::SlotElem;
use crate::context::Context;
use crate::encoding::PlaintextArray;
use crate::error::{config_err, Result};
use crate::keys::KeyManager;
use crate::lwe::LweCiphertext;
use crate::math::{GaussianSampler, ModQ};
use crate::params::EngineParams;
use crate::timing::{EvalStats, StatsSnapshot};

/// Encrypted plaintext array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctxt {
    cts: Vec<LweCiphertext>,
}

impl Ctxt {
    /// Number of coefficient ciphertexts (n·d)
    pub fn len(&self) -> usize {
        self.cts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cts.is_empty()
    }

    pub fn ciphertexts(&self) -> &[LweCiphertext] {
        &self.cts
    }
}

/// Encrypts, decrypts and evaluates linear operations on [`Ctxt`]s
#[derive(Debug)]
pub struct Engine {
    ctx: Arc<Context>,
    params: EngineParams,
    keys: KeyManager,
    sampler: GaussianSampler,
    delta: u64,
    stats: EvalStats,
}

impl Engine {
    pub fn new(keys: KeyManager, params: EngineParams) -> Result<Self> {
        let ctx = keys.context().clone();
        let t = ctx.ring().plaintext_modulus();
        params.validate(t)?;
        params.check_noise_budget(t, ctx.degree(), ctx.slot_count())?;

        let sk = keys.secret_key();
        if sk.dim != params.lwe_dim || sk.q != params.q {
            return Err(config_err!(
                "secret key (n = {}, q = {}) does not match engine parameters (n = {}, q = {})",
                sk.dim,
                sk.q,
                params.lwe_dim,
                params.q
            ));
        }

        Ok(Self {
            sampler: GaussianSampler::new(params.sigma),
            delta: params.delta(t),
            ctx,
            params,
            keys,
            stats: EvalStats::default(),
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn encrypt<R: Rng + ?Sized>(&self, pt: &PlaintextArray, rng: &mut R) -> Ctxt {
        let sk = self.keys.secret_key();
        let cts = pt
            .encode()
            .into_iter()
            .map(|m| {
                let error = self.sampler.sample(rng);
                LweCiphertext::encrypt(sk, m, self.delta, error, rng)
            })
            .collect();
        Ctxt { cts }
    }

    pub fn decrypt(&self, ct: &Ctxt) -> PlaintextArray {
        let sk = self.keys.secret_key();
        let t = self.ctx.ring().plaintext_modulus();
        let flat: Vec<u64> = ct.cts.par_iter().map(|c| c.decrypt(sk, t)).collect();
        PlaintextArray::decode(&self.ctx, &flat)
    }

    /// Trivial (noiseless) encryption of the zero array
    pub fn zero(&self) -> Ctxt {
        let len = self.ctx.slot_count() * self.ctx.degree();
        Ctxt {
            cts: vec![LweCiphertext::zero(self.params.lwe_dim, self.params.q); len],
        }
    }

    pub fn add(&self, a: &Ctxt, b: &Ctxt) -> Ctxt {
        let mut out = a.clone();
        self.add_assign(&mut out, b);
        out
    }

    pub fn add_assign(&self, acc: &mut Ctxt, other: &Ctxt) {
        debug_assert_eq!(acc.len(), other.len());
        acc.cts
            .par_iter_mut()
            .zip(other.cts.par_iter())
            .for_each(|(a, b)| a.add_assign(b));
    }

    /// Slot-wise product with a plaintext constant
    pub fn mul_by_constant(&self, ct: &Ctxt, constant: &PlaintextArray) -> Ctxt {
        self.stats.add_constant_mul();
        let ring = self.ctx.ring();
        self.map_slots(ct, |t, chunk| {
            let c: &SlotElem = constant.slot(t);
            if c.is_zero() {
                self.zero_slot()
            } else {
                self.apply_matrix(chunk, &ring.mul_matrix(c))
            }
        })
    }

    /// Rotate along `dim`: slot at coordinate i moves to i + amount
    pub fn rotate(&self, ct: &Ctxt, dim: usize, amount: i64) -> Result<Ctxt> {
        let path = self.keys.rotation_path(dim, amount)?;
        self.charge_rotation(dim, path.len());
        Ok(self.permute(ct, dim, amount))
    }

    /// Several rotations of the same input sharing one key-switching
    /// decomposition
    pub fn rotate_hoisted(&self, ct: &Ctxt, dim: usize, amounts: &[i64]) -> Result<Vec<Ctxt>> {
        let paths = amounts
            .iter()
            .map(|&e| self.keys.rotation_path(dim, e))
            .collect::<Result<Vec<_>>>()?;
        self.stats.add_hoisted_batch();
        Ok(amounts
            .iter()
            .zip(paths)
            .map(|(&e, path)| {
                self.charge_rotation(dim, path.len());
                self.permute(ct, dim, e)
            })
            .collect())
    }

    /// Apply σ^j in every slot
    pub fn frobenius(&self, ct: &Ctxt, j: usize) -> Result<Ctxt> {
        let j = j % self.ctx.degree();
        if j == 0 {
            return Ok(ct.clone());
        }
        let path = self.keys.frobenius_path(j)?;
        self.stats.add_key_switches(path.len() as u64);
        self.stats.add_frobenius();

        let matrix = self.ctx.ring().frobenius_matrix(j);
        Ok(self.map_slots(ct, |_, chunk| self.apply_matrix(chunk, matrix)))
    }

    fn charge_rotation(&self, dim: usize, steps: usize) {
        if steps == 0 {
            return;
        }
        let per_step = if self.ctx.hypercube().is_native(dim) { 1 } else { 2 };
        self.stats.add_key_switches((steps * per_step) as u64);
        self.stats.add_rotation();
    }

    fn permute(&self, ct: &Ctxt, dim: usize, amount: i64) -> Ctxt {
        let d = self.ctx.degree();
        let hc = self.ctx.hypercube();
        let slots: Vec<&[LweCiphertext]> = ct.cts.chunks(d).collect();
        let moved: Vec<Vec<LweCiphertext>> = (0..slots.len())
            .into_par_iter()
            .map(|t| slots[hc.rotate_index(t, dim, -amount)].to_vec())
            .collect();
        Ctxt {
            cts: moved.into_iter().flatten().collect(),
        }
    }

    fn map_slots<F>(&self, ct: &Ctxt, f: F) -> Ctxt
    where
        F: Fn(usize, &[LweCiphertext]) -> Vec<LweCiphertext> + Sync,
    {
        let d = self.ctx.degree();
        let slots: Vec<Vec<LweCiphertext>> = ct
            .cts
            .par_chunks(d)
            .enumerate()
            .map(|(t, chunk)| f(t, chunk))
            .collect();
        Ctxt {
            cts: slots.into_iter().flatten().collect(),
        }
    }

    /// Row-vector product: output coefficient u is Σ_i M[i][u]·ct_i
    fn apply_matrix(&self, chunk: &[LweCiphertext], matrix: &[Vec<u64>]) -> Vec<LweCiphertext> {
        let t = self.ctx.ring().plaintext_modulus();
        (0..chunk.len())
            .map(|u| {
                let terms: Vec<(&LweCiphertext, i64)> = chunk
                    .iter()
                    .zip(matrix)
                    .map(|(ct, row)| (ct, ModQ::to_signed(row[u], t)))
                    .collect();
                LweCiphertext::linear_combination(self.params.lwe_dim, self.params.q, &terms)
            })
            .collect()
    }

    fn zero_slot(&self) -> Vec<LweCiphertext> {
        vec![LweCiphertext::zero(self.params.lwe_dim, self.params.q); self.ctx.degree()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextParams;
    use crate::error::HeError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_engine(params: ContextParams, install: fn(&mut KeyManager)) -> Engine {
        let ctx = Arc::new(Context::new(params).unwrap());
        let engine_params = EngineParams::fast();
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let mut keys = KeyManager::generate(
            ctx,
            engine_params.lwe_dim,
            engine_params.hamming_weight,
            engine_params.q,
            &mut rng,
        );
        install(&mut keys);
        Engine::new(keys, engine_params).unwrap()
    }

    fn small() -> ContextParams {
        ContextParams {
            m: 105,
            ..ContextParams::default()
        }
    }

    #[test]
    fn test_encrypt_decrypt() {
        let engine = test_engine(small(), |_| {});
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let v = PlaintextArray::random(engine.context(), &mut rng);
        let ct = engine.encrypt(&v, &mut rng);
        assert_eq!(ct.len(), v.len() * engine.context().degree());
        assert_eq!(engine.decrypt(&ct), v);
    }

    #[test]
    fn test_add_and_constant_mul() {
        let engine = test_engine(small(), |_| {});
        let ctx = engine.context().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let v = PlaintextArray::random(&ctx, &mut rng);
        let w = PlaintextArray::random(&ctx, &mut rng);
        let c = PlaintextArray::random(&ctx, &mut rng);

        let cv = engine.encrypt(&v, &mut rng);
        let cw = engine.encrypt(&w, &mut rng);

        let sum = engine.decrypt(&engine.add(&cv, &cw));
        let expected: Vec<SlotElem> = v
            .slots()
            .iter()
            .zip(w.slots())
            .map(|(a, b)| ctx.ring().add(a, b))
            .collect();
        assert_eq!(sum, PlaintextArray::from_slots(expected));

        let prod = engine.decrypt(&engine.mul_by_constant(&cv, &c));
        assert_eq!(prod, v.mul(&ctx, &c));
        assert_eq!(engine.stats().constant_muls, 1);
    }

    #[test]
    fn test_rotation_matches_plaintext() {
        let engine = test_engine(ContextParams::default(), |k| k.add_minimal_1d());
        let ctx = engine.context().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let v = PlaintextArray::random(&ctx, &mut rng);
        let ct = engine.encrypt(&v, &mut rng);

        let rotated = engine.rotate(&ct, 0, 3).unwrap();
        assert_eq!(engine.decrypt(&rotated), v.rotate(&ctx, 0, 3));
        assert_eq!(engine.stats().key_switches, 3);

        // non-native dimension: two key switches per step
        engine.reset_stats();
        let rotated = engine.rotate(&ct, 1, 1).unwrap();
        assert_eq!(engine.decrypt(&rotated), v.rotate(&ctx, 1, 1));
        assert_eq!(engine.stats().key_switches, 2);
    }

    #[test]
    fn test_hoisted_rotations() {
        let engine = test_engine(small(), |k| k.add_full_1d());
        let ctx = engine.context().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let v = PlaintextArray::random(&ctx, &mut rng);
        let ct = engine.encrypt(&v, &mut rng);

        let amounts = [0, 1, 2];
        let rotated = engine.rotate_hoisted(&ct, 0, &amounts).unwrap();
        for (&e, r) in amounts.iter().zip(&rotated) {
            assert_eq!(engine.decrypt(r), v.rotate(&ctx, 0, e));
        }
        assert_eq!(engine.stats().hoisted_batches, 1);
        assert_eq!(engine.stats().rotations, 2);
    }

    #[test]
    fn test_frobenius() {
        let engine = test_engine(ContextParams::default(), |k| k.add_minimal_frb());
        let ctx = engine.context().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let v = PlaintextArray::random(&ctx, &mut rng);
        let ct = engine.encrypt(&v, &mut rng);

        let out = engine.frobenius(&ct, 2).unwrap();
        assert_eq!(engine.decrypt(&out), v.frobenius(&ctx, 2));
        assert_eq!(engine.stats().key_switches, 2);
        assert_eq!(engine.frobenius(&ct, 0).unwrap(), ct);
    }

    #[test]
    fn test_missing_key_is_error() {
        let engine = test_engine(ContextParams::default(), |_| {});
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let v = PlaintextArray::random(engine.context(), &mut rng);
        let ct = engine.encrypt(&v, &mut rng);
        assert!(matches!(
            engine.rotate(&ct, 0, 1),
            Err(HeError::MissingKey { .. })
        ));
        assert!(engine.frobenius(&ct, 1).is_err());
    }

    #[test]
    fn test_lifted_plaintext_modulus() {
        let params = ContextParams {
            m: 91,
            p: 3,
            r: 2,
            ..ContextParams::default()
        };
        let engine = test_engine(params, |k| {
            k.add_full_1d();
            k.add_frb();
        });
        let ctx = engine.context().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let v = PlaintextArray::random(&ctx, &mut rng);
        let c = PlaintextArray::random(&ctx, &mut rng);
        let ct = engine.encrypt(&v, &mut rng);

        let out = engine
            .frobenius(&engine.mul_by_constant(&ct, &c), 1)
            .unwrap();
        assert_eq!(engine.decrypt(&out), v.mul(&ctx, &c).frobenius(&ctx, 1));
    }
}
