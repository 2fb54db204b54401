//! Secret key and automorphism key management
//!
//! Key-switching material is tracked by Galois element: rotating by `e`
//! along dimension `i` needs the key for `g_i^e mod m` (and, on a
//! non-native dimension, also `g_i^{e-D}`); Frobenius `σ^j` needs the key
//! for `p^j mod m`. Automorphisms without a direct key are composed from
//! available steps along a shortest path.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::error::{HeError, Result};
use crate::lwe::LweSecretKey;
use crate::math::modular::ceil_sqrt;
use crate::math::ModQ;

/// Hamming weight of the secret key
pub const DEFAULT_HAMMING_WEIGHT: usize = 64;

/// Dimensions (or Frobenius orders) up to this size get a full key set
/// from the "some" builders; larger ones get baby-step/giant-step keys
pub const KEY_BOUND: usize = 50;

/// Set of Galois elements for which key-switching material exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    elements: BTreeSet<u64>,
}

impl KeySet {
    pub fn insert(&mut self, element: u64) -> bool {
        self.elements.insert(element)
    }

    pub fn contains(&self, element: u64) -> bool {
        self.elements.contains(&element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.elements.iter().copied()
    }
}

/// Owns the secret key and the automorphism keys generated for it
#[derive(Debug, Clone)]
pub struct KeyManager {
    ctx: Arc<Context>,
    secret: LweSecretKey,
    keys: KeySet,
}

impl KeyManager {
    /// Sample a Hamming-weight-`weight` ternary secret of dimension `dim`
    pub fn generate<R: Rng + ?Sized>(
        ctx: Arc<Context>,
        dim: usize,
        weight: usize,
        q: u64,
        rng: &mut R,
    ) -> Self {
        let secret = LweSecretKey::generate(dim, weight, q, rng);
        Self::from_secret(ctx, secret)
    }

    pub fn from_secret(ctx: Arc<Context>, secret: LweSecretKey) -> Self {
        Self {
            ctx,
            secret,
            keys: KeySet::default(),
        }
    }

    pub fn secret_key(&self) -> &LweSecretKey {
        &self.secret
    }

    pub fn key_set(&self) -> &KeySet {
        &self.keys
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Keys for rotating by `amount` along `dim` in one step
    pub fn add_rotation_key(&mut self, dim: usize, amount: i64) {
        let hc = self.ctx.hypercube();
        let size = hc.size_of_dim(dim) as i64;
        let e = amount.rem_euclid(size);
        if e == 0 {
            return;
        }
        self.keys.insert(hc.galois_element(dim, e));
        if !hc.is_native(dim) {
            self.keys.insert(hc.galois_element(dim, e - size));
        }
    }

    /// Key for σ^j in one step
    pub fn add_frobenius_key(&mut self, j: usize) {
        let d = self.ctx.degree();
        let j = j % d;
        if j == 0 {
            return;
        }
        let m = self.ctx.m();
        self.keys.insert(ModQ::pow(self.ctx.p() % m, j as u64, m));
    }

    /// Every rotation amount along every dimension
    pub fn add_full_1d(&mut self) {
        for dim in 0..self.ctx.num_dims() {
            for e in 1..self.ctx.size_of_dimension(dim) {
                self.add_rotation_key(dim, e as i64);
            }
        }
        debug!(keys = self.keys.len(), "added full 1D key set");
    }

    /// Full key set on small dimensions, baby-step/giant-step on large ones
    pub fn add_some_1d(&mut self) {
        for dim in 0..self.ctx.num_dims() {
            let size = self.ctx.size_of_dimension(dim);
            if size <= KEY_BOUND {
                for e in 1..size {
                    self.add_rotation_key(dim, e as i64);
                }
            } else {
                self.add_baby_giant_1d(dim);
            }
        }
        debug!(keys = self.keys.len(), "added default 1D key set");
    }

    /// Baby-step/giant-step keys on every dimension
    pub fn add_bsgs_1d(&mut self) {
        for dim in 0..self.ctx.num_dims() {
            self.add_baby_giant_1d(dim);
        }
        debug!(keys = self.keys.len(), "added BSGS 1D key set");
    }

    /// Only rotation by one along every dimension
    pub fn add_minimal_1d(&mut self) {
        for dim in 0..self.ctx.num_dims() {
            self.add_rotation_key(dim, 1);
        }
        debug!(keys = self.keys.len(), "added minimal 1D key set");
    }

    /// Every Frobenius power
    pub fn add_frb(&mut self) {
        for j in 1..self.ctx.degree() {
            self.add_frobenius_key(j);
        }
    }

    /// All Frobenius powers for small d, baby-step/giant-step otherwise
    pub fn add_some_frb(&mut self) {
        let d = self.ctx.degree();
        if d <= KEY_BOUND {
            self.add_frb();
            return;
        }
        let g = ceil_sqrt(d);
        for j in 1..g {
            self.add_frobenius_key(j);
        }
        for j in (g..d).step_by(g) {
            self.add_frobenius_key(j);
        }
    }

    /// Only σ^1
    pub fn add_minimal_frb(&mut self) {
        self.add_frobenius_key(1);
    }

    fn add_baby_giant_1d(&mut self, dim: usize) {
        let size = self.ctx.size_of_dimension(dim);
        let g = ceil_sqrt(size);
        for e in 1..g {
            self.add_rotation_key(dim, e as i64);
        }
        for e in (g..size).step_by(g) {
            self.add_rotation_key(dim, e as i64);
        }
    }

    /// Whether rotation by `amount` along `dim` is a single key switch
    pub fn has_rotation(&self, dim: usize, amount: i64) -> bool {
        let hc = self.ctx.hypercube();
        let size = hc.size_of_dim(dim) as i64;
        let e = amount.rem_euclid(size);
        if e == 0 {
            return true;
        }
        self.keys.contains(hc.galois_element(dim, e))
            && (hc.is_native(dim) || self.keys.contains(hc.galois_element(dim, e - size)))
    }

    pub fn has_frobenius(&self, j: usize) -> bool {
        let j = j % self.ctx.degree();
        let m = self.ctx.m();
        j == 0 || self.keys.contains(ModQ::pow(self.ctx.p() % m, j as u64, m))
    }

    /// Shortest sequence of keyed rotation steps summing to `amount` mod D
    pub fn rotation_path(&self, dim: usize, amount: i64) -> Result<Vec<i64>> {
        self.ctx.check_dim(dim)?;
        let size = self.ctx.size_of_dimension(dim);
        let target = amount.rem_euclid(size as i64) as usize;
        let steps: Vec<usize> = (1..size)
            .filter(|&e| self.has_rotation(dim, e as i64))
            .collect();

        shortest_path(size, target, &steps)
            .map(|path| path.into_iter().map(|e| e as i64).collect())
            .ok_or_else(|| HeError::MissingKey {
                what: format!("rotation by {} along dimension {}", amount, dim),
            })
    }

    /// Shortest sequence of keyed Frobenius steps summing to `j` mod d
    pub fn frobenius_path(&self, j: usize) -> Result<Vec<usize>> {
        let d = self.ctx.degree();
        let steps: Vec<usize> = (1..d).filter(|&s| self.has_frobenius(s)).collect();
        shortest_path(d, j % d, &steps).ok_or_else(|| HeError::MissingKey {
            what: format!("Frobenius power {}", j),
        })
    }

    /// Check that every dimension and every Frobenius power is reachable
    pub fn check_complete(&self) -> Result<()> {
        for dim in 0..self.ctx.num_dims() {
            if self.ctx.size_of_dimension(dim) > 1 {
                self.rotation_path(dim, 1)?;
            }
        }
        if self.ctx.degree() > 1 {
            self.frobenius_path(1)?;
        }
        Ok(())
    }
}

/// BFS over Z_n from 0 to `target` using the given step sizes
fn shortest_path(n: usize, target: usize, steps: &[usize]) -> Option<Vec<usize>> {
    if target == 0 {
        return Some(Vec::new());
    }
    let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
    let mut seen = vec![false; n];
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;

    while let Some(node) = queue.pop_front() {
        for &s in steps {
            let next = (node + s) % n;
            if seen[next] {
                continue;
            }
            seen[next] = true;
            prev[next] = Some((node, s));
            if next == target {
                let mut path = Vec::new();
                let mut cur = target;
                while let Some((from, step)) = prev[cur] {
                    path.push(step);
                    cur = from;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}
