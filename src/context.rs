//! Algebraic context: cyclotomic parameters, slot ring and hypercube
//!
//! The context is immutable once built and shared via `Arc` between the
//! generators, the engine and the harness.

use serde::{Deserialize, Serialize};

use crate::algebra::SlotRing;
use crate::error::{config_err, Result};
use crate::hypercube::Hypercube;
use crate::math::modular::{euler_phi, gcd, is_prime, multiplicative_order};

/// Parameters defining the algebra Z_{p^r}[X]/Φ_m(X)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextParams {
    /// Cyclotomic index: Φ_m(X) defines the ring
    pub m: u64,
    /// Plaintext base (prime)
    pub p: u64,
    /// Lifting: the plaintext modulus is p^r
    pub r: u32,
    /// Number of levels in the modulus chain
    pub levels: usize,
    /// Explicit hypercube generators (empty: derive them)
    pub gens: Vec<u64>,
    /// Expected orders of `gens`; negative marks a non-native dimension
    pub ords: Vec<i64>,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            m: 2047,
            p: 2,
            r: 1,
            levels: 4,
            gens: Vec::new(),
            ords: Vec::new(),
        }
    }
}

impl ContextParams {
    /// Check parameters before any group or ring computation
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(config_err!("m must be at least 2, got {}", self.m));
        }
        if self.m > 1 << 20 {
            return Err(config_err!("m = {} is too large for the slot tables", self.m));
        }
        if !is_prime(self.p) {
            return Err(config_err!("p must be prime, got {}", self.p));
        }
        if gcd(self.p, self.m) != 1 {
            return Err(config_err!("p = {} must not divide m = {}", self.p, self.m));
        }
        if self.r == 0 {
            return Err(config_err!("r must be at least 1"));
        }
        match self.p.checked_pow(self.r) {
            Some(t) if t < 1 << 62 => {}
            _ => {
                return Err(config_err!(
                    "plaintext modulus {}^{} does not fit below 2^62",
                    self.p,
                    self.r
                ))
            }
        }
        if self.levels == 0 {
            return Err(config_err!("L must be at least 1"));
        }
        if !self.ords.is_empty() && self.gens.is_empty() {
            return Err(config_err!("ords given without gens"));
        }
        Ok(())
    }
}

/// Immutable algebraic context
#[derive(Debug, Clone)]
pub struct Context {
    params: ContextParams,
    phi_m: u64,
    hypercube: Hypercube,
    ring: SlotRing,
}

impl Context {
    pub fn new(params: ContextParams) -> Result<Self> {
        params.validate()?;
        let m = params.m;
        let p = params.p;

        let phi_m = euler_phi(m);
        let d = multiplicative_order(p, m)
            .ok_or_else(|| config_err!("p = {} is not a unit mod {}", p, m))?
            as usize;

        let hypercube = if params.gens.is_empty() {
            Hypercube::decompose(m, p)
        } else {
            Hypercube::from_generators(m, p, &params.gens, &params.ords)?
        };
        debug_assert_eq!(hypercube.size() as u64 * d as u64, phi_m);

        let ring = SlotRing::new(p, params.r, d)?;

        Ok(Self {
            params,
            phi_m,
            hypercube,
            ring,
        })
    }

    pub fn params(&self) -> &ContextParams {
        &self.params
    }

    pub fn m(&self) -> u64 {
        self.params.m
    }

    pub fn p(&self) -> u64 {
        self.params.p
    }

    pub fn phi_m(&self) -> u64 {
        self.phi_m
    }

    /// Number of slots n
    pub fn slot_count(&self) -> usize {
        self.hypercube.size()
    }

    /// Degree d of each slot's extension
    pub fn degree(&self) -> usize {
        self.ring.degree()
    }

    pub fn ring(&self) -> &SlotRing {
        &self.ring
    }

    pub fn hypercube(&self) -> &Hypercube {
        &self.hypercube
    }

    pub fn num_dims(&self) -> usize {
        self.hypercube.num_dims()
    }

    /// Size D of hypercube dimension `dim`
    pub fn size_of_dimension(&self, dim: usize) -> usize {
        self.hypercube.size_of_dim(dim)
    }

    /// Number n/D of parallel copies of dimension `dim`
    pub fn copies_of_dimension(&self, dim: usize) -> usize {
        self.slot_count() / self.size_of_dimension(dim)
    }

    pub fn check_dim(&self, dim: usize) -> Result<()> {
        if dim >= self.num_dims() {
            return Err(config_err!(
                "dim = {} out of range: the hypercube has {} dimension(s)",
                dim,
                self.num_dims()
            ));
        }
        Ok(())
    }

    /// Multi-line description of the group structure
    pub fn describe(&self) -> String {
        let mut out = format!(
            "m = {}, p = {}, r = {}, L = {}, phi(m) = {}\n  ord(p) = {}, nslots = {}\n",
            self.params.m,
            self.params.p,
            self.params.r,
            self.params.levels,
            self.phi_m,
            self.degree(),
            self.slot_count()
        );
        for (i, dim) in self.hypercube.dims().iter().enumerate() {
            out.push_str(&format!(
                "  dim {}: generator {}, size {}{}\n",
                i,
                dim.generator,
                dim.size,
                if dim.native { "" } else { " (non-native)" }
            ));
        }
        out.push_str(&format!("  slot modulus G = {:?}", self.ring.modulus().coeffs()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let ctx = Context::new(ContextParams::default()).unwrap();
        assert_eq!(ctx.phi_m(), 1936);
        assert_eq!(ctx.degree(), 11);
        assert_eq!(ctx.slot_count(), 176);
        assert_eq!(ctx.size_of_dimension(0), 88);
        assert_eq!(ctx.copies_of_dimension(0), 2);
        assert_eq!(ctx.copies_of_dimension(1), 88);
        assert!(ctx.describe().contains("nslots = 176"));
    }

    #[test]
    fn test_invalid_params() {
        let bad = |f: fn(&mut ContextParams)| {
            let mut params = ContextParams::default();
            f(&mut params);
            Context::new(params).is_err()
        };
        assert!(bad(|p| p.p = 4));
        assert!(bad(|p| p.m = 2046));
        assert!(bad(|p| p.r = 0));
        assert!(bad(|p| p.levels = 0));
        assert!(bad(|p| p.ords = vec![88, -2]));
        assert!(bad(|p| {
            p.gens = vec![3, 5];
            p.ords = vec![88, 2];
        }));
    }

    #[test]
    fn test_explicit_gens_context() {
        let params = ContextParams {
            gens: vec![3, 5],
            ords: vec![88, -2],
            ..ContextParams::default()
        };
        let ctx = Context::new(params).unwrap();
        assert_eq!(ctx.num_dims(), 2);
        assert!(ctx.check_dim(1).is_ok());
        assert!(ctx.check_dim(2).is_err());
    }
}
