//! Slot encoding: plaintext arrays of slot values
//!
//! A [`PlaintextArray`] holds one [`SlotElem`] per hypercube point. Its flat
//! form lays slot `t` out as coefficients `t·d .. (t+1)·d`, which is the
//! order the engine encrypts in.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::algebra::SlotElem;
use crate::context::Context;

/// One value per slot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextArray {
    slots: Vec<SlotElem>,
}

impl PlaintextArray {
    pub fn zero(ctx: &Context) -> Self {
        Self {
            slots: vec![ctx.ring().zero(); ctx.slot_count()],
        }
    }

    pub fn from_slots(slots: Vec<SlotElem>) -> Self {
        Self { slots }
    }

    /// Independent uniform slot values (same distribution as scalar entries)
    pub fn random<R: Rng + ?Sized>(ctx: &Context, rng: &mut R) -> Self {
        let ring = ctx.ring();
        Self {
            slots: (0..ctx.slot_count()).map(|_| ring.random(rng)).collect(),
        }
    }

    pub fn slots(&self) -> &[SlotElem] {
        &self.slots
    }

    pub fn slot(&self, t: usize) -> &SlotElem {
        &self.slots[t]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.slots.iter().all(SlotElem::is_zero)
    }

    /// Flat coefficient vector of length n·d
    pub fn encode(&self) -> Vec<u64> {
        self.slots
            .iter()
            .flat_map(|s| s.coeffs().iter().copied())
            .collect()
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(ctx: &Context, flat: &[u64]) -> Self {
        let d = ctx.degree();
        debug_assert_eq!(flat.len(), ctx.slot_count() * d);
        Self {
            slots: flat
                .chunks(d)
                .map(|chunk| ctx.ring().from_coeffs(chunk.to_vec()))
                .collect(),
        }
    }

    /// Slot-wise equality, returning the indices that differ
    pub fn mismatches(&self, other: &Self) -> Vec<usize> {
        self.slots
            .iter()
            .zip(&other.slots)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(t, _)| t)
            .collect()
    }

    /// Rotate along `dim`: the value at coordinate i moves to i + amount
    pub fn rotate(&self, ctx: &Context, dim: usize, amount: i64) -> Self {
        let hc = ctx.hypercube();
        let mut out = self.slots.clone();
        for (t, value) in self.slots.iter().enumerate() {
            out[hc.rotate_index(t, dim, amount)] = value.clone();
        }
        Self { slots: out }
    }

    /// Apply σ^j in every slot
    pub fn frobenius(&self, ctx: &Context, j: usize) -> Self {
        let ring = ctx.ring();
        Self {
            slots: self.slots.iter().map(|s| ring.frobenius(s, j)).collect(),
        }
    }

    /// Slot-wise product
    pub fn mul(&self, ctx: &Context, other: &Self) -> Self {
        let ring = ctx.ring();
        Self {
            slots: self
                .slots
                .iter()
                .zip(&other.slots)
                .map(|(a, b)| ring.mul(a, b))
                .collect(),
        }
    }
}

/// Exact slot-wise equality over the algebraic domain
pub fn equals(a: &PlaintextArray, b: &PlaintextArray) -> bool {
    a.len() == b.len() && a.mismatches(b).is_empty()
}
