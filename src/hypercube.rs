//! Hypercube structure of the slots
//!
//! Slots are indexed by the quotient group Z_m^* / ⟨p⟩. Writing every class
//! as ∏ g_i^{e_i} with 0 ≤ e_i < D_i turns the slot space into a hypercube
//! with one axis per generator g_i. Rotating along axis i corresponds to the
//! automorphism X ↦ X^{g_i}. An axis is *native* when g_i^{D_i} ≡ 1 (mod m);
//! otherwise the wrap-around lands elsewhere in the group and a rotation
//! needs two automorphisms (and their keys).

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};
use crate::math::modular::{gcd, ModQ};

/// One axis of the hypercube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypercubeDim {
    /// Generator g_i ∈ Z_m^*
    pub generator: u64,
    /// Order of g_i relative to ⟨p, g_0, …, g_{i-1}⟩
    pub size: usize,
    /// g_i^{size} ≡ 1 (mod m)
    pub native: bool,
}

/// Row-major hypercube over the slots (dimension 0 varies slowest)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypercube {
    m: u64,
    dims: Vec<HypercubeDim>,
    strides: Vec<usize>,
    size: usize,
}

impl Hypercube {
    /// Greedy decomposition of Z_m^* / ⟨p⟩
    ///
    /// At each step the smallest unit of maximal order relative to the
    /// subgroup generated so far becomes the next generator.
    pub fn decompose(m: u64, p: u64) -> Self {
        let mut subgroup = Subgroup::generated_by(m, p);
        let units: Vec<u64> = (1..m).filter(|&x| gcd(x, m) == 1).collect();

        let mut dims = Vec::new();
        while subgroup.len() < units.len() {
            let mut best: Option<(u64, usize)> = None;
            for &g in &units {
                if subgroup.contains(g) {
                    continue;
                }
                let k = subgroup.relative_order(g);
                if best.map_or(true, |(_, bk)| k > bk) {
                    best = Some((g, k));
                }
            }
            let Some((g, k)) = best else { break };
            subgroup.extend(g, k);
            dims.push(HypercubeDim {
                generator: g,
                size: k,
                native: ModQ::pow(g, k as u64, m) == 1,
            });
        }
        Self::from_dims(m, dims)
    }

    /// Hypercube from explicit generators, optionally checked against orders
    ///
    /// A negative order marks a non-native dimension.
    pub fn from_generators(m: u64, p: u64, gens: &[u64], ords: &[i64]) -> Result<Self> {
        if !ords.is_empty() && ords.len() != gens.len() {
            return Err(config_err!(
                "{} orders given for {} generators",
                ords.len(),
                gens.len()
            ));
        }
        let phi = (1..m).filter(|&x| gcd(x, m) == 1).count();
        let mut subgroup = Subgroup::generated_by(m, p);
        let mut dims = Vec::with_capacity(gens.len());

        for (i, &g) in gens.iter().enumerate() {
            if gcd(g % m, m) != 1 {
                return Err(config_err!("generator {} is not a unit mod {}", g, m));
            }
            if subgroup.contains(g % m) {
                return Err(config_err!(
                    "generator {} is already in the span of p and earlier generators",
                    g
                ));
            }
            let size = subgroup.relative_order(g % m);
            let native = ModQ::pow(g, size as u64, m) == 1;
            if let Some(&ord) = ords.get(i) {
                if ord.unsigned_abs() as usize != size || (ord > 0) != native {
                    return Err(config_err!(
                        "order {} for generator {} does not match the group (expected {})",
                        ord,
                        g,
                        if native { size as i64 } else { -(size as i64) }
                    ));
                }
            }
            subgroup.extend(g % m, size);
            dims.push(HypercubeDim {
                generator: g % m,
                size,
                native,
            });
        }
        if subgroup.len() != phi {
            return Err(config_err!(
                "generators {:?} do not span Z_{}^* / <{}>",
                gens,
                m,
                p
            ));
        }
        Ok(Self::from_dims(m, dims))
    }

    fn from_dims(m: u64, dims: Vec<HypercubeDim>) -> Self {
        let mut strides = vec![1; dims.len()];
        for i in (0..dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * dims[i + 1].size;
        }
        let size = dims.iter().map(|d| d.size).product();
        Self {
            m,
            dims,
            strides,
            size,
        }
    }

    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Total number of slots
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dims(&self) -> &[HypercubeDim] {
        &self.dims
    }

    pub fn size_of_dim(&self, dim: usize) -> usize {
        self.dims[dim].size
    }

    pub fn is_native(&self, dim: usize) -> bool {
        self.dims[dim].native
    }

    pub fn coordinate(&self, index: usize, dim: usize) -> usize {
        (index / self.strides[dim]) % self.dims[dim].size
    }

    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        (0..self.num_dims()).map(|i| self.coordinate(index, i)).collect()
    }

    pub fn index_of(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.strides)
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Split a slot index into (copy index k, coordinate along `dim`)
    ///
    /// k enumerates the n/D lines parallel to `dim`.
    pub fn break_index_by_dim(&self, index: usize, dim: usize) -> (usize, usize) {
        let stride = self.strides[dim];
        let size = self.dims[dim].size;
        let coord = (index / stride) % size;
        let k = (index / (stride * size)) * stride + index % stride;
        (k, coord)
    }

    /// Inverse of [`break_index_by_dim`](Self::break_index_by_dim)
    pub fn assemble_index_by_dim(&self, k: usize, coord: usize, dim: usize) -> usize {
        let stride = self.strides[dim];
        let size = self.dims[dim].size;
        (k / stride) * stride * size + coord * stride + k % stride
    }

    /// Destination of slot `index` after rotating by `amount` along `dim`
    pub fn rotate_index(&self, index: usize, dim: usize, amount: i64) -> usize {
        let size = self.dims[dim].size as i64;
        let coord = self.coordinate(index, dim) as i64;
        let moved = (coord + amount).rem_euclid(size) as usize;
        index - (coord as usize) * self.strides[dim] + moved * self.strides[dim]
    }

    /// Representative ∏ g_i^{e_i} mod m of the class held by slot `index`
    pub fn representative(&self, index: usize) -> u64 {
        self.dims
            .iter()
            .enumerate()
            .fold(1 % self.m, |acc, (i, dim)| {
                let e = self.coordinate(index, i) as u64;
                ModQ::mul(acc, ModQ::pow(dim.generator, e, self.m), self.m)
            })
    }

    /// Galois element g_dim^amount mod m (negative amounts via the inverse)
    pub fn galois_element(&self, dim: usize, amount: i64) -> u64 {
        let g = self.dims[dim].generator;
        let base = if amount < 0 {
            ModQ::inv(g, self.m).unwrap_or(1)
        } else {
            g
        };
        ModQ::pow(base, amount.unsigned_abs(), self.m)
    }
}

/// Membership table for a subgroup of Z_m^*
struct Subgroup {
    m: u64,
    member: Vec<bool>,
    elements: Vec<u64>,
}

impl Subgroup {
    fn generated_by(m: u64, p: u64) -> Self {
        let mut member = vec![false; m as usize];
        let mut elements = Vec::new();
        let mut x = 1 % m;
        while !member[x as usize] {
            member[x as usize] = true;
            elements.push(x);
            x = ModQ::mul(x, p, m);
        }
        Self { m, member, elements }
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn contains(&self, x: u64) -> bool {
        self.member[(x % self.m) as usize]
    }

    /// Smallest k ≥ 1 with g^k in the subgroup
    fn relative_order(&self, g: u64) -> usize {
        let mut k = 1;
        let mut y = g % self.m;
        while !self.contains(y) {
            y = ModQ::mul(y, g, self.m);
            k += 1;
        }
        k
    }

    /// Replace H by ⟨H, g⟩ where g has relative order k
    fn extend(&mut self, g: u64, k: usize) {
        let mut added = Vec::with_capacity(self.elements.len() * (k - 1));
        for &h in &self.elements {
            let mut y = h;
            for _ in 1..k {
                y = ModQ::mul(y, g, self.m);
                added.push(y);
            }
        }
        for y in added {
            if !self.member[y as usize] {
                self.member[y as usize] = true;
                self.elements.push(y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_decompose_2047() {
        let hc = Hypercube::decompose(2047, 2);
        assert_eq!(hc.size(), 176);
        assert_eq!(
            hc.dims(),
            &[
                HypercubeDim { generator: 3, size: 88, native: true },
                HypercubeDim { generator: 5, size: 2, native: false },
            ]
        );
    }

    #[test]
    fn test_decompose_small() {
        let hc = Hypercube::decompose(31, 2);
        assert_eq!(hc.dims(), &[HypercubeDim { generator: 3, size: 6, native: false }]);

        let hc = Hypercube::decompose(91, 2);
        assert_eq!(hc.dims(), &[HypercubeDim { generator: 3, size: 6, native: true }]);

        let hc = Hypercube::decompose(105, 2);
        assert_eq!(hc.size(), 4);
        assert_eq!(hc.num_dims(), 2);
    }

    #[test]
    fn test_representatives_cover_quotient() {
        let m = 2047;
        let hc = Hypercube::decompose(m, 2);
        // Each slot must land in a distinct coset of <2>
        let mut cosets = HashSet::new();
        for t in 0..hc.size() {
            let rep = hc.representative(t);
            let mut coset: Vec<u64> = (0..11).map(|j| ModQ::mul(rep, ModQ::pow(2, j, m), m)).collect();
            coset.sort_unstable();
            assert!(cosets.insert(coset[0]), "slot {} repeats a coset", t);
        }
    }

    #[test]
    fn test_break_and_assemble() {
        let hc = Hypercube::decompose(105, 2);
        for dim in 0..hc.num_dims() {
            let d = hc.size_of_dim(dim);
            let copies = hc.size() / d;
            let mut seen = HashSet::new();
            for t in 0..hc.size() {
                let (k, coord) = hc.break_index_by_dim(t, dim);
                assert!(k < copies && coord < d);
                assert_eq!(hc.assemble_index_by_dim(k, coord, dim), t);
                assert!(seen.insert((k, coord)));
            }
        }
    }

    #[test]
    fn test_rotate_index() {
        let hc = Hypercube::decompose(2047, 2);
        let t = hc.index_of(&[87, 1]);
        assert_eq!(hc.coordinates(hc.rotate_index(t, 0, 1)), vec![0, 1]);
        assert_eq!(hc.coordinates(hc.rotate_index(t, 1, 1)), vec![87, 0]);
        assert_eq!(hc.rotate_index(hc.rotate_index(t, 0, 5), 0, -5), t);
    }

    #[test]
    fn test_explicit_generators() {
        let hc = Hypercube::from_generators(2047, 2, &[3, 5], &[88, -2]).unwrap();
        assert_eq!(hc.size(), 176);

        // wrong sign on a native dimension
        assert!(Hypercube::from_generators(2047, 2, &[3, 5], &[-88, -2]).is_err());
        // not spanning
        assert!(Hypercube::from_generators(2047, 2, &[3], &[]).is_err());
        // not a unit
        assert!(Hypercube::from_generators(2047, 2, &[23], &[]).is_err());
        // length mismatch
        assert!(Hypercube::from_generators(2047, 2, &[3, 5], &[88]).is_err());
    }

    #[test]
    fn test_galois_element() {
        let hc = Hypercube::decompose(2047, 2);
        assert_eq!(hc.galois_element(0, 1), 3);
        assert_eq!(hc.galois_element(0, 88), 1);
        let inv = hc.galois_element(0, -1);
        assert_eq!(ModQ::mul(inv, 3, 2047), 1);
    }
}
