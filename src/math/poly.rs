//! Dense univariate polynomials over Z_q.
//!
//! Unlike slot elements, these have no fixed length: the coefficient vector
//! is kept trimmed, so the zero polynomial has no coefficients at all. They
//! are used to build the slot modulus (irreducibility testing, Teichmüller
//! lifting) and for unit inversion in the slot ring.

use super::modular::{prime_factors, ModQ};
use std::ops::{Add, Mul, Neg, Sub};

/// Polynomial with coefficients in Z_q, lowest degree first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly {
    coeffs: Vec<u64>,
    q: u64,
}

impl Poly {
    pub fn zero(q: u64) -> Self {
        Self { coeffs: Vec::new(), q }
    }

    /// Build from coefficients, reducing mod q and trimming leading zeros
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut poly = Self {
            coeffs: coeffs.into_iter().map(|c| c % q).collect(),
            q,
        };
        poly.trim();
        poly
    }

    /// c·X^k
    pub fn monomial(c: u64, k: usize, q: u64) -> Self {
        let mut coeffs = vec![0; k + 1];
        coeffs[k] = c;
        Self::from_coeffs(coeffs, q)
    }

    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Degree, or `None` for the zero polynomial
    pub fn degree(&self) -> Option<usize> {
        self.coeffs.len().checked_sub(1)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Coefficient of X^i (zero beyond the degree)
    pub fn coeff(&self, i: usize) -> u64 {
        self.coeffs.get(i).copied().unwrap_or(0)
    }

    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Coefficients padded (or truncated) to exactly `len` entries
    pub fn to_padded(&self, len: usize) -> Vec<u64> {
        (0..len).map(|i| self.coeff(i)).collect()
    }

    fn leading(&self) -> Option<u64> {
        self.coeffs.last().copied()
    }

    fn trim(&mut self) {
        while self.coeffs.last() == Some(&0) {
            self.coeffs.pop();
        }
    }

    pub fn scalar_mul(&self, c: u64) -> Self {
        Self::from_coeffs(
            self.coeffs.iter().map(|&a| ModQ::mul(a, c, self.q)).collect(),
            self.q,
        )
    }

    /// Same coefficients viewed modulo a divisor `p` of q
    pub fn reduce_modulus(&self, p: u64) -> Self {
        Self::from_coeffs(self.coeffs.clone(), p)
    }

    /// Euclidean division by a divisor whose leading coefficient is a unit
    ///
    /// Returns `None` when the leading coefficient is not invertible mod q.
    pub fn div_rem(&self, divisor: &Poly) -> Option<(Poly, Poly)> {
        let q = self.q;
        let dd = divisor.degree()?;
        let lead_inv = ModQ::inv(divisor.leading()?, q)?;

        let mut rem = self.coeffs.clone();
        if rem.len() <= dd {
            return Some((Poly::zero(q), self.clone()));
        }
        let mut quot = vec![0u64; rem.len() - dd];
        for shift in (0..rem.len() - dd).rev() {
            let c = ModQ::mul(rem[shift + dd], lead_inv, q);
            if c == 0 {
                continue;
            }
            quot[shift] = c;
            for (j, &dj) in divisor.coeffs.iter().enumerate() {
                rem[shift + j] = ModQ::sub(rem[shift + j], ModQ::mul(c, dj, q), q);
            }
        }
        Some((Poly::from_coeffs(quot, q), Poly::from_coeffs(rem, q)))
    }

    /// Remainder modulo a monic polynomial
    pub fn rem_monic(&self, modulus: &Poly) -> Poly {
        debug_assert_eq!(modulus.leading(), Some(1), "modulus must be monic");
        match self.div_rem(modulus) {
            Some((_, r)) => r,
            None => unreachable!("monic divisor always has a unit leading coefficient"),
        }
    }

    /// self^e mod `modulus` (monic)
    pub fn pow_mod(&self, mut e: u128, modulus: &Poly) -> Poly {
        let mut base = self.rem_monic(modulus);
        let mut acc = Poly::from_coeffs(vec![1], self.q).rem_monic(modulus);
        while e > 0 {
            if e & 1 == 1 {
                acc = (&acc * &base).rem_monic(modulus);
            }
            base = (&base * &base).rem_monic(modulus);
            e >>= 1;
        }
        acc
    }

    /// Monic gcd; q must be prime
    pub fn gcd(&self, other: &Poly) -> Poly {
        let mut a = self.clone();
        let mut b = other.clone();
        while !b.is_zero() {
            let r = match a.div_rem(&b) {
                Some((_, r)) => r,
                None => unreachable!("non-zero divisor over a prime field"),
            };
            a = b;
            b = r;
        }
        match a.leading().and_then(|l| ModQ::inv(l, a.q)) {
            Some(inv) => a.scalar_mul(inv),
            None => a,
        }
    }

    /// Extended Euclid over the prime field Z_q: returns (g, s) with
    /// g = gcd(self, modulus) monic and s·self ≡ g (mod modulus)
    pub fn ext_gcd(&self, modulus: &Poly) -> (Poly, Poly) {
        let q = self.q;
        let (mut r0, mut r1) = (modulus.clone(), self.clone());
        let (mut s0, mut s1) = (Poly::zero(q), Poly::from_coeffs(vec![1], q));
        while !r1.is_zero() {
            let (quot, rem) = match r0.div_rem(&r1) {
                Some(qr) => qr,
                None => unreachable!("non-zero divisor over a prime field"),
            };
            let s2 = &s0 - &(&quot * &s1);
            r0 = std::mem::replace(&mut r1, rem);
            s0 = std::mem::replace(&mut s1, s2);
        }
        match r0.leading().and_then(|l| ModQ::inv(l, q)) {
            Some(inv) => (r0.scalar_mul(inv), s0.scalar_mul(inv)),
            None => (r0, s0),
        }
    }

    /// Rabin irreducibility test over the prime field Z_q
    pub fn is_irreducible(&self) -> bool {
        let p = self.q as u128;
        let d = match self.degree() {
            Some(0) | None => return false,
            Some(1) => return true,
            Some(d) => d,
        };
        let x = Poly::monomial(1, 1, self.q);

        // X^{p^k} mod f, by k successive p-th powers
        let frob_power = |k: usize| {
            (0..k).fold(x.clone(), |acc, _| acc.pow_mod(p, self))
        };

        if !(&frob_power(d) - &x).is_zero() {
            return false;
        }
        prime_factors(d as u64).into_iter().all(|t| {
            let h = &frob_power(d / t as usize) - &x;
            self.gcd(&h).degree() == Some(0)
        })
    }

    /// Smallest monic irreducible polynomial of degree `d` over Z_p
    ///
    /// Candidates are enumerated by reading the base-p digits of a counter as
    /// the low coefficients, skipping those with a zero constant term.
    pub fn find_irreducible(d: usize, p: u64) -> Poly {
        let mut counter: u128 = 1;
        loop {
            let mut coeffs = Vec::with_capacity(d + 1);
            let mut rest = counter;
            for _ in 0..d {
                coeffs.push((rest % p as u128) as u64);
                rest /= p as u128;
            }
            coeffs.push(1);
            counter += 1;
            if coeffs[0] == 0 {
                continue;
            }
            let candidate = Poly::from_coeffs(coeffs, p);
            if candidate.is_irreducible() {
                return candidate;
            }
        }
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Poly {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        let len = self.coeffs.len().max(rhs.coeffs.len());
        Poly::from_coeffs(
            (0..len)
                .map(|i| ModQ::add(self.coeff(i), rhs.coeff(i), self.q))
                .collect(),
            self.q,
        )
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Poly {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        let len = self.coeffs.len().max(rhs.coeffs.len());
        Poly::from_coeffs(
            (0..len)
                .map(|i| ModQ::sub(self.coeff(i), rhs.coeff(i), self.q))
                .collect(),
            self.q,
        )
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        Poly::from_coeffs(
            self.coeffs.iter().map(|&c| ModQ::negate(c, self.q)).collect(),
            self.q,
        )
    }
}

impl Mul for &Poly {
    type Output = Poly;

    /// Schoolbook product; the degrees involved stay small
    fn mul(self, rhs: Self) -> Poly {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        if self.is_zero() || rhs.is_zero() {
            return Poly::zero(self.q);
        }
        let q = self.q;
        let mut out = vec![0u64; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                out[i + j] = ModQ::add(out[i + j], ModQ::mul(a, b, q), q);
            }
        }
        Poly::from_coeffs(out, q)
    }
}
