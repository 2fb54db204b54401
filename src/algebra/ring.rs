//! The slot ring R = Z_{p^r}[X]/G(X)
//!
//! `G` is the smallest monic irreducible polynomial of degree `d` over Z_p.
//! For r > 1 it is replaced by its Teichmüller lift, so that the Frobenius
//! map σ(X) = X^p stays a ring automorphism of R (its roots are then roots
//! of unity, closed under p-th powers).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};
use crate::math::{ModQ, Poly};

/// One slot value: a polynomial of degree < d with coefficients in Z_{p^r}
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotElem {
    coeffs: Vec<u64>,
}

impl SlotElem {
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// True iff every coefficient is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }
}

/// Arithmetic context for slot values
#[derive(Debug, Clone)]
pub struct SlotRing {
    p: u64,
    r: u32,
    q: u64,
    d: usize,
    modulus: Poly,
    /// `frobenius[j][i]` holds the coefficients of σ^j(X^i)
    frobenius: Vec<Vec<Vec<u64>>>,
    /// Inverse of the Moore matrix A[i][l] = σ^l(X^i)
    moore_inv: Vec<Vec<SlotElem>>,
}

impl SlotRing {
    /// Build Z_{p^r}[X]/G for an irreducible G of degree `d`
    pub fn new(p: u64, r: u32, d: usize) -> Result<Self> {
        if d == 0 {
            return Err(config_err!("slot degree must be positive"));
        }
        let q = p
            .checked_pow(r)
            .filter(|&q| q < (1 << 62))
            .ok_or_else(|| config_err!("plaintext modulus {}^{} is too large", p, r))?;

        let base = Poly::find_irreducible(d, p);
        let modulus = if r == 1 {
            base
        } else {
            teichmuller_lift(&base, p, r)
        };

        let mut ring = Self {
            p,
            r,
            q,
            d,
            modulus,
            frobenius: Vec::new(),
            moore_inv: Vec::new(),
        };
        ring.frobenius = ring.build_frobenius_tables();
        ring.moore_inv = ring.invert_moore_matrix()?;
        Ok(ring)
    }

    pub fn p(&self) -> u64 {
        self.p
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    /// Plaintext modulus p^r
    pub fn plaintext_modulus(&self) -> u64 {
        self.q
    }

    pub fn degree(&self) -> usize {
        self.d
    }

    /// The slot modulus G over Z_{p^r}
    pub fn modulus(&self) -> &Poly {
        &self.modulus
    }

    pub fn zero(&self) -> SlotElem {
        SlotElem {
            coeffs: vec![0; self.d],
        }
    }

    pub fn one(&self) -> SlotElem {
        self.constant(1)
    }

    pub fn constant(&self, c: u64) -> SlotElem {
        self.reduce(&Poly::from_coeffs(vec![c], self.q))
    }

    /// Image of X in R
    pub fn x(&self) -> SlotElem {
        self.reduce(&Poly::monomial(1, 1, self.q))
    }

    /// Reduce arbitrary coefficients into R
    pub fn from_coeffs(&self, coeffs: Vec<u64>) -> SlotElem {
        self.reduce(&Poly::from_coeffs(coeffs, self.q))
    }

    pub fn reduce(&self, poly: &Poly) -> SlotElem {
        let poly = if poly.modulus() == self.q {
            poly.rem_monic(&self.modulus)
        } else {
            Poly::from_coeffs(poly.coeffs().to_vec(), self.q).rem_monic(&self.modulus)
        };
        SlotElem {
            coeffs: poly.to_padded(self.d),
        }
    }

    pub fn to_poly(&self, a: &SlotElem) -> Poly {
        Poly::from_coeffs(a.coeffs.clone(), self.q)
    }

    /// Uniformly random element (independent uniform coefficients)
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> SlotElem {
        SlotElem {
            coeffs: (0..self.d).map(|_| rng.gen_range(0..self.q)).collect(),
        }
    }

    pub fn add(&self, a: &SlotElem, b: &SlotElem) -> SlotElem {
        SlotElem {
            coeffs: a
                .coeffs
                .iter()
                .zip(&b.coeffs)
                .map(|(&x, &y)| ModQ::add(x, y, self.q))
                .collect(),
        }
    }

    pub fn add_assign(&self, acc: &mut SlotElem, b: &SlotElem) {
        for (x, &y) in acc.coeffs.iter_mut().zip(&b.coeffs) {
            *x = ModQ::add(*x, y, self.q);
        }
    }

    pub fn sub(&self, a: &SlotElem, b: &SlotElem) -> SlotElem {
        SlotElem {
            coeffs: a
                .coeffs
                .iter()
                .zip(&b.coeffs)
                .map(|(&x, &y)| ModQ::sub(x, y, self.q))
                .collect(),
        }
    }

    pub fn neg(&self, a: &SlotElem) -> SlotElem {
        SlotElem {
            coeffs: a.coeffs.iter().map(|&x| ModQ::negate(x, self.q)).collect(),
        }
    }

    pub fn mul(&self, a: &SlotElem, b: &SlotElem) -> SlotElem {
        let q = self.q;
        let mut wide = vec![0u64; 2 * self.d - 1];
        for (i, &x) in a.coeffs.iter().enumerate() {
            if x == 0 {
                continue;
            }
            for (j, &y) in b.coeffs.iter().enumerate() {
                wide[i + j] = ModQ::add(wide[i + j], ModQ::mul(x, y, q), q);
            }
        }
        self.reduce_wide(wide)
    }

    /// Fold a product of length 2d-1 back below degree d
    fn reduce_wide(&self, mut wide: Vec<u64>) -> SlotElem {
        let q = self.q;
        let d = self.d;
        let g = self.modulus.coeffs();
        for top in (d..wide.len()).rev() {
            let c = wide[top];
            if c == 0 {
                continue;
            }
            // X^top = -X^{top-d} (G - X^d)
            for (j, &gj) in g.iter().enumerate().take(d) {
                let idx = top - d + j;
                wide[idx] = ModQ::sub(wide[idx], ModQ::mul(c, gj, q), q);
            }
            wide[top] = 0;
        }
        wide.truncate(d);
        SlotElem { coeffs: wide }
    }

    pub fn pow(&self, a: &SlotElem, mut e: u64) -> SlotElem {
        let mut acc = self.one();
        let mut base = a.clone();
        while e > 0 {
            if e & 1 == 1 {
                acc = self.mul(&acc, &base);
            }
            base = self.mul(&base, &base);
            e >>= 1;
        }
        acc
    }

    /// σ^j(a), exponent taken mod d
    pub fn frobenius(&self, a: &SlotElem, j: usize) -> SlotElem {
        self.apply_matrix(a, &self.frobenius[j % self.d])
    }

    /// σ^j as a d×d matrix acting on coefficient rows
    pub fn frobenius_matrix(&self, j: usize) -> &[Vec<u64>] {
        &self.frobenius[j % self.d]
    }

    /// Row-vector times matrix: (x·M)_j = Σ_i x_i M[i][j]
    pub fn apply_matrix(&self, x: &SlotElem, m: &[Vec<u64>]) -> SlotElem {
        let q = self.q;
        let mut out = vec![0u64; self.d];
        for (i, &xi) in x.coeffs.iter().enumerate() {
            if xi == 0 {
                continue;
            }
            for (o, &mij) in out.iter_mut().zip(&m[i]) {
                *o = ModQ::add(*o, ModQ::mul(xi, mij, q), q);
            }
        }
        SlotElem { coeffs: out }
    }

    /// Matrix of y ↦ y·c: row i holds the coefficients of c·X^i
    pub fn mul_matrix(&self, c: &SlotElem) -> Vec<Vec<u64>> {
        let x = self.x();
        let mut row = c.clone();
        let mut rows = Vec::with_capacity(self.d);
        for _ in 0..self.d {
            let next = self.mul(&row, &x);
            rows.push(std::mem::replace(&mut row, next).coeffs);
        }
        rows
    }

    /// Multiplicative inverse, if `a` is a unit (non-zero mod p)
    pub fn inverse(&self, a: &SlotElem) -> Option<SlotElem> {
        let a_mod_p = self.to_poly(a).reduce_modulus(self.p);
        let g_mod_p = self.modulus.reduce_modulus(self.p);
        let (g, s) = a_mod_p.ext_gcd(&g_mod_p);
        if g.degree() != Some(0) {
            return None;
        }

        // Newton lifting: v ← v·(2 - a·v) doubles the p-adic precision
        let mut v = self.from_coeffs(s.coeffs().to_vec());
        let two = self.constant(2);
        let mut precision = 1;
        while precision < self.r {
            let av = self.mul(a, &v);
            v = self.mul(&v, &self.sub(&two, &av));
            precision *= 2;
        }
        Some(v)
    }

    /// Constants c_l with x·B = Σ_l c_l σ^l(x) for every x
    ///
    /// Row i of `B` is the image of X^i; the c_l solve the Moore system
    /// Σ_l σ^l(X^i) c_l = B[i].
    pub fn decompose_linear_map(&self, rows: &[Vec<u64>]) -> Vec<SlotElem> {
        let images: Vec<SlotElem> = rows.iter().map(|r| self.from_coeffs(r.clone())).collect();
        self.moore_inv
            .iter()
            .map(|inv_row| {
                let mut acc = self.zero();
                for (coef, y) in inv_row.iter().zip(&images) {
                    self.add_assign(&mut acc, &self.mul(coef, y));
                }
                acc
            })
            .collect()
    }

    fn build_frobenius_tables(&self) -> Vec<Vec<Vec<u64>>> {
        let mut x_image = self.x();
        let mut tables = Vec::with_capacity(self.d);
        for _ in 0..self.d {
            let mut rows = Vec::with_capacity(self.d);
            let mut power = self.one();
            for _ in 0..self.d {
                let next = self.mul(&power, &x_image);
                rows.push(std::mem::replace(&mut power, next).coeffs);
            }
            tables.push(rows);
            x_image = self.pow(&x_image, self.p);
        }
        tables
    }

    /// Gauss-Jordan elimination over R with unit pivots
    fn invert_moore_matrix(&self) -> Result<Vec<Vec<SlotElem>>> {
        let d = self.d;
        let mut a: Vec<Vec<SlotElem>> = (0..d)
            .map(|i| {
                (0..d)
                    .map(|l| SlotElem {
                        coeffs: self.frobenius[l][i].clone(),
                    })
                    .collect()
            })
            .collect();
        let mut inv: Vec<Vec<SlotElem>> = (0..d)
            .map(|i| {
                (0..d)
                    .map(|l| if i == l { self.one() } else { self.zero() })
                    .collect()
            })
            .collect();

        for col in 0..d {
            let (pivot, pivot_inv) = (col..d)
                .find_map(|row| self.inverse(&a[row][col]).map(|u| (row, u)))
                .ok_or_else(|| config_err!("Frobenius basis is singular for this slot modulus"))?;
            a.swap(col, pivot);
            inv.swap(col, pivot);
            for l in 0..d {
                a[col][l] = self.mul(&a[col][l], &pivot_inv);
                inv[col][l] = self.mul(&inv[col][l], &pivot_inv);
            }
            for row in 0..d {
                if row == col || a[row][col].is_zero() {
                    continue;
                }
                let factor = a[row][col].clone();
                for l in 0..d {
                    let t = self.mul(&factor, &a[col][l]);
                    a[row][l] = self.sub(&a[row][l], &t);
                    let t = self.mul(&factor, &inv[col][l]);
                    inv[row][l] = self.sub(&inv[row][l], &t);
                }
            }
        }
        Ok(inv)
    }
}

/// Lift an irreducible G mod p to Z_{p^r} so that its roots are
/// Teichmüller representatives
///
/// In A = Z_{p^r}[X]/G̃ (G̃ any lift), ω = X^{p^{d(r-1)}} is the Teichmüller
/// representative of X; the lifted modulus is ∏_j (Y - ω^{p^j}).
fn teichmuller_lift(base: &Poly, p: u64, r: u32) -> Poly {
    let q = p.pow(r);
    let d = base.degree().unwrap_or(0);
    let lifted = Poly::from_coeffs(base.coeffs().to_vec(), q);

    let mut omega = Poly::monomial(1, 1, q).rem_monic(&lifted);
    for _ in 0..d * (r as usize - 1) {
        omega = omega.pow_mod(p as u128, &lifted);
    }

    // Coefficients (in A) of the product polynomial in Y, lowest first
    let mut product: Vec<Poly> = vec![Poly::from_coeffs(vec![1], q)];
    let mut root = omega;
    for _ in 0..d {
        let neg_root = -&root;
        let mut next = vec![Poly::zero(q); product.len() + 1];
        for (i, c) in product.iter().enumerate() {
            next[i + 1] = &next[i + 1] + c;
            next[i] = &next[i] + &(c * &neg_root).rem_monic(&lifted);
        }
        product = next;
        root = root.pow_mod(p as u128, &lifted);
    }

    debug_assert!(product.iter().all(|c| c.degree().unwrap_or(0) == 0));
    Poly::from_coeffs(product.iter().map(|c| c.coeff(0)).collect(), q)
}
