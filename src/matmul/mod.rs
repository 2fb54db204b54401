//! Linear transforms over the slots
//!
//! A transform is described by a generator that hands out matrix entries on
//! demand. Two scopes exist:
//!
//! - **1D** ([`MatMul1D`]): a D×D matrix acting along one hypercube
//!   dimension, either shared by all n/D copies of that dimension or, for
//!   multi-transforms, one matrix per copy,
//! - **full** ([`MatMulFull`]): an n×n matrix over the whole slot space.
//!
//! and two entry shapes, selected by the [`Entry`] type: scalar entries
//! ([`SlotElem`], multiplication in the slot ring) and block entries
//! ([`BlockEntry`], arbitrary linear maps on a slot's coefficients).
//!
//! The convention throughout is row-vector times matrix:
//! `w[j] = Σ_i v[i] ⋆ M[i][j]` where `x ⋆ e` applies entry `e` to `x`.
//!
//! [`Matrix`] erases the four combinations behind one runtime tag; the
//! plaintext reference in [`plain`] and the homomorphic executor in
//! [`exec`] both dispatch on it.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::algebra::{BlockEntry, SlotElem, SlotRing};
use crate::context::Context;
use crate::error::{config_err, Result};

pub mod exec;
pub mod plain;
pub mod random;

pub use exec::{EvalOverrides, MatMulExec, BSGS_THRESHOLD};
pub use random::{RandomMatMul1D, RandomMatMulFull, ZeroInjection, MATRIX_SEED};

/// A matrix entry: something that maps one slot value to another linearly
pub trait Entry: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Uniformly random entry
    fn random<R: Rng + ?Sized>(ring: &SlotRing, rng: &mut R) -> Self;

    /// True iff every coefficient is zero
    fn is_zero(&self) -> bool;

    /// x ⋆ self
    fn apply(&self, ring: &SlotRing, x: &SlotElem) -> SlotElem;

    /// Number of Frobenius terms in [`linearize`](Entry::linearize)
    fn frobenius_terms(ring: &SlotRing) -> usize;

    /// Constants c_l with x ⋆ self = Σ_l c_l·σ^l(x)
    fn linearize(&self, ring: &SlotRing) -> Vec<SlotElem>;
}

impl Entry for SlotElem {
    fn random<R: Rng + ?Sized>(ring: &SlotRing, rng: &mut R) -> Self {
        ring.random(rng)
    }

    fn is_zero(&self) -> bool {
        SlotElem::is_zero(self)
    }

    fn apply(&self, ring: &SlotRing, x: &SlotElem) -> SlotElem {
        ring.mul(x, self)
    }

    fn frobenius_terms(_ring: &SlotRing) -> usize {
        1
    }

    fn linearize(&self, _ring: &SlotRing) -> Vec<SlotElem> {
        vec![self.clone()]
    }
}

impl Entry for BlockEntry {
    fn random<R: Rng + ?Sized>(ring: &SlotRing, rng: &mut R) -> Self {
        BlockEntry::random(ring, rng)
    }

    fn is_zero(&self) -> bool {
        BlockEntry::is_zero(self)
    }

    fn apply(&self, ring: &SlotRing, x: &SlotElem) -> SlotElem {
        BlockEntry::apply(self, ring, x)
    }

    fn frobenius_terms(ring: &SlotRing) -> usize {
        ring.degree()
    }

    fn linearize(&self, ring: &SlotRing) -> Vec<SlotElem> {
        ring.decompose_linear_map(self.rows())
    }
}

/// D×D transform along one hypercube dimension
///
/// `get` returns `None` for a zero entry. Indices `i, j` range over
/// `0..D`; `k` selects the copy (`0..n/D`) and is only meaningful for
/// multi-transforms. Out-of-range indices panic.
pub trait MatMul1D<E: Entry>: Send + Sync {
    fn context(&self) -> &Arc<Context>;

    /// Hypercube dimension the transform acts along
    fn dim(&self) -> usize;

    /// Whether the matrix differs between copies of the dimension
    fn is_multi(&self) -> bool;

    fn get(&self, i: usize, j: usize, k: usize) -> Option<E>;
}

/// n×n transform over the whole slot space
pub trait MatMulFull<E: Entry>: Send + Sync {
    fn context(&self) -> &Arc<Context>;

    fn get(&self, i: usize, j: usize) -> Option<E>;
}

/// Transform scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Along one hypercube dimension
    #[default]
    OneDim,
    /// Whole slot space
    Full,
}

/// Entry shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Scalar,
    Block,
}

/// Selects one of the six generator variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatrixKind {
    pub scope: Scope,
    pub shape: Shape,
    /// One matrix per copy of the dimension (1D scope only)
    pub multi: bool,
}

impl MatrixKind {
    pub fn new(full: bool, block: bool, multi: bool) -> Self {
        Self {
            scope: if full { Scope::Full } else { Scope::OneDim },
            shape: if block { Shape::Block } else { Shape::Scalar },
            multi,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.multi && self.scope == Scope::Full {
            return Err(config_err!("multi-transforms are 1D only"));
        }
        Ok(())
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            Scope::OneDim => "1D",
            Scope::Full => "full",
        };
        let shape = match self.shape {
            Shape::Scalar => "scalar",
            Shape::Block => "block",
        };
        write!(f, "{} {}", scope, shape)?;
        if self.multi {
            write!(f, " multi")?;
        }
        Ok(())
    }
}

/// Runtime-tagged transform of any scope and shape
pub enum Matrix {
    Scalar1D(Box<dyn MatMul1D<SlotElem>>),
    Block1D(Box<dyn MatMul1D<BlockEntry>>),
    ScalarFull(Box<dyn MatMulFull<SlotElem>>),
    BlockFull(Box<dyn MatMulFull<BlockEntry>>),
}

impl Matrix {
    /// Seeded random generator of the requested variant
    pub fn random(
        ctx: Arc<Context>,
        kind: MatrixKind,
        dim: usize,
        zeros: ZeroInjection,
    ) -> Result<Self> {
        kind.validate()?;
        Ok(match (kind.scope, kind.shape) {
            (Scope::OneDim, Shape::Scalar) => Matrix::Scalar1D(Box::new(
                RandomMatMul1D::<SlotElem>::new(ctx, dim, kind.multi, zeros)?,
            )),
            (Scope::OneDim, Shape::Block) => Matrix::Block1D(Box::new(
                RandomMatMul1D::<BlockEntry>::new(ctx, dim, kind.multi, zeros)?,
            )),
            (Scope::Full, Shape::Scalar) => {
                Matrix::ScalarFull(Box::new(RandomMatMulFull::<SlotElem>::new(ctx, zeros)))
            }
            (Scope::Full, Shape::Block) => {
                Matrix::BlockFull(Box::new(RandomMatMulFull::<BlockEntry>::new(ctx, zeros)))
            }
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        match self {
            Matrix::Scalar1D(m) => m.context(),
            Matrix::Block1D(m) => m.context(),
            Matrix::ScalarFull(m) => m.context(),
            Matrix::BlockFull(m) => m.context(),
        }
    }

    /// Dimension acted along; `None` for full-space transforms
    pub fn dim(&self) -> Option<usize> {
        match self {
            Matrix::Scalar1D(m) => Some(m.dim()),
            Matrix::Block1D(m) => Some(m.dim()),
            Matrix::ScalarFull(_) | Matrix::BlockFull(_) => None,
        }
    }

    /// Always false for full-space transforms
    pub fn is_multi(&self) -> bool {
        match self {
            Matrix::Scalar1D(m) => m.is_multi(),
            Matrix::Block1D(m) => m.is_multi(),
            Matrix::ScalarFull(_) | Matrix::BlockFull(_) => false,
        }
    }

    pub fn kind(&self) -> MatrixKind {
        match self {
            Matrix::Scalar1D(m) => MatrixKind::new(false, false, m.is_multi()),
            Matrix::Block1D(m) => MatrixKind::new(false, true, m.is_multi()),
            Matrix::ScalarFull(_) => MatrixKind::new(true, false, false),
            Matrix::BlockFull(_) => MatrixKind::new(true, true, false),
        }
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("kind", &self.kind())
            .field("dim", &self.dim())
            .finish()
    }
}
