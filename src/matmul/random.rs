//! Seeded random transforms
//!
//! Every generator draws its whole table once, at construction, from its
//! own `ChaCha20Rng` seeded with [`MATRIX_SEED`]. Two generators built
//! with the same context and arguments are therefore identical, and no
//! shared random state is read or disturbed.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Entry, MatMul1D, MatMulFull};
use crate::context::Context;
use crate::error::{config_err, Result};

/// Seed shared by all generator variants
pub const MATRIX_SEED: u64 = 123;

/// Optional forcing of entries to zero, off unless asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroInjection {
    #[default]
    Off,
    /// Keep each entry with probability 1/bound, zero it otherwise
    Sparse { bound: u64 },
}

impl ZeroInjection {
    pub fn validate(&self) -> Result<()> {
        match *self {
            ZeroInjection::Sparse { bound: 0 } => {
                Err(config_err!("zero-injection bound must be positive"))
            }
            _ => Ok(()),
        }
    }

    fn draw<E: Entry, R: Rng + ?Sized>(&self, ctx: &Context, rng: &mut R) -> Option<E> {
        let entry = E::random(ctx.ring(), rng);
        let keep = match *self {
            ZeroInjection::Off => true,
            ZeroInjection::Sparse { bound } => rng.gen_range(0..bound) == 0,
        };
        (keep && !entry.is_zero()).then_some(entry)
    }
}

/// Random D×D transform along one dimension
pub struct RandomMatMul1D<E: Entry> {
    ctx: Arc<Context>,
    dim: usize,
    size: usize,
    multi: bool,
    /// `tables[k][i * size + j]`, one table unless `multi`
    tables: Vec<Vec<Option<E>>>,
}

impl<E: Entry> RandomMatMul1D<E> {
    pub fn new(ctx: Arc<Context>, dim: usize, multi: bool, zeros: ZeroInjection) -> Result<Self> {
        ctx.check_dim(dim)?;
        zeros.validate()?;

        let size = ctx.size_of_dimension(dim);
        let count = if multi { ctx.copies_of_dimension(dim) } else { 1 };

        let mut rng = ChaCha20Rng::seed_from_u64(MATRIX_SEED);
        let tables: Vec<Vec<Option<E>>> = (0..count)
            .map(|_| {
                (0..size * size)
                    .map(|_| zeros.draw(&ctx, &mut rng))
                    .collect()
            })
            .collect();

        debug!(dim, size, tables = count, "built random 1D transform");
        Ok(Self {
            ctx,
            dim,
            size,
            multi,
            tables,
        })
    }

    /// Number of independent D×D tables (n/D for multi-transforms)
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl<E: Entry> MatMul1D<E> for RandomMatMul1D<E> {
    fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn is_multi(&self) -> bool {
        self.multi
    }

    fn get(&self, i: usize, j: usize, k: usize) -> Option<E> {
        assert!(
            i < self.size && j < self.size,
            "entry ({}, {}) out of range for a {}x{} transform",
            i,
            j,
            self.size,
            self.size
        );
        let table = if self.multi {
            assert!(
                k < self.tables.len(),
                "copy {} out of range ({} copies)",
                k,
                self.tables.len()
            );
            &self.tables[k]
        } else {
            &self.tables[0]
        };
        table[i * self.size + j].clone()
    }
}

/// Random n×n transform over the whole slot space
pub struct RandomMatMulFull<E: Entry> {
    ctx: Arc<Context>,
    n: usize,
    table: Vec<Option<E>>,
}

impl<E: Entry> RandomMatMulFull<E> {
    pub fn new(ctx: Arc<Context>, zeros: ZeroInjection) -> Self {
        let n = ctx.slot_count();
        let mut rng = ChaCha20Rng::seed_from_u64(MATRIX_SEED);
        let table = (0..n * n).map(|_| zeros.draw(&ctx, &mut rng)).collect();
        debug!(n, "built random full transform");
        Self {
            ctx,
            n,
            table,
        }
    }
}

impl<E: Entry> MatMulFull<E> for RandomMatMulFull<E> {
    fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    fn get(&self, i: usize, j: usize) -> Option<E> {
        assert!(
            i < self.n && j < self.n,
            "entry ({}, {}) out of range for a {}x{} transform",
            i,
            j,
            self.n,
            self.n
        );
        self.table[i * self.n + j].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{BlockEntry, SlotElem};
    use crate::context::ContextParams;

    fn ctx(m: u64) -> Arc<Context> {
        Arc::new(
            Context::new(ContextParams {
                m,
                ..ContextParams::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_deterministic() {
        let ctx = ctx(2047);
        let a = RandomMatMul1D::<SlotElem>::new(ctx.clone(), 0, false, ZeroInjection::Off).unwrap();
        let b = RandomMatMul1D::<SlotElem>::new(ctx.clone(), 0, false, ZeroInjection::Off).unwrap();
        for i in 0..88 {
            for j in 0..88 {
                assert_eq!(a.get(i, j, 0), b.get(i, j, 0));
            }
        }

        let f1 = RandomMatMulFull::<BlockEntry>::new(ctx.clone(), ZeroInjection::Off);
        let f2 = RandomMatMulFull::<BlockEntry>::new(ctx, ZeroInjection::Off);
        assert_eq!(f1.get(3, 170), f2.get(3, 170));
    }

    #[test]
    fn test_dimension_consistency() {
        let ctx = ctx(2047);
        let single = RandomMatMul1D::<SlotElem>::new(ctx.clone(), 1, false, ZeroInjection::Off).unwrap();
        assert_eq!(single.table_count(), 1);
        // k is ignored for single transforms
        assert_eq!(single.get(1, 0, 0), single.get(1, 0, 500));

        let multi = RandomMatMul1D::<SlotElem>::new(ctx.clone(), 1, true, ZeroInjection::Off).unwrap();
        assert_eq!(multi.table_count(), ctx.copies_of_dimension(1));
        assert_eq!(multi.table_count(), 88);
        assert!(multi.is_multi());
        assert!((0..2).any(|i| (0..2).any(|j| multi.get(i, j, 0) != multi.get(i, j, 1))));

        assert!(RandomMatMul1D::<SlotElem>::new(ctx, 2, false, ZeroInjection::Off).is_err());
    }

    #[test]
    fn test_zero_classification() {
        let ctx = ctx(105);
        let m = RandomMatMul1D::<SlotElem>::new(
            ctx.clone(),
            0,
            true,
            ZeroInjection::Sparse { bound: 3 },
        )
        .unwrap();
        let size = ctx.size_of_dimension(0);
        let mut zeros = 0;
        for k in 0..m.table_count() {
            for i in 0..size {
                for j in 0..size {
                    match m.get(i, j, k) {
                        Some(e) => assert!(!e.is_zero()),
                        None => zeros += 1,
                    }
                }
            }
        }
        assert!(zeros > 0);

        assert!(RandomMatMul1D::<SlotElem>::new(ctx, 0, false, ZeroInjection::Sparse { bound: 0 })
            .is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let m = RandomMatMul1D::<SlotElem>::new(ctx(2047), 0, false, ZeroInjection::Off).unwrap();
        m.get(88, 0, 0);
    }

    #[test]
    #[should_panic(expected = "copy")]
    fn test_out_of_range_copy_panics() {
        let m = RandomMatMul1D::<BlockEntry>::new(ctx(105), 0, true, ZeroInjection::Off).unwrap();
        let copies = m.table_count();
        m.get(0, 0, copies);
    }
}
