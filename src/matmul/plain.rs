//! Plaintext reference: apply a transform directly to slot values
//!
//! Zero entries are skipped, so they contribute nothing regardless of the
//! entry shape.

use rayon::prelude::*;

use super::{Entry, MatMul1D, MatMulFull, Matrix};
use crate::algebra::SlotElem;
use crate::encoding::PlaintextArray;

/// w[(k, j)] = Σ_i v[(k, i)] ⋆ M_k[i][j]
pub fn mul_1d<E: Entry>(v: &PlaintextArray, mat: &dyn MatMul1D<E>) -> PlaintextArray {
    let ctx = mat.context();
    let ring = ctx.ring();
    let hc = ctx.hypercube();
    let dim = mat.dim();
    let size = ctx.size_of_dimension(dim);

    let slots: Vec<SlotElem> = (0..ctx.slot_count())
        .into_par_iter()
        .map(|t| {
            let (k, j) = hc.break_index_by_dim(t, dim);
            let mut acc = ring.zero();
            for i in 0..size {
                if let Some(entry) = mat.get(i, j, k) {
                    let src = v.slot(hc.assemble_index_by_dim(k, i, dim));
                    ring.add_assign(&mut acc, &entry.apply(ring, src));
                }
            }
            acc
        })
        .collect();
    PlaintextArray::from_slots(slots)
}

/// w[j] = Σ_i v[i] ⋆ M[i][j]
pub fn mul_full<E: Entry>(v: &PlaintextArray, mat: &dyn MatMulFull<E>) -> PlaintextArray {
    let ctx = mat.context();
    let ring = ctx.ring();
    let n = ctx.slot_count();

    let slots: Vec<SlotElem> = (0..n)
        .into_par_iter()
        .map(|j| {
            let mut acc = ring.zero();
            for i in 0..n {
                if let Some(entry) = mat.get(i, j) {
                    ring.add_assign(&mut acc, &entry.apply(ring, v.slot(i)));
                }
            }
            acc
        })
        .collect();
    PlaintextArray::from_slots(slots)
}

impl Matrix {
    /// Reference product of `v` with this transform
    pub fn apply_plain(&self, v: &PlaintextArray) -> PlaintextArray {
        match self {
            Matrix::Scalar1D(m) => mul_1d(v, m.as_ref()),
            Matrix::Block1D(m) => mul_1d(v, m.as_ref()),
            Matrix::ScalarFull(m) => mul_full(v, m.as_ref()),
            Matrix::BlockFull(m) => mul_full(v, m.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextParams};
    use crate::matmul::{MatrixKind, ZeroInjection};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;

    struct Identity(Arc<Context>);

    impl MatMul1D<SlotElem> for Identity {
        fn context(&self) -> &Arc<Context> {
            &self.0
        }
        fn dim(&self) -> usize {
            0
        }
        fn is_multi(&self) -> bool {
            false
        }
        fn get(&self, i: usize, j: usize, _k: usize) -> Option<SlotElem> {
            (i == j).then(|| self.0.ring().one())
        }
    }

    fn ctx_for(m: u64, p: u64) -> Arc<Context> {
        Arc::new(
            Context::new(ContextParams {
                m,
                p,
                ..ContextParams::default()
            })
            .unwrap(),
        )
    }

    fn ctx() -> Arc<Context> {
        ctx_for(91, 3)
    }

    #[test]
    fn test_identity_transform() {
        let ctx = ctx();
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let v = PlaintextArray::random(&ctx, &mut rng);
        assert_eq!(mul_1d::<SlotElem>(&v, &Identity(ctx.clone())), v);
    }

    #[test]
    fn test_zero_vector_maps_to_zero() {
        let ctx = ctx();
        let zero = PlaintextArray::zero(&ctx);
        for (full, block, multi) in [
            (false, false, false),
            (false, false, true),
            (false, true, false),
            (false, true, true),
            (true, false, false),
            (true, true, false),
        ] {
            let kind = MatrixKind::new(full, block, multi);
            let m = Matrix::random(ctx.clone(), kind, 0, ZeroInjection::Off).unwrap();
            assert!(m.apply_plain(&zero).is_zero(), "{} is not linear", kind);
        }
    }

    #[test]
    fn test_1d_acts_within_lines() {
        // two dimensions of size 2
        let ctx = ctx_for(105, 2);
        let dim = 1;
        let m = Matrix::random(ctx.clone(), MatrixKind::new(false, false, true), dim, ZeroInjection::Off)
            .unwrap();

        // a vector supported on one line stays on that line
        let hc = ctx.hypercube();
        let target_k = 0;
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let slots: Vec<SlotElem> = (0..ctx.slot_count())
            .map(|t| {
                if hc.break_index_by_dim(t, dim).0 == target_k {
                    ctx.ring().random(&mut rng)
                } else {
                    ctx.ring().zero()
                }
            })
            .collect();
        let w = m.apply_plain(&PlaintextArray::from_slots(slots));
        for t in 0..ctx.slot_count() {
            if hc.break_index_by_dim(t, dim).0 != target_k {
                assert!(w.slot(t).is_zero());
            }
        }
    }
}
