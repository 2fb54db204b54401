//! Homomorphic evaluation of transforms
//!
//! Every transform is brought into diagonal form. For a 1D transform along
//! a dimension of size D with Frobenius terms l = 0..L,
//!
//! ```text
//! T(v) = Σ_l Σ_e rot_e(σ^l(v)) ⊙ c_{l,e},    c_{l,e}[(k, j)] = lin_l(M_k[j - e][j])
//! ```
//!
//! where `lin_l` is the l-th Frobenius coefficient of an entry (L = 1 for
//! scalar entries, L = d for blocks). Full-space transforms use the same
//! form with one diagonal per hypercube shift.
//!
//! [`MatMulExec::upgrade`] computes the diagonals once and picks a plan;
//! [`MatMulExec::mul`] evaluates it:
//!
//! - **direct**: one rotation per non-zero diagonal, optionally hoisted,
//! - **BSGS**: e = g·a + b with g = ⌈√D⌉; the g baby rotations are shared
//!   and diagonals are pre-rotated by -g·a so each giant group costs a
//!   single rotation,
//! - **minimal**: each σ^l(v) is taken from the fresh input along a chain of
//!   σ^1 keys, then Horner's rule in rot_1 runs over its diagonals, so only
//!   the rotate-by-one and σ^1 keys are used and every term passes through
//!   at most one Frobenius map,
//! - **full**: walks every shift of the hypercube with rotate-by-one steps.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Entry, MatMul1D, MatMulFull, Matrix};
use crate::algebra::SlotElem;
use crate::context::Context;
use crate::encoding::PlaintextArray;
use crate::engine::{Ctxt, Engine};
use crate::error::{config_err, HeError, Result};
use crate::math::modular::ceil_sqrt;
use crate::timing::Timers;

/// Dimensions larger than this use BSGS unless it is forced off
pub const BSGS_THRESHOLD: usize = 16;

/// Switches that force evaluation choices on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvalOverrides {
    /// 1 forces BSGS on, -1 forces it off, 0 decides by dimension size
    pub force_bsgs: i32,
    /// 1 forces hoisting, -1 forces it off, 0 hoists on native dimensions
    pub force_hoist: i32,
}

impl EvalOverrides {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("force_bsgs", self.force_bsgs), ("force_hoist", self.force_hoist)] {
            if !(-1..=1).contains(&value) {
                return Err(config_err!("{} must be -1, 0 or 1, got {}", name, value));
            }
        }
        Ok(())
    }

    fn use_bsgs(&self, size: usize) -> bool {
        match self.force_bsgs {
            1 => true,
            -1 => false,
            _ => size > BSGS_THRESHOLD,
        }
    }

    fn use_hoist(&self, native: bool) -> bool {
        match self.force_hoist {
            1 => true,
            -1 => false,
            _ => native,
        }
    }
}

/// Non-zero diagonals of one Frobenius term, indexed by shift
type Diagonals = Vec<Option<PlaintextArray>>;

enum Plan {
    Direct {
        dim: usize,
        hoist: bool,
        diagonals: Vec<Diagonals>,
    },
    /// Entry g·a + b holds rot_{-g·a}(c_{g·a+b})
    Bsgs {
        dim: usize,
        hoist: bool,
        giant: usize,
        diagonals: Vec<Diagonals>,
    },
    /// Entry (l, e) holds rot_{-e}(c_{l,e})
    Minimal { dim: usize, diagonals: Vec<Diagonals> },
    /// Entry (l, s) is indexed by the slot whose coordinates are the shift s
    Full { diagonals: Vec<Diagonals> },
}

impl Plan {
    fn name(&self) -> &'static str {
        match self {
            Plan::Direct { .. } => "direct",
            Plan::Bsgs { .. } => "bsgs",
            Plan::Minimal { .. } => "minimal",
            Plan::Full { .. } => "full",
        }
    }

    fn nonzero_diagonals(&self) -> usize {
        let diagonals = match self {
            Plan::Direct { diagonals, .. }
            | Plan::Bsgs { diagonals, .. }
            | Plan::Minimal { diagonals, .. }
            | Plan::Full { diagonals } => diagonals,
        };
        diagonals.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// Executor for one transform, bound to it for its lifetime
pub struct MatMulExec<'a> {
    matrix: &'a Matrix,
    minimal: bool,
    overrides: EvalOverrides,
    plan: Option<Plan>,
}

impl<'a> MatMulExec<'a> {
    /// `minimal` restricts evaluation to rotate-by-one and σ^1 keys
    pub fn new(matrix: &'a Matrix, minimal: bool, overrides: EvalOverrides) -> Self {
        Self {
            matrix,
            minimal,
            overrides,
            plan: None,
        }
    }

    pub fn is_upgraded(&self) -> bool {
        self.plan.is_some()
    }

    /// Name of the chosen evaluation plan, once upgraded
    pub fn plan_name(&self) -> Option<&'static str> {
        self.plan.as_ref().map(Plan::name)
    }

    /// Precompute diagonals and choose a plan; must be called exactly once
    pub fn upgrade(&mut self, timers: &Timers) -> Result<()> {
        if self.plan.is_some() {
            return Err(HeError::AlreadyUpgraded);
        }
        let plan = timers.time("upgrade", || self.build_plan());
        debug!(
            plan = plan.name(),
            diagonals = plan.nonzero_diagonals(),
            "executor upgraded"
        );
        self.plan = Some(plan);
        Ok(())
    }

    /// Apply the transform to `ct`, leaving it untouched
    pub fn mul(&self, engine: &Engine, ct: &Ctxt) -> Result<Ctxt> {
        let plan = self.plan.as_ref().ok_or(HeError::NotUpgraded)?;

        let ctx = self.matrix.context();
        if engine.context().slot_count() != ctx.slot_count()
            || engine.context().degree() != ctx.degree()
        {
            return Err(config_err!(
                "engine and transform were built over different contexts"
            ));
        }

        match plan {
            Plan::Direct {
                dim,
                hoist,
                diagonals,
            } => mul_direct(engine, ct, *dim, *hoist, diagonals),
            Plan::Bsgs {
                dim,
                hoist,
                giant,
                diagonals,
            } => mul_bsgs(engine, ct, *dim, *hoist, *giant, diagonals),
            Plan::Minimal { dim, diagonals } => mul_minimal(engine, ct, *dim, diagonals),
            Plan::Full { diagonals } => mul_full_space(engine, ct, diagonals),
        }
    }

    fn build_plan(&self) -> Plan {
        match self.matrix {
            Matrix::Scalar1D(m) => self.plan_1d(m.as_ref()),
            Matrix::Block1D(m) => self.plan_1d(m.as_ref()),
            Matrix::ScalarFull(m) => Plan::Full {
                diagonals: diagonals_full(m.as_ref()),
            },
            Matrix::BlockFull(m) => Plan::Full {
                diagonals: diagonals_full(m.as_ref()),
            },
        }
    }

    fn plan_1d<E: Entry>(&self, mat: &dyn MatMul1D<E>) -> Plan {
        let ctx = mat.context();
        let dim = mat.dim();
        let size = ctx.size_of_dimension(dim);
        let diagonals = diagonals_1d(mat);

        if self.minimal {
            return Plan::Minimal {
                dim,
                diagonals: prepare_minimal(ctx, dim, diagonals),
            };
        }

        let hoist = self.overrides.use_hoist(ctx.hypercube().is_native(dim));
        if self.overrides.use_bsgs(size) {
            let giant = ceil_sqrt(size);
            Plan::Bsgs {
                dim,
                hoist,
                giant,
                diagonals: prerotate_bsgs(ctx, dim, giant, diagonals),
            }
        } else {
            Plan::Direct {
                dim,
                hoist,
                diagonals,
            }
        }
    }
}

impl fmt::Debug for MatMulExec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatMulExec")
            .field("matrix", self.matrix)
            .field("minimal", &self.minimal)
            .field("overrides", &self.overrides)
            .field("plan", &self.plan_name())
            .finish()
    }
}

fn into_diagonal(slots: Vec<SlotElem>) -> Option<PlaintextArray> {
    let pa = PlaintextArray::from_slots(slots);
    (!pa.is_zero()).then_some(pa)
}

/// c_{l,e}[(k, j)] = lin_l(M_k[(j - e) mod D][j])
fn diagonals_1d<E: Entry>(mat: &dyn MatMul1D<E>) -> Vec<Diagonals> {
    let ctx = mat.context();
    let ring = ctx.ring();
    let hc = ctx.hypercube();
    let dim = mat.dim();
    let size = ctx.size_of_dimension(dim);
    let n = ctx.slot_count();
    let terms = E::frobenius_terms(ring);

    let tables = if mat.is_multi() {
        ctx.copies_of_dimension(dim)
    } else {
        1
    };
    let lin: Vec<Option<Vec<SlotElem>>> = (0..tables * size * size)
        .into_par_iter()
        .map(|idx| {
            let (k, ij) = (idx / (size * size), idx % (size * size));
            mat.get(ij / size, ij % size, k)
                .map(|entry| entry.linearize(ring))
        })
        .collect();

    let entry_at = |t: usize, e: usize, l: usize| -> SlotElem {
        let (k, j) = hc.break_index_by_dim(t, dim);
        let k = if tables == 1 { 0 } else { k };
        let i = (j + size - e) % size;
        lin[k * size * size + i * size + j]
            .as_ref()
            .map_or_else(|| ring.zero(), |coeffs| coeffs[l].clone())
    };

    (0..terms)
        .map(|l| {
            (0..size)
                .into_par_iter()
                .map(|e| into_diagonal((0..n).map(|t| entry_at(t, e, l)).collect()))
                .collect()
        })
        .collect()
}

/// c_{l,s}[t] = lin_l(M[t - s][t]), s ranging over hypercube shifts
fn diagonals_full<E: Entry>(mat: &dyn MatMulFull<E>) -> Vec<Diagonals> {
    let ctx = mat.context();
    let ring = ctx.ring();
    let hc = ctx.hypercube();
    let n = ctx.slot_count();
    let terms = E::frobenius_terms(ring);

    let lin: Vec<Option<Vec<SlotElem>>> = (0..n * n)
        .into_par_iter()
        .map(|idx| mat.get(idx / n, idx % n).map(|entry| entry.linearize(ring)))
        .collect();

    let source = |t: usize, shift: usize| -> usize {
        hc.coordinates(shift)
            .into_iter()
            .enumerate()
            .fold(t, |src, (dim, s)| hc.rotate_index(src, dim, -(s as i64)))
    };

    (0..terms)
        .map(|l| {
            (0..n)
                .into_par_iter()
                .map(|shift| {
                    into_diagonal(
                        (0..n)
                            .map(|t| {
                                lin[source(t, shift) * n + t]
                                    .as_ref()
                                    .map_or_else(|| ring.zero(), |coeffs| coeffs[l].clone())
                            })
                            .collect(),
                    )
                })
                .collect()
        })
        .collect()
}

fn prerotate_bsgs(ctx: &Context, dim: usize, giant: usize, diagonals: Vec<Diagonals>) -> Vec<Diagonals> {
    diagonals
        .into_iter()
        .map(|diags| {
            diags
                .into_iter()
                .enumerate()
                .map(|(e, c)| {
                    let shift = (e / giant * giant) as i64;
                    c.map(|c| c.rotate(ctx, dim, -shift))
                })
                .collect()
        })
        .collect()
}

fn prepare_minimal(ctx: &Context, dim: usize, diagonals: Vec<Diagonals>) -> Vec<Diagonals> {
    diagonals
        .into_iter()
        .map(|diags| {
            diags
                .into_iter()
                .enumerate()
                .map(|(e, c)| c.map(|c| c.rotate(ctx, dim, -(e as i64))))
                .collect()
        })
        .collect()
}

fn accumulate(engine: &Engine, acc: &mut Option<Ctxt>, term: Ctxt) {
    match acc {
        Some(sum) => engine.add_assign(sum, &term),
        None => *acc = Some(term),
    }
}

fn mul_direct(
    engine: &Engine,
    ct: &Ctxt,
    dim: usize,
    hoist: bool,
    diagonals: &[Diagonals],
) -> Result<Ctxt> {
    let mut acc = None;
    for (l, diags) in diagonals.iter().enumerate() {
        let amounts: Vec<i64> = diags
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .map(|(e, _)| e as i64)
            .collect();
        if amounts.is_empty() {
            continue;
        }

        let u = engine.frobenius(ct, l)?;
        let rotated = if hoist {
            engine.rotate_hoisted(&u, dim, &amounts)?
        } else {
            amounts
                .iter()
                .map(|&e| engine.rotate(&u, dim, e))
                .collect::<Result<Vec<_>>>()?
        };

        for (&e, r) in amounts.iter().zip(&rotated) {
            if let Some(c) = &diags[e as usize] {
                accumulate(engine, &mut acc, engine.mul_by_constant(r, c));
            }
        }
    }
    Ok(acc.unwrap_or_else(|| engine.zero()))
}

fn mul_bsgs(
    engine: &Engine,
    ct: &Ctxt,
    dim: usize,
    hoist: bool,
    giant: usize,
    diagonals: &[Diagonals],
) -> Result<Ctxt> {
    let mut acc = None;
    for (l, diags) in diagonals.iter().enumerate() {
        let size = diags.len();
        let baby_needed: Vec<i64> = (0..giant)
            .filter(|&b| (b..size).step_by(giant).any(|e| diags[e].is_some()))
            .map(|b| b as i64)
            .collect();
        if baby_needed.is_empty() {
            continue;
        }

        let u = engine.frobenius(ct, l)?;
        let babies = if hoist {
            engine.rotate_hoisted(&u, dim, &baby_needed)?
        } else {
            baby_needed
                .iter()
                .map(|&b| engine.rotate(&u, dim, b))
                .collect::<Result<Vec<_>>>()?
        };
        let mut baby: Vec<Option<Ctxt>> = vec![None; giant];
        for (&b, r) in baby_needed.iter().zip(babies) {
            baby[b as usize] = Some(r);
        }

        for a in (0..size).step_by(giant) {
            let mut inner = None;
            for (b, slot) in baby.iter().enumerate().take(size - a) {
                if let (Some(c), Some(r)) = (&diags[a + b], slot) {
                    accumulate(engine, &mut inner, engine.mul_by_constant(r, c));
                }
            }
            if let Some(inner) = inner {
                let term = engine.rotate(&inner, dim, a as i64)?;
                accumulate(engine, &mut acc, term);
            }
        }
    }
    Ok(acc.unwrap_or_else(|| engine.zero()))
}

/// Σ_l Σ_e rot_e(σ^l(v) ⊙ rot_{-e}(c_{l,e})), Horner in rot_1 over e
fn mul_minimal(engine: &Engine, ct: &Ctxt, dim: usize, diagonals: &[Diagonals]) -> Result<Ctxt> {
    let mut total: Option<Ctxt> = None;
    for (l, diags) in diagonals.iter().enumerate() {
        if diags.iter().all(Option::is_none) {
            continue;
        }
        let u = engine.frobenius(ct, l)?;

        let mut inner: Option<Ctxt> = None;
        for c in diags.iter().rev() {
            if let Some(a) = inner.take() {
                inner = Some(engine.rotate(&a, dim, 1)?);
            }
            if let Some(c) = c {
                accumulate(engine, &mut inner, engine.mul_by_constant(&u, c));
            }
        }
        if let Some(s) = inner {
            accumulate(engine, &mut total, s);
        }
    }
    Ok(total.unwrap_or_else(|| engine.zero()))
}

fn mul_full_space(engine: &Engine, ct: &Ctxt, diagonals: &[Diagonals]) -> Result<Ctxt> {
    let mut acc = None;
    let mut coords = vec![0usize; engine.context().num_dims()];
    for (l, diags) in diagonals.iter().enumerate() {
        if diags.iter().all(Option::is_none) {
            continue;
        }
        let u = engine.frobenius(ct, l)?;
        walk_shifts(engine, 0, u, &mut coords, diags, &mut acc)?;
    }
    Ok(acc.unwrap_or_else(|| engine.zero()))
}

/// Visit rot_s(u) for every shift s with coordinates fixed below `dim`
fn walk_shifts(
    engine: &Engine,
    dim: usize,
    u: Ctxt,
    coords: &mut [usize],
    diags: &Diagonals,
    acc: &mut Option<Ctxt>,
) -> Result<()> {
    let hc = engine.context().hypercube();
    if dim == hc.num_dims() {
        if let Some(c) = &diags[hc.index_of(coords)] {
            accumulate(engine, acc, engine.mul_by_constant(&u, c));
        }
        return Ok(());
    }

    let size = hc.size_of_dim(dim);
    let mut cur = u;
    for s in 0..size {
        coords[dim] = s;
        let next = if s + 1 < size {
            Some(engine.rotate(&cur, dim, 1)?)
        } else {
            None
        };
        walk_shifts(engine, dim + 1, cur, coords, diags, acc)?;
        match next {
            Some(n) => cur = n,
            None => break,
        }
    }
    Ok(())
}
