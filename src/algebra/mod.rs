//! Slot algebra: the ring each slot lives in and block (d×d) entries
//!
//! Every slot holds an element of R = Z_{p^r}[X]/G(X), a Galois ring of
//! degree d (a finite field GF(p^d) when r = 1). Linear transforms act on
//! vectors of slots either through scalar entries (multiplication by an
//! element of R) or through block entries (arbitrary Z_{p^r}-linear maps on
//! the coefficient vector of a slot). Block maps are realised homomorphically
//! through the decomposition x·B = Σ_l c_l σ^l(x), σ being Frobenius.

mod block;
mod ring;

pub use block::BlockEntry;
pub use ring::{SlotElem, SlotRing};
