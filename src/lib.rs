//! hcube-matmul: homomorphic linear transforms over hypercube-structured slots
//!
//! This crate evaluates matrix-vector products on encrypted arrays of slots
//! and checks them against a plaintext reference.
//!
//! Key components:
//! - Slot algebra: Z_{p^r}[X]/G with Frobenius, and the hypercube of slots
//! - Seeded random transforms along one dimension or over the full space
//! - An evaluator that picks direct, baby-step/giant-step or minimal-key plans
//! - Key-switching strategies deciding which Galois keys exist
//! - A verification harness reporting "Nice!!" or "Grrr@*"

pub mod algebra;
pub mod context;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod harness;
pub mod hypercube;
pub mod keys;
pub mod lwe;
pub mod math;
pub mod matmul;
pub mod params;
pub mod strategy;
pub mod timing;

pub use context::{Context, ContextParams};
pub use encoding::PlaintextArray;
pub use engine::{Ctxt, Engine};
pub use error::{HeError, Result};
pub use harness::{do_test, run, TrialConfig, TrialOutcome, TrialReport};
pub use keys::KeyManager;
pub use matmul::{EvalOverrides, MatMulExec, Matrix, MatrixKind, ZeroInjection};
pub use params::EngineParams;
pub use strategy::KsStrategy;
