//! Key and ciphertext containers for the per-coefficient engine

use serde::{Deserialize, Serialize};

/// Ternary secret s ∈ {-1, 0, 1}^dim, entries stored as residues mod q
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LweSecretKey {
    pub coeffs: Vec<u64>,
    pub dim: usize,
    pub q: u64,
}

/// Encryption of one slot coefficient
///
/// Satisfies b + <a, s> = Δ·m + e (mod q).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LweCiphertext {
    /// Mask, `dim` residues mod q
    pub a: Vec<u64>,
    /// Body
    pub b: u64,
    pub q: u64,
}
