//! d×d block entries over Z_{p^r}

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ring::{SlotElem, SlotRing};

/// A Z_{p^r}-linear map on one slot, stored as a d×d matrix acting on
/// coefficient row vectors (x ↦ x·B)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    rows: Vec<Vec<u64>>,
}

impl BlockEntry {
    pub fn zero(ring: &SlotRing) -> Self {
        let d = ring.degree();
        Self {
            rows: vec![vec![0; d]; d],
        }
    }

    pub fn from_rows(rows: Vec<Vec<u64>>) -> Self {
        Self { rows }
    }

    /// Multiplication-by-`c` map, the block form of a scalar entry
    pub fn from_scalar(ring: &SlotRing, c: &SlotElem) -> Self {
        Self {
            rows: ring.mul_matrix(c),
        }
    }

    pub fn random<R: Rng + ?Sized>(ring: &SlotRing, rng: &mut R) -> Self {
        let d = ring.degree();
        let q = ring.plaintext_modulus();
        Self {
            rows: (0..d)
                .map(|_| (0..d).map(|_| rng.gen_range(0..q)).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.rows
    }

    pub fn is_zero(&self) -> bool {
        self.rows.iter().flatten().all(|&c| c == 0)
    }

    /// x·B
    pub fn apply(&self, ring: &SlotRing, x: &SlotElem) -> SlotElem {
        ring.apply_matrix(x, &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_scalar_block_agrees_with_mul() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let ring = SlotRing::new(3, 1, 4).unwrap();
        let c = ring.random(&mut rng);
        let x = ring.random(&mut rng);
        let block = BlockEntry::from_scalar(&ring, &c);
        assert_eq!(block.apply(&ring, &x), ring.mul(&x, &c));
    }

    #[test]
    fn test_zero_block() {
        let ring = SlotRing::new(2, 1, 5).unwrap();
        let zero = BlockEntry::zero(&ring);
        assert!(zero.is_zero());
        assert_eq!(zero.rows().len(), 5);

        let mut rows = zero.rows().to_vec();
        rows[4][4] = 1;
        assert!(!BlockEntry::from_rows(rows).is_zero());
    }
}
