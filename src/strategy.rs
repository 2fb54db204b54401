//! Key-switching strategy selection

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{config_err, Result};
use crate::keys::KeyManager;

/// Which automorphism keys are generated before a transform runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KsStrategy {
    /// Some 1D keys plus some Frobenius keys
    #[default]
    Default,
    /// Every 1D rotation key plus some Frobenius keys
    Full,
    /// Baby-step/giant-step 1D keys plus some Frobenius keys
    Bsgs,
    /// Rotation-by-one and σ^1 keys only
    Minimal,
}

impl KsStrategy {
    /// Parse the numeric selector: 0 default, 1 full, 2 bsgs, 3 minimal
    pub fn from_index(index: i64) -> Result<Self> {
        match index {
            0 => Ok(Self::Default),
            1 => Ok(Self::Full),
            2 => Ok(Self::Bsgs),
            3 => Ok(Self::Minimal),
            other => Err(config_err!(
                "bad ks_strategy {} (0: default, 1: full, 2: bsgs, 3: minimal)",
                other
            )),
        }
    }

    pub fn index(self) -> i64 {
        match self {
            Self::Default => 0,
            Self::Full => 1,
            Self::Bsgs => 2,
            Self::Minimal => 3,
        }
    }

    /// Executors must restrict themselves to minimal key material
    pub fn is_minimal(self) -> bool {
        self == Self::Minimal
    }

    /// Generate this strategy's key material
    pub fn install(self, keys: &mut KeyManager) {
        match self {
            Self::Default => {
                keys.add_some_1d();
                keys.add_some_frb();
            }
            Self::Full => {
                keys.add_full_1d();
                keys.add_some_frb();
            }
            Self::Bsgs => {
                keys.add_bsgs_1d();
                keys.add_some_frb();
            }
            Self::Minimal => {
                keys.add_minimal_1d();
                keys.add_minimal_frb();
            }
        }
        info!(strategy = %self, keys = keys.key_set().len(), "key-switching material ready");
    }
}

impl fmt::Display for KsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Full => "full",
            Self::Bsgs => "bsgs",
            Self::Minimal => "minimal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextParams};
    use crate::error::HeError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;

    #[test]
    fn test_from_index() {
        for i in 0..4 {
            assert_eq!(KsStrategy::from_index(i).unwrap().index(), i);
        }
        assert!(matches!(KsStrategy::from_index(4), Err(HeError::Config(_))));
        assert!(KsStrategy::from_index(-1).is_err());
        assert!(KsStrategy::Minimal.is_minimal());
        assert!(!KsStrategy::Bsgs.is_minimal());
    }

    #[test]
    fn test_install_sizes() {
        let ctx = Arc::new(Context::new(ContextParams::default()).unwrap());
        let sizes: Vec<usize> = [
            KsStrategy::Default,
            KsStrategy::Full,
            KsStrategy::Bsgs,
            KsStrategy::Minimal,
        ]
        .iter()
        .map(|s| {
            let mut rng = ChaCha20Rng::seed_from_u64(0);
            let mut keys = KeyManager::generate(ctx.clone(), 8, 4, 97, &mut rng);
            s.install(&mut keys);
            assert!(keys.check_complete().is_ok());
            keys.key_set().len()
        })
        .collect();

        // full > default = bsgs (dim 0 of size 88 exceeds the bound) > minimal
        assert!(sizes[1] > sizes[0]);
        assert_eq!(sizes[0], sizes[2]);
        assert!(sizes[2] > sizes[3]);
    }

    #[test]
    fn test_display_roundtrip() {
        let json = serde_json::to_string(&KsStrategy::Bsgs).unwrap();
        assert_eq!(json, "\"bsgs\"");
        assert_eq!(KsStrategy::Minimal.to_string(), "minimal");
    }
}
