//! Error handling for the verification crate
//!
//! Configuration problems and missing key material are fatal and surface as
//! [`HeError`]. A decrypted result that disagrees with the plaintext
//! reference is *not* an error: it is reported as a trial outcome by the
//! harness.

use std::fmt;

/// Error raised by context setup, key management or homomorphic evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeError {
    /// Invalid parameters: unknown strategy index, malformed generator or
    /// order vectors, bad `m/p/r/L/dim`
    Config(String),
    /// The key set cannot realise a requested automorphism
    MissingKey {
        /// Human readable description of the automorphism
        what: String,
    },
    /// `mul` called on an executor that has not been upgraded
    NotUpgraded,
    /// `upgrade` called twice on the same executor
    AlreadyUpgraded,
}

impl fmt::Display for HeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeError::Config(msg) => write!(f, "configuration error: {}", msg),
            HeError::MissingKey { what } => {
                write!(f, "missing key-switching material for {}", what)
            }
            HeError::NotUpgraded => write!(f, "executor used before upgrade()"),
            HeError::AlreadyUpgraded => write!(f, "upgrade() called more than once"),
        }
    }
}

impl std::error::Error for HeError {}

impl HeError {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for fallible operations in this crate
pub type Result<T> = std::result::Result<T, HeError>;

/// Create an `HeError::Config` with format string support
macro_rules! config_err {
    ($($arg:tt)*) => {
        $crate::error::HeError::Config(format!($($arg)*))
    };
}

pub(crate) use config_err;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = config_err!("bad ks_strategy {}", 7);
        assert_eq!(err.to_string(), "configuration error: bad ks_strategy 7");

        let err = HeError::MissingKey {
            what: "rotation by 3 along dimension 0".into(),
        };
        assert!(err.to_string().contains("rotation by 3"));
    }

    #[test]
    fn test_converts_into_eyre() {
        fn fails() -> eyre::Result<()> {
            Err(HeError::NotUpgraded)?;
            Ok(())
        }
        let report = fails().unwrap_err();
        assert!(report.to_string().contains("upgrade"));
    }
}
