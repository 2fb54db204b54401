//! End-to-end verification of homomorphic transforms
//!
//! One trial: pick the key-switching strategy, generate keys, build the
//! transform and its executor, encrypt a random array, evaluate, decrypt
//! and compare slot by slot against the plaintext reference. A mismatch is
//! an outcome of the trial, not an error.

use std::fmt;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::{Context, ContextParams};
use crate::encoding::{self, PlaintextArray};
use crate::engine::Engine;
use crate::error::{config_err, Result};
use crate::keys::KeyManager;
use crate::matmul::{EvalOverrides, MatMulExec, Matrix, MatrixKind, Scope, ZeroInjection};
use crate::params::EngineParams;
use crate::strategy::KsStrategy;
use crate::timing::{StatsSnapshot, TimerReport, Timers};

/// Everything needed to run one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub context: ContextParams,
    pub engine: EngineParams,
    /// Dimension along which 1D transforms act
    pub dim: usize,
    pub kind: MatrixKind,
    /// 0: default, 1: full, 2: bsgs, 3: minimal
    pub ks_strategy: i64,
    pub overrides: EvalOverrides,
    pub zeros: ZeroInjection,
    /// Seed for key generation and the stimulus vector
    pub seed: u64,
    pub verbose: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            context: ContextParams::default(),
            engine: EngineParams::default(),
            dim: 0,
            kind: MatrixKind::default(),
            ks_strategy: 0,
            overrides: EvalOverrides::default(),
            zeros: ZeroInjection::Off,
            seed: 0,
            verbose: false,
        }
    }
}

impl TrialConfig {
    /// Parameter checks that need no group or ring computation
    pub fn validate(&self) -> Result<KsStrategy> {
        let strategy = KsStrategy::from_index(self.ks_strategy)?;
        self.context.validate()?;
        self.kind.validate()?;
        self.overrides.validate()?;
        self.zeros.validate()?;
        Ok(strategy)
    }
}

/// Result of comparing the decrypted output with the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialOutcome {
    Pass,
    Mismatch,
}

impl TrialOutcome {
    pub fn is_pass(self) -> bool {
        self == TrialOutcome::Pass
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialOutcome::Pass => f.write_str("Nice!!"),
            TrialOutcome::Mismatch => f.write_str("Grrr@*"),
        }
    }
}

/// Summary of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub outcome: TrialOutcome,
    pub kind: MatrixKind,
    pub strategy: KsStrategy,
    /// Evaluation plan chosen by the executor
    pub plan: String,
    pub slots: usize,
    pub degree: usize,
    pub dim: Option<usize>,
    /// Galois elements with key-switching material
    pub keys: usize,
    /// Slots where the decrypted output differs from the reference
    pub mismatched_slots: Vec<usize>,
    pub stats: StatsSnapshot,
    pub timers: Vec<TimerReport>,
}

/// Run one complete trial from a configuration
pub fn run(config: &TrialConfig) -> Result<TrialReport> {
    // An unknown strategy must fail before any key material exists
    let strategy = config.validate()?;

    let ctx = Arc::new(Context::new(config.context.clone())?);
    if config.kind.scope == Scope::OneDim {
        ctx.check_dim(config.dim)?;
    }
    if config.verbose {
        info!("{}", ctx.describe());
    }

    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let params = config.engine.clone();
    let t = ctx.ring().plaintext_modulus();
    params.validate(t)?;
    params.check_noise_budget(t, ctx.degree(), ctx.slot_count())?;

    let mut keys = KeyManager::generate(
        ctx.clone(),
        params.lwe_dim,
        params.hamming_weight,
        params.q,
        &mut rng,
    );
    strategy.install(&mut keys);
    let engine = Engine::new(keys, params)?;

    let matrix = Matrix::random(ctx, config.kind, config.dim, config.zeros)?;
    do_test(
        &engine,
        &matrix,
        strategy,
        config.overrides,
        &mut rng,
        config.verbose,
    )
}

/// Verify `matrix` on an engine whose keys were generated for `strategy`
pub fn do_test<R: Rng + ?Sized>(
    engine: &Engine,
    matrix: &Matrix,
    strategy: KsStrategy,
    overrides: EvalOverrides,
    rng: &mut R,
    verbose: bool,
) -> Result<TrialReport> {
    let ctx = engine.context();
    if !Arc::ptr_eq(ctx, matrix.context()) && ctx.params() != matrix.context().params() {
        return Err(config_err!("transform and engine use different contexts"));
    }

    let timers = Timers::new();
    let mut exec = MatMulExec::new(matrix, strategy.is_minimal(), overrides);
    exec.upgrade(&timers)?;

    let v = PlaintextArray::random(ctx, rng);
    let ct = engine.encrypt(&v, rng);
    let original = ct.clone();

    timers.reset();
    engine.reset_stats();
    let out = timers.time("mul", || exec.mul(engine, &ct))?;
    let stats = engine.stats();
    if verbose {
        timers.print();
        info!(
            key_switches = stats.key_switches,
            rotations = stats.rotations,
            frobenius = stats.frobenius_maps,
            constant_muls = stats.constant_muls,
            "evaluation stats"
        );
    }
    debug_assert_eq!(ct, original);

    let expected = timers.time("reference", || matrix.apply_plain(&v));
    let actual = timers.time("decrypt", || engine.decrypt(&out));

    let mismatched_slots = expected.mismatches(&actual);
    let outcome = if encoding::equals(&expected, &actual) {
        TrialOutcome::Pass
    } else {
        warn!(slots = mismatched_slots.len(), "decrypted result differs from reference");
        TrialOutcome::Mismatch
    };
    debug!(%outcome, plan = exec.plan_name(), "trial finished");

    Ok(TrialReport {
        outcome,
        kind: matrix.kind(),
        strategy,
        plan: exec.plan_name().unwrap_or_default().to_string(),
        slots: ctx.slot_count(),
        degree: ctx.degree(),
        dim: matrix.dim(),
        keys: engine.keys().key_set().len(),
        mismatched_slots,
        stats,
        timers: timers.report(),
    })
}

/// Parse an integer vector such as `[562 1871 751]` or `4,2,-4`
pub fn parse_vector(s: &str) -> Result<Vec<i64>> {
    let trimmed = s.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    if trimmed.starts_with('[') != trimmed.ends_with(']') {
        return Err(config_err!("unbalanced brackets in vector {:?}", s));
    }

    inner
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<i64>()
                .map_err(|_| config_err!("bad integer {:?} in vector {:?}", tok, s))
        })
        .collect()
}

/// Parse a generator vector: every entry must be positive
pub fn parse_generators(s: &str) -> Result<Vec<u64>> {
    parse_vector(s)?
        .into_iter()
        .map(|g| {
            u64::try_from(g)
                .ok()
                .filter(|&g| g > 0)
                .ok_or_else(|| config_err!("generator {} must be positive", g))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeError;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("[4 2 -4]").unwrap(), vec![4, 2, -4]);
        assert_eq!(parse_vector("562,1871, 751").unwrap(), vec![562, 1871, 751]);
        assert_eq!(parse_vector("[]").unwrap(), Vec::<i64>::new());
        assert!(parse_vector("[4 x]").is_err());
        assert!(parse_vector("[4 2").is_err());
        assert!(parse_generators("[3 -5]").is_err());
        assert_eq!(parse_generators("[3 5]").unwrap(), vec![3, 5]);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TrialOutcome::Pass.to_string(), "Nice!!");
        assert_eq!(TrialOutcome::Mismatch.to_string(), "Grrr@*");
    }

    #[test]
    fn test_bad_strategy_is_config_error() {
        let config = TrialConfig {
            ks_strategy: 7,
            ..TrialConfig::default()
        };
        assert!(matches!(run(&config), Err(HeError::Config(_))));
    }

    #[test]
    fn test_small_trial_passes() {
        let config = TrialConfig {
            context: ContextParams {
                m: 31,
                ..ContextParams::default()
            },
            engine: EngineParams::fast(),
            ..TrialConfig::default()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.outcome, TrialOutcome::Pass);
        assert!(report.mismatched_slots.is_empty());
        assert_eq!(report.slots, 6);
        assert_eq!(report.degree, 5);
        assert!(report.timers.iter().any(|t| t.name == "mul"));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: TrialConfig = serde_json::from_str(r#"{"dim": 1, "ks_strategy": 2}"#).unwrap();
        assert_eq!(config.dim, 1);
        assert_eq!(config.context, ContextParams::default());
        assert_eq!(config.validate().unwrap(), KsStrategy::Bsgs);
    }
}
