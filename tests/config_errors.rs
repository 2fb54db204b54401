//! Configuration handling: invalid trials must fail before any evaluation

use hcube_matmul::harness::{self, parse_generators, parse_vector, TrialConfig};
use hcube_matmul::{ContextParams, EngineParams, EvalOverrides, HeError, MatrixKind, ZeroInjection};

fn config_with(context: ContextParams) -> TrialConfig {
    TrialConfig {
        context,
        engine: EngineParams::fast(),
        ..TrialConfig::default()
    }
}

fn is_config_error(config: &TrialConfig) -> bool {
    matches!(harness::run(config), Err(HeError::Config(_)))
}

#[test]
fn test_unknown_strategy_rejected() {
    for ks_strategy in [-1, 4, 100] {
        let config = TrialConfig {
            ks_strategy,
            ..TrialConfig::default()
        };
        assert!(is_config_error(&config), "strategy {} accepted", ks_strategy);
    }
}

#[test]
fn test_bad_context_parameters() {
    let base = ContextParams::default();
    for params in [
        ContextParams { m: 1, ..base.clone() },
        ContextParams { p: 4, ..base.clone() },
        ContextParams { m: 2046, ..base.clone() },
        ContextParams { r: 0, ..base.clone() },
        ContextParams { levels: 0, ..base.clone() },
    ] {
        assert!(is_config_error(&config_with(params.clone())), "{:?} accepted", params);
    }
}

#[test]
fn test_bad_dimension() {
    let config = TrialConfig {
        dim: 2,
        ..config_with(ContextParams::default())
    };
    assert!(is_config_error(&config));

    // full-space transforms ignore the dimension
    let config = TrialConfig {
        dim: 2,
        kind: MatrixKind::new(true, false, false),
        ..config_with(ContextParams {
            m: 31,
            ..ContextParams::default()
        })
    };
    assert!(harness::run(&config).unwrap().outcome.is_pass());
}

#[test]
fn test_generator_orders() {
    // 2047 = 23 * 89: 3 generates a native dimension of size 88, 5 a non-native one of size 2
    let good = ContextParams {
        gens: parse_generators("[3 5]").unwrap(),
        ords: parse_vector("[88 -2]").unwrap(),
        ..ContextParams::default()
    };
    let config = TrialConfig {
        dim: 1,
        ..config_with(good.clone())
    };
    assert!(harness::run(&config).unwrap().outcome.is_pass());

    let wrong_sign = ContextParams {
        ords: vec![88, 2],
        ..good.clone()
    };
    assert!(is_config_error(&config_with(wrong_sign)));

    let wrong_order = ContextParams {
        ords: vec![44, -2],
        ..good.clone()
    };
    assert!(is_config_error(&config_with(wrong_order)));

    let orders_only = ContextParams {
        gens: Vec::new(),
        ..good
    };
    assert!(is_config_error(&config_with(orders_only)));
}

#[test]
fn test_malformed_vectors() {
    assert!(matches!(parse_vector("[1 two]"), Err(HeError::Config(_))));
    assert!(matches!(parse_vector("1 2]"), Err(HeError::Config(_))));
    assert!(matches!(parse_generators("[0]"), Err(HeError::Config(_))));
    assert_eq!(parse_vector(" [ 4  2 -4 ] ").unwrap(), vec![4, 2, -4]);
}

#[test]
fn test_bad_overrides_and_zeros() {
    let config = TrialConfig {
        overrides: EvalOverrides {
            force_bsgs: 0,
            force_hoist: 3,
        },
        ..TrialConfig::default()
    };
    assert!(is_config_error(&config));

    let config = TrialConfig {
        zeros: ZeroInjection::Sparse { bound: 0 },
        ..TrialConfig::default()
    };
    assert!(is_config_error(&config));
}

#[test]
fn test_bad_engine_parameters() {
    let config = TrialConfig {
        engine: EngineParams {
            lwe_dim: 0,
            ..EngineParams::fast()
        },
        ..config_with(ContextParams {
            m: 31,
            ..ContextParams::default()
        })
    };
    assert!(is_config_error(&config));
}

#[test]
fn test_full_multi_rejected() {
    let config = TrialConfig {
        kind: MatrixKind::new(true, false, true),
        ..config_with(ContextParams {
            m: 31,
            ..ContextParams::default()
        })
    };
    assert!(is_config_error(&config));
}

#[test]
fn test_noise_budget_exceeded() {
    // t = 2^30 leaves Δ = 2^30, too small for two maps of width 3·2^29
    let config = config_with(ContextParams {
        m: 7,
        p: 2,
        r: 30,
        ..ContextParams::default()
    });
    assert!(is_config_error(&config));
}

#[test]
fn test_huge_prime_base() {
    // largest prime below 2^64: passes the primality test, fails the modulus bound
    let config = config_with(ContextParams {
        m: 3,
        p: 18_446_744_073_709_551_557,
        ..ContextParams::default()
    });
    assert!(is_config_error(&config));
}
