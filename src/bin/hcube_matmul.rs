//! hcube-matmul: verify one homomorphic linear transform
//!
//! Builds the context, keys and a seeded random transform, evaluates it on
//! an encrypted random array and compares against the plaintext result.

use std::process::ExitCode;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hcube_matmul::harness::{self, parse_generators, parse_vector, TrialConfig};
use hcube_matmul::{ContextParams, EngineParams, EvalOverrides, MatrixKind, ZeroInjection};

#[derive(Parser)]
#[command(name = "hcube-matmul")]
#[command(about = "Check homomorphic matrix-vector products against plaintext")]
#[command(version)]
struct Args {
    /// Cyclotomic ring index
    #[arg(long, default_value = "2047")]
    m: u64,

    /// Plaintext base
    #[arg(long, default_value = "2")]
    p: u64,

    /// Lifting: plaintext modulus is p^r
    #[arg(long, default_value = "1")]
    r: u32,

    /// Number of levels
    #[arg(long = "L", default_value = "4")]
    levels: usize,

    /// Dimension along which 1D transforms act
    #[arg(long, default_value = "0")]
    dim: usize,

    /// Worker threads
    #[arg(long, default_value = "1")]
    nt: usize,

    /// Print the configuration and timers
    #[arg(long)]
    verbose: bool,

    /// Transform over the whole slot space
    #[arg(long)]
    full: bool,

    /// Block entries instead of slot scalars
    #[arg(long)]
    block: bool,

    /// One matrix per copy of the dimension
    #[arg(long)]
    multi: bool,

    /// 0: default, 1: full, 2: bsgs, 3: minimal
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    ks_strategy: i64,

    /// 1 to force BSGS on, -1 to force it off
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    force_bsgs: i32,

    /// 1 to force hoisting on, -1 to force it off
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    force_hoist: i32,

    /// Hypercube generators, e.g. "[562 1871 751]"
    #[arg(long, default_value = "[]")]
    gens: String,

    /// Orders of the generators, negative for non-native, e.g. "[4 2 -4]"
    #[arg(long, default_value = "[]")]
    ords: String,

    /// Keep each matrix entry with probability 1/SPARSE
    #[arg(long)]
    sparse: Option<u64>,

    /// Seed for keys and the encrypted input
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Small LWE dimension for quick runs
    #[arg(long)]
    fast: bool,

    /// Print the trial report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn to_config(&self) -> Result<TrialConfig> {
        let gens = parse_generators(&self.gens).wrap_err("invalid --gens")?;
        let ords = parse_vector(&self.ords).wrap_err("invalid --ords")?;

        Ok(TrialConfig {
            context: ContextParams {
                m: self.m,
                p: self.p,
                r: self.r,
                levels: self.levels,
                gens,
                ords,
            },
            engine: if self.fast {
                EngineParams::fast()
            } else {
                EngineParams::standard()
            },
            dim: self.dim,
            kind: MatrixKind::new(self.full, self.block, self.multi),
            ks_strategy: self.ks_strategy,
            overrides: EvalOverrides {
                force_bsgs: self.force_bsgs,
                force_hoist: self.force_hoist,
            },
            zeros: match self.sparse {
                Some(bound) => ZeroInjection::Sparse { bound },
                None => ZeroInjection::Off,
            },
            seed: self.seed,
            verbose: self.verbose,
        })
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.to_config()?;
    if args.verbose {
        info!(
            "m={} p={} r={} L={} dim={} nt={} kind={} ks_strategy={} force_bsgs={} force_hoist={}",
            args.m,
            args.p,
            args.r,
            args.levels,
            args.dim,
            args.nt,
            config.kind,
            args.ks_strategy,
            args.force_bsgs,
            args.force_hoist
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.nt.max(1))
        .build()
        .wrap_err("failed to build worker pool")?;
    let report = pool
        .install(|| harness::run(&config))
        .wrap_err("trial failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.outcome);
    }

    Ok(if report.outcome.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
