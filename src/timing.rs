//! Named accumulating timers and evaluation counters

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Accumulated time for one named section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerReport {
    pub name: String,
    pub calls: u64,
    pub total_ms: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Entry {
    calls: u64,
    total: Duration,
}

/// Set of named timers, shared by reference between the harness and the
/// executors
#[derive(Debug, Default)]
pub struct Timers {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, charging its wall time to `name`
    pub fn time<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    pub fn record(&self, name: &str, elapsed: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(name.to_string()).or_default();
        entry.calls += 1;
        entry.total += elapsed;
    }

    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn report(&self) -> Vec<TimerReport> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, e)| TimerReport {
                name: name.clone(),
                calls: e.calls,
                total_ms: e.total.as_secs_f64() * 1e3,
            })
            .collect()
    }

    /// Log every timer at INFO level
    pub fn print(&self) {
        for t in self.report() {
            info!("  {}: {:.3} ms ({} calls)", t.name, t.total_ms, t.calls);
        }
    }
}

/// Counters updated by the engine as it evaluates
#[derive(Debug, Default)]
pub struct EvalStats {
    key_switches: AtomicU64,
    rotations: AtomicU64,
    frobenius_maps: AtomicU64,
    constant_muls: AtomicU64,
    hoisted_batches: AtomicU64,
}

/// Point-in-time copy of [`EvalStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub key_switches: u64,
    pub rotations: u64,
    pub frobenius_maps: u64,
    pub constant_muls: u64,
    pub hoisted_batches: u64,
}

impl EvalStats {
    pub fn add_key_switches(&self, n: u64) {
        self.key_switches.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_frobenius(&self) {
        self.frobenius_maps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_constant_mul(&self) {
        self.constant_muls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_hoisted_batch(&self) {
        self.hoisted_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            key_switches: self.key_switches.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            frobenius_maps: self.frobenius_maps.load(Ordering::Relaxed),
            constant_muls: self.constant_muls.load(Ordering::Relaxed),
            hoisted_batches: self.hoisted_batches.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.key_switches,
            &self.rotations,
            &self.frobenius_maps,
            &self.constant_muls,
            &self.hoisted_batches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_accumulate_and_reset() {
        let timers = Timers::new();
        let x = timers.time("upgrade", || 41 + 1);
        assert_eq!(x, 42);
        timers.record("upgrade", Duration::from_millis(2));
        timers.record("mul", Duration::from_millis(1));

        let report = timers.report();
        assert_eq!(report.len(), 2);
        let upgrade = report.iter().find(|t| t.name == "upgrade").unwrap();
        assert_eq!(upgrade.calls, 2);
        assert!(upgrade.total_ms >= 2.0);

        timers.reset();
        assert!(timers.report().is_empty());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = EvalStats::default();
        stats.add_key_switches(3);
        stats.add_rotation();
        stats.add_constant_mul();
        let snap = stats.snapshot();
        assert_eq!(snap.key_switches, 3);
        assert_eq!(snap.rotations, 1);
        assert_eq!(snap.frobenius_maps, 0);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
