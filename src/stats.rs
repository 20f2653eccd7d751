//! Per-mnemonic statistics
//!
//! One linear pass over the decoded spawns produces the overall totals and a
//! table keyed by mnemonic. The table remembers the order in which mnemonics
//! first appeared so that later sorts break ties the same way on every run.

use crate::record::SpawnExec;
use indexmap::IndexMap;
use std::time::Duration;

/// Statistics for a single mnemonic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MnemonicMetrics {
    /// Number of spawns with this mnemonic
    pub count: u64,
    /// Spawns whose result was reused from a cache
    pub cache_hits: u64,
    /// Sum of every spawn's total time
    pub total_duration: Duration,
}

impl MnemonicMetrics {
    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_duration.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Cache hits as a percentage of spawns
    pub fn cache_hit_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.cache_hits as f64 / self.count as f64) * 100.0
    }
}

/// Summary totals over the whole log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogTotals {
    pub total_actions: u64,
    pub cache_hits: u64,
}

impl LogTotals {
    /// Cache hits as a percentage of all actions; 0 for an empty log
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_actions == 0 {
            return 0.0;
        }
        (self.cache_hits as f64 / self.total_actions as f64) * 100.0
    }
}

/// Accumulates statistics per mnemonic
#[derive(Debug, Default)]
pub struct StatsTracker {
    totals: LogTotals,
    /// Mnemonic -> statistics, in first-seen order
    stats: IndexMap<String, MnemonicMetrics>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole log
    pub fn from_spawns(spawns: &[SpawnExec]) -> Self {
        let mut tracker = Self::new();
        for spawn in spawns {
            tracker.record(spawn);
        }
        tracker
    }

    /// Record one spawn
    pub fn record(&mut self, spawn: &SpawnExec) {
        self.totals.total_actions += 1;
        if spawn.cache_hit {
            self.totals.cache_hits += 1;
        }

        let entry = self.stats.entry(spawn.mnemonic.clone()).or_default();
        entry.count += 1;
        if spawn.cache_hit {
            entry.cache_hits += 1;
        }
        entry.total_duration = entry.total_duration.saturating_add(spawn.total_time());
    }

    pub fn totals(&self) -> LogTotals {
        self.totals
    }

    /// Mnemonic table in first-seen order
    pub fn stats_map(&self) -> &IndexMap<String, MnemonicMetrics> {
        &self.stats
    }

    pub fn get(&self, mnemonic: &str) -> Option<&MnemonicMetrics> {
        self.stats.get(mnemonic)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
