//! Remote cache throughput

use crate::record::SpawnExec;
use std::time::Duration;

/// Runner string Bazel records for outputs downloaded from a remote cache
pub const REMOTE_CACHE_HIT_RUNNER: &str = "remote cache hit";

/// Fetch times at or below this are too small to derive a rate from
pub const MIN_FETCH_TIME_FOR_RATE: Duration = Duration::from_millis(1);

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Totals over spawns served by the remote cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePerformanceSummary {
    pub remote_cache_hit_count: u64,
    pub total_bytes_downloaded: u64,
    pub total_fetch_time: Duration,
}

impl CachePerformanceSummary {
    pub fn from_spawns(spawns: &[SpawnExec]) -> Self {
        let mut summary = Self::default();

        for spawn in spawns
            .iter()
            .filter(|s| s.runner == REMOTE_CACHE_HIT_RUNNER)
        {
            summary.remote_cache_hit_count += 1;
            summary.total_bytes_downloaded = summary
                .total_bytes_downloaded
                .saturating_add(spawn.output_bytes());
            summary.total_fetch_time = summary.total_fetch_time.saturating_add(spawn.fetch_time());
        }

        summary
    }

    pub fn total_mb_downloaded(&self) -> f64 {
        self.total_bytes_downloaded as f64 / BYTES_PER_MB
    }

    /// Average download rate in MB/s
    ///
    /// `None` when the total fetch time is too small for the rate to mean
    /// anything, including when it is zero.
    pub fn download_rate_mbps(&self) -> Option<f64> {
        if self.total_fetch_time <= MIN_FETCH_TIME_FOR_RATE {
            return None;
        }
        Some(self.total_mb_downloaded() / self.total_fetch_time.as_secs_f64())
    }
}
