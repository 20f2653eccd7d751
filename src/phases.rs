//! Phase, size, memory, retry and strategy breakdowns
//!
//! These look past total time into the individual `SpawnMetrics` fields.
//! Most of them only consider executed spawns (not cache hits), since a cache
//! hit spends no time queueing, setting up or running.

use crate::record::SpawnExec;
use indexmap::IndexMap;
use std::time::Duration;

/// Per-phase timings of one executed spawn
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTimings<'a> {
    pub spawn: &'a SpawnExec,
    pub total: Duration,
    pub queue: Duration,
    pub setup: Duration,
    pub upload: Duration,
    pub execution: Duration,
    pub fetch: Duration,
}

impl PhaseTimings<'_> {
    /// Share of total time not spent executing, as a percentage
    pub fn overhead_pct(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        self.total.saturating_sub(self.execution).as_secs_f64() / self.total.as_secs_f64() * 100.0
    }
}

fn executed(spawns: &[SpawnExec]) -> impl Iterator<Item = &SpawnExec> {
    spawns.iter().filter(|s| !s.cache_hit)
}

/// The `n` slowest executed spawns with their phase timings
pub fn phase_breakdown(spawns: &[SpawnExec], n: usize) -> Vec<PhaseTimings<'_>> {
    let mut sorted: Vec<&SpawnExec> = executed(spawns).collect();
    sorted.sort_by(|a, b| b.total_time().cmp(&a.total_time()));

    sorted
        .into_iter()
        .take(n)
        .map(|spawn| PhaseTimings {
            spawn,
            total: spawn.total_time(),
            queue: spawn.queue_time(),
            setup: spawn.setup_time(),
            upload: spawn.upload_time(),
            execution: spawn.execution_wall_time(),
            fetch: spawn.fetch_time(),
        })
        .collect()
}

/// Phase totals over all executed spawns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatePhases {
    pub executed_count: u64,
    pub total: Duration,
    pub queue: Duration,
    pub setup: Duration,
    pub upload: Duration,
    pub execution: Duration,
    pub fetch: Duration,
    pub retry: Duration,
}

impl AggregatePhases {
    /// `(name, time, percentage of total)` per phase, in pipeline order
    pub fn rows(&self) -> [(&'static str, Duration, f64); 6] {
        let pct = |d: Duration| {
            if self.total.is_zero() {
                0.0
            } else {
                d.as_secs_f64() / self.total.as_secs_f64() * 100.0
            }
        };
        [
            ("Queue", self.queue, pct(self.queue)),
            ("Setup", self.setup, pct(self.setup)),
            ("Upload", self.upload, pct(self.upload)),
            ("Execution", self.execution, pct(self.execution)),
            ("Fetch", self.fetch, pct(self.fetch)),
            ("Retry", self.retry, pct(self.retry)),
        ]
    }
}

pub fn aggregate_phases(spawns: &[SpawnExec]) -> AggregatePhases {
    executed(spawns).fold(AggregatePhases::default(), |mut acc, spawn| {
        acc.executed_count += 1;
        acc.total = acc.total.saturating_add(spawn.total_time());
        acc.queue = acc.queue.saturating_add(spawn.queue_time());
        acc.setup = acc.setup.saturating_add(spawn.setup_time());
        acc.upload = acc.upload.saturating_add(spawn.upload_time());
        acc.execution = acc.execution.saturating_add(spawn.execution_wall_time());
        acc.fetch = acc.fetch.saturating_add(spawn.fetch_time());
        acc.retry = acc.retry.saturating_add(spawn.retry_time());
        acc
    })
}

/// A spawn paired with the size it is ranked by
#[derive(Debug, Clone, PartialEq)]
pub struct SizedSpawn<'a> {
    pub spawn: &'a SpawnExec,
    pub bytes: u64,
    pub files: u64,
}

fn largest_first(mut sized: Vec<SizedSpawn<'_>>, n: usize) -> Vec<SizedSpawn<'_>> {
    sized.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    sized.truncate(n);
    sized
}

/// The `n` spawns with the largest declared input size
pub fn largest_inputs(spawns: &[SpawnExec], n: usize) -> Vec<SizedSpawn<'_>> {
    let sized = spawns
        .iter()
        .filter_map(|spawn| {
            let metrics = spawn.metrics.as_ref()?;
            let bytes = u64::try_from(metrics.input_bytes).ok().filter(|&b| b > 0)?;
            Some(SizedSpawn {
                spawn,
                bytes,
                files: u64::try_from(metrics.input_files).unwrap_or(0),
            })
        })
        .collect();
    largest_first(sized, n)
}

/// The `n` spawns with the largest total output digest size
pub fn largest_outputs(spawns: &[SpawnExec], n: usize) -> Vec<SizedSpawn<'_>> {
    let sized = spawns
        .iter()
        .filter_map(|spawn| {
            let bytes = spawn.output_bytes();
            (bytes > 0).then(|| SizedSpawn {
                spawn,
                bytes,
                files: spawn.actual_outputs.len() as u64,
            })
        })
        .collect();
    largest_first(sized, n)
}

/// Estimated memory against the declared limit
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryUsage<'a> {
    pub spawn: &'a SpawnExec,
    pub estimate_bytes: u64,
    pub limit_bytes: u64,
}

impl MemoryUsage<'_> {
    pub fn usage_ratio(&self) -> f64 {
        self.estimate_bytes as f64 / self.limit_bytes as f64
    }
}

/// The `n` spawns closest to (or furthest over) their memory limit
pub fn memory_pressure(spawns: &[SpawnExec], n: usize) -> Vec<MemoryUsage<'_>> {
    let mut usage: Vec<MemoryUsage<'_>> = spawns
        .iter()
        .filter_map(|spawn| {
            let metrics = spawn.metrics.as_ref()?;
            let limit_bytes = u64::try_from(metrics.memory_bytes_limit)
                .ok()
                .filter(|&l| l > 0)?;
            Some(MemoryUsage {
                spawn,
                estimate_bytes: u64::try_from(metrics.memory_estimate_bytes).unwrap_or(0),
                limit_bytes,
            })
        })
        .collect();

    usage.sort_by(|a, b| b.usage_ratio().total_cmp(&a.usage_ratio()));
    usage.truncate(n);
    usage
}

/// A spawn that failed or spent time in retries
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSpawn<'a> {
    pub spawn: &'a SpawnExec,
    pub retry_time: Duration,
}

impl ProblemSpawn<'_> {
    pub fn failed(&self) -> bool {
        !self.spawn.status.is_empty()
    }
}

/// Spawns with a non-empty status or any retry time, in log order
pub fn failures_and_retries(spawns: &[SpawnExec]) -> Vec<ProblemSpawn<'_>> {
    spawns
        .iter()
        .map(|spawn| ProblemSpawn {
            spawn,
            retry_time: spawn.retry_time(),
        })
        .filter(|p| p.failed() || !p.retry_time.is_zero())
        .collect()
}

/// Count and summed execution time for one strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionTimings {
    pub count: u64,
    pub total_duration: Duration,
}

impl ExecutionTimings {
    fn add(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration = self.total_duration.saturating_add(duration);
    }

    pub fn avg_secs(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_duration.as_secs_f64() / self.count as f64
    }
}

/// Remote against local execution for one mnemonic
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyComparison {
    pub mnemonic: String,
    pub remote: ExecutionTimings,
    pub local: ExecutionTimings,
}

impl StrategyComparison {
    /// Remote average over local average; `None` when local averages zero
    pub fn remote_to_local_ratio(&self) -> Option<f64> {
        let local = self.local.avg_secs();
        (local > 0.0).then(|| self.remote.avg_secs() / local)
    }
}

/// Mnemonics executed both remotely and locally, sorted by name
///
/// Only executed spawns that report an execution wall time are counted. A
/// runner containing "remote" is remote; one containing "sandbox" or "local"
/// is local; anything else (e.g. "worker") is left out.
pub fn execution_comparison(spawns: &[SpawnExec]) -> Vec<StrategyComparison> {
    let mut by_mnemonic: IndexMap<&str, (ExecutionTimings, ExecutionTimings)> = IndexMap::new();

    for spawn in executed(spawns) {
        let Some(wall) = spawn
            .metrics
            .as_ref()
            .and_then(|m| m.execution_wall_time.as_ref())
        else {
            continue;
        };
        let duration = wall.to_std();
        let entry = by_mnemonic.entry(spawn.mnemonic.as_str()).or_default();

        if spawn.runner.contains("remote") {
            entry.0.add(duration);
        } else if spawn.runner.contains("sandbox") || spawn.runner.contains("local") {
            entry.1.add(duration);
        }
    }

    let mut comparisons: Vec<StrategyComparison> = by_mnemonic
        .into_iter()
        .filter(|(_, (remote, local))| remote.count > 0 && local.count > 0)
        .map(|(mnemonic, (remote, local))| StrategyComparison {
            mnemonic: mnemonic.to_string(),
            remote,
            local,
        })
        .collect();
    comparisons.sort_by(|a, b| a.mnemonic.cmp(&b.mnemonic));
    comparisons
}

/// The `n` executed spawns that waited longest in the queue
pub fn queue_hotspots(spawns: &[SpawnExec], n: usize) -> Vec<&SpawnExec> {
    let mut sorted: Vec<&SpawnExec> = executed(spawns).collect();
    sorted.sort_by(|a, b| b.queue_time().cmp(&a.queue_time()));
    sorted.truncate(n);
    sorted
}
