//! JSON report format
//!
//! Carries the same results as the text report in a stable shape for
//! scripts. Times are seconds as floats, sizes are raw bytes.

use crate::analyze::Analysis;
use crate::phases;
use crate::ranking;
use crate::record::SpawnExec;
use crate::report::ReportOptions;
use serde::{Deserialize, Serialize};

/// Overall totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_actions: u64,
    pub cache_hits: u64,
    /// Cache hits as a percentage of all actions
    pub cache_hit_rate: f64,
}

/// One spawn in a ranked list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonAction {
    pub mnemonic: String,
    pub target_label: String,
    pub runner: String,
    pub cache_hit: bool,
    pub total_time_secs: f64,
}

impl From<&SpawnExec> for JsonAction {
    fn from(spawn: &SpawnExec) -> Self {
        Self {
            mnemonic: spawn.mnemonic.clone(),
            target_label: spawn.target_label.clone(),
            runner: spawn.runner.clone(),
            cache_hit: spawn.cache_hit,
            total_time_secs: spawn.total_time().as_secs_f64(),
        }
    }
}

/// One row of the per-mnemonic table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMnemonic {
    pub mnemonic: String,
    pub count: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub total_time_secs: f64,
    pub avg_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCachePerformance {
    pub remote_cache_hit_count: u64,
    pub total_bytes_downloaded: u64,
    pub total_fetch_time_secs: f64,
    /// Absent when the fetch time is too small to derive a rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_rate_mbps: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPhaseTimings {
    pub target_label: String,
    pub total_secs: f64,
    pub queue_secs: f64,
    pub setup_secs: f64,
    pub upload_secs: f64,
    pub execution_secs: f64,
    pub fetch_secs: f64,
    pub overhead_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPhaseShare {
    pub phase: String,
    pub time_secs: f64,
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonAggregatePhases {
    pub executed_actions: u64,
    pub total_time_secs: f64,
    pub phases: Vec<JsonPhaseShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSized {
    pub target_label: String,
    pub bytes: u64,
    pub files: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMemory {
    pub target_label: String,
    pub estimate_bytes: u64,
    pub limit_bytes: u64,
    pub usage_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonProblem {
    pub target_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub exit_code: i32,
    pub retry_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonStrategyComparison {
    pub mnemonic: String,
    pub remote_count: u64,
    pub remote_avg_secs: f64,
    pub local_count: u64,
    pub local_avg_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_to_local_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonQueueEntry {
    pub target_label: String,
    pub queue_time_secs: f64,
    pub total_time_secs: f64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    /// Tool version that produced the report
    pub version: String,
    /// Format name
    pub format: String,
    pub summary: JsonSummary,
    pub slowest_actions: Vec<JsonAction>,
    pub mnemonics: Vec<JsonMnemonic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_performance: Option<JsonCachePerformance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_timings: Option<Vec<JsonPhaseTimings>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_phases: Option<JsonAggregatePhases>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_inputs: Option<Vec<JsonSized>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_outputs: Option<Vec<JsonSized>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_pressure: Option<Vec<JsonMemory>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures_and_retries: Option<Vec<JsonProblem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_comparison: Option<Vec<JsonStrategyComparison>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_hotspots: Option<Vec<JsonQueueEntry>>,
}

fn sized(rows: Vec<phases::SizedSpawn<'_>>) -> Vec<JsonSized> {
    rows.into_iter()
        .map(|r| JsonSized {
            target_label: r.spawn.target_label.clone(),
            bytes: r.bytes,
            files: r.files,
        })
        .collect()
}

impl JsonReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "execlog-json-v1".to_string(),
            summary: JsonSummary {
                total_actions: 0,
                cache_hits: 0,
                cache_hit_rate: 0.0,
            },
            slowest_actions: Vec::new(),
            mnemonics: Vec::new(),
            cache_performance: None,
            phase_timings: None,
            aggregate_phases: None,
            largest_inputs: None,
            largest_outputs: None,
            memory_pressure: None,
            failures_and_retries: None,
            execution_comparison: None,
            queue_hotspots: None,
        }
    }

    /// Build the report, filling only the sections `options` enables
    pub fn from_analysis(analysis: &Analysis<'_>, options: &ReportOptions) -> Self {
        let spawns = analysis.spawns;
        let top_n = options.top_n;
        let totals = analysis.stats.totals();

        let mut report = Self::new();
        report.summary = JsonSummary {
            total_actions: totals.total_actions,
            cache_hits: totals.cache_hits,
            cache_hit_rate: totals.cache_hit_rate(),
        };
        report.slowest_actions = ranking::top_n(spawns, top_n)
            .into_iter()
            .map(JsonAction::from)
            .collect();
        report.mnemonics = ranking::mnemonics_by_total_time(&analysis.stats)
            .into_iter()
            .map(|(name, m)| JsonMnemonic {
                mnemonic: name.to_string(),
                count: m.count,
                cache_hits: m.cache_hits,
                cache_hit_rate: m.cache_hit_rate(),
                total_time_secs: m.total_duration.as_secs_f64(),
                avg_time_secs: m.avg_duration().as_secs_f64(),
            })
            .collect();

        if options.cache_metrics {
            let cache = &analysis.cache;
            report.cache_performance = Some(JsonCachePerformance {
                remote_cache_hit_count: cache.remote_cache_hit_count,
                total_bytes_downloaded: cache.total_bytes_downloaded,
                total_fetch_time_secs: cache.total_fetch_time.as_secs_f64(),
                download_rate_mbps: cache.download_rate_mbps(),
            });
        }

        if options.phase_timings {
            report.phase_timings = Some(
                phases::phase_breakdown(spawns, top_n)
                    .iter()
                    .map(|t| JsonPhaseTimings {
                        target_label: t.spawn.target_label.clone(),
                        total_secs: t.total.as_secs_f64(),
                        queue_secs: t.queue.as_secs_f64(),
                        setup_secs: t.setup.as_secs_f64(),
                        upload_secs: t.upload.as_secs_f64(),
                        execution_secs: t.execution.as_secs_f64(),
                        fetch_secs: t.fetch.as_secs_f64(),
                        overhead_pct: t.overhead_pct(),
                    })
                    .collect(),
            );
        }

        if options.aggregate_phases {
            let totals = phases::aggregate_phases(spawns);
            report.aggregate_phases = Some(JsonAggregatePhases {
                executed_actions: totals.executed_count,
                total_time_secs: totals.total.as_secs_f64(),
                phases: totals
                    .rows()
                    .into_iter()
                    .map(|(name, time, pct)| JsonPhaseShare {
                        phase: name.to_string(),
                        time_secs: time.as_secs_f64(),
                        percent_of_total: pct,
                    })
                    .collect(),
            });
        }

        if options.input_analysis {
            report.largest_inputs = Some(sized(phases::largest_inputs(spawns, top_n)));
        }
        if options.output_analysis {
            report.largest_outputs = Some(sized(phases::largest_outputs(spawns, top_n)));
        }

        if options.memory_analysis {
            report.memory_pressure = Some(
                phases::memory_pressure(spawns, top_n)
                    .iter()
                    .map(|m| JsonMemory {
                        target_label: m.spawn.target_label.clone(),
                        estimate_bytes: m.estimate_bytes,
                        limit_bytes: m.limit_bytes,
                        usage_ratio: m.usage_ratio(),
                    })
                    .collect(),
            );
        }

        if options.retries {
            report.failures_and_retries = Some(
                phases::failures_and_retries(spawns)
                    .iter()
                    .map(|p| JsonProblem {
                        target_label: p.spawn.target_label.clone(),
                        status: p.failed().then(|| p.spawn.status.clone()),
                        exit_code: p.spawn.exit_code,
                        retry_time_secs: p.retry_time.as_secs_f64(),
                    })
                    .collect(),
            );
        }

        if options.execution_comparison {
            report.execution_comparison = Some(
                phases::execution_comparison(spawns)
                    .iter()
                    .map(|c| JsonStrategyComparison {
                        mnemonic: c.mnemonic.clone(),
                        remote_count: c.remote.count,
                        remote_avg_secs: c.remote.avg_secs(),
                        local_count: c.local.count,
                        local_avg_secs: c.local.avg_secs(),
                        remote_to_local_ratio: c.remote_to_local_ratio(),
                    })
                    .collect(),
            );
        }

        if options.queue_analysis {
            report.queue_hotspots = Some(
                phases::queue_hotspots(spawns, top_n)
                    .into_iter()
                    .map(|s| JsonQueueEntry {
                        target_label: s.target_label.clone(),
                        queue_time_secs: s.queue_time().as_secs_f64(),
                        total_time_secs: s.total_time().as_secs_f64(),
                    })
                    .collect(),
            );
        }

        report
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonReport {
    fn default() -> Self {
        Self::new()
    }
}
