//! Plain-text report
//!
//! Tables are sized from the rows they show, so wide mnemonics or long
//! durations never break the column alignment.

use crate::analyze::Analysis;
use crate::cache_perf::CachePerformanceSummary;
use crate::phases;
use crate::ranking;
use std::fmt::{self, Write};

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Which sections to render, and how many rows per ranked table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_n: usize,
    pub cache_metrics: bool,
    pub phase_timings: bool,
    pub aggregate_phases: bool,
    pub input_analysis: bool,
    pub output_analysis: bool,
    pub memory_analysis: bool,
    pub retries: bool,
    pub execution_comparison: bool,
    pub queue_analysis: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            cache_metrics: true,
            phase_timings: false,
            aggregate_phases: false,
            input_analysis: false,
            output_analysis: false,
            memory_analysis: false,
            retries: false,
            execution_comparison: false,
            queue_analysis: false,
        }
    }
}

/// Width of a column: the widest cell, never narrower than the header
fn column_width<I>(header: &str, cells: I) -> usize
where
    I: IntoIterator<Item = String>,
{
    cells
        .into_iter()
        .map(|cell| cell.len())
        .max()
        .unwrap_or(0)
        .max(header.len())
}

fn secs(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64()
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

/// Render the full text report for a non-empty log
pub fn render_text(
    analysis: &Analysis<'_>,
    options: &ReportOptions,
    log_file: &str,
) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "========================================")?;
    writeln!(out, " Bazel Execution Log Analysis Report")?;
    writeln!(out, "========================================")?;
    writeln!(out, "Log file: {}", log_file)?;
    writeln!(out)?;

    write_summary(&mut out, analysis)?;
    write_slowest(&mut out, analysis, options.top_n)?;
    write_mnemonics(&mut out, analysis)?;

    if options.cache_metrics {
        write_cache_performance(&mut out, &analysis.cache)?;
    }
    if options.phase_timings {
        write_phase_timings(&mut out, analysis, options.top_n)?;
    }
    if options.aggregate_phases {
        write_aggregate_phases(&mut out, analysis)?;
    }
    if options.input_analysis {
        write_input_sizes(&mut out, analysis, options.top_n)?;
    }
    if options.output_analysis {
        write_output_sizes(&mut out, analysis, options.top_n)?;
    }
    if options.memory_analysis {
        write_memory(&mut out, analysis, options.top_n)?;
    }
    if options.retries {
        write_failures(&mut out, analysis)?;
    }
    if options.execution_comparison {
        write_execution_comparison(&mut out, analysis)?;
    }
    if options.queue_analysis {
        write_queue(&mut out, analysis, options.top_n)?;
    }

    Ok(out)
}

fn write_summary(out: &mut String, analysis: &Analysis<'_>) -> fmt::Result {
    let totals = analysis.stats.totals();
    writeln!(out, "--- Overall Summary ---")?;
    writeln!(out, "Total Actions: {}", totals.total_actions)?;
    writeln!(
        out,
        "Cache Hits: {} ({:.2}%)",
        totals.cache_hits,
        totals.cache_hit_rate()
    )?;
    writeln!(out)
}

fn write_slowest(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    let rows = ranking::top_n(analysis.spawns, top_n);
    let time_width = column_width(
        "Time",
        rows.iter().map(|s| format!("{:.3}s", secs(s.total_time()))),
    );
    let mnemonic_width = column_width("Mnemonic", rows.iter().map(|s| s.mnemonic.clone()));

    writeln!(out, "--- Top {} Slowest Actions ---", top_n)?;
    writeln!(
        out,
        "{:<tw$} | {:<mw$} | Target",
        "Time",
        "Mnemonic",
        tw = time_width,
        mw = mnemonic_width
    )?;
    writeln!(out, "{}", "-".repeat(time_width + mnemonic_width + 12))?;
    for spawn in rows {
        writeln!(
            out,
            "{:<tw$} | {:<mw$} | {}",
            format!("{:.3}s", secs(spawn.total_time())),
            spawn.mnemonic,
            spawn.target_label,
            tw = time_width,
            mw = mnemonic_width
        )?;
    }
    writeln!(out)
}

fn write_mnemonics(out: &mut String, analysis: &Analysis<'_>) -> fmt::Result {
    let rows = ranking::mnemonics_by_total_time(&analysis.stats);

    let name_width = column_width("Mnemonic", rows.iter().map(|(name, _)| name.to_string()));
    let count_width = column_width("Count", rows.iter().map(|(_, m)| m.count.to_string()));
    let hits_width = column_width(
        "Cache Hits",
        rows.iter().map(|(_, m)| format!("{:.1}%", m.cache_hit_rate())),
    );
    let total_width = column_width(
        "Total Time",
        rows.iter().map(|(_, m)| format!("{:.2}s", secs(m.total_duration))),
    );
    let avg_width = column_width(
        "Avg Time",
        rows.iter().map(|(_, m)| format!("{:.3}s", secs(m.avg_duration()))),
    );

    writeln!(out, "--- Analysis by Mnemonic ---")?;
    writeln!(
        out,
        "{:<w1$} | {:>w2$} | {:>w3$} | {:>w4$} | {:>w5$}",
        "Mnemonic",
        "Count",
        "Cache Hits",
        "Total Time",
        "Avg Time",
        w1 = name_width,
        w2 = count_width,
        w3 = hits_width,
        w4 = total_width,
        w5 = avg_width
    )?;
    writeln!(
        out,
        "{}",
        "-".repeat(name_width + count_width + hits_width + total_width + avg_width + 12)
    )?;
    for (name, metrics) in rows {
        writeln!(
            out,
            "{:<w1$} | {:>w2$} | {:>w3$} | {:>w4$} | {:>w5$}",
            name,
            metrics.count,
            format!("{:.1}%", metrics.cache_hit_rate()),
            format!("{:.2}s", secs(metrics.total_duration)),
            format!("{:.3}s", secs(metrics.avg_duration())),
            w1 = name_width,
            w2 = count_width,
            w3 = hits_width,
            w4 = total_width,
            w5 = avg_width
        )?;
    }
    writeln!(out)
}

fn write_cache_performance(out: &mut String, cache: &CachePerformanceSummary) -> fmt::Result {
    writeln!(out, "--- Remote Cache Performance ---")?;
    if cache.remote_cache_hit_count == 0 {
        writeln!(out, "No remote cache hits found in the log.")?;
        return writeln!(out);
    }

    writeln!(out, "Remote Cache Hits Count: {}", cache.remote_cache_hit_count)?;
    writeln!(out, "Total Data Downloaded: {:.2} MB", cache.total_mb_downloaded())?;
    writeln!(
        out,
        "Total Time Fetching from Cache: {:.2}s",
        secs(cache.total_fetch_time)
    )?;
    match cache.download_rate_mbps() {
        Some(rate) => writeln!(out, "Average Download Rate: {:.2} MB/s", rate)?,
        None => writeln!(
            out,
            "Average Download Rate: N/A (total fetch time is negligible)"
        )?,
    }
    writeln!(out)
}

fn write_phase_timings(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    writeln!(out, "--- Top {} Slowest Actions (Phase Timings) ---", top_n)?;
    writeln!(out, "Cache hits are excluded; they have no execution phases.")?;

    let rows = phases::phase_breakdown(analysis.spawns, top_n);
    if rows.is_empty() {
        writeln!(out, "No executed actions found (all were cache hits).")?;
        return writeln!(out);
    }

    let headers = ["Total", "Queue", "Setup", "Upload", "Execute", "Fetch"];
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|r| {
            [r.total, r.queue, r.setup, r.upload, r.execution, r.fetch]
                .map(|d| format!("{:.2}s", secs(d)))
        })
        .collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| column_width(header, cells.iter().map(|row| row[i].clone())))
        .collect();

    for (header, width) in headers.iter().zip(&widths) {
        write!(out, "{:>width$} | ", header, width = *width)?;
    }
    writeln!(out, "Target")?;
    writeln!(out, "{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len() + 6))?;

    for (row, timings) in cells.iter().zip(&rows) {
        for (cell, width) in row.iter().zip(&widths) {
            write!(out, "{:>width$} | ", cell, width = *width)?;
        }
        writeln!(out, "{}", timings.spawn.target_label)?;
        writeln!(out, "  └ Overhead: {:.1}%", timings.overhead_pct())?;
    }
    writeln!(out)
}

fn write_aggregate_phases(out: &mut String, analysis: &Analysis<'_>) -> fmt::Result {
    writeln!(out, "--- Aggregate Phase Timings (Executed Actions) ---")?;

    let totals = phases::aggregate_phases(analysis.spawns);
    if totals.executed_count == 0 {
        writeln!(out, "No executed actions found (all were cache hits).")?;
        return writeln!(out);
    }

    writeln!(out, "Executed Actions: {}", totals.executed_count)?;
    writeln!(out, "Total Execution Time: {:.2}s", secs(totals.total))?;
    writeln!(out)?;
    writeln!(out, "{:<15} | {:>11} | {:>10}", "Phase", "Time", "% of Total")?;
    writeln!(out, "{}", "-".repeat(42))?;
    for (name, duration, pct) in totals.rows() {
        writeln!(
            out,
            "{:<15} | {:>11} | {:>10}",
            name,
            format!("{:.2}s", secs(duration)),
            format!("{:.1}%", pct)
        )?;
    }
    writeln!(out)
}

fn write_sized(
    out: &mut String,
    rows: &[phases::SizedSpawn<'_>],
    size_header: &str,
    files_header: &str,
) -> fmt::Result {
    let size_width = column_width(
        size_header,
        rows.iter().map(|r| format!("{:.2}MB", mib(r.bytes))),
    );
    let files_width = column_width(files_header, rows.iter().map(|r| r.files.to_string()));

    writeln!(
        out,
        "{:>sw$} | {:>fw$} | Target",
        size_header,
        files_header,
        sw = size_width,
        fw = files_width
    )?;
    writeln!(out, "{}", "-".repeat(size_width + files_width + 12))?;
    for row in rows {
        writeln!(
            out,
            "{:>sw$} | {:>fw$} | {}",
            format!("{:.2}MB", mib(row.bytes)),
            row.files,
            row.spawn.target_label,
            sw = size_width,
            fw = files_width
        )?;
    }
    writeln!(out)
}

fn write_input_sizes(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    writeln!(out, "--- Top {} Actions by Input Size ---", top_n)?;
    let rows = phases::largest_inputs(analysis.spawns, top_n);
    if rows.is_empty() {
        writeln!(out, "No actions with input size data found in the log.")?;
        return writeln!(out);
    }
    write_sized(out, &rows, "Input Size", "Input Files")
}

fn write_output_sizes(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    writeln!(out, "--- Top {} Actions by Output Size ---", top_n)?;
    let rows = phases::largest_outputs(analysis.spawns, top_n);
    if rows.is_empty() {
        writeln!(out, "No actions with output size data found in the log.")?;
        return writeln!(out);
    }
    write_sized(out, &rows, "Output Size", "Output Files")
}

fn write_memory(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    writeln!(out, "--- Top {} Actions by Memory Usage vs. Limit ---", top_n)?;
    let rows = phases::memory_pressure(analysis.spawns, top_n);
    if rows.is_empty() {
        writeln!(out, "No actions with memory limit data found in the log.")?;
        return writeln!(out);
    }

    let used_width = column_width(
        "Memory Used",
        rows.iter().map(|r| format!("{:.1}MB", mib(r.estimate_bytes))),
    );
    let limit_width = column_width(
        "Memory Limit",
        rows.iter().map(|r| format!("{:.1}MB", mib(r.limit_bytes))),
    );
    let usage_width = column_width(
        "Usage %",
        rows.iter().map(|r| format!("{:.1}%", r.usage_ratio() * 100.0)),
    );

    writeln!(
        out,
        "{:>w1$} | {:>w2$} | {:>w3$} | Target",
        "Memory Used",
        "Memory Limit",
        "Usage %",
        w1 = used_width,
        w2 = limit_width,
        w3 = usage_width
    )?;
    writeln!(out, "{}", "-".repeat(used_width + limit_width + usage_width + 15))?;
    for row in &rows {
        writeln!(
            out,
            "{:>w1$} | {:>w2$} | {:>w3$} | {}",
            format!("{:.1}MB", mib(row.estimate_bytes)),
            format!("{:.1}MB", mib(row.limit_bytes)),
            format!("{:.1}%", row.usage_ratio() * 100.0),
            row.spawn.target_label,
            w1 = used_width,
            w2 = limit_width,
            w3 = usage_width
        )?;
    }
    writeln!(out)
}

fn write_failures(out: &mut String, analysis: &Analysis<'_>) -> fmt::Result {
    writeln!(out, "--- Actions with Failures or Retries ---")?;
    let problems = phases::failures_and_retries(analysis.spawns);
    if problems.is_empty() {
        writeln!(out, "No actions with failures or retries found.")?;
        return writeln!(out);
    }

    for problem in &problems {
        writeln!(out, "Target: {}", problem.spawn.target_label)?;
        if problem.failed() {
            writeln!(
                out,
                "  └ Status: {} (Exit Code: {})",
                problem.spawn.status, problem.spawn.exit_code
            )?;
        }
        if !problem.retry_time.is_zero() {
            writeln!(out, "  └ Time in Retries: {:.3}s", secs(problem.retry_time))?;
        }
    }
    writeln!(out)
}

fn difference_text(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r > 1.0 => format!("{:.1}x slower", r),
        Some(r) if r > 0.0 && r < 1.0 => format!("{:.1}x faster", 1.0 / r),
        _ => "N/A".to_string(),
    }
}

fn write_execution_comparison(out: &mut String, analysis: &Analysis<'_>) -> fmt::Result {
    writeln!(out, "--- Remote vs. Local Execution Time Comparison ---")?;
    let rows = phases::execution_comparison(analysis.spawns);
    if rows.is_empty() {
        writeln!(out, "No mnemonics found with both remote and local executions.")?;
        return writeln!(out);
    }

    let name_width = column_width("Mnemonic", rows.iter().map(|r| r.mnemonic.clone()));
    writeln!(
        out,
        "{:<nw$} | {:>8} | {:>10} | {:>8} | {:>10} | {:>12}",
        "Mnemonic",
        "Remote",
        "Avg Time",
        "Local",
        "Avg Time",
        "Difference",
        nw = name_width
    )?;
    writeln!(out, "{}", "-".repeat(name_width + 63))?;
    for row in &rows {
        writeln!(
            out,
            "{:<nw$} | {:>8} | {:>10} | {:>8} | {:>10} | {:>12}",
            row.mnemonic,
            row.remote.count,
            format!("{:.3}s", row.remote.avg_secs()),
            row.local.count,
            format!("{:.3}s", row.local.avg_secs()),
            difference_text(row.remote_to_local_ratio()),
            nw = name_width
        )?;
    }
    writeln!(out)
}

fn write_queue(out: &mut String, analysis: &Analysis<'_>, top_n: usize) -> fmt::Result {
    writeln!(out, "--- Top {} Actions by Queue Time ---", top_n)?;
    let rows = phases::queue_hotspots(analysis.spawns, top_n);
    if rows.is_empty() {
        writeln!(out, "No executed actions found (all were cache hits).")?;
        return writeln!(out);
    }

    let queue_width = column_width(
        "Queue Time",
        rows.iter().map(|s| format!("{:.2}s", secs(s.queue_time()))),
    );
    let total_width = column_width(
        "Total Time",
        rows.iter().map(|s| format!("{:.2}s", secs(s.total_time()))),
    );

    writeln!(
        out,
        "{:>qw$} | {:>tw$} | Target",
        "Queue Time",
        "Total Time",
        qw = queue_width,
        tw = total_width
    )?;
    writeln!(out, "{}", "-".repeat(queue_width + total_width + 12))?;
    for spawn in rows {
        writeln!(
            out,
            "{:>qw$} | {:>tw$} | {}",
            format!("{:.2}s", secs(spawn.queue_time())),
            format!("{:.2}s", secs(spawn.total_time())),
            spawn.target_label,
            qw = queue_width,
            tw = total_width
        )?;
    }
    writeln!(out)
}
