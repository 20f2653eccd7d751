//! End-to-end analysis of one execution log
//!
//! Read the whole file, pick a decoder, fold the records once, and hand the
//! results to the text or JSON renderer. Nothing is kept between runs.

use crate::binary_log;
use crate::cache_perf::CachePerformanceSummary;
use crate::cli::{Cli, LogFormat, OutputFormat};
use crate::compact_log;
use crate::error::Result as DecodeResult;
use crate::json_log;
use crate::json_output::JsonReport;
use crate::record::SpawnExec;
use crate::report::{self, ReportOptions};
use crate::stats::StatsTracker;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Message shown when a log decodes to zero records
pub const EMPTY_LOG_MESSAGE: &str =
    "Execution log is empty or could not be parsed. No metrics to report.";

/// Settings for one analysis run
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub file: PathBuf,
    /// Explicit log format; detected from the file extension when `None`
    pub format: Option<LogFormat>,
    pub output: OutputFormat,
    pub report: ReportOptions,
}

impl From<Cli> for AnalyzeConfig {
    fn from(cli: Cli) -> Self {
        let report = ReportOptions {
            top_n: cli.top_n,
            cache_metrics: !cli.no_cache_metrics,
            phase_timings: cli.phase_timings,
            aggregate_phases: cli.aggregate_phases,
            input_analysis: cli.input_analysis,
            output_analysis: cli.output_analysis,
            memory_analysis: cli.memory_analysis,
            retries: cli.retries,
            execution_comparison: cli.execution_comparison,
            queue_analysis: cli.queue_analysis,
        };
        Self {
            file: cli.file,
            format: cli.format,
            output: cli.output,
            report,
        }
    }
}

/// Resolve the decoder: an explicit choice wins, otherwise `.json` means JSON
pub fn resolve_format(explicit: Option<LogFormat>, path: &Path) -> LogFormat {
    explicit.unwrap_or_else(|| {
        if path.extension().is_some_and(|ext| ext == "json") {
            LogFormat::Json
        } else {
            LogFormat::Binary
        }
    })
}

/// Decode a whole log buffer with the chosen decoder
///
/// Binary input that starts with a zstd frame is tried as a compact log
/// first and falls back to the verbose reader when that fails.
pub fn decode(format: LogFormat, content: &[u8]) -> DecodeResult<Vec<SpawnExec>> {
    match format {
        LogFormat::Binary if compact_log::is_zstd(content) => {
            match compact_log::decode_compressed(content) {
                Ok(spawns) => {
                    tracing::info!("detected zstd-compressed compact log");
                    Ok(spawns)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "not a compact log, falling back to binary");
                    binary_log::decode_log(content)
                }
            }
        }
        LogFormat::Binary => binary_log::decode_log(content),
        LogFormat::Compact => compact_log::decode_compressed(content),
        LogFormat::Json => json_log::decode_log(content),
    }
}

/// Everything derived from one decoded log
#[derive(Debug)]
pub struct Analysis<'a> {
    pub spawns: &'a [SpawnExec],
    pub stats: StatsTracker,
    pub cache: CachePerformanceSummary,
}

impl<'a> Analysis<'a> {
    pub fn new(spawns: &'a [SpawnExec]) -> Self {
        Self {
            spawns,
            stats: StatsTracker::from_spawns(spawns),
            cache: CachePerformanceSummary::from_spawns(spawns),
        }
    }
}

/// Run the analysis and return the rendered report
pub fn run(config: &AnalyzeConfig) -> Result<String> {
    let content = std::fs::read(&config.file)
        .with_context(|| format!("Failed to read file: {}", config.file.display()))?;

    let format = resolve_format(config.format, &config.file);
    tracing::debug!(?format, bytes = content.len(), "decoding execution log");

    let spawns = decode(format, &content).context("Failed to parse execution log")?;
    if spawns.is_empty() {
        return Ok(format!("{}\n", EMPTY_LOG_MESSAGE));
    }

    let analysis = Analysis::new(&spawns);
    match config.output {
        OutputFormat::Text => {
            let log_file = config.file.display().to_string();
            Ok(report::render_text(&analysis, &config.report, &log_file)?)
        }
        OutputFormat::Json => {
            let json = JsonReport::from_analysis(&analysis, &config.report).to_json()?;
            Ok(json + "\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert_eq!(resolve_format(None, Path::new("exec.json")), LogFormat::Json);
        assert_eq!(resolve_format(None, Path::new("exec.log")), LogFormat::Binary);
        assert_eq!(resolve_format(None, Path::new("exec")), LogFormat::Binary);
        assert_eq!(resolve_format(None, Path::new("exec.JSON")), LogFormat::Binary);
    }

    #[test]
    fn test_explicit_format_wins() {
        assert_eq!(
            resolve_format(Some(LogFormat::Binary), Path::new("exec.json")),
            LogFormat::Binary
        );
        assert_eq!(
            resolve_format(Some(LogFormat::Json), Path::new("exec.bin")),
            LogFormat::Json
        );
    }

    #[test]
    fn test_empty_input_for_both_formats() {
        assert!(decode(LogFormat::Binary, &[]).unwrap().is_empty());
        assert!(decode(LogFormat::Json, &[]).unwrap().is_empty());
    }

    fn compact_content(label: &str) -> Vec<u8> {
        use crate::compact_log::{Entry, ExecLogEntry, Spawn};
        let entry = ExecLogEntry {
            id: 0,
            r#type: Some(Entry::Spawn(Spawn {
                mnemonic: "Javac".to_string(),
                target_label: label.to_string(),
                ..Default::default()
            })),
        };
        let framed = compact_log::encode_log(&[entry]);
        zstd::stream::encode_all(&framed[..], 3).unwrap()
    }

    #[test]
    fn test_binary_detects_compact_log() {
        let spawns = decode(LogFormat::Binary, &compact_content("//java:lib")).unwrap();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].target_label, "//java:lib");
        assert_eq!(spawns[0].mnemonic, "Javac");
    }

    #[test]
    fn test_broken_zstd_falls_back_to_binary() {
        // zstd magic followed by a frame header with the reserved bit set
        let mut content = compact_log::ZSTD_MAGIC.to_vec();
        content.extend_from_slice(&[0xff; 6]);
        // read as verbose binary this is one truncated message
        assert!(decode(LogFormat::Binary, &content).unwrap().is_empty());
        assert!(matches!(
            decode(LogFormat::Compact, &content),
            Err(crate::DecodeError::Decompress { .. })
        ));
    }

    #[test]
    fn test_plain_binary_is_not_treated_as_compact() {
        let spawn = SpawnExec {
            target_label: "//a:b".to_string(),
            ..Default::default()
        };
        let content = binary_log::encode_log(&[spawn]);
        assert_eq!(decode(LogFormat::Binary, &content).unwrap()[0].target_label, "//a:b");
        assert!(decode(LogFormat::Compact, &content).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let config = AnalyzeConfig {
            file: PathBuf::from("/nonexistent/execution_log.bin"),
            format: None,
            output: OutputFormat::Text,
            report: ReportOptions::default(),
        };
        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
