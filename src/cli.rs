//! CLI argument parsing for execlog

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Encoding of the execution log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Length-delimited binary protobuf (`--execution_log_binary_file`)
    Binary,
    /// Protobuf JSON (`--execution_log_json_file`)
    Json,
    /// zstd-compressed compact log (`--execution_log_compact_file`)
    Compact,
}

/// Output format for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "execlog")]
#[command(version)]
#[command(about = "Analyze Bazel execution logs for slow actions and cache behaviour", long_about = None)]
pub struct Cli {
    /// Path to the execution log file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of slowest actions to show
    #[arg(short = 'n', long = "top-n", value_name = "N", default_value = "10")]
    pub top_n: usize,

    /// Log format; a `.json` extension selects json, anything else binary
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<LogFormat>,

    /// Skip the remote cache performance section
    #[arg(long = "no-cache-metrics")]
    pub no_cache_metrics: bool,

    /// Report format (text or json)
    #[arg(long = "output", value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Show queue/setup/upload/execute/fetch breakdown for the slowest executed actions
    #[arg(long = "phase-timings")]
    pub phase_timings: bool,

    /// Show phase totals across all executed actions
    #[arg(long = "aggregate-phases")]
    pub aggregate_phases: bool,

    /// Show actions with the largest inputs
    #[arg(long = "input-analysis")]
    pub input_analysis: bool,

    /// Show actions with the largest outputs
    #[arg(long = "output-analysis")]
    pub output_analysis: bool,

    /// Show actions closest to their memory limit
    #[arg(long = "memory-analysis")]
    pub memory_analysis: bool,

    /// Show failed actions and actions that were retried
    #[arg(long = "retries")]
    pub retries: bool,

    /// Compare remote and local execution time per mnemonic
    #[arg(long = "execution-comparison")]
    pub execution_comparison: bool,

    /// Show actions that waited longest in the queue
    #[arg(long = "queue-analysis")]
    pub queue_analysis: bool,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_file() {
        let cli = Cli::parse_from(["execlog", "exec.log"]);
        assert_eq!(cli.file, PathBuf::from("exec.log"));
    }

    #[test]
    fn test_cli_requires_file() {
        assert!(Cli::try_parse_from(["execlog"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["execlog", "exec.log"]);
        assert_eq!(cli.top_n, 10);
        assert_eq!(cli.format, None);
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.no_cache_metrics);
        assert!(!cli.phase_timings);
        assert!(!cli.queue_analysis);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_top_n_short_and_long() {
        let cli = Cli::parse_from(["execlog", "-n", "3", "exec.log"]);
        assert_eq!(cli.top_n, 3);
        let cli = Cli::parse_from(["execlog", "exec.log", "--top-n", "25"]);
        assert_eq!(cli.top_n, 25);
    }

    #[test]
    fn test_cli_top_n_rejects_negative() {
        assert!(Cli::try_parse_from(["execlog", "-n", "-1", "exec.log"]).is_err());
    }

    #[test]
    fn test_cli_format() {
        let cli = Cli::parse_from(["execlog", "-f", "json", "exec.log"]);
        assert_eq!(cli.format, Some(LogFormat::Json));
        let cli = Cli::parse_from(["execlog", "--format", "binary", "exec.json"]);
        assert_eq!(cli.format, Some(LogFormat::Binary));
        let cli = Cli::parse_from(["execlog", "--format", "compact", "exec.log"]);
        assert_eq!(cli.format, Some(LogFormat::Compact));
    }

    #[test]
    fn test_cli_invalid_format() {
        assert!(Cli::try_parse_from(["execlog", "--format", "xml", "exec.log"]).is_err());
    }

    #[test]
    fn test_cli_output_json() {
        let cli = Cli::parse_from(["execlog", "--output", "json", "exec.log"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_cli_section_flags() {
        let cli = Cli::parse_from([
            "execlog",
            "--no-cache-metrics",
            "--phase-timings",
            "--aggregate-phases",
            "--input-analysis",
            "--output-analysis",
            "--memory-analysis",
            "--retries",
            "--execution-comparison",
            "--queue-analysis",
            "--debug",
            "exec.log",
        ]);
        assert!(cli.no_cache_metrics);
        assert!(cli.phase_timings);
        assert!(cli.aggregate_phases);
        assert!(cli.input_analysis);
        assert!(cli.output_analysis);
        assert!(cli.memory_analysis);
        assert!(cli.retries);
        assert!(cli.execution_comparison);
        assert!(cli.queue_analysis);
        assert!(cli.debug);
    }
}
