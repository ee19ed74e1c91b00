//! CLI argument parsing for faultlens

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "faultlens")]
#[command(version)]
#[command(
    about = "Correlate kernel signals with request spans and attribute SLO faults",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the correlation matcher against labeled span/signal pairs
    CorrelationEval(CorrelationEvalArgs),
    /// Attribute fault samples to fault domains
    Attribute(AttributeArgs),
    /// Enrich one span with candidate kernel signals
    Enrich(EnrichArgs),
}

#[derive(clap::Args, Debug)]
pub struct CorrelationEvalArgs {
    /// JSONL file of labeled pairs
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Write the evaluation summary as JSON
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Write per-case predictions as CSV
    #[arg(long = "predictions-out", value_name = "FILE")]
    pub predictions_out: Option<PathBuf>,

    /// Correlation window in milliseconds (overrides config)
    #[arg(long = "window-ms", value_name = "MS")]
    pub window_ms: Option<u64>,

    /// Confidence a match needs to count as predicted (overrides config)
    #[arg(long, value_name = "CONFIDENCE")]
    pub threshold: Option<f64>,

    /// Required precision for the gate (overrides config)
    #[arg(long = "min-precision", value_name = "RATIO")]
    pub min_precision: Option<f64>,

    /// Required recall for the gate (overrides config)
    #[arg(long = "min-recall", value_name = "RATIO")]
    pub min_recall: Option<f64>,

    /// TOML engine configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct AttributeArgs {
    /// JSONL file of fault samples
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Attribution JSONL output ('-' for stdout)
    #[arg(long, value_name = "FILE", default_value = "-")]
    pub out: PathBuf,

    /// Write a run summary as JSON
    #[arg(long = "summary-out", value_name = "FILE")]
    pub summary_out: Option<PathBuf>,

    /// Write the confusion matrix as CSV
    #[arg(long = "confusion-out", value_name = "FILE")]
    pub confusion_out: Option<PathBuf>,

    /// Attribution mode: bayes or rule (overrides config)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// TOML engine configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct EnrichArgs {
    /// JSON file holding one span
    #[arg(long, value_name = "FILE")]
    pub span: PathBuf,

    /// JSONL file of candidate signals
    #[arg(long, value_name = "FILE")]
    pub signals: PathBuf,

    /// TOML engine configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_correlation_eval_minimal() {
        let cli = Cli::parse_from(["faultlens", "correlation-eval", "--input", "pairs.jsonl"]);
        assert!(!cli.debug);
        let Command::CorrelationEval(args) = cli.command else {
            panic!("expected correlation-eval");
        };
        assert_eq!(args.input, PathBuf::from("pairs.jsonl"));
        assert!(args.out.is_none());
        assert!(args.window_ms.is_none());
        assert!(args.threshold.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_cli_correlation_eval_overrides() {
        let cli = Cli::parse_from([
            "faultlens",
            "correlation-eval",
            "--input",
            "pairs.jsonl",
            "--out",
            "summary.json",
            "--predictions-out",
            "predictions.csv",
            "--window-ms",
            "500",
            "--threshold",
            "0.8",
            "--min-precision",
            "0.95",
            "--min-recall",
            "0.5",
        ]);
        let Command::CorrelationEval(args) = cli.command else {
            panic!("expected correlation-eval");
        };
        assert_eq!(args.window_ms, Some(500));
        assert_eq!(args.threshold, Some(0.8));
        assert_eq!(args.min_precision, Some(0.95));
        assert_eq!(args.min_recall, Some(0.5));
        assert_eq!(args.predictions_out, Some(PathBuf::from("predictions.csv")));
    }

    #[test]
    fn test_cli_attribute_defaults_to_stdout() {
        let cli = Cli::parse_from(["faultlens", "attribute", "--input", "samples.jsonl"]);
        let Command::Attribute(args) = cli.command else {
            panic!("expected attribute");
        };
        assert_eq!(args.out, PathBuf::from("-"));
        assert!(args.mode.is_none());
        assert!(args.summary_out.is_none());
        assert!(args.confusion_out.is_none());
    }

    #[test]
    fn test_cli_attribute_mode() {
        let cli = Cli::parse_from([
            "faultlens",
            "attribute",
            "--input",
            "samples.jsonl",
            "--mode",
            "rule",
        ]);
        let Command::Attribute(args) = cli.command else {
            panic!("expected attribute");
        };
        assert_eq!(args.mode.as_deref(), Some("rule"));
    }

    #[test]
    fn test_cli_debug_is_global() {
        let cli = Cli::parse_from([
            "faultlens",
            "enrich",
            "--span",
            "span.json",
            "--signals",
            "signals.jsonl",
            "--debug",
        ]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Enrich(_)));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["faultlens"]).is_err());
    }

    #[test]
    fn test_cli_requires_input() {
        assert!(Cli::try_parse_from(["faultlens", "attribute"]).is_err());
    }
}
