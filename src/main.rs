use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use faultlens::attribution::{
    build_attributions, build_confusion_matrix, load_samples, AttributionMode,
    AttributionSummary,
};
use faultlens::cli::{AttributeArgs, Cli, Command, CorrelationEvalArgs, EnrichArgs};
use faultlens::config::EngineConfig;
use faultlens::correlation::{
    decompose_retrieval, evaluate_gate, evaluate_labeled_pairs, load_labeled_pairs, Attributes,
    SignalRef, SpanRef,
};
use faultlens::csv_output::{confusion_matrix_csv, PredictionsCsv};
use faultlens::jsonl;
use faultlens::signal::SignalKind;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_toml(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Write `content` to `path`, creating parent directories
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))
}

fn run_correlation_eval(args: CorrelationEvalArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let window = args
        .window_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.correlation_window());
    let threshold = args
        .threshold
        .unwrap_or(config.correlation.enrichment_threshold);
    let min_precision = args
        .min_precision
        .unwrap_or(config.evaluation.min_precision);
    let min_recall = args.min_recall.unwrap_or(config.evaluation.min_recall);

    let pairs = load_labeled_pairs(&args.input).context("Failed to load labeled pairs")?;
    let (report, predictions) = evaluate_labeled_pairs(&pairs, window, threshold);
    let gate = evaluate_gate(&report, min_precision, min_recall);
    let report = report.with_gate(min_precision, min_recall, &gate);

    if let Some(out) = &args.out {
        let mut json = serde_json::to_string_pretty(&report)?;
        json.push('\n');
        write_file(out, &json)?;
    }
    if let Some(out) = &args.predictions_out {
        let csv: PredictionsCsv = predictions.into_iter().collect();
        write_file(out, &csv.to_csv())?;
    }

    println!(
        "correlation gate: {} | precision={:.4} recall={:.4} f1={:.4} sample_size={}",
        if gate.pass { "PASS" } else { "FAIL" },
        report.precision,
        report.recall,
        report.f1,
        report.sample_size
    );

    if !gate.pass {
        anyhow::bail!("{}", gate.message);
    }
    Ok(())
}

fn run_attribute(args: AttributeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mode = args
        .mode
        .as_deref()
        .map(AttributionMode::parse_lossy)
        .unwrap_or_else(|| config.attribution_mode());

    let samples = load_samples(&args.input).context("Failed to load fault samples")?;
    let predictions = build_attributions(&samples, mode);
    for prediction in &predictions {
        prediction.validate().with_context(|| {
            format!(
                "Attribution for incident {} failed schema validation",
                prediction.incident_id
            )
        })?;
    }

    let mut lines = String::new();
    for prediction in &predictions {
        lines.push_str(&serde_json::to_string(prediction)?);
        lines.push('\n');
    }
    if args.out.as_os_str() == "-" {
        let mut stdout = BufWriter::new(io::stdout().lock());
        stdout.write_all(lines.as_bytes())?;
        stdout.flush()?;
    } else {
        write_file(&args.out, &lines)?;
    }

    if let Some(out) = &args.confusion_out {
        let matrix = build_confusion_matrix(&samples, &predictions);
        write_file(out, &confusion_matrix_csv(&matrix))?;
    }

    let mut summary = AttributionSummary::new(
        &samples,
        &predictions,
        mode,
        config.attribution.coverage_threshold,
    );
    tracing::info!(
        mode = %mode,
        total = summary.total_samples,
        accuracy = summary.accuracy,
        partial_accuracy = summary.partial_accuracy,
        "attribution complete"
    );

    if let Some(out) = &args.summary_out {
        summary.input_path = Some(args.input.display().to_string());
        summary.output_path = Some(args.out.display().to_string());
        summary.confusion_path = args.confusion_out.as_ref().map(|p| p.display().to_string());
        let mut json = serde_json::to_string_pretty(&summary)?;
        json.push('\n');
        write_file(out, &json)?;
    }
    Ok(())
}

fn run_enrich(args: EnrichArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let span_json = fs::read_to_string(&args.span)
        .with_context(|| format!("Failed to read span: {}", args.span.display()))?;
    let span: SpanRef = serde_json::from_str(&span_json)
        .with_context(|| format!("Failed to parse span: {}", args.span.display()))?;
    let signals: Vec<SignalRef> =
        jsonl::load_records(&args.signals).context("Failed to load signals")?;

    let result = config.correlator().enrich(&Attributes::new(), &span, &signals);
    let mut attributes = result.attributes;
    decompose_retrieval(&mut attributes);

    // retransmit bursts on the span's pod
    let detector = config.retry_storm_detector();
    let retransmits = signals
        .iter()
        .filter(|s| s.kind() == Some(SignalKind::TcpRetransmitsTotal) && !s.pod.is_empty())
        .filter_map(|s| s.timestamp.map(|ts| (s.pod.as_str(), ts)));
    for (pod, ts) in retransmits {
        detector.record(pod, ts);
    }
    let now = span.timestamp.unwrap_or_else(Utc::now);

    let selected: Vec<_> = result
        .candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "signal": c.signal.signal,
                "tier": c.decision.tier_name(),
                "confidence": c.decision.confidence,
            })
        })
        .collect();

    let output = serde_json::json!({
        "attributes": attributes,
        "selected": selected,
        "debug": result.debug,
        "retry_storm": {
            "key": span.pod,
            "count": detector.count(&span.pod, now),
            "storm": detector.is_storm(&span.pod, now),
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::CorrelationEval(args) => run_correlation_eval(args),
        Command::Attribute(args) => run_attribute(args),
        Command::Enrich(args) => run_enrich(args),
    }
}
