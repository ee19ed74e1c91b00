//! Integration tests for the faultlens binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ============================================================================
// correlation-eval
// ============================================================================

#[test]
fn test_correlation_eval_pass() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("out").join("summary.json");
    let predictions = dir.path().join("predictions.csv");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval")
        .arg("--input")
        .arg(fixture("labeled_pairs_pass.jsonl"))
        .arg("--out")
        .arg(&summary)
        .arg("--predictions-out")
        .arg(&predictions);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("correlation gate: PASS"))
        .stdout(predicate::str::contains("precision=1.0000"))
        .stdout(predicate::str::contains("sample_size=5"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(report["true_positive"], 3);
    assert_eq!(report["true_negative"], 2);
    assert_eq!(report["tier_accuracy"], 1.0);
    assert_eq!(report["window_ms"], 2000);
    assert_eq!(report["passed_gate"], true);
    assert_eq!(report["min_precision_required"], 0.9);

    let csv = fs::read_to_string(&predictions).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("case_id,signal,expected_match"));
    assert!(lines[1].starts_with("trace-exact,dns_latency_ms,true,true,1.0000,trace_id_exact"));
}

#[test]
fn test_correlation_eval_recall_gate_fails() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("summary.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval")
        .arg("--input")
        .arg(fixture("labeled_pairs_fail.jsonl"))
        .arg("--out")
        .arg(&summary);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("correlation gate: FAIL"))
        .stderr(predicate::str::contains(
            "recall gate failed: got 0.7500 required 0.8500",
        ));

    // the summary is still written for inspection
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(report["false_negative"], 1);
    assert_eq!(report["passed_gate"], false);
}

#[test]
fn test_correlation_eval_lower_threshold_recovers_recall() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval")
        .arg("--input")
        .arg(fixture("labeled_pairs_fail.jsonl"))
        .arg("--threshold")
        .arg("0.6");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("recall=1.0000"));
}

#[test]
fn test_correlation_eval_config_gate_bounds() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("faultlens.toml");
    fs::write(&config, "[evaluation]\nmin_recall = 0.7\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval")
        .arg("--input")
        .arg(fixture("labeled_pairs_fail.jsonl"))
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("correlation gate: PASS"));
}

#[test]
fn test_correlation_eval_empty_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.jsonl");
    fs::write(&input, "\n\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval").arg("--input").arg(&input);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no records loaded"));
}

#[test]
fn test_correlation_eval_malformed_line() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.jsonl");
    let good = fs::read_to_string(fixture("labeled_pairs_pass.jsonl")).unwrap();
    let first = good.lines().next().unwrap();
    fs::write(&input, format!("{}\n{{\"case_id\":\"broken\"}}\n", first)).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval").arg("--input").arg(&input);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("bad.jsonl:2"));
}

#[test]
fn test_correlation_eval_missing_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("correlation-eval")
        .arg("--input")
        .arg("/nonexistent/faultlens/pairs.jsonl");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// ============================================================================
// attribute
// ============================================================================

#[test]
fn test_attribute_bayes_to_stdout() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("attribute")
        .arg("--input")
        .arg(fixture("fault_samples.jsonl"));

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 4);

    assert_eq!(records[0]["predicted_fault_domain"], "network_dns");
    assert_eq!(records[0]["fault_hypotheses"][0]["domain"], "network_dns");
    assert_eq!(records[1]["predicted_fault_domain"], "cpu_throttle");
    assert_eq!(records[3]["predicted_fault_domain"], "memory_pressure");

    // no signals: rule fallback without hypotheses
    assert_eq!(records[2]["predicted_fault_domain"], "provider_throttle");
    assert_eq!(records[2]["confidence"], 0.92);
    assert!(records[2].get("fault_hypotheses").is_none());
    assert_eq!(records[2]["slo_impact"]["sli"], "ttft_ms");
}

#[test]
fn test_attribute_rule_mode_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("attributions.jsonl");
    let summary = dir.path().join("summary.json");
    let confusion = dir.path().join("reports").join("confusion.csv");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("attribute")
        .arg("--input")
        .arg(fixture("fault_samples.jsonl"))
        .arg("--mode")
        .arg("rule")
        .arg("--out")
        .arg(&out)
        .arg("--summary-out")
        .arg(&summary)
        .arg("--confusion-out")
        .arg(&confusion);

    cmd.assert().success().stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(!written.contains("fault_hypotheses"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(summary["attribution_mode"], "rule");
    assert_eq!(summary["total_samples"], 4);
    assert_eq!(summary["accuracy"], 1.0);
    assert_eq!(summary["partial_accuracy"], 1.0);
    assert_eq!(summary["predicted_domain_counts"]["network_dns"], 1);

    assert_eq!(
        fs::read_to_string(&confusion).unwrap(),
        "actual,predicted,count\n\
         cpu_throttle,cpu_throttle,1\n\
         memory_pressure,memory_pressure,1\n\
         network_dns,network_dns,1\n\
         provider_throttle,provider_throttle,1\n"
    );
}

#[test]
fn test_attribute_unknown_mode_uses_bayes() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("summary.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("attribute")
        .arg("--input")
        .arg(fixture("fault_samples.jsonl"))
        .arg("--mode")
        .arg("oracle")
        .arg("--summary-out")
        .arg(&summary);

    cmd.assert().success();

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(summary["attribution_mode"], "bayes");
}

#[test]
fn test_attribute_rejects_invalid_envelope() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("samples.jsonl");
    fs::write(
        &input,
        "{\"incident_id\":\"inc-1\",\"fault_label\":\"dns_latency\",\"confidence\":0.5}\n",
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("attribute").arg("--input").arg(&input);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("schema validation"))
        .stderr(predicate::str::contains("service must not be empty"));
}

// ============================================================================
// enrich
// ============================================================================

#[test]
fn test_enrich_span() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("enrich")
        .arg("--span")
        .arg(fixture("span.json"))
        .arg("--signals")
        .arg(fixture("signals.jsonl"));

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let attrs = &parsed["attributes"];
    assert_eq!(attrs["llm.ebpf.dns.latency_ms"], 120.0);
    assert_eq!(attrs["llm.ebpf.net.connect_latency_ms"], 90.0);
    assert_eq!(attrs["llm.ebpf.tls.handshake_ms"], 70.0);
    assert_eq!(attrs["llm.ebpf.correlation_confidence"], 1.0);
    assert_eq!(attrs["llm.ebpf.retrieval.kernel_attributed_ms"], 280.0);
    assert!(attrs.get("llm.ebpf.sched.runqueue_delay_ms").is_none());

    assert_eq!(parsed["selected"][0]["tier"], "trace_id_exact");
    assert_eq!(parsed["selected"].as_array().unwrap().len(), 3);

    assert_eq!(parsed["debug"]["unmatched"], 5);
    assert_eq!(parsed["debug"]["low_confidence"], 1);
    assert_eq!(parsed["debug"]["unsupported_type"], 1);
    assert_eq!(parsed["debug"]["fanout_dropped"], 0);

    assert_eq!(parsed["retry_storm"]["key"], "rag-0");
    assert_eq!(parsed["retry_storm"]["count"], 5);
    assert_eq!(parsed["retry_storm"]["storm"], true);
}

#[test]
fn test_enrich_fanout_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("faultlens.toml");
    fs::write(&config, "[correlation]\nmax_fanout = 1\n\n[retry_storm]\nthreshold = 6\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("enrich")
        .arg("--span")
        .arg(fixture("span.json"))
        .arg("--signals")
        .arg(fixture("signals.jsonl"))
        .arg("--config")
        .arg(&config);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(parsed["debug"]["fanout_dropped"], 2);
    assert_eq!(parsed["attributes"]["llm.ebpf.retrieval.kernel_attributed_ms"], 120.0);
    assert_eq!(parsed["retry_storm"]["storm"], false);
}

#[test]
fn test_enrich_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("faultlens.toml");
    fs::write(&config, "[correlation]\nenrichment_threshold = 3.0\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.arg("enrich")
        .arg("--span")
        .arg(fixture("span.json"))
        .arg("--signals")
        .arg(fixture("signals.jsonl"))
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_no_subcommand_shows_usage() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("faultlens");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
