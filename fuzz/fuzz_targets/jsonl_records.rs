#![no_main]

use faultlens::attribution::{BayesianAttributor, FaultSample};
use faultlens::correlation::{evaluate_labeled_pairs, LabeledPair};
use faultlens::jsonl::parse_records;
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    // Malformed input must surface as an error, never a panic
    if let Ok(pairs) = parse_records::<LabeledPair, _>(data, Path::new("fuzz.jsonl")) {
        let _ = evaluate_labeled_pairs(&pairs, Duration::ZERO, 0.0);
    }

    if let Ok(samples) = parse_records::<FaultSample, _>(data, Path::new("fuzz.jsonl")) {
        let attributor = BayesianAttributor::new();
        for sample in &samples {
            let _ = attributor.attribute_sample(sample).validate();
        }
    }
});
