//! CSV output for evaluation artifacts
//!
//! Per-case correlation predictions and the attribution confusion matrix,
//! both meant for spreadsheet review next to the JSON summaries.

use crate::attribution::MatrixKey;
use crate::correlation::Prediction;
use std::collections::BTreeMap;

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Correlation predictions formatter
#[derive(Debug, Default)]
pub struct PredictionsCsv {
    rows: Vec<Prediction>,
}

impl PredictionsCsv {
    const HEADER: &'static str =
        "case_id,signal,expected_match,predicted_match,confidence,tier,expected_tier,is_correct";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prediction(&mut self, prediction: Prediction) {
        self.rows.push(prediction);
    }

    fn format_row(row: &Prediction) -> String {
        [
            escape_field(&row.case_id),
            escape_field(&row.signal),
            row.expected.to_string(),
            row.predicted.to_string(),
            format!("{:.4}", row.confidence),
            row.tier.map(|t| t.as_str()).unwrap_or_default().to_string(),
            row.expected_tier
                .map(|t| t.as_str())
                .unwrap_or_default()
                .to_string(),
            row.correct.to_string(),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(Self::HEADER);
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }
        output
    }
}

impl FromIterator<Prediction> for PredictionsCsv {
    fn from_iter<I: IntoIterator<Item = Prediction>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Confusion matrix as `actual,predicted,count`, rows sorted by domain names
pub fn confusion_matrix_csv(matrix: &BTreeMap<MatrixKey, usize>) -> String {
    let mut rows: Vec<(&str, &str, usize)> = matrix
        .iter()
        .map(|(key, count)| (key.actual.as_str(), key.predicted.as_str(), *count))
        .collect();
    rows.sort_unstable();

    let mut output = String::from("actual,predicted,count\n");
    for (actual, predicted, count) in rows {
        output.push_str(&format!("{},{},{}\n", actual, predicted, count));
    }
    output
}
