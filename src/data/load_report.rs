use crate::data::type_inference::CoercionFailure;
use serde::Serialize;
use std::fmt;

/// A cell that could not be converted to its column's inferred type.
/// The cell is stored as null; the record explains why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionFailureRecord {
    /// Zero-based data row (the header is not counted)
    pub row_index: usize,
    pub column: String,
    pub raw_value: String,
    #[serde(serialize_with = "serialize_display")]
    pub reason: CoercionFailure,
}

fn serialize_display<S: serde::Serializer>(
    reason: &CoercionFailure,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// Fewer fields than the header; trailing cells are missing
    MissingFields,
    /// More fields than the header; extras were dropped
    ExtraFields,
}

/// A ragged row found while parsing delimited text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAnomaly {
    pub row_index: usize,
    pub expected: usize,
    pub found: usize,
    pub kind: AnomalyKind,
}

impl fmt::Display for RowAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnomalyKind::MissingFields => write!(
                f,
                "row {}: {} of {} fields present, missing cells set to null",
                self.row_index, self.found, self.expected
            ),
            AnomalyKind::ExtraFields => write!(
                f,
                "row {}: {} fields for {} columns, extra fields ignored",
                self.row_index, self.found, self.expected
            ),
        }
    }
}

/// Everything non-fatal that happened while loading one dataset
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub source_name: String,
    pub table_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub coercion_failures: Vec<CoercionFailureRecord>,
    pub anomalies: Vec<RowAnomaly>,
    /// Normalized column names in table order, used to order the summary
    #[serde(skip)]
    pub(crate) column_order: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.coercion_failures.is_empty() && self.anomalies.is_empty()
    }

    /// Coercion failure counts per column, in column order, skipping clean columns
    pub fn failures_by_column(&self) -> Vec<(String, usize)> {
        self.column_order
            .iter()
            .filter_map(|column| {
                let count = self
                    .coercion_failures
                    .iter()
                    .filter(|f| &f.column == column)
                    .count();
                (count > 0).then(|| (column.clone(), count))
            })
            .collect()
    }

    /// One-line human summary for status bars and logs
    pub fn summary(&self) -> String {
        let mut text = format!(
            "'{}' -> {}: {} rows, {} columns",
            self.source_name, self.table_name, self.row_count, self.column_count
        );
        if !self.coercion_failures.is_empty() {
            let per_column: Vec<String> = self
                .failures_by_column()
                .into_iter()
                .map(|(column, count)| format!("{} x{}", column, count))
                .collect();
            text.push_str(&format!(
                "; {} cells set to null ({})",
                self.coercion_failures.len(),
                per_column.join(", ")
            ));
        }
        if !self.anomalies.is_empty() {
            text.push_str(&format!("; {} ragged rows", self.anomalies.len()));
        }
        text
    }
}
