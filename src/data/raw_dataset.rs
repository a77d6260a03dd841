//! Delimited text to raw, untyped records
//!
//! Parsing is tolerant: ragged rows are padded or cut to the header width and
//! recorded as anomalies, invalid UTF-8 is decoded lossily.

use crate::data::load_report::{AnomalyKind, RowAnomaly};
use crate::error::Result;
use csv::ReaderBuilder;
use std::io::Read;
use tracing::{debug, warn};

/// Delimiters considered when none is configured
const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// One raw record: a cell per header position, `None` where the row ran short
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub values: Vec<Option<String>>,
}

impl RawRecord {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Fixed delimiter; sniffed from the header line when `None`
    pub delimiter: Option<u8>,
}

/// Header labels plus positional records, as handed over by an upload
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub source_name: String,
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    pub anomalies: Vec<RowAnomaly>,
}

impl RawDataset {
    /// Build a dataset from already-split rows; rows are fitted to the header width
    pub fn new(
        source_name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        let mut dataset = Self {
            source_name: source_name.into(),
            headers,
            records: Vec::with_capacity(rows.len()),
            anomalies: Vec::new(),
        };
        for row in rows {
            dataset.push_row(row);
        }
        dataset
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Lazy view over one column's raw cells
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.records.iter().map(move |r| r.get(index))
    }

    fn push_row(&mut self, mut values: Vec<Option<String>>) {
        let expected = self.headers.len();
        let found = values.len();
        let row_index = self.records.len();

        if found != expected {
            let kind = if found < expected {
                AnomalyKind::MissingFields
            } else {
                AnomalyKind::ExtraFields
            };
            let anomaly = RowAnomaly {
                row_index,
                expected,
                found,
                kind,
            };
            debug!(source = %self.source_name, "{}", anomaly);
            self.anomalies.push(anomaly);
            values.resize(expected, None);
        }

        self.records.push(RawRecord::new(values));
    }

    /// Parse delimited text from any reader
    pub fn from_reader<R: Read>(
        source_name: impl Into<String>,
        mut reader: R,
        options: &CsvOptions,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(source_name, &bytes, options)
    }

    /// Parse delimited text held in memory
    pub fn from_bytes(
        source_name: impl Into<String>,
        bytes: &[u8],
        options: &CsvOptions,
    ) -> Result<Self> {
        let source_name = source_name.into();
        let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(bytes));
        debug!(
            source = %source_name,
            delimiter = %(delimiter as char).escape_default(),
            bytes = bytes.len(),
            "Parsing delimited text"
        );

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        let mut dataset = Self {
            source_name,
            headers,
            records: Vec::new(),
            anomalies: Vec::new(),
        };

        for result in reader.byte_records() {
            let record = result?;
            let values = record
                .iter()
                .map(|field| Some(String::from_utf8_lossy(field).into_owned()))
                .collect();
            dataset.push_row(values);
        }

        if !dataset.anomalies.is_empty() {
            warn!(
                source = %dataset.source_name,
                ragged_rows = dataset.anomalies.len(),
                "Ragged rows fitted to header width"
            );
        }

        Ok(dataset)
    }
}

/// Pick the candidate delimiter that occurs most often in the header line, outside quotes.
/// Falls back to a comma.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;

    for &b in bytes {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'\n' | b'\r' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
                    counts[pos] += 1;
                }
            }
            _ => {}
        }
    }

    let mut best = 0;
    for (idx, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = idx;
        }
    }
    if counts[best] == 0 {
        b','
    } else {
        CANDIDATE_DELIMITERS[best]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RawDataset {
        RawDataset::from_bytes("test.csv", text.as_bytes(), &CsvOptions::default()).unwrap()
    }

    #[test]
    fn test_basic_parse() {
        let dataset = parse("id,name\n1,Widget\n2,\"Gadget, large\"\n");
        assert_eq!(dataset.headers, vec!["id", "name"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.records[1].get(1), Some("Gadget, large"));
        assert!(dataset.anomalies.is_empty());
    }

    #[test]
    fn test_ragged_rows() {
        let dataset = parse("a,b,c\n1,2\n1,2,3,4\n");
        assert_eq!(dataset.records[0].values, vec![Some("1".into()), Some("2".into()), None]);
        assert_eq!(dataset.records[1].values.len(), 3);
        assert_eq!(dataset.anomalies.len(), 2);
        assert_eq!(dataset.anomalies[0].kind, AnomalyKind::MissingFields);
        assert_eq!(dataset.anomalies[1].kind, AnomalyKind::ExtraFields);
        assert_eq!(dataset.anomalies[1].found, 4);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter(b"a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter(b"a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter(b"\"x;y\",z\n"), b',');
        assert_eq!(sniff_delimiter(b"single"), b',');
    }

    #[test]
    fn test_semicolon_file() {
        let dataset = parse("city;population\nParis;2100000\n");
        assert_eq!(dataset.headers, vec!["city", "population"]);
        assert_eq!(dataset.records[0].get(1), Some("2100000"));
    }

    #[test]
    fn test_empty_input_has_no_columns() {
        let dataset = parse("");
        assert_eq!(dataset.column_count(), 0);
        assert_eq!(dataset.row_count(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let bytes = b"name\ncaf\xe9\n";
        let dataset = RawDataset::from_bytes("latin1.csv", bytes, &CsvOptions::default()).unwrap();
        assert_eq!(dataset.records[0].get(0), Some("caf\u{fffd}"));
    }

    #[test]
    fn test_new_fits_rows() {
        let dataset = RawDataset::new(
            "mem",
            vec!["a".into(), "b".into()],
            vec![vec![Some("1".into())]],
        );
        assert_eq!(dataset.records[0].values, vec![Some("1".into()), None]);
        assert_eq!(dataset.anomalies.len(), 1);
    }
}
