use crate::data::identifiers::unique_name;
use crate::error::{Error, Result};
use crate::projection::{GenericTable, Scalar};
use chrono::Local;
use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::Config(format!(
                "unknown export format '{}' (expected csv or json)",
                other
            ))),
        }
    }
}

/// Writes projected tables to CSV or JSON
pub struct DataExporter;

impl DataExporter {
    pub fn write<W: Write>(table: &GenericTable, format: ExportFormat, writer: W) -> Result<()> {
        match format {
            ExportFormat::Csv => Self::write_csv(table, writer),
            ExportFormat::Json => Self::write_json(table, writer),
        }
    }

    /// Export to a file and return a status line for the user
    pub fn export_to_path(table: &GenericTable, format: ExportFormat, path: &Path) -> Result<String> {
        let file = File::create(path)?;
        Self::write(table, format, BufWriter::new(file))?;
        info!(path = %path.display(), rows = table.row_count(), %format, "Exported results");
        Ok(format!(
            "Exported {} rows to {} file: {}",
            table.row_count(),
            format.extension().to_uppercase(),
            path.display()
        ))
    }

    /// `query_results_<timestamp>.<ext>` in the current directory
    pub fn default_filename(format: ExportFormat) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        format!("query_results_{}.{}", timestamp, format.extension())
    }

    fn write_csv<W: Write>(table: &GenericTable, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&table.columns)?;
        for row in &table.rows {
            csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    fn write_json<W: Write>(table: &GenericTable, mut writer: W) -> Result<()> {
        // Result columns may repeat a name (a.id, b.id); object keys must not
        let mut keys: Vec<String> = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let key = unique_name(column, |candidate| keys.iter().any(|k| k == candidate));
            keys.push(key);
        }

        let objects: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::with_capacity(keys.len());
                for (key, value) in keys.iter().zip(row) {
                    object.insert(key.clone(), scalar_to_json(value));
                }
                Value::Object(object)
            })
            .collect();

        serde_json::to_writer_pretty(&mut writer, &objects)
            .map_err(|e| Error::Io(e.into()))?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn scalar_to_json(value: &Scalar) -> Value {
    match value {
        Scalar::Integer(i) => Value::from(*i),
        Scalar::Float(f) => Value::from(*f),
        Scalar::String(s) | Scalar::Date(s) => Value::String(s.clone()),
        Scalar::Null => Value::Null,
    }
}
