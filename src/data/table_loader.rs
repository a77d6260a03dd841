use crate::data::datatable::{ColumnSchema, DataRow, DataTable, DataValue};
use crate::data::identifiers::{table_name_from_source, IdentifierNormalizer};
use crate::data::load_report::{CoercionFailureRecord, LoadReport};
use crate::data::raw_dataset::{CsvOptions, RawDataset};
use crate::data::type_inference::{CoercionPlan, TypeInferencer};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a raw dataset into a typed table. Registration is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    normalizer: IdentifierNormalizer,
    inferencer: TypeInferencer,
    csv_options: CsvOptions,
}

impl TableLoader {
    pub fn new(inferencer: TypeInferencer, csv_options: CsvOptions) -> Self {
        Self {
            normalizer: IdentifierNormalizer::for_columns(),
            inferencer,
            csv_options,
        }
    }

    /// Load a dataset under `requested_name`, normalized with the table marker.
    ///
    /// Fails only when the dataset has no columns; bad cells become nulls and
    /// are listed in the report.
    pub fn load(&self, dataset: RawDataset, requested_name: &str) -> Result<(DataTable, LoadReport)> {
        let start = Instant::now();

        if dataset.column_count() == 0 {
            return Err(Error::schema(
                &dataset.source_name,
                "dataset has no columns (missing or empty header row)",
            ));
        }

        let table_name = IdentifierNormalizer::for_tables().normalize_one(requested_name);
        let names = self.normalizer.normalize(&dataset.headers);
        let mut table = DataTable::new(table_name.clone());
        table
            .metadata
            .insert("source_name".to_string(), dataset.source_name.clone());
        table
            .metadata
            .insert("source_type".to_string(), "delimited_text".to_string());

        // Infer every column from a lazy walk over its cells
        let mut plans: Vec<CoercionPlan> = Vec::with_capacity(names.len());
        for (idx, (label, name)) in dataset.headers.iter().zip(&names).enumerate() {
            let inference = self.inferencer.infer(dataset.column_values(idx));
            debug!(
                column = %name,
                label = %label,
                inferred = %inference.inferred_type,
                sampled = inference.sampled,
                "Inferred column type"
            );

            let mut column = ColumnSchema::new(label.clone(), name.clone())
                .with_type(inference.inferred_type)
                .with_nullable(false);
            if let Some(kind) = inference.date_kind() {
                column = column.with_date_kind(kind);
            }
            table.add_column(column);
            plans.push(inference.plan(&self.inferencer));
        }

        let mut report = LoadReport {
            source_name: dataset.source_name.clone(),
            table_name,
            column_count: names.len(),
            column_order: names.clone(),
            ..Default::default()
        };

        let mut nullable = vec![false; names.len()];
        table.rows.reserve(dataset.row_count());
        for (row_index, record) in dataset.records.iter().enumerate() {
            let mut values = Vec::with_capacity(plans.len());
            for (col_idx, plan) in plans.iter().enumerate() {
                let raw = record.get(col_idx);
                let value = match plan.coerce(raw) {
                    Ok(value) => value,
                    Err(reason) => {
                        report.coercion_failures.push(CoercionFailureRecord {
                            row_index,
                            column: names[col_idx].clone(),
                            raw_value: raw.unwrap_or_default().to_string(),
                            reason,
                        });
                        DataValue::Null
                    }
                };
                if value.is_null() {
                    nullable[col_idx] = true;
                }
                values.push(value);
            }
            table
                .add_row(DataRow::new(values))
                .map_err(|e| Error::schema(&dataset.source_name, e))?;
        }

        for (column, is_nullable) in table.columns.iter_mut().zip(nullable) {
            column.nullable = is_nullable;
        }

        report.row_count = table.row_count();
        report.anomalies = dataset.anomalies;

        if !report.coercion_failures.is_empty() {
            warn!(
                source = %report.source_name,
                failures = report.coercion_failures.len(),
                "Some cells did not match their column type and were set to null"
            );
        }
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded {}",
            report.summary()
        );

        Ok((table, report))
    }

    /// Parse delimited text from a reader and load it under a name derived from `source_name`
    pub fn load_reader<R: Read>(&self, source_name: &str, reader: R) -> Result<(DataTable, LoadReport)> {
        let dataset = RawDataset::from_reader(source_name, reader, &self.csv_options)?;
        self.load(dataset, &table_name_from_source(source_name))
    }

    /// Load a delimited text file from disk
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<(DataTable, LoadReport)> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let file = File::open(path)?;
        let (mut table, report) = self.load_reader(&source_name, file)?;
        table
            .metadata
            .insert("source_path".to_string(), source_name);
        Ok((table, report))
    }
}
