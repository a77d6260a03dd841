use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Storage format for date cells when they leave the typed model (engine, display defaults)
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Semantic type of a column after inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InferredType {
    Integer,
    Float,
    Date,
    Text,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Integer => "integer",
            InferredType::Float => "float",
            InferredType::Date => "date",
            InferredType::Text => "text",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a Date column carries a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateKind {
    Date,
    DateTime,
}

/// Column metadata and definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub original_label: String,
    pub normalized_name: String,
    pub inferred_type: InferredType,
    pub nullable: bool,
    pub date_kind: Option<DateKind>,
}

impl ColumnSchema {
    pub fn new(original_label: impl Into<String>, normalized_name: impl Into<String>) -> Self {
        Self {
            original_label: original_label.into(),
            normalized_name: normalized_name.into(),
            inferred_type: InferredType::Text,
            nullable: true,
            date_kind: None,
        }
    }

    pub fn with_type(mut self, inferred_type: InferredType) -> Self {
        self.inferred_type = inferred_type;
        if inferred_type == InferredType::Date && self.date_kind.is_none() {
            self.date_kind = Some(DateKind::Date);
        }
        self
    }

    pub fn with_date_kind(mut self, date_kind: DateKind) -> Self {
        self.inferred_type = InferredType::Date;
        self.date_kind = Some(date_kind);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn name(&self) -> &str {
        &self.normalized_name
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
    Null,
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// The column type this value belongs to, `None` for nulls
    pub fn inferred_type(&self) -> Option<InferredType> {
        match self {
            DataValue::Integer(_) => Some(InferredType::Integer),
            DataValue::Float(_) => Some(InferredType::Float),
            DataValue::Date(_) | DataValue::DateTime(_) => Some(InferredType::Date),
            DataValue::Text(_) => Some(InferredType::Text),
            DataValue::Null => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Date(d) => write!(f, "{}", d.format(ISO_DATE_FORMAT)),
            DataValue::DateTime(dt) => write!(f, "{}", dt.format(ISO_DATETIME_FORMAT)),
            DataValue::Text(s) => write!(f, "{}", s),
            DataValue::Null => write!(f, ""),
        }
    }
}

/// A row of data in the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub values: Vec<DataValue>,
}

impl DataRow {
    pub fn new(values: Vec<DataValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&DataValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A loaded, typed table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTable {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub rows: Vec<DataRow>,
    pub metadata: HashMap<String, String>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn add_column(&mut self, column: ColumnSchema) -> &mut Self {
        self.columns.push(column);
        self
    }

    pub fn add_row(&mut self, row: DataRow) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Case-insensitive lookup, matching how the engine resolves identifiers
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.normalized_name.eq_ignore_ascii_case(name))
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.get_column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.normalized_name.clone())
            .collect()
    }

    pub fn get_value(&self, row: usize, col: usize) -> Option<&DataValue> {
        self.rows.get(row)?.get(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> DataTable {
        let mut table = DataTable::new("products");
        table.add_column(ColumnSchema::new("Id", "Id").with_type(InferredType::Integer));
        table.add_column(ColumnSchema::new("Name", "Name"));
        table.add_column(ColumnSchema::new("Added On", "Added_On").with_date_kind(DateKind::Date));
        table
            .add_row(DataRow::new(vec![
                DataValue::Integer(1),
                DataValue::Text("Widget".to_string()),
                DataValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            ]))
            .unwrap();
        table
            .add_row(DataRow::new(vec![
                DataValue::Integer(2),
                DataValue::Null,
                DataValue::Null,
            ]))
            .unwrap();
        table
    }

    #[test]
    fn test_datatable_creation() {
        let table = products();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 2);
        let name = table.get_column_index("name").unwrap();
        let added = table.get_column_index("ADDED_ON").unwrap();
        assert_eq!(table.get_value(0, name).unwrap().to_string(), "Widget");
        assert_eq!(table.get_value(0, added).unwrap().to_string(), "2024-01-15");
    }

    #[test]
    fn test_add_row_rejects_wrong_width() {
        let mut table = products();
        let result = table.add_row(DataRow::new(vec![DataValue::Integer(3)]));
        assert!(result.is_err());
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_value_types() {
        assert_eq!(
            DataValue::Float(1.5).inferred_type(),
            Some(InferredType::Float)
        );
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            DataValue::DateTime(ts).inferred_type(),
            Some(InferredType::Date)
        );
        assert_eq!(DataValue::DateTime(ts).to_string(), "2024-03-01 08:30:00");
        assert_eq!(DataValue::Null.inferred_type(), None);
    }
}
