//! Read-only access to typed tabular data
//!
//! Loaded tables and query results both expose their columns and rows through
//! [`TabularSource`], so projection and display never care which one they hold.

use crate::data::datatable::{DataRow, DataTable, InferredType};
use std::fmt::Debug;

/// Core trait for read-only access to named, typed columns and typed rows
pub trait TabularSource: Debug {
    /// Name shown to the user (table name, or the statement for query results)
    fn source_name(&self) -> &str;

    fn get_column_names(&self) -> Vec<String>;

    fn get_column_types(&self) -> Vec<InferredType>;

    fn get_row_count(&self) -> usize;

    /// Get a single row by index, `None` when out of bounds
    fn get_row(&self, index: usize) -> Option<&DataRow>;
}

impl TabularSource for DataTable {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn get_column_names(&self) -> Vec<String> {
        self.column_names()
    }

    fn get_column_types(&self) -> Vec<InferredType> {
        self.columns.iter().map(|c| c.inferred_type).collect()
    }

    fn get_row_count(&self) -> usize {
        self.row_count()
    }

    fn get_row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datatable::{ColumnSchema, DataValue};

    fn sample_table() -> DataTable {
        let mut table = DataTable::new("people");
        table.add_column(ColumnSchema::new("id", "id").with_type(InferredType::Integer));
        table.add_column(ColumnSchema::new("Full Name", "Full_Name"));
        table
            .add_row(DataRow::new(vec![
                DataValue::Integer(1),
                DataValue::Text("Ada Lovelace".to_string()),
            ]))
            .unwrap();
        table
            .add_row(DataRow::new(vec![DataValue::Integer(22), DataValue::Null]))
            .unwrap();
        table
    }

    #[test]
    fn test_datatable_as_source() {
        let table = sample_table();
        let source: &dyn TabularSource = &table;

        assert_eq!(source.source_name(), "people");
        assert_eq!(source.get_column_names(), vec!["id", "Full_Name"]);
        assert_eq!(
            source.get_column_types(),
            vec![InferredType::Integer, InferredType::Text]
        );
        assert_eq!(source.get_row_count(), 2);
        assert_eq!(source.get_row(1).and_then(|r| r.get(0)), Some(&DataValue::Integer(22)));
        assert!(source.get_row(2).is_none());
    }
}
