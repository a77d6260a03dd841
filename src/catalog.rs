//! Per-session registry of loaded tables.

use crate::data::datatable::{ColumnSchema, DataTable};
use crate::data::identifiers::unique_name;
use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Schema summary of one registered table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub row_count: usize,
}

/// Ordered mapping from table name to loaded table.
///
/// Names are unique case-insensitively. Every mutation bumps `generation`,
/// which lets an engine tell whether its copy of the tables is stale.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    tables: Vec<Arc<DataTable>>,
    generation: u64,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, renaming it to `<name>_2`, `<name>_3`, ... on collision.
    /// Returns the name actually used.
    pub fn register(&mut self, mut table: DataTable) -> String {
        let requested = table.name.clone();
        let name = unique_name(&requested, |candidate| self.position(candidate).is_some());
        if name != requested {
            debug!(requested = %requested, assigned = %name, "Table name taken, using suffix");
        }

        table.name = name.clone();
        info!(
            table = %name,
            rows = table.row_count(),
            columns = table.column_count(),
            "Registered table"
        );
        self.tables.push(Arc::new(table));
        self.generation += 1;
        name
    }

    pub fn get(&self, name: &str) -> Result<Arc<DataTable>> {
        self.position(name)
            .map(|idx| Arc::clone(&self.tables[idx]))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Schemas in registration order
    pub fn list(&self) -> Vec<TableSchema> {
        self.tables
            .iter()
            .map(|t| TableSchema {
                name: t.name.clone(),
                columns: t.columns.clone(),
                row_count: t.row_count(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Tables in registration order, for backends that materialize them
    pub fn tables(&self) -> impl Iterator<Item = &Arc<DataTable>> {
        self.tables.iter()
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<DataTable>> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let removed = self.tables.remove(idx);
        self.generation += 1;
        info!(table = %removed.name, "Removed table");
        Ok(removed)
    }

    /// Swap in a new version of an existing table, keeping the registered name
    pub fn replace(&mut self, mut table: DataTable) -> Result<()> {
        let idx = self
            .position(&table.name)
            .ok_or_else(|| Error::NotFound(table.name.clone()))?;
        table.name = self.tables[idx].name.clone();
        info!(table = %table.name, rows = table.row_count(), "Replaced table");
        self.tables[idx] = Arc::new(table);
        self.generation += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        if self.tables.is_empty() {
            return;
        }
        debug!(count = self.tables.len(), "Clearing catalog");
        self.tables.clear();
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datatable::{DataRow, DataValue};

    fn table(name: &str, rows: i64) -> DataTable {
        let mut table = DataTable::new(name);
        table.add_column(ColumnSchema::new("n", "n"));
        for i in 0..rows {
            table.add_row(DataRow::new(vec![DataValue::Integer(i)])).unwrap();
        }
        table
    }

    #[test]
    fn test_register_collisions() {
        let mut catalog = CatalogRegistry::new();
        assert_eq!(catalog.register(table("sales", 1)), "sales");
        assert_eq!(catalog.register(table("Sales", 2)), "Sales_2");
        assert_eq!(catalog.register(table("sales", 3)), "sales_3");

        assert_eq!(catalog.names(), vec!["sales", "Sales_2", "sales_3"]);
        // First writer keeps its rows under the plain name
        assert_eq!(catalog.get("SALES").unwrap().row_count(), 1);
        assert_eq!(catalog.get("sales_2").unwrap().name, "Sales_2");
    }

    #[test]
    fn test_get_missing() {
        let catalog = CatalogRegistry::new();
        assert!(catalog.get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_in_registration_order() {
        let mut catalog = CatalogRegistry::new();
        catalog.register(table("b", 2));
        catalog.register(table("a", 0));
        let schemas = catalog.list();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "b");
        assert_eq!(schemas[0].row_count, 2);
        assert_eq!(schemas[1].columns[0].normalized_name, "n");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut catalog = CatalogRegistry::new();
        catalog.register(table("t", 1));
        let generation = catalog.generation();
        catalog.clear();
        assert!(catalog.is_empty());
        assert!(catalog.generation() > generation);

        let generation = catalog.generation();
        catalog.clear();
        assert_eq!(catalog.generation(), generation);
        assert!(catalog.get("t").unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_and_replace() {
        let mut catalog = CatalogRegistry::new();
        catalog.register(table("Orders", 1));

        catalog.replace(table("orders", 5)).unwrap();
        let orders = catalog.get("orders").unwrap();
        assert_eq!(orders.name, "Orders");
        assert_eq!(orders.row_count(), 5);

        assert!(catalog.replace(table("missing", 1)).unwrap_err().is_not_found());

        catalog.remove("ORDERS").unwrap();
        assert_eq!(catalog.len(), 0);
        assert!(catalog.remove("orders").unwrap_err().is_not_found());
    }

    #[test]
    fn test_arc_outlives_clear() {
        let mut catalog = CatalogRegistry::new();
        catalog.register(table("t", 3));
        let held = catalog.get("t").unwrap();
        catalog.clear();
        assert_eq!(held.row_count(), 3);
    }
}
