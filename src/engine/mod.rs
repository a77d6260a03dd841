//! Query execution against the catalog's tables.

pub mod sqlite_backend;
pub mod statement_guard;

use crate::catalog::CatalogRegistry;
use crate::config::QueryConfig;
use crate::data::data_provider::TabularSource;
use crate::data::datatable::{DataRow, InferredType};
use crate::error::Result;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

pub use sqlite_backend::SqliteBackend;
pub use statement_guard::guard_statement;

/// Name and type of one result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: InferredType,
}

/// Rows produced by one statement
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub statement: String,
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<DataRow>,
    /// Set when the row budget cut the result short
    pub truncated: bool,
    pub elapsed: Duration,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

impl TabularSource for QueryResult {
    fn source_name(&self) -> &str {
        &self.statement
    }

    fn get_column_names(&self) -> Vec<String> {
        self.column_names()
    }

    fn get_column_types(&self) -> Vec<InferredType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    fn get_row_count(&self) -> usize {
        self.rows.len()
    }

    fn get_row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }
}

/// A relational engine able to run read-only statements over the catalog.
///
/// Backends receive statements that already passed [`guard_statement`] and must
/// still refuse anything that would modify state.
pub trait SqlBackend: Send + std::fmt::Debug {
    fn name(&self) -> &str;

    fn execute(&mut self, sql: &str, catalog: &CatalogRegistry) -> Result<QueryResult>;

    /// Discard any state built from previously seen tables
    fn reset(&mut self);
}

#[derive(Debug)]
pub struct QueryEngine {
    backend: Box<dyn SqlBackend>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl QueryEngine {
    pub fn new(config: &QueryConfig) -> Self {
        Self::with_backend(Box::new(SqliteBackend::new(config.max_result_rows)))
    }

    pub fn with_backend(backend: Box<dyn SqlBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run one read-only statement against exactly the tables in `catalog`
    pub fn execute(&mut self, sql: &str, catalog: &CatalogRegistry) -> Result<QueryResult> {
        let statement = guard_statement(sql)?;
        debug!(backend = self.backend.name(), sql = %statement, "Executing statement");

        let result = self.backend.execute(&statement, catalog)?;
        info!(
            rows = result.row_count(),
            columns = result.columns.len(),
            truncated = result.truncated,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Query complete"
        );
        Ok(result)
    }

    pub fn reset(&mut self) {
        self.backend.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table_loader::TableLoader;
    use crate::error::Error;

    fn catalog_with(files: &[(&str, &str)]) -> CatalogRegistry {
        let loader = TableLoader::default();
        let mut catalog = CatalogRegistry::new();
        for (name, text) in files {
            let (table, _) = loader.load_reader(name, text.as_bytes()).unwrap();
            catalog.register(table);
        }
        catalog
    }

    #[test]
    fn test_join_across_files() {
        let catalog = catalog_with(&[
            ("customers.csv", "id,name\n1,Ada\n2,Grace\n"),
            ("orders.csv", "order_id,customer_id,total\n10,1,9.5\n11,1,3\n12,2,7.25\n"),
        ]);
        let mut engine = QueryEngine::default();
        let result = engine
            .execute(
                "SELECT c.name, SUM(o.total) AS spent FROM customers c \
                 JOIN orders o ON o.customer_id = c.id GROUP BY c.name ORDER BY c.name;",
                &catalog,
            )
            .unwrap();

        assert_eq!(result.column_names(), vec!["name", "spent"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.columns[1].data_type, InferredType::Float);
        assert_eq!(result.rows[0].values[1].to_string(), "12.5");
    }

    #[test]
    fn test_guard_runs_before_backend() {
        let catalog = catalog_with(&[("t.csv", "a\n1\n")]);
        let mut engine = QueryEngine::default();
        let err = engine.execute("DROP TABLE t", &catalog).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStatement { ref keyword, .. } if keyword == "DROP"));
        assert_eq!(engine.execute("SELECT * FROM t", &catalog).unwrap().row_count(), 1);
    }

    #[test]
    fn test_execute_is_idempotent() {
        let catalog = catalog_with(&[("t.csv", "a,b\n1,x\n2,y\n")]);
        let mut engine = QueryEngine::default();
        let first = engine.execute("SELECT * FROM t ORDER BY a", &catalog).unwrap();
        let second = engine.execute("SELECT * FROM t ORDER BY a", &catalog).unwrap();
        assert_eq!(first.rows, second.rows);
        assert_eq!(first.columns, second.columns);
    }

    #[test]
    fn test_reset_drops_database() {
        let catalog = catalog_with(&[("t.csv", "a\n1\n")]);
        let mut engine = QueryEngine::default();
        engine.execute("SELECT * FROM t", &catalog).unwrap();
        engine.reset();
        // Rebuilt from the catalog on next use
        assert_eq!(engine.execute("SELECT count(*) FROM t", &catalog).unwrap().row_count(), 1);
        assert_eq!(engine.backend_name(), "sqlite");
    }
}
