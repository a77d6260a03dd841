//! One user's working set: loaded tables, the query engine over them and the
//! settings both were built from. Dropping or resetting a session discards
//! every table it held.

use crate::catalog::{CatalogRegistry, TableSchema};
use crate::config::Config;
use crate::data::load_report::LoadReport;
use crate::data::identifiers::table_name_from_source;
use crate::data::raw_dataset::RawDataset;
use crate::data::table_loader::TableLoader;
use crate::engine::{QueryEngine, QueryResult};
use crate::error::Result;
use crate::projection::{GenericTable, ResultProjector};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded {
        table_name: String,
        report: LoadReport,
    },
    /// The same source was already ingested in this session; nothing changed
    AlreadyLoaded { source_name: String },
}

impl LoadOutcome {
    pub fn table_name(&self) -> Option<&str> {
        match self {
            LoadOutcome::Loaded { table_name, .. } => Some(table_name),
            LoadOutcome::AlreadyLoaded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    catalog: CatalogRegistry,
    engine: QueryEngine,
    loader: TableLoader,
    projector: ResultProjector,
    loaded_sources: HashSet<String>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        let loader = TableLoader::new(config.loader.inferencer(), config.loader.csv_options()?);
        let engine = QueryEngine::new(&config.query);
        debug!(
            backend = engine.backend_name(),
            max_result_rows = ?config.query.max_result_rows,
            "Session created"
        );
        Ok(Self {
            catalog: CatalogRegistry::new(),
            engine,
            loader,
            projector: ResultProjector::from_config(&config.display)?,
            loaded_sources: HashSet::new(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            catalog: CatalogRegistry::new(),
            engine: QueryEngine::default(),
            loader: TableLoader::default(),
            projector: ResultProjector::default(),
            loaded_sources: HashSet::new(),
        }
    }

    /// Load delimited text under a table name derived from `source_name`
    pub fn load_reader<R: Read>(&mut self, source_name: &str, reader: R) -> Result<LoadOutcome> {
        if self.loaded_sources.contains(source_name) {
            debug!(source = source_name, "Source already loaded, skipping");
            return Ok(LoadOutcome::AlreadyLoaded {
                source_name: source_name.to_string(),
            });
        }

        let (table, mut report) = self.loader.load_reader(source_name, reader)?;
        let table_name = self.catalog.register(table);
        report.table_name = table_name.clone();
        self.loaded_sources.insert(source_name.to_string());

        Ok(LoadOutcome::Loaded { table_name, report })
    }

    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadOutcome> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        if self.loaded_sources.contains(&source_name) {
            return Ok(LoadOutcome::AlreadyLoaded { source_name });
        }
        let file = File::open(path)?;
        self.load_reader(&source_name, file)
    }

    /// Load an already split dataset, e.g. one handed over by an upload collaborator
    pub fn load_dataset(&mut self, dataset: RawDataset) -> Result<LoadOutcome> {
        let source_name = dataset.source_name.clone();
        if self.loaded_sources.contains(&source_name) {
            return Ok(LoadOutcome::AlreadyLoaded { source_name });
        }

        let requested = table_name_from_source(&source_name);
        let (table, mut report) = self.loader.load(dataset, &requested)?;
        let table_name = self.catalog.register(table);
        report.table_name = table_name.clone();
        self.loaded_sources.insert(source_name);

        Ok(LoadOutcome::Loaded { table_name, report })
    }

    pub fn query(&mut self, sql: &str) -> Result<GenericTable> {
        let result = self.query_raw(sql)?;
        Ok(self.projector.project(&result))
    }

    pub fn query_raw(&mut self, sql: &str) -> Result<QueryResult> {
        self.engine.execute(sql, &self.catalog)
    }

    pub fn schema(&self) -> Vec<TableSchema> {
        self.catalog.list()
    }

    /// A loaded table as it was ingested, without going through the engine
    pub fn table(&self, name: &str) -> Result<GenericTable> {
        let table = self.catalog.get(name)?;
        Ok(self.projector.project(table.as_ref()))
    }

    pub fn catalog(&self) -> &CatalogRegistry {
        &self.catalog
    }

    pub fn projector(&self) -> &ResultProjector {
        &self.projector
    }

    /// Starter statement for an empty editor
    pub fn suggested_query(&self) -> String {
        match self.catalog.names().first() {
            Some(name) => format!("SELECT * FROM {} LIMIT 10", name),
            None => "SELECT name FROM sqlite_master WHERE type = 'table'".to_string(),
        }
    }

    /// Forget every table, the engine database and which sources were seen
    pub fn reset(&mut self) {
        info!(tables = self.catalog.len(), "Resetting session");
        self.catalog.clear();
        self.engine.reset();
        self.loaded_sources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_query() {
        let mut session = Session::with_defaults();
        assert!(session.suggested_query().contains("sqlite_master"));

        session.load_reader("sales.csv", "a\n1\n".as_bytes()).unwrap();
        assert_eq!(session.suggested_query(), "SELECT * FROM sales LIMIT 10");
        assert_eq!(session.query(&session.suggested_query()).unwrap().row_count(), 1);
    }

    #[test]
    fn test_load_dataset() {
        let mut session = Session::with_defaults();
        let dataset = RawDataset::new(
            "upload.csv",
            vec!["x".into()],
            vec![vec![Some("1".into())], vec![Some("2".into())]],
        );
        let outcome = session.load_dataset(dataset.clone()).unwrap();
        assert_eq!(outcome.table_name(), Some("upload"));
        assert!(matches!(
            session.load_dataset(dataset).unwrap(),
            LoadOutcome::AlreadyLoaded { .. }
        ));
    }
}
