//! In-memory SQLite backend
//!
//! The registered tables are copied into a private in-memory database the first
//! time a query runs after the catalog changed. The database is switched to
//! `query_only` once loaded, so nothing a statement does can alter it.

use super::{QueryResult, ResultColumn, SqlBackend};
use crate::catalog::CatalogRegistry;
use crate::data::datatable::{DataRow, DataTable, DataValue, DateKind, InferredType, ISO_DATE_FORMAT};
use crate::data::identifiers::quote_identifier;
use crate::engine::statement_guard::{leading_keyword, MULTIPLE_STATEMENTS};
use crate::error::{Error, QueryError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Timestamp storage format; fractional seconds are written only when present
const STORAGE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl ToSql for DataValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DataValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            DataValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            DataValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format(ISO_DATE_FORMAT).to_string())),
            DataValue::DateTime(dt) => {
                ToSqlOutput::Owned(Value::Text(dt.format(STORAGE_DATETIME_FORMAT).to_string()))
            }
            DataValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DataValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

fn declared_type(inferred: InferredType, date_kind: Option<DateKind>) -> &'static str {
    match (inferred, date_kind) {
        (InferredType::Integer, _) => "INTEGER",
        (InferredType::Float, _) => "REAL",
        (InferredType::Date, Some(DateKind::DateTime)) => "TIMESTAMP",
        (InferredType::Date, _) => "DATE",
        (InferredType::Text, _) => "TEXT",
    }
}

fn engine_error(context: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |e| Error::Engine(format!("{}: {}", context, e))
}

/// Map an engine failure on a user statement, keeping the engine's own text
fn query_error(err: rusqlite::Error, statement: &str) -> Error {
    match err {
        rusqlite::Error::SqlInputError { msg, offset, .. } => QueryError::new(msg, statement)
            .with_position(usize::try_from(offset).ok())
            .into(),
        rusqlite::Error::SqliteFailure(_, Some(msg)) => QueryError::new(msg, statement).into(),
        rusqlite::Error::MultipleStatement => Error::unsupported(MULTIPLE_STATEMENTS, statement),
        other => QueryError::new(other.to_string(), statement).into(),
    }
}

#[derive(Debug, Default)]
pub struct SqliteBackend {
    conn: Option<Connection>,
    synced_generation: Option<u64>,
    max_rows: Option<usize>,
}

impl SqliteBackend {
    pub fn new(max_rows: Option<usize>) -> Self {
        Self {
            conn: None,
            synced_generation: None,
            max_rows,
        }
    }

    /// The connection holding the catalog's current tables, rebuilt when stale
    fn connection(&mut self, catalog: &CatalogRegistry) -> Result<&Connection> {
        let generation = catalog.generation();
        if self.synced_generation != Some(generation) || self.conn.is_none() {
            // Drop the old database before building the new one
            self.conn = None;
            let conn = materialize(catalog)?;
            self.synced_generation = Some(generation);
            self.conn = Some(conn);
        }
        self.conn
            .as_ref()
            .ok_or_else(|| Error::Engine("database not initialized".to_string()))
    }
}

/// Build a fresh in-memory database holding every registered table
fn materialize(catalog: &CatalogRegistry) -> Result<Connection> {
    let start = Instant::now();
    let mut conn =
        Connection::open_in_memory().map_err(engine_error("Failed to open in-memory database"))?;

    let tx = conn
        .transaction()
        .map_err(engine_error("Failed to start load transaction"))?;
    let mut total_rows = 0usize;
    for table in catalog.tables() {
        create_and_fill(&tx, table)?;
        total_rows += table.row_count();
    }
    tx.commit()
        .map_err(engine_error("Failed to commit load transaction"))?;

    conn.execute_batch("PRAGMA query_only = ON;")
        .map_err(engine_error("Failed to make database read-only"))?;

    info!(
        tables = catalog.len(),
        rows = total_rows,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Materialized catalog into SQLite"
    );
    Ok(conn)
}

fn create_and_fill(conn: &Connection, table: &DataTable) -> Result<()> {
    let table_name = quote_identifier(&table.name);
    let column_defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            format!(
                "{} {}",
                quote_identifier(&c.normalized_name),
                declared_type(c.inferred_type, c.date_kind)
            )
        })
        .collect();

    let create_sql = format!("CREATE TABLE {} ({})", table_name, column_defs.join(", "));
    debug!(sql = %create_sql, "Creating table");
    conn.execute_batch(&create_sql)
        .map_err(engine_error(&format!("Failed to create table '{}'", table.name)))?;

    if table.rows.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; table.column_count()].join(", ");
    let insert_sql = format!("INSERT INTO {} VALUES ({})", table_name, placeholders);
    let mut stmt = conn
        .prepare(&insert_sql)
        .map_err(engine_error(&format!("Failed to prepare insert into '{}'", table.name)))?;
    for row in &table.rows {
        stmt.execute(params_from_iter(row.values.iter()))
            .map_err(engine_error(&format!("Failed to insert into '{}'", table.name)))?;
    }
    Ok(())
}

impl SqlBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn execute(&mut self, sql: &str, catalog: &CatalogRegistry) -> Result<QueryResult> {
        let max_rows = self.max_rows;
        let conn = self.connection(catalog)?;
        let start = Instant::now();

        let mut stmt = conn.prepare(sql).map_err(|e| query_error(e, sql))?;
        if !stmt.readonly() {
            return Err(Error::unsupported(leading_keyword(sql), sql));
        }

        let column_count = stmt.column_count();
        let column_meta: Vec<(String, Option<String>)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
            .collect();

        let mut raw_rows: Vec<Vec<Value>> = Vec::new();
        let mut truncated = false;
        let mut rows = stmt.query([]).map_err(|e| query_error(e, sql))?;
        while let Some(row) = rows.next().map_err(|e| query_error(e, sql))? {
            if max_rows.is_some_and(|max| raw_rows.len() >= max) {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(row.get::<_, Value>(i).map_err(|e| query_error(e, sql))?);
            }
            raw_rows.push(values);
        }

        if truncated {
            warn!(
                max_rows = max_rows.unwrap_or_default(),
                "Query result truncated at max rows"
            );
        }

        let mut columns = Vec::with_capacity(column_count);
        let mut converters = Vec::with_capacity(column_count);
        for (idx, (name, decl)) in column_meta.into_iter().enumerate() {
            let target = result_type(decl.as_deref(), raw_rows.iter().map(|r| &r[idx]));
            columns.push(ResultColumn {
                name,
                data_type: target.inferred_type(),
            });
            converters.push(target);
        }

        let rows = raw_rows
            .into_iter()
            .map(|values| {
                DataRow::new(
                    values
                        .into_iter()
                        .zip(&converters)
                        .map(|(value, target)| target.convert(value))
                        .collect(),
                )
            })
            .collect();

        Ok(QueryResult {
            statement: sql.to_string(),
            columns,
            rows,
            truncated,
            elapsed: start.elapsed(),
        })
    }

    fn reset(&mut self) {
        debug!("Discarding SQLite database");
        self.conn = None;
        self.synced_generation = None;
    }
}

/// How raw engine values of one result column become typed cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultTarget {
    Integer,
    Float,
    Date,
    Text,
}

impl ResultTarget {
    fn inferred_type(self) -> InferredType {
        match self {
            ResultTarget::Integer => InferredType::Integer,
            ResultTarget::Float => InferredType::Float,
            ResultTarget::Date => InferredType::Date,
            ResultTarget::Text => InferredType::Text,
        }
    }

    fn convert(self, value: Value) -> DataValue {
        match (self, value) {
            (_, Value::Null) => DataValue::Null,
            (ResultTarget::Integer, Value::Integer(i)) => DataValue::Integer(i),
            (ResultTarget::Float, Value::Integer(i)) => DataValue::Float(i as f64),
            (ResultTarget::Float, Value::Real(f)) => DataValue::Float(f),
            (ResultTarget::Date, Value::Text(s)) => parse_stored_date(&s).unwrap_or(DataValue::Text(s)),
            (_, Value::Integer(i)) => DataValue::Text(i.to_string()),
            (_, Value::Real(f)) => DataValue::Text(f.to_string()),
            (_, Value::Text(s)) => DataValue::Text(s),
            (_, Value::Blob(b)) => DataValue::Text(to_hex(&b)),
        }
    }
}

/// Decide a result column's type from its declared type and the values it produced
fn result_type<'a>(declared: Option<&str>, values: impl Iterator<Item = &'a Value> + Clone) -> ResultTarget {
    let declared = declared.map(|d| d.to_ascii_uppercase());
    let declared_date = declared
        .as_deref()
        .is_some_and(|d| d.starts_with("DATE") || d.starts_with("TIMESTAMP"));

    if declared_date
        && values.clone().all(|v| match v {
            Value::Null => true,
            Value::Text(s) => parse_stored_date(s).is_some(),
            _ => false,
        })
    {
        return ResultTarget::Date;
    }

    let (mut any, mut real, mut text) = (false, false, false);
    for value in values {
        match value {
            Value::Null => continue,
            Value::Integer(_) => {}
            Value::Real(_) => real = true,
            Value::Text(_) | Value::Blob(_) => text = true,
        }
        any = true;
    }

    if text {
        ResultTarget::Text
    } else if real {
        ResultTarget::Float
    } else if any {
        ResultTarget::Integer
    } else {
        match declared.as_deref() {
            Some("INTEGER") => ResultTarget::Integer,
            Some("REAL") => ResultTarget::Float,
            _ => ResultTarget::Text,
        }
    }
}

fn parse_stored_date(s: &str) -> Option<DataValue> {
    if let Ok(d) = NaiveDate::parse_from_str(s, ISO_DATE_FORMAT) {
        return Some(DataValue::Date(d));
    }
    NaiveDateTime::parse_from_str(s, STORAGE_DATETIME_FORMAT)
        .ok()
        .map(DataValue::DateTime)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
