//! Shapes query results and loaded tables into [`GenericTable`], the only form
//! handed to display and export collaborators.
//!
//! This is where lossy conversions happen: dates become display strings and
//! non-finite floats become nulls.

use crate::config::DisplayConfig;
use crate::data::data_provider::TabularSource;
use crate::data::datatable::{DataValue, InferredType, ISO_DATETIME_FORMAT, ISO_DATE_FORMAT};
use crate::error::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Column type tag carried alongside projected values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Integer,
    Float,
    Date,
    Text,
}

impl From<InferredType> for TypeTag {
    fn from(t: InferredType) -> Self {
        match t {
            InferredType::Integer => TypeTag::Integer,
            InferredType::Float => TypeTag::Float,
            InferredType::Date => TypeTag::Date,
            InferredType::Text => TypeTag::Text,
        }
    }
}

/// A format-neutral cell. Dates are already rendered to strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    String(String),
    Date(String),
    Null,
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(fl) => write!(f, "{}", fl),
            Scalar::String(s) | Scalar::Date(s) => f.write_str(s),
            Scalar::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenericTable {
    pub columns: Vec<String>,
    pub types: Vec<TypeTag>,
    pub rows: Vec<Vec<Scalar>>,
}

impl GenericTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Scalar> {
        self.rows.get(row)?.get(col)
    }
}

#[derive(Debug, Clone)]
pub struct ResultProjector {
    date_format: String,
    datetime_format: String,
}

impl Default for ResultProjector {
    fn default() -> Self {
        Self {
            date_format: ISO_DATE_FORMAT.to_string(),
            datetime_format: ISO_DATETIME_FORMAT.to_string(),
        }
    }
}

fn check_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::Config(format!("invalid date format '{}'", format)));
    }
    Ok(())
}

/// A date-only value cannot fill time fields; such formats fall back to ISO
fn render(formatted: impl fmt::Display, fallback: impl fmt::Display) -> String {
    let mut out = String::new();
    if write!(out, "{}", formatted).is_err() {
        out.clear();
        let _ = write!(out, "{}", fallback);
    }
    out
}

impl ResultProjector {
    pub fn new(date_format: &str, datetime_format: &str) -> Result<Self> {
        check_format(date_format)?;
        check_format(datetime_format)?;
        Ok(Self {
            date_format: date_format.to_string(),
            datetime_format: datetime_format.to_string(),
        })
    }

    pub fn from_config(display: &DisplayConfig) -> Result<Self> {
        Self::new(&display.date_format, &display.datetime_format)
    }

    pub fn project(&self, source: &dyn TabularSource) -> GenericTable {
        let columns = source.get_column_names();
        let types = source
            .get_column_types()
            .into_iter()
            .map(TypeTag::from)
            .collect();

        let rows = (0..source.get_row_count())
            .filter_map(|idx| source.get_row(idx))
            .map(|row| row.values.iter().map(|v| self.scalar(v)).collect())
            .collect();

        GenericTable {
            columns,
            types,
            rows,
        }
    }

    pub fn scalar(&self, value: &DataValue) -> Scalar {
        match value {
            DataValue::Integer(i) => Scalar::Integer(*i),
            DataValue::Float(f) if f.is_finite() => Scalar::Float(*f),
            DataValue::Float(_) => Scalar::Null,
            DataValue::Date(d) => Scalar::Date(render(
                d.format(&self.date_format),
                d.format(ISO_DATE_FORMAT),
            )),
            DataValue::DateTime(dt) => Scalar::Date(render(
                dt.format(&self.datetime_format),
                dt.format(ISO_DATETIME_FORMAT),
            )),
            DataValue::Text(s) => Scalar::String(s.clone()),
            DataValue::Null => Scalar::Null,
        }
    }
}
