//! Column type inference and coercion plans
//!
//! A column is inferred from a bounded sample of its raw values, in priority
//! order Integer, Float, Date, Text. The result carries a [`CoercionPlan`] that
//! converts every raw cell of the column into a typed [`DataValue`].

use crate::data::datatable::{DataValue, DateKind, InferredType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Number of non-missing values examined per column unless configured otherwise
pub const DEFAULT_SAMPLE_ROWS: usize = 10_000;

/// Tokens treated as missing in addition to empty cells
pub const DEFAULT_NULL_MARKERS: &[&str] = &["NA", "N/A", "#N/A", "NULL", "null", "NaN", "nan"];

/// Cheap shape check before handing a value to chrono.
/// Rejects ID-like strings such as "BQ-81198596" or "ORDER-2024-001".
static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}([ T]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("date shape regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Date,
    DateTime,
    /// RFC 3339 with an offset, normalised to UTC
    Rfc3339,
}

/// One entry of the ordered date pattern list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePattern {
    pub format: &'static str,
    kind: PatternKind,
}

impl DatePattern {
    const fn date(format: &'static str) -> Self {
        Self {
            format,
            kind: PatternKind::Date,
        }
    }

    const fn datetime(format: &'static str) -> Self {
        Self {
            format,
            kind: PatternKind::DateTime,
        }
    }

    pub fn date_kind(&self) -> DateKind {
        match self.kind {
            PatternKind::Date => DateKind::Date,
            PatternKind::DateTime | PatternKind::Rfc3339 => DateKind::DateTime,
        }
    }

    /// Parse a trimmed value with this pattern
    pub fn parse(&self, value: &str) -> Option<DataValue> {
        match self.kind {
            PatternKind::Date => NaiveDate::parse_from_str(value, self.format)
                .ok()
                .map(DataValue::Date),
            PatternKind::DateTime => NaiveDateTime::parse_from_str(value, self.format)
                .ok()
                .map(DataValue::DateTime),
            PatternKind::Rfc3339 => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| DataValue::DateTime(dt.naive_utc())),
        }
    }
}

/// Date/time patterns in priority order; the first one matching the whole sample wins.
/// Month-first wins over day-first when both fit.
pub static DATE_PATTERNS: &[DatePattern] = &[
    DatePattern::date("%Y-%m-%d"),
    DatePattern::datetime("%Y-%m-%d %H:%M:%S%.f"),
    DatePattern::datetime("%Y-%m-%dT%H:%M:%S%.f"),
    DatePattern {
        format: "rfc3339",
        kind: PatternKind::Rfc3339,
    },
    DatePattern::datetime("%Y-%m-%d %H:%M"),
    DatePattern::date("%Y/%m/%d"),
    DatePattern::date("%m/%d/%Y"),
    DatePattern::date("%d/%m/%Y"),
    DatePattern::date("%d-%m-%Y"),
    DatePattern::date("%d.%m.%Y"),
    DatePattern::datetime("%m/%d/%Y %H:%M:%S"),
    DatePattern::datetime("%d/%m/%Y %H:%M:%S"),
];

/// Why a single cell could not be coerced to its column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionFailure {
    NotAnInteger,
    IntegerOutOfRange,
    NotAFloat,
    DateMismatch { pattern: &'static str },
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnInteger => write!(f, "not an integer"),
            Self::IntegerOutOfRange => write!(f, "integer out of range"),
            Self::NotAFloat => write!(f, "not a number"),
            Self::DateMismatch { pattern } => write!(f, "does not match date pattern {}", pattern),
        }
    }
}

/// Type inference utilities
#[derive(Debug, Clone)]
pub struct TypeInferencer {
    sample_rows: usize,
    null_markers: Vec<String>,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new(
            DEFAULT_SAMPLE_ROWS,
            DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl TypeInferencer {
    pub fn new(sample_rows: usize, null_markers: Vec<String>) -> Self {
        Self {
            sample_rows: sample_rows.max(1),
            null_markers,
        }
    }

    /// Trimmed value, or `None` when the cell counts as missing
    pub fn present<'a>(&self, raw: Option<&'a str>) -> Option<&'a str> {
        let value = raw?.trim();
        if value.is_empty() || self.null_markers.iter().any(|m| m == value) {
            None
        } else {
            Some(value)
        }
    }

    /// Infer a column type from its raw values.
    ///
    /// Consumes at most `sample_rows` non-missing values from the iterator.
    pub fn infer<'a, I>(&self, values: I) -> Inference
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut sample: Vec<&str> = Vec::new();
        let mut missing = 0usize;

        for raw in values {
            match self.present(raw) {
                Some(value) => {
                    sample.push(value);
                    if sample.len() >= self.sample_rows {
                        break;
                    }
                }
                None => missing += 1,
            }
        }

        let (inferred_type, date_pattern) = Self::classify(&sample);
        Inference {
            inferred_type,
            date_pattern,
            sampled: sample.len(),
            missing,
        }
    }

    fn classify(sample: &[&str]) -> (InferredType, Option<DatePattern>) {
        if sample.is_empty() {
            return (InferredType::Text, None);
        }

        if sample.iter().all(|v| Self::is_integer(v)) {
            return (InferredType::Integer, None);
        }

        if sample.iter().all(|v| Self::is_float(v)) {
            return (InferredType::Float, None);
        }

        if sample.iter().all(|v| Self::looks_like_datetime(v)) {
            if let Some(pattern) = DATE_PATTERNS
                .iter()
                .find(|p| sample.iter().all(|v| p.parse(v).is_some()))
            {
                return (InferredType::Date, Some(*pattern));
            }
        }

        (InferredType::Text, None)
    }

    /// Optional sign, ASCII digits only, within the i64 range
    pub fn is_integer(value: &str) -> bool {
        Self::is_integer_literal(value) && value.parse::<i64>().is_ok()
    }

    fn is_integer_literal(value: &str) -> bool {
        let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }

    /// Finite decimal or scientific literal; rejects "inf", "NaN" and thousands separators
    pub fn is_float(value: &str) -> bool {
        value.bytes().any(|b| b.is_ascii_digit())
            && value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
    }

    /// Check if a string has the shape of a date or timestamp
    pub fn looks_like_datetime(value: &str) -> bool {
        if value.len() < 6 || value.len() > 35 {
            return false;
        }
        DATE_SHAPE.is_match(value)
    }
}

/// Outcome of inferring one column
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub inferred_type: InferredType,
    pub date_pattern: Option<DatePattern>,
    /// Non-missing values examined
    pub sampled: usize,
    /// Missing values seen while sampling
    pub missing: usize,
}

impl Inference {
    pub fn date_kind(&self) -> Option<DateKind> {
        self.date_pattern.map(|p| p.date_kind())
    }

    pub fn plan(&self, inferencer: &TypeInferencer) -> CoercionPlan {
        CoercionPlan {
            target: self.inferred_type,
            date_pattern: self.date_pattern,
            inferencer: inferencer.clone(),
        }
    }
}

/// Per-column conversion from raw string to typed value
#[derive(Debug, Clone)]
pub struct CoercionPlan {
    target: InferredType,
    date_pattern: Option<DatePattern>,
    inferencer: TypeInferencer,
}

impl CoercionPlan {
    /// Convert one raw cell. Missing cells become `Null`; mismatches are reported, not fatal.
    pub fn coerce(&self, raw: Option<&str>) -> Result<DataValue, CoercionFailure> {
        let Some(value) = self.inferencer.present(raw) else {
            return Ok(DataValue::Null);
        };

        match self.target {
            InferredType::Integer => {
                if !TypeInferencer::is_integer_literal(value) {
                    return Err(CoercionFailure::NotAnInteger);
                }
                value
                    .parse::<i64>()
                    .map(DataValue::Integer)
                    .map_err(|_| CoercionFailure::IntegerOutOfRange)
            }
            InferredType::Float => {
                if TypeInferencer::is_float(value) {
                    value
                        .parse::<f64>()
                        .map(DataValue::Float)
                        .map_err(|_| CoercionFailure::NotAFloat)
                } else {
                    Err(CoercionFailure::NotAFloat)
                }
            }
            InferredType::Date => {
                let pattern = self.date_pattern.unwrap_or(DATE_PATTERNS[0]);
                pattern
                    .parse(value)
                    .ok_or(CoercionFailure::DateMismatch {
                        pattern: pattern.format,
                    })
            }
            // Text keeps the cell exactly as it arrived
            InferredType::Text => Ok(DataValue::Text(raw.unwrap_or_default().to_string())),
        }
    }
}
