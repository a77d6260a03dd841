//! Turns raw column labels and file names into query-safe identifiers.
//!
//! Output keeps the letter case of the input (`Order Date` -> `Order_Date`),
//! while uniqueness is decided case-insensitively because the engine resolves
//! identifiers that way.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum length for a generated identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

pub const COLUMN_MARKER: &str = "col_";
pub const TABLE_MARKER: &str = "t_";

/// Words the engine grammar will not accept as bare identifiers: every SQLite
/// keyword without an `ID` fallback, the join keywords, plus a few fallback
/// keywords that read ambiguously in expressions.
static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "abort", "add", "all", "alter", "and", "as", "asc", "autoincrement", "between", "by",
        "case", "cast", "check", "collate", "column", "commit", "constraint", "create", "cross",
        "current", "current_date", "current_time", "current_timestamp", "default",
        "deferrable", "delete", "desc", "distinct", "drop", "else", "end", "escape", "except",
        "exists", "foreign", "from", "full", "glob", "group", "having", "if", "in", "index",
        "inner", "insert", "intersect", "into", "is", "isnull", "join", "left", "like", "limit",
        "natural", "not", "nothing", "notnull", "null", "offset", "on", "or", "order", "outer",
        "primary", "references", "returning", "right", "rollback", "select", "set", "table",
        "then", "to", "transaction", "union", "unique", "update", "using", "values", "when",
        "where", "with",
    ]
    .into_iter()
    .collect()
});

/// Identifiers starting with these are owned by the engine.
const RESERVED_PREFIXES: &[&str] = &["sqlite_"];

#[derive(Debug, Clone)]
pub struct IdentifierNormalizer {
    marker: String,
}

impl Default for IdentifierNormalizer {
    fn default() -> Self {
        Self::for_columns()
    }
}

impl IdentifierNormalizer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn for_columns() -> Self {
        Self::new(COLUMN_MARKER)
    }

    pub fn for_tables() -> Self {
        Self::new(TABLE_MARKER)
    }

    /// Normalize a whole header: one unique identifier per label, order preserved.
    pub fn normalize<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut taken = HashSet::with_capacity(labels.len());
        let mut result = Vec::with_capacity(labels.len());

        for (idx, label) in labels.iter().enumerate() {
            let base = self
                .sanitize(label.as_ref())
                .unwrap_or_else(|| format!("{}{}", self.marker, idx + 1));
            let name = unique_name(&base, |candidate| {
                taken.contains(&candidate.to_ascii_lowercase())
            });
            taken.insert(name.to_ascii_lowercase());
            result.push(name);
        }

        result
    }

    /// Normalize a single label with no collision handling.
    pub fn normalize_one(&self, label: &str) -> String {
        self.sanitize(label)
            .unwrap_or_else(|| format!("{}1", self.marker))
    }

    /// Steps shared by `normalize` and `normalize_one`; `None` when nothing usable remains.
    fn sanitize(&self, label: &str) -> Option<String> {
        let trimmed = label.trim().trim_matches('\u{feff}').trim();

        let mut out = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
            } else if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        while out.ends_with('_') {
            out.pop();
        }

        if out.is_empty() {
            return None;
        }

        let lower = out.to_ascii_lowercase();
        let starts_with_digit = out.starts_with(|c: char| c.is_ascii_digit());
        let reserved = RESERVED_WORDS.contains(lower.as_str())
            || RESERVED_PREFIXES.iter().any(|p| lower.starts_with(p));
        if starts_with_digit || reserved {
            out.insert_str(0, &self.marker);
        }

        if out.len() > MAX_IDENTIFIER_LENGTH {
            out.truncate(MAX_IDENTIFIER_LENGTH);
        }

        Some(out)
    }
}

/// Append `_2`, `_3`, ... to `base` until `is_taken` says the candidate is free.
pub fn unique_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Derive a table name from an uploaded file name: `data/sales.2024.csv` -> `sales`.
pub fn table_name_from_source(source_name: &str) -> String {
    let file_name = Path::new(source_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string());
    let stem = file_name.split('.').next().unwrap_or_default();
    IdentifierNormalizer::for_tables().normalize_one(stem)
}

/// Quote an identifier for the engine, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Check that `name` is usable unquoted: letter or underscore first, then ASCII alphanumerics or `_`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(name.to_ascii_lowercase().as_str())
}
