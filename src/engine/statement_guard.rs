//! Read-only gate in front of the engine.
//!
//! Statements are classified with `sqlparser` before the engine ever sees them.
//! Text the parser cannot handle (engine-specific syntax, plain typos) still goes
//! to the engine, unless it starts with a keyword that can modify state.

use crate::error::{Error, QueryError, Result};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Keyword reported when one submission holds several statements
pub const MULTIPLE_STATEMENTS: &str = "MULTIPLE STATEMENTS";

/// Leading keywords that are never passed through, even when unparseable
const DENIED_KEYWORDS: &[&str] = &[
    "CREATE", "ALTER", "DROP", "INSERT", "UPDATE", "DELETE", "REPLACE", "ATTACH", "DETACH",
    "PRAGMA", "VACUUM", "REINDEX", "ANALYZE", "BEGIN", "COMMIT", "END", "ROLLBACK", "SAVEPOINT",
    "RELEASE", "UPSERT",
];

/// Check one submitted statement and return it ready for the engine:
/// trimmed, without trailing semicolons.
pub fn guard_statement(sql: &str) -> Result<String> {
    let statement = strip_terminators(sql);
    if statement.is_empty() {
        return Err(QueryError::new("empty statement", sql).into());
    }

    match Parser::parse_sql(&SQLiteDialect {}, statement) {
        Ok(parsed) => {
            if parsed.len() > 1 {
                return Err(Error::unsupported(MULTIPLE_STATEMENTS, statement));
            }
            match parsed.first() {
                Some(parsed) if is_read_only(parsed) => Ok(statement.to_string()),
                _ => Err(Error::unsupported(leading_keyword(statement), statement)),
            }
        }
        Err(e) => {
            let keyword = leading_keyword(statement);
            if DENIED_KEYWORDS.contains(&keyword.as_str()) {
                return Err(Error::unsupported(keyword, statement));
            }
            debug!(error = %e, "Statement not understood by the parser, deferring to the engine");
            Ok(statement.to_string())
        }
    }
}

fn is_read_only(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => !matches!(*query.body, SetExpr::Insert(_) | SetExpr::Update(_)),
        Statement::Explain { statement, .. } => is_read_only(statement),
        _ => false,
    }
}

fn strip_terminators(sql: &str) -> &str {
    let mut statement = sql.trim();
    while let Some(rest) = statement.strip_suffix(';') {
        statement = rest.trim_end();
    }
    statement
}

/// First word of the statement, uppercased, for error messages
pub fn leading_keyword(statement: &str) -> String {
    statement
        .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}
