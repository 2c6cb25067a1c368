//! Schema text dialects and their detection.
//!
//! Each dialect is a cluster of regexes applied in a fixed order. None of them
//! fail: unmatched blocks and lines are skipped, dangling references dropped.

mod dbml;
mod markers;
mod shorthand;
mod sql;

use crate::model::Table;

pub use markers::{is_foreign_key, is_not_null, is_primary_key};

/// Input notation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Detect from content
    #[default]
    Auto,
    /// `CREATE TABLE` / `CREATE TYPE ... AS ENUM` statements
    Sql,
    /// `Table` / `Enum` blocks with standalone `ref:` lines
    Dbml,
    /// `Table` blocks with inline `>` references
    Shorthand,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "sql" => Some(Self::Sql),
            "dbml" => Some(Self::Dbml),
            "shorthand" | "simple" | "simplified" => Some(Self::Shorthand),
            _ => None,
        }
    }

    /// Detect dialect from content.
    ///
    /// A substring sniff, not a grammar check: `create table` anywhere wins, then
    /// `Enum`/`enum` anywhere, then the shorthand fallback.
    pub fn detect(content: &str) -> Self {
        if content.to_lowercase().contains("create table") {
            return Self::Sql;
        }
        if content.contains("Enum") || content.contains("enum") {
            return Self::Dbml;
        }
        Self::Shorthand
    }

    /// Resolve Auto to a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }
}

/// Parse schema text, detecting the dialect from the content.
pub fn parse_schema(input: &str) -> Vec<Table> {
    parse_with(input, Dialect::Auto)
}

/// Parse schema text with the given dialect (`Auto` detects).
pub fn parse_with(input: &str, dialect: Dialect) -> Vec<Table> {
    let dialect = dialect.resolve(input);
    log::debug!("parsing schema as {:?}", dialect);

    let tables = match dialect {
        Dialect::Sql => sql::parse(input),
        Dialect::Dbml => dbml::parse(input),
        Dialect::Shorthand | Dialect::Auto => shorthand::parse(input),
    };

    log::debug!("parsed {} tables", tables.len());
    tables
}

/// Drop foreign keys whose target table, and with `require_column` the target
/// column, was not declared anywhere in the input.
fn drop_dangling(tables: &mut [Table], require_column: bool) {
    let targets: Vec<(String, Vec<String>)> = tables
        .iter()
        .map(|t| (t.name.clone(), t.columns.iter().map(|c| c.name.clone()).collect()))
        .collect();

    for table in tables.iter_mut() {
        let owner = table.name.clone();
        table.foreign_keys.retain(|fk| {
            let found = targets.iter().any(|(name, columns)| {
                *name == fk.reference_table
                    && (!require_column || columns.contains(&fk.reference_column))
            });
            if !found {
                log::debug!(
                    "dropping reference {}.{} -> {}.{}",
                    owner,
                    fk.column,
                    fk.reference_table,
                    fk.reference_column
                );
            }
            found
        });
    }
}
