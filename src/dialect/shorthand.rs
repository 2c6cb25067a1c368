//! Simplified `Table Name { col type [opts] }` notation.
//!
//! Inline references only honour `>`; a `<` line is recognised and ignored.
//! Dotted `a.b > c.d` references anywhere in the text are bound in a second
//! pass once every table is known.

use std::sync::LazyLock;

use regex::Regex;

use super::drop_dangling;
use super::markers::{is_not_null, is_primary_key, unquote};
use crate::enums::{self, EnumRegistry};
use crate::model::{table_index, Column, ForeignKey, RelationType, Table};

static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)enum\s+(\w+)\s*\{\s*([^}]*)\s*\}").unwrap());

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Table\s+(\w+)\s*\{([^}]*)\}").unwrap());

static COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s+(\w+(?:\(\d+\))?)\s*(?:\[(.*)\])?").unwrap());

/// `[ref:|fk:] column > Table.column`
static LINE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:ref:|fk:)?\s*(\w+)\s*([<>])\s*(\w+)\.(\w+)").unwrap());

/// `column type [ref: > Table.column]`
static ATTACHED_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\w+)\b.*\b(?:ref|fk)\s*:\s*([<>])\s*(\w+)\.(\w+)").unwrap()
});

static GLOBAL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:ref:|fk:)?\s*(\w+)\.(\w+)\s*([<>])\s*(\w+)\.(\w+)").unwrap()
});

pub(super) fn parse(input: &str) -> Vec<Table> {
    let enums = scan_enums(input);

    let mut tables: Vec<Table> = TABLE_RE
        .captures_iter(input)
        .map(|caps| parse_table(&caps[1], &caps[2]))
        .collect();

    drop_dangling(&mut tables, false);
    bind_global_refs(input, &mut tables);
    enums::propagate(&mut tables, &enums);
    tables
}

fn scan_enums(input: &str) -> EnumRegistry {
    let mut enums = EnumRegistry::new();
    for caps in ENUM_RE.captures_iter(input) {
        let members = caps[2]
            .split(',')
            .map(unquote)
            .filter(|v| !v.is_empty())
            .collect();
        enums.insert(&caps[1], members);
    }
    enums
}

fn parse_table(name: &str, body: &str) -> Table {
    log::debug!("table {}", name);
    let mut table = Table::new(name);

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // A line may yield both a column and a foreign key
        if let Some(caps) = COLUMN_RE.captures(line) {
            let options = caps.get(3).map_or("", |m| m.as_str());
            let mut column = Column::new(&caps[1], &caps[2]);
            column.is_primary_key = is_primary_key(options);
            column.is_nullable = !is_not_null(options);
            table.columns.push(column);
        }

        let reference = LINE_REF_RE
            .captures(line)
            .or_else(|| ATTACHED_REF_RE.captures(line));
        if let Some(caps) = reference {
            if &caps[2] == ">" {
                table.foreign_keys.push(ForeignKey::new(
                    &caps[1],
                    &caps[3],
                    &caps[4],
                    Some(RelationType::OneToMany),
                ));
            } else {
                log::trace!("ignoring inbound reference in {}: {}", name, line);
            }
        }
    }

    table
}

/// `>` means the left column references the right one, `<` the reverse.
fn bind_global_refs(input: &str, tables: &mut [Table]) {
    for caps in GLOBAL_REF_RE.captures_iter(input) {
        let (left_table, left_column) = (&caps[1], &caps[2]);
        let (right_table, right_column) = (&caps[4], &caps[5]);

        let (Some(left), Some(right)) = (table_index(tables, left_table), table_index(tables, right_table))
        else {
            log::debug!("dropping reference {}", &caps[0].trim());
            continue;
        };

        if &caps[3] == ">" {
            tables[left].foreign_keys.push(ForeignKey::new(
                left_column,
                right_table,
                right_column,
                Some(RelationType::OneToMany),
            ));
        } else {
            tables[right].foreign_keys.push(ForeignKey::new(
                right_column,
                left_table,
                left_column,
                Some(RelationType::OneToMany),
            ));
        }
    }
}
