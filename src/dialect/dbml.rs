//! DBML-like `Table` / `Enum` blocks with standalone `ref:` relations.

use std::sync::LazyLock;

use regex::Regex;

use super::markers::{is_not_null, is_primary_key, unquote};
use crate::enums::{self, EnumRegistry};
use crate::model::{table_index, Column, ForeignKey, RelationType, Table};

static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Enum\s+(\w+)\s*\{([^}]*)\}").unwrap());

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Table\s+(\w+)\s*\{([^}]*)\}").unwrap());

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s+(\w+(?:\(\d+(?:,\d+)?\))?)\s*(?:\[(.*)\])?").unwrap()
});

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ref:\s*(\w+)\.(\w+)\s*([<>-])\s*(\w+)\.(\w+)").unwrap()
});

pub(super) fn parse(input: &str) -> Vec<Table> {
    let enums = scan_enums(input);

    let mut tables: Vec<Table> = TABLE_RE
        .captures_iter(input)
        .map(|caps| parse_table(&caps[1], &caps[2]))
        .collect();

    bind_refs(input, &mut tables);
    enums::propagate(&mut tables, &enums);
    tables
}

/// One member per line; quotes and trailing commas stripped. Several members
/// sharing a line are split on their commas.
fn scan_enums(input: &str) -> EnumRegistry {
    let mut enums = EnumRegistry::new();
    for caps in ENUM_RE.captures_iter(input) {
        let members = caps[2]
            .lines()
            .flat_map(|line| line.split(','))
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
        let Some(caps) = COLUMN_RE.captures(line) else {
            log::trace!("skipping line in {}: {}", name, line);
            continue;
        };
        let options = caps.get(3).map_or("", |m| m.as_str());
        let mut column = Column::new(&caps[1], &caps[2]);
        column.is_primary_key = is_primary_key(options);
        column.is_nullable = !is_not_null(options);
        table.columns.push(column);
    }

    table
}

/// `ref: A.a <op> B.b` always lands on the right-hand table `B`, as column `b`
/// referencing `A.a`. `<` and `>` give one-to-many, `-` one-to-one.
fn bind_refs(input: &str, tables: &mut [Table]) {
    for caps in REF_RE.captures_iter(input) {
        let (source_table, source_column) = (&caps[1], &caps[2]);
        let (target_table, target_column) = (&caps[4], &caps[5]);

        let Some(target) = table_index(tables, target_table) else {
            log::debug!("dropping reference {}", caps[0].trim());
            continue;
        };

        let relation_type = match &caps[3] {
            "<" | ">" => RelationType::OneToMany,
            _ => RelationType::OneToOne,
        };
        tables[target].foreign_keys.push(ForeignKey::new(
            target_column,
            source_table,
            source_column,
            Some(relation_type),
        ));
    }
}
