//! `CREATE TABLE` / `CREATE TYPE ... AS ENUM` statements.
//!
//! Known limitations, kept on purpose:
//! - a table body ends at the first `)` whose remainder up to the next `;`
//!   holds no other `)`;
//! - column definitions are split on every comma, so `decimal(10,2)` is read
//!   as type `decimal` and the `2)` fragment is dropped.

use std::sync::LazyLock;

use regex::Regex;

use super::drop_dangling;
use crate::enums::{self, EnumRegistry};
use crate::model::{Column, ForeignKey, Table};

static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CREATE\s+TYPE\s+(\w+)\s+AS\s+ENUM\s*\(\s*((?:'[^']*'(?:\s*,\s*'[^']*')*)\s*)\)")
        .unwrap()
});

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[`"]?\w+[`"]?\.)?[`"]?(\w+)[`"]?\s*\(([\s\S]*?)\)[^)]*?;"#,
    )
    .unwrap()
});

static FK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:FOREIGN\s+KEY|FK)\s*\(\s*[`"]?(\w+)[`"]?\s*\)\s*REFERENCES\s+[`"]?(\w+)[`"]?\s*\(\s*[`"]?(\w+)[`"]?\s*\)"#,
    )
    .unwrap()
});

static INLINE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bREFERENCES\s+(?:[`"]?\w+[`"]?\.)?[`"]?(\w+)[`"]?(?:\s*\(\s*[`"]?(\w+)[`"]?\s*\))?"#,
    )
    .unwrap()
});

static PK_CONSTRAINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:CONSTRAINT\s+\S+\s+)?PRIMARY\s+KEY\s*\((.*)$").unwrap()
});

/// Table-level `UNIQUE`/`INDEX`/`KEY`/`CHECK` constraints. The keyword alone is not
/// enough: `key VARCHAR(64)` is a column, `KEY idx (key)` is not. A constraint's
/// parenthesised list starts with a name, a column type's precision with a digit.
static TABLE_CONSTRAINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(?:(?:UNIQUE(?:\s+(?:KEY|INDEX))?|INDEX|KEY)\s*(?:[`"]?\w+[`"]?\s*)?\(\s*[`"]?[A-Za-z_]|CHECK\s*\(|CONSTRAINT\s+\S+\s+(?:UNIQUE|CHECK)\b)"#,
    )
    .unwrap()
});

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^[`"]?(\w+)[`"]?\s+(\w+(?:\(\d+(?:,\d+)?\))?)"#).unwrap()
});

static NOT_NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b|\bNN\b").unwrap());

static PRIMARY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b|\bPK\b").unwrap());

pub(super) fn parse(input: &str) -> Vec<Table> {
    let enums = scan_enums(input);

    let mut tables: Vec<Table> = TABLE_RE
        .captures_iter(input)
        .map(|caps| parse_table(&caps[1], &caps[2]))
        .collect();

    drop_dangling(&mut tables, true);
    enums::propagate(&mut tables, &enums);
    tables
}

fn scan_enums(input: &str) -> EnumRegistry {
    let mut enums = EnumRegistry::new();
    for caps in ENUM_RE.captures_iter(input) {
        let members = caps[2]
            .split(',')
            .map(|v| {
                let v = v.trim();
                let v = v.strip_prefix('\'').unwrap_or(v);
                v.strip_suffix('\'').unwrap_or(v).to_string()
            })
            .filter(|v| !v.is_empty())
            .collect();
        enums.insert(&caps[1], members);
    }
    enums
}

fn parse_table(name: &str, body: &str) -> Table {
    log::debug!("table {}", name);

    let mut table = Table::new(name);
    let mut pk_columns: Vec<String> = Vec::new();
    // Inside a table-level PRIMARY KEY list that the comma split cut apart
    let mut in_pk_list = false;

    for fragment in body.split(',') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        if in_pk_list {
            in_pk_list = collect_key_names(fragment, &mut pk_columns);
            continue;
        }

        if let Some(caps) = FK_RE.captures(fragment) {
            table
                .foreign_keys
                .push(ForeignKey::new(&caps[1], &caps[2], &caps[3], None));
            continue;
        }

        if let Some(caps) = PK_CONSTRAINT_RE.captures(fragment) {
            in_pk_list = collect_key_names(&caps[1], &mut pk_columns);
            continue;
        }

        if TABLE_CONSTRAINT_RE.is_match(fragment) {
            log::trace!("skipping constraint in {}: {}", name, fragment);
            continue;
        }

        match parse_column(fragment) {
            Some((column, reference)) => {
                if let Some(fk) = reference {
                    table.foreign_keys.push(fk);
                }
                table.columns.push(column);
            }
            None => log::trace!("skipping fragment in {}: {}", name, fragment),
        }
    }

    for column in table.columns.iter_mut() {
        if pk_columns.contains(&column.name) {
            column.is_primary_key = true;
        }
    }

    table
}

/// Push the names of a `PRIMARY KEY (...)` list fragment. Returns whether the list continues.
fn collect_key_names(fragment: &str, names: &mut Vec<String>) -> bool {
    let (list, closed) = match fragment.find(')') {
        Some(end) => (&fragment[..end], true),
        None => (fragment, false),
    };
    names.extend(
        list.split(',')
            .map(|n| n.trim().trim_matches(|c| c == '`' || c == '"').to_string())
            .filter(|n| !n.is_empty()),
    );
    !closed
}

fn parse_column(fragment: &str) -> Option<(Column, Option<ForeignKey>)> {
    let caps = COLUMN_RE.captures(fragment)?;
    let whole = caps.get(0)?;
    let name = &caps[1];
    let rest = &fragment[whole.end()..];

    let mut column = Column::new(name, &caps[2]);
    column.is_nullable = !NOT_NULL_RE.is_match(rest);
    column.is_primary_key =
        PRIMARY_KEY_RE.is_match(rest) || name.to_lowercase().starts_with("pk_");

    let reference = INLINE_REF_RE.captures(rest).map(|r| {
        let target_column = r.get(2).map_or("id", |m| m.as_str());
        ForeignKey::new(name, &r[1], target_column, None)
    });

    Some((column, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_table() {
        let sql = r#"
            CREATE TABLE users (
                id INT PRIMARY KEY,
                email VARCHAR(255) NOT NULL
            );
        "#;

        let tables = parse(sql);
        assert_eq!(tables.len(), 1);

        let users = &tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.columns.len(), 2);

        assert_eq!(users.columns[0].name, "id");
        assert_eq!(users.columns[0].typ, "INT");
        assert!(users.columns[0].is_primary_key);
        assert!(users.columns[0].is_nullable);

        assert_eq!(users.columns[1].name, "email");
        assert_eq!(users.columns[1].typ, "VARCHAR(255)");
        assert!(!users.columns[1].is_primary_key);
        assert!(!users.columns[1].is_nullable);
    }

    #[test]
    fn test_shorthand_markers() {
        let sql = "CREATE TABLE t (id INT NN PK, name TEXT);";
        let t = &parse(sql)[0];
        assert!(t.columns[0].is_primary_key);
        assert!(!t.columns[0].is_nullable);
        assert!(!t.columns[1].is_primary_key);
        assert!(t.columns[1].is_nullable);
    }

    #[test]
    fn test_marker_order_does_not_matter() {
        let sql = "CREATE TABLE t (a INT PRIMARY KEY NOT NULL, b INT NOT NULL PRIMARY KEY);";
        let t = &parse(sql)[0];
        for col in &t.columns {
            assert!(col.is_primary_key, "{}", col.name);
            assert!(!col.is_nullable, "{}", col.name);
        }
    }

    #[test]
    fn test_pk_prefix_name_is_primary_key() {
        let sql = "CREATE TABLE t (pk_id INT, PK_code TEXT, upkeep INT);";
        let t = &parse(sql)[0];
        assert!(t.columns[0].is_primary_key);
        assert!(t.columns[1].is_primary_key);
        assert!(!t.columns[2].is_primary_key);
    }

    #[test]
    fn test_quoted_table_and_column_names() {
        let sql = "CREATE TABLE `orders` (`id` INT PK, \"total\" INT);";
        let t = &parse(sql)[0];
        assert_eq!(t.name, "orders");
        assert_eq!(t.columns[0].name, "id");
        assert_eq!(t.columns[1].name, "total");
    }

    #[test]
    fn test_foreign_key_constraint() {
        let sql = r#"
            CREATE TABLE users (id INT PRIMARY KEY);
            CREATE TABLE posts (
                id INT PRIMARY KEY,
                author_id INT,
                FOREIGN KEY (author_id) REFERENCES users(id)
            );
        "#;
        let t = &parse(sql)[1];
        assert_eq!(t.columns.len(), 2);
        assert_eq!(
            t.foreign_keys,
            vec![ForeignKey::new("author_id", "users", "id", None)]
        );
        assert_eq!(t.foreign_keys[0].cardinality(), RelationType::OneToMany);
    }

    #[test]
    fn test_fk_shorthand_constraint() {
        let sql = "CREATE TABLE users (id INT);\nCREATE TABLE posts (id INT, author_id INT, FK(author_id) REFERENCES users(id));";
        let t = &parse(sql)[1];
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.foreign_keys.len(), 1);
        assert_eq!(t.foreign_keys[0].reference_table, "users");
    }

    #[test]
    fn test_named_foreign_key_constraint() {
        let sql = "CREATE TABLE users (id INT);\nCREATE TABLE posts (id INT, uid INT, CONSTRAINT fk_user FOREIGN KEY (uid) REFERENCES users (id));";
        let t = &parse(sql)[1];
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.foreign_keys[0].column, "uid");
    }

    #[test]
    fn test_inline_references() {
        let sql = "CREATE TABLE orders (id INT PK, user_id INT NOT NULL REFERENCES users(id), preferences TEXT);\nCREATE TABLE users (id INT PK);";
        let t = &parse(sql)[0];
        assert_eq!(t.columns.len(), 3);
        assert!(!t.columns[1].is_nullable);
        assert_eq!(t.columns[2].name, "preferences");
        assert_eq!(
            t.foreign_keys,
            vec![ForeignKey::new("user_id", "users", "id", None)]
        );
    }

    #[test]
    fn test_table_level_primary_key() {
        let sql = "CREATE TABLE m (a INT, b INT, c INT, PRIMARY KEY (a, b));";
        let t = &parse(sql)[0];
        assert_eq!(t.columns.len(), 3);
        assert!(t.columns[0].is_primary_key);
        assert!(t.columns[1].is_primary_key);
        assert!(!t.columns[2].is_primary_key);
    }

    #[test]
    fn test_unique_and_check_constraints_are_skipped() {
        let sql = "CREATE TABLE t (id INT, email TEXT, UNIQUE (email), CHECK (id > 0));";
        let t = &parse(sql)[0];
        assert_eq!(t.columns.len(), 2);
    }

    #[test]
    fn test_keyword_named_columns_are_kept() {
        let sql = "CREATE TABLE settings (id INT PK, key VARCHAR(64) NOT NULL, index INT, unique BOOLEAN, check CHAR(1), value TEXT, KEY idx_key (key), UNIQUE KEY uq_value (value), CONSTRAINT ck_check CHECK (check <> 'x'));";
        let t = &parse(sql)[0];
        let names: Vec<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "key", "index", "unique", "check", "value"]);
        assert_eq!(t.columns[1].typ, "VARCHAR(64)");
        assert!(!t.columns[1].is_nullable);
        assert_eq!(t.columns[4].typ, "CHAR(1)");
    }

    #[test]
    fn test_decimal_precision_is_split_naively() {
        let sql = "CREATE TABLE p (id INT, price decimal(10,2) NOT NULL, qty INT);";
        let t = &parse(sql)[0];
        let names: Vec<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "price", "qty"]);
        assert_eq!(t.columns[1].typ, "decimal");
        // the NOT NULL marker sat in the dropped "2) NOT NULL" fragment
        assert!(t.columns[1].is_nullable);
    }

    #[test]
    fn test_body_with_table_options() {
        let sql = "CREATE TABLE t (id INT, name VARCHAR(10)) ENGINE=InnoDB;\nCREATE TABLE u (id INT);";
        let tables = parse(sql);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns[1].typ, "VARCHAR(10)");
        assert_eq!(tables[1].name, "u");
    }

    #[test]
    fn test_if_not_exists_and_schema_prefix() {
        let sql = "CREATE TABLE IF NOT EXISTS public.users (id INT PK);";
        let tables = parse(sql);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
    }

    #[test]
    fn test_create_type_enum() {
        let sql = r#"
            CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');
            CREATE TABLE person (
                id INT PRIMARY KEY,
                current_mood mood NOT NULL,
                name TEXT
            );
        "#;
        let t = &parse(sql)[0];
        let mood = &t.columns[1];
        assert!(mood.is_enum);
        assert_eq!(
            mood.enum_values,
            Some(vec!["sad".to_string(), "ok".to_string(), "happy".to_string()])
        );
        assert!(!t.columns[2].is_enum);
        assert_eq!(t.columns[2].enum_values, None);
    }

    #[test]
    fn test_missing_terminator_yields_nothing() {
        assert!(parse("CREATE TABLE t (id INT)").is_empty());
    }

    #[test]
    fn test_dangling_references_are_dropped() {
        let sql = r#"
            CREATE TABLE a (id INT, b_id INT, FOREIGN KEY (id) REFERENCES nowhere(id));
            CREATE TABLE b (id INT);
            CREATE TABLE c (a_id INT REFERENCES a(missing), b_id INT REFERENCES b);
        "#;
        let tables = parse(sql);
        assert_eq!(tables.len(), 3);
        assert!(tables[0].foreign_keys.is_empty());
        // bare REFERENCES b targets b.id
        assert_eq!(
            tables[2].foreign_keys,
            vec![ForeignKey::new("b_id", "b", "id", None)]
        );
    }

    #[test]
    fn test_forward_and_backward_references_match() {
        let backward = "CREATE TABLE u (id INT);\nCREATE TABLE p (uid INT, FOREIGN KEY (uid) REFERENCES u(id));";
        let forward = "CREATE TABLE p (uid INT, FOREIGN KEY (uid) REFERENCES u(id));\nCREATE TABLE u (id INT);";
        let fk_of = |sql: &str| {
            parse(sql)
                .into_iter()
                .find(|t| t.name == "p")
                .map(|t| t.foreign_keys)
        };
        assert_eq!(fk_of(backward), fk_of(forward));
        assert_eq!(fk_of(forward).map(|fks| fks.len()), Some(1));
    }
}
