//! Plain-text summary of a parsed table list.

use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use crate::model::{Column, Table};

/// Column flag markers shown in the summary.
fn flags(column: &Column) -> String {
    let mut out = Vec::new();
    if column.is_primary_key {
        out.push("PK");
    }
    if !column.is_nullable {
        out.push("NN");
    }
    if column.is_enum {
        out.push("ENUM");
    }
    out.join(" ")
}

/// Pad `text` to `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let mut s = text.to_string();
    let w = UnicodeWidthStr::width(text);
    if w < width {
        s.push_str(&" ".repeat(width - w));
    }
    s
}

#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub indent: usize,
    pub gap: usize,
}

impl Default for Summary {
    fn default() -> Self {
        Self { indent: 2, gap: 2 }
    }
}

impl Summary {
    pub fn render(&self, tables: &[Table]) -> String {
        let mut out = String::new();
        let indent = " ".repeat(self.indent);
        let gap = " ".repeat(self.gap);

        for (i, table) in tables.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }

            let _ = write!(out, "{}", table.name);
            if let Some(alias) = &table.alias {
                let _ = write!(out, " as {}", alias);
            }
            let _ = writeln!(out, " ({} columns)", table.columns.len());
            if let Some(note) = &table.note {
                let _ = writeln!(out, "{}# {}", indent, note);
            }

            let name_width = table
                .columns
                .iter()
                .map(|c| UnicodeWidthStr::width(c.name.as_str()))
                .max()
                .unwrap_or(0);
            let type_width = table
                .columns
                .iter()
                .map(|c| UnicodeWidthStr::width(c.typ.as_str()))
                .max()
                .unwrap_or(0);

            for column in &table.columns {
                let mut line = format!(
                    "{}{}{}{}",
                    indent,
                    pad(&column.name, name_width),
                    gap,
                    pad(&column.typ, type_width)
                );
                let f = flags(column);
                if !f.is_empty() {
                    line.push_str(&gap);
                    line.push_str(&f);
                }
                if let Some(target) = &column.foreign_key {
                    let _ = write!(line, "{}-> {}", gap, target);
                }
                let _ = writeln!(out, "{}", line.trim_end());
            }

            for fk in &table.foreign_keys {
                let _ = writeln!(
                    out,
                    "{}{} -> {}.{} ({})",
                    indent,
                    fk.column,
                    fk.reference_table,
                    fk.reference_column,
                    fk.cardinality()
                );
            }
        }

        out
    }
}
