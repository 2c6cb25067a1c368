use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub columns: Vec<Column>,
    /// Empty for the strict grammar, which records references on the column instead.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_name: Option<String>,
}

impl Column {
    /// A column with no markers: not a key, nullable.
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            is_primary_key: false,
            is_nullable: true,
            is_enum: false,
            enum_values: None,
            note: None,
            foreign_key: None,
            foreign_key_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub reference_table: String,
    pub reference_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationType>,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        reference_table: impl Into<String>,
        reference_column: impl Into<String>,
        relation_type: Option<RelationType>,
    ) -> Self {
        Self {
            column: column.into(),
            reference_table: reference_table.into(),
            reference_column: reference_column.into(),
            relation_type,
        }
    }

    /// Cardinality with the one-to-many default applied.
    pub fn cardinality(&self) -> RelationType {
        self.relation_type.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[default]
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dotted `Table.Column` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Split on the first dot. Paths without a dot are rejected.
    pub fn parse(path: &str) -> Option<Self> {
        let (table, column) = path.split_once('.')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some(Self::new(table, column))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl From<ColumnRef> for String {
    fn from(r: ColumnRef) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("invalid column reference: {}", s))
    }
}

pub(crate) fn find_table<'a>(tables: &'a [Table], name: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.name == name)
}

pub(crate) fn table_index(tables: &[Table], name: &str) -> Option<usize> {
    tables.iter().position(|t| t.name == name)
}
