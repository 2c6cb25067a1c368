//! Diagram document: grid-placed entities, relationships and enum data.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums;
use crate::model::{Column, RelationType, Table, find_table};

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid JSON format: entities and relationships must be arrays")]
    NotArrays,
    #[error("Invalid entity format in imported data (index {0})")]
    InvalidEntity(usize),
    #[error("Invalid relationship format in imported data (index {0})")]
    InvalidRelationship(usize),
}

/// Fixed grid placement for entities, filled row by row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub margin: f64,
    pub x_spacing: f64,
    pub y_spacing: f64,
    pub per_row: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            margin: 50.0,
            x_spacing: 300.0,
            y_spacing: 250.0,
            per_row: 3,
        }
    }
}

impl GridLayout {
    pub fn position(&self, index: usize) -> Position {
        let per_row = self.per_row.max(1);
        let row = index / per_row;
        let col = index % per_row;
        Position {
            x: self.margin + col as f64 * self.x_spacing,
            y: self.margin + row as f64 * self.y_spacing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub id: String,
    pub name: String,
    pub attributes: Vec<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub entity_id: String,
    pub attribute_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipData {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(rename = "type")]
    pub kind: RelationType,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    pub entities: Vec<EntityData>,
    pub relationships: Vec<RelationshipData>,
    #[serde(default)]
    pub enum_data: LinkedHashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_input: Option<String>,
}

fn entity_id(table: &str) -> String {
    format!("entity-{}", table)
}

/// `PK: id (int) NOT NULL`
fn describe(column: &Column) -> String {
    let mut desc = if column.is_primary_key {
        format!("PK: {}", column.name)
    } else {
        column.name.clone()
    };
    desc.push_str(&format!(" ({})", column.typ));
    if !column.is_nullable {
        desc.push_str(" NOT NULL");
    }
    desc
}

struct Link<'a> {
    column: &'a str,
    target_table: &'a str,
    target_column: &'a str,
    kind: RelationType,
}

impl DiagramDocument {
    /// Lay tables out on the grid and turn every resolvable reference into a relationship.
    pub fn from_tables(tables: &[Table], layout: &GridLayout) -> Self {
        let mut entities: Vec<EntityData> = tables
            .iter()
            .enumerate()
            .map(|(i, table)| EntityData {
                id: entity_id(&table.name),
                name: table.name.clone(),
                attributes: table.columns.iter().map(describe).collect(),
                position: layout.position(i),
            })
            .collect();

        let mut relationships = Vec::new();

        for (table_idx, table) in tables.iter().enumerate() {
            // Table-level keys first, then column-level references from the strict grammar
            let links = table
                .foreign_keys
                .iter()
                .map(|fk| Link {
                    column: &fk.column,
                    target_table: &fk.reference_table,
                    target_column: &fk.reference_column,
                    kind: fk.cardinality(),
                })
                .chain(table.columns.iter().filter_map(|c| {
                    c.foreign_key.as_ref().map(|r| Link {
                        column: &c.name,
                        target_table: &r.table,
                        target_column: &r.column,
                        kind: RelationType::default(),
                    })
                }));

            for (n, link) in links.enumerate() {
                let source_idx = table.column_index(link.column);
                let target_idx = find_table(tables, link.target_table)
                    .and_then(|t| t.column_index(link.target_column));

                let (Some(source_idx), Some(target_idx)) = (source_idx, target_idx) else {
                    log::debug!(
                        "no relationship for {}.{} -> {}.{}",
                        table.name,
                        link.column,
                        link.target_table,
                        link.target_column
                    );
                    continue;
                };

                entities[table_idx].attributes[source_idx].push_str(&format!(
                    " [ref: > {}.{}]",
                    link.target_table, link.target_column
                ));

                relationships.push(RelationshipData {
                    id: format!("relationship-{}-{}", table.name, n),
                    from: Endpoint {
                        entity_id: entity_id(&table.name),
                        attribute_index: source_idx,
                    },
                    to: Endpoint {
                        entity_id: entity_id(link.target_table),
                        attribute_index: target_idx,
                    },
                    kind: link.kind,
                });
            }
        }

        Self {
            entities,
            relationships,
            enum_data: enums::collect(tables),
            sql_input: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sql_input = Some(source.into());
        self
    }

    pub fn to_json(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import a document, checking its shape before deserializing.
    pub fn from_json(input: &str) -> Result<Self, DiagramError> {
        let value: Value = serde_json::from_str(input)?;
        validate(&value)?;
        Ok(serde_json::from_value(value)?)
    }
}

fn non_empty_str(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn validate(value: &Value) -> Result<(), DiagramError> {
    let (Some(entities), Some(relationships)) = (
        value.get("entities").and_then(Value::as_array),
        value.get("relationships").and_then(Value::as_array),
    ) else {
        return Err(DiagramError::NotArrays);
    };

    for (i, entity) in entities.iter().enumerate() {
        let position_ok = entity.get("position").is_some_and(|p| {
            p.get("x").is_some_and(Value::is_number) && p.get("y").is_some_and(Value::is_number)
        });
        let attributes_ok = entity.get("attributes").is_some_and(Value::is_array);

        if !non_empty_str(entity, "id") || !non_empty_str(entity, "name") || !attributes_ok || !position_ok {
            return Err(DiagramError::InvalidEntity(i));
        }
    }

    for (i, relationship) in relationships.iter().enumerate() {
        let ends_ok = relationship.get("from").is_some_and(Value::is_object)
            && relationship.get("to").is_some_and(Value::is_object);
        if !non_empty_str(relationship, "id") || !non_empty_str(relationship, "type") || !ends_ok {
            return Err(DiagramError::InvalidRelationship(i));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::parse_schema;
    use crate::parser::parse_strict;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
Table users {
  id int [pk]
  name varchar [nn]
}
Table posts {
  id int [pk]
  author_id int [ref: > users.id]
}
"#;

    #[test]
    fn test_grid_positions() {
        let layout = GridLayout::default();
        assert_eq!(layout.position(0), Position { x: 50.0, y: 50.0 });
        assert_eq!(layout.position(2), Position { x: 650.0, y: 50.0 });
        assert_eq!(layout.position(3), Position { x: 50.0, y: 300.0 });
        assert_eq!(layout.position(7), Position { x: 350.0, y: 550.0 });
    }

    #[test]
    fn test_grid_zero_per_row() {
        let layout = GridLayout {
            per_row: 0,
            ..GridLayout::default()
        };
        assert_eq!(layout.position(1), Position { x: 50.0, y: 300.0 });
    }

    #[test]
    fn test_entities_and_relationships() {
        let tables = parse_schema(SCHEMA);
        let doc = DiagramDocument::from_tables(&tables, &GridLayout::default());

        assert_eq!(doc.entities.len(), 2);
        assert_eq!(doc.entities[0].id, "entity-users");
        assert_eq!(
            doc.entities[0].attributes,
            vec!["PK: id (int)", "name (varchar) NOT NULL"]
        );
        assert_eq!(doc.entities[1].position, Position { x: 350.0, y: 50.0 });
        assert_eq!(
            doc.entities[1].attributes[1],
            "author_id (int) [ref: > users.id]"
        );

        assert_eq!(
            doc.relationships,
            vec![RelationshipData {
                id: "relationship-posts-0".into(),
                from: Endpoint {
                    entity_id: "entity-posts".into(),
                    attribute_index: 1,
                },
                to: Endpoint {
                    entity_id: "entity-users".into(),
                    attribute_index: 0,
                },
                kind: RelationType::OneToMany,
            }]
        );
    }

    #[test]
    fn test_unlocatable_column_is_skipped() {
        let tables = parse_schema("Table users {\n id int\n}\nTable posts {\n ref: uid > users.id\n}");
        assert_eq!(tables[1].foreign_keys.len(), 1);
        let doc = DiagramDocument::from_tables(&tables, &GridLayout::default());
        assert!(doc.relationships.is_empty());
    }

    #[test]
    fn test_column_level_references() {
        let tables = parse_strict(
            "Table users { id int }\nTable posts { uid int }\nRef: posts.uid < users.id",
        )
        .unwrap();
        let doc = DiagramDocument::from_tables(&tables, &GridLayout::default());
        assert_eq!(doc.relationships.len(), 1);
        assert_eq!(doc.relationships[0].from.entity_id, "entity-posts");
        assert_eq!(doc.relationships[0].to.entity_id, "entity-users");
    }

    #[test]
    fn test_enum_data() {
        let tables = parse_schema("Enum Status {\n on\n off\n}\nTable t {\n s Status\n}");
        let doc = DiagramDocument::from_tables(&tables, &GridLayout::default());
        assert_eq!(
            doc.enum_data.get("Status"),
            Some(&vec!["on".to_string(), "off".to_string()])
        );
    }

    #[test]
    fn test_json_round_trip_keeps_source() {
        let tables = parse_schema(SCHEMA);
        let doc = DiagramDocument::from_tables(&tables, &GridLayout::default()).with_source(SCHEMA);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"sqlInput\""));
        assert!(json.contains("\"attributeIndex\""));
        assert!(json.contains("\"one-to-many\""));
        assert_eq!(DiagramDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_import_without_enum_data() {
        let json = r#"{"entities": [], "relationships": []}"#;
        let doc = DiagramDocument::from_json(json).unwrap();
        assert!(doc.enum_data.is_empty());
        assert_eq!(doc.sql_input, None);
    }

    #[test]
    fn test_import_validation() {
        assert!(matches!(
            DiagramDocument::from_json(r#"{"entities": {}, "relationships": []}"#),
            Err(DiagramError::NotArrays)
        ));
        assert!(matches!(
            DiagramDocument::from_json(
                r#"{"entities": [{"id": "", "name": "a", "attributes": [], "position": {"x": 0, "y": 0}}], "relationships": []}"#
            ),
            Err(DiagramError::InvalidEntity(0))
        ));
        assert!(matches!(
            DiagramDocument::from_json(
                r#"{"entities": [{"id": "e", "name": "a", "attributes": [], "position": {"x": "0", "y": 0}}], "relationships": []}"#
            ),
            Err(DiagramError::InvalidEntity(0))
        ));
        assert!(matches!(
            DiagramDocument::from_json(
                r#"{"entities": [], "relationships": [{"id": "r", "from": {}, "to": {}}]}"#
            ),
            Err(DiagramError::InvalidRelationship(0))
        ));
        assert!(matches!(
            DiagramDocument::from_json("not json"),
            Err(DiagramError::Json(_))
        ));
    }
}
