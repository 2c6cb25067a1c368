//! Enum registry and propagation onto columns.

use crate::model::Table;
use linked_hash_map::LinkedHashMap;

/// Enum name to members, in declaration order. Lives for one parse call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumRegistry {
    enums: LinkedHashMap<String, Vec<String>>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enum. A later declaration with the same name replaces the earlier one.
    pub fn insert(&mut self, name: impl Into<String>, members: Vec<String>) {
        let name = name.into();
        log::debug!("enum {} with {} members", name, members.len());
        self.enums.insert(name, members);
    }

    pub fn get(&self, name: &str) -> Option<&Vec<String>> {
        self.enums.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }
}

/// Attach enum members to every column whose type names a registered enum.
///
/// Type matching is exact and case-sensitive. Columns of other types are left untouched.
pub fn propagate(tables: &mut [Table], enums: &EnumRegistry) {
    if enums.is_empty() {
        return;
    }

    for table in tables.iter_mut() {
        for column in table.columns.iter_mut() {
            if let Some(members) = enums.get(&column.typ) {
                column.is_enum = true;
                column.enum_values = Some(members.clone());
            }
        }
    }
}

/// Collect the enum map back out of a propagated table list, keyed by column type.
pub fn collect(tables: &[Table]) -> LinkedHashMap<String, Vec<String>> {
    let mut map = LinkedHashMap::new();
    for column in tables.iter().flat_map(|t| t.columns.iter()) {
        if !column.is_enum {
            continue;
        }
        if let Some(values) = &column.enum_values {
            map.insert(column.typ.clone(), values.clone());
        }
    }
    map
}
