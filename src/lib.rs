pub mod dialect;
pub mod diagram;
pub mod enums;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod report;

use wasm_bindgen::prelude::*;

pub use dialect::{Dialect, parse_schema, parse_with};
pub use diagram::{DiagramDocument, GridLayout};
pub use model::{Column, ColumnRef, ForeignKey, RelationType, Table};
pub use parser::parse_strict;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse schema text (any dialect) to a JSON table list
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema_json(source: &str, dialect: Option<String>) -> Result<String, String> {
    let dialect = match dialect.as_deref() {
        Some(name) => Dialect::from_str(name).ok_or_else(|| format!("Unknown dialect: {}", name))?,
        None => Dialect::Auto,
    };
    let tables = parse_with(source, dialect);
    serde_json::to_string(&tables).map_err(|e| e.to_string())
}

/// Strict grammar path. Malformed input yields `undefined` instead of an error.
#[wasm_bindgen(js_name = "parseSchemaStrict")]
pub fn parse_schema_strict_json(source: &str) -> Option<String> {
    match parse_strict(source) {
        Ok(tables) => serde_json::to_string(&tables).ok(),
        Err(e) => {
            log::debug!("strict parse failed: {}", e);
            None
        }
    }
}

/// Parse schema text and build the diagram document JSON with the default grid
#[wasm_bindgen(js_name = "generateDiagram")]
pub fn generate_diagram(source: &str) -> Result<String, String> {
    let tables = parse_schema(source);
    DiagramDocument::from_tables(&tables, &GridLayout::default())
        .with_source(source)
        .to_json()
        .map_err(|e| e.to_string())
}

/// Validate and normalize an imported diagram document
#[wasm_bindgen(js_name = "importDiagram")]
pub fn import_diagram(json: &str) -> Result<String, String> {
    DiagramDocument::from_json(json)
        .and_then(|doc| doc.to_json())
        .map_err(|e| e.to_string())
}
