//! Request payload validation
//!
//! Converts loosely-typed JSON bodies into the typed model and back. All
//! shape checks happen here, before a request reaches the registry or any
//! lock.
//!
//! ## Row shape
//! ```text
//! [ { "0": { "text": "a", "foreground": "#000000", "font": {"bold": true} },
//!     "1": "plain text cell",
//!     "note": ... },                 <- non-integer key, ignored
//!   ... ]
//! ```

use serde_json::{json, Map, Value};

use crate::error::{GridError, Result};
use crate::model::{
    Alignment, Cell, Color, Font, HAlign, MergeSpan, ResourceKey, Row, TableSnapshot, VAlign,
};

/// Body field holding rows
pub const ROWS_FIELD: &str = "data";

/// Body field holding merge spans
pub const MERGES_FIELD: &str = "merged_cells";

/// `get_all` data field holding rows
pub const TABLE_DATA_FIELD: &str = "table_data";

fn malformed(msg: impl Into<String>) -> GridError {
    GridError::MalformedPayload(msg.into())
}

// =============================================================================
// Resource key
// =============================================================================

/// Read and validate `{target, database, collection}`.
///
/// Also accepts `uri`, `db_name` and `collection_name`.
pub fn parse_key(body: &Map<String, Value>) -> Result<ResourceKey> {
    let key = ResourceKey::new(
        string_field(body, &["target", "uri"])?,
        string_field(body, &["database", "db_name"])?,
        string_field(body, &["collection", "collection_name"])?,
    );
    key.validate()?;
    Ok(key)
}

fn string_field(body: &Map<String, Value>, names: &[&str]) -> Result<String> {
    for name in names {
        match body.get(*name) {
            Some(Value::String(s)) => return Ok(s.clone()),
            Some(Value::Null) | None => continue,
            Some(other) => {
                return Err(malformed(format!("{} must be a string, got {}", name, kind(other))))
            }
        }
    }
    Err(malformed(format!("missing field {}", names[0])))
}

pub fn key_to_json(key: &ResourceKey, body: &mut Map<String, Value>) {
    body.insert("target".to_string(), Value::String(key.target.clone()));
    body.insert("database".to_string(), Value::String(key.database.clone()));
    body.insert("collection".to_string(), Value::String(key.collection.clone()));
}

// =============================================================================
// Rows
// =============================================================================

/// Parse a row list. Column keys that are not non-negative integers are
/// skipped; anything else that is off-shape is rejected.
pub fn parse_rows(value: &Value) -> Result<Vec<Row>> {
    let rows = value
        .as_array()
        .ok_or_else(|| malformed(format!("rows must be an array, got {}", kind(value))))?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| parse_row(index, row))
        .collect()
}

fn parse_row(index: usize, value: &Value) -> Result<Row> {
    let entries = value
        .as_object()
        .ok_or_else(|| malformed(format!("row {} must be an object, got {}", index, kind(value))))?;

    let mut row = Row::new();
    for (col_key, cell_value) in entries {
        let Ok(col) = col_key.parse::<u32>() else {
            tracing::trace!("Ignoring non-column key {:?} in row {}", col_key, index);
            continue;
        };
        let at = |msg: String| malformed(format!("row {}, column {}: {}", index, col, msg));

        let cell = match cell_value {
            Value::Object(fields) => parse_cell(fields).map_err(|e| match e {
                GridError::MalformedPayload(msg) => at(msg),
                other => other,
            })?,
            Value::String(text) => Cell::from_text(text.clone()),
            Value::Null => continue,
            other => return Err(at(format!("cell must be an object or string, got {}", kind(other)))),
        };
        row.insert(col, cell);
    }
    Ok(row)
}

fn parse_cell(fields: &Map<String, Value>) -> Result<Cell> {
    let mut cell = Cell::default();

    cell.text = match fields.get("text") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return Err(malformed(format!("text must be a string, got {}", kind(other)))),
    };
    cell.foreground = optional(fields, "foreground", parse_color)?;
    cell.background = optional(fields, "background", parse_color)?;
    cell.alignment = optional(fields, "alignment", parse_alignment)?;
    cell.font = optional(fields, "font", parse_font)?;
    cell.row_height = optional(fields, "row_height", |v| parse_u32("row_height", v))?;
    cell.column_width = optional(fields, "column_width", |v| parse_u32("column_width", v))?;

    Ok(cell)
}

/// Apply `parse` to `fields[name]` unless it is absent or null
fn optional<T>(
    fields: &Map<String, Value>,
    name: &str,
    parse: impl Fn(&Value) -> Result<T>,
) -> Result<Option<T>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}

fn parse_color(value: &Value) -> Result<Color> {
    match value {
        Value::String(s) => s.parse(),
        other => Err(malformed(format!("color must be a string, got {}", kind(other)))),
    }
}

fn parse_alignment(value: &Value) -> Result<Alignment> {
    match value {
        Value::Number(_) => Ok(Alignment::from_flags(parse_u32("alignment", value)?)),
        Value::Object(fields) => {
            let horizontal = match fields.get("horizontal").and_then(Value::as_str) {
                None => HAlign::default(),
                Some("left") => HAlign::Left,
                Some("right") => HAlign::Right,
                Some("center") => HAlign::Center,
                Some("justify") => HAlign::Justify,
                Some(other) => return Err(malformed(format!("unknown horizontal alignment {:?}", other))),
            };
            let vertical = match fields.get("vertical").and_then(Value::as_str) {
                None => VAlign::default(),
                Some("top") => VAlign::Top,
                Some("bottom") => VAlign::Bottom,
                Some("middle") | Some("center") => VAlign::Middle,
                Some(other) => return Err(malformed(format!("unknown vertical alignment {:?}", other))),
            };
            Ok(Alignment::new(horizontal, vertical))
        }
        other => Err(malformed(format!(
            "alignment must be flags or an object, got {}",
            kind(other)
        ))),
    }
}

fn parse_font(value: &Value) -> Result<Font> {
    let fields = value
        .as_object()
        .ok_or_else(|| malformed(format!("font must be an object, got {}", kind(value))))?;

    let bold = match fields.get("bold") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => return Err(malformed(format!("font.bold must be a boolean, got {}", kind(other)))),
    };
    let size = optional(fields, "size", |v| parse_u32("font.size", v))?;
    if size == Some(0) {
        return Err(malformed("font.size must be greater than 0"));
    }

    Ok(Font { bold, size })
}

fn parse_u32(name: &str, value: &Value) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| malformed(format!("{} must be a non-negative integer, got {}", name, value)))
}

pub fn rows_to_json(rows: &[Row]) -> Value {
    Value::Array(rows.iter().map(row_to_json).collect())
}

pub fn row_to_json(row: &Row) -> Value {
    let entries = row
        .iter()
        .map(|(col, cell)| (col.to_string(), cell_to_json(cell)))
        .collect::<Map<_, _>>();
    Value::Object(entries)
}

/// Only fields that are set are written
pub fn cell_to_json(cell: &Cell) -> Value {
    let mut fields = Map::new();
    if let Some(text) = &cell.text {
        fields.insert("text".to_string(), json!(text));
    }
    if let Some(color) = cell.foreground {
        fields.insert("foreground".to_string(), json!(color.to_string()));
    }
    if let Some(color) = cell.background {
        fields.insert("background".to_string(), json!(color.to_string()));
    }
    if let Some(alignment) = cell.alignment {
        fields.insert(
            "alignment".to_string(),
            json!({ "horizontal": alignment.horizontal, "vertical": alignment.vertical }),
        );
    }
    if let Some(font) = cell.font {
        let mut font_fields = Map::new();
        if let Some(bold) = font.bold {
            font_fields.insert("bold".to_string(), json!(bold));
        }
        if let Some(size) = font.size {
            font_fields.insert("size".to_string(), json!(size));
        }
        fields.insert("font".to_string(), Value::Object(font_fields));
    }
    if let Some(height) = cell.row_height {
        fields.insert("row_height".to_string(), json!(height));
    }
    if let Some(width) = cell.column_width {
        fields.insert("column_width".to_string(), json!(width));
    }
    Value::Object(fields)
}

// =============================================================================
// Merge spans
// =============================================================================

pub fn parse_spans(value: &Value) -> Result<Vec<MergeSpan>> {
    let spans = value
        .as_array()
        .ok_or_else(|| malformed(format!("merged cells must be an array, got {}", kind(value))))?;

    spans
        .iter()
        .enumerate()
        .map(|(index, span)| {
            let fields = span.as_object().ok_or_else(|| {
                malformed(format!("merged cell {} must be an object, got {}", index, kind(span)))
            })?;
            let field = |name: &str| {
                let value = fields
                    .get(name)
                    .ok_or_else(|| malformed(format!("merged cell {}: missing {}", index, name)))?;
                parse_u32(name, value)
                    .map_err(|_| malformed(format!("merged cell {}: {} must be a non-negative integer", index, name)))
            };
            let span = MergeSpan::new(field("row")?, field("col")?, field("row_span")?, field("col_span")?);
            span.validate()?;
            Ok(span)
        })
        .collect()
}

pub fn spans_to_json(spans: &[MergeSpan]) -> Value {
    Value::Array(
        spans
            .iter()
            .map(|s| {
                json!({
                    "row": s.row,
                    "col": s.col,
                    "row_span": s.row_span,
                    "col_span": s.col_span,
                })
            })
            .collect(),
    )
}

// =============================================================================
// Snapshots
// =============================================================================

/// `{"table_data": [...], "merged_cells": [...]}`
pub fn snapshot_to_json(snapshot: &TableSnapshot) -> Value {
    json!({
        TABLE_DATA_FIELD: rows_to_json(&snapshot.rows),
        MERGES_FIELD: spans_to_json(&snapshot.merges),
    })
}

pub fn parse_snapshot(value: &Value) -> Result<TableSnapshot> {
    let rows = value
        .get(TABLE_DATA_FIELD)
        .ok_or_else(|| malformed(format!("missing {}", TABLE_DATA_FIELD)))?;
    let merges = value
        .get(MERGES_FIELD)
        .ok_or_else(|| malformed(format!("missing {}", MERGES_FIELD)))?;
    Ok(TableSnapshot::new(parse_rows(rows)?, parse_spans(merges)?))
}

/// JSON type name for error messages
fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
