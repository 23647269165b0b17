//! # Field Model
//!
//! Plain data describing the form elements placed on a template page:
//! pixel boxes in canonical page space, values, fonts, table structure and
//! signature slots.
//!
//! All types derive `Serialize + Deserialize` with camelCase keys, so the same
//! structs are used for the backend's JSON and for Rust construction.
//!
//! ```
//! use docflow::field::{Field, FieldType};
//!
//! let json = r#"{"id":"f1","label":"Name","type":"text","x":10,"y":20,"width":200,"height":30}"#;
//! let field: Field = serde_json::from_str(json).unwrap();
//! assert_eq!(field.field_type, FieldType::Text);
//! assert_eq!(field.font.size, 14.0);
//! assert_eq!(field.page, 1);
//! ```

mod table_value;
mod types;

pub use table_value::{MAX_TABLE_COLS, MAX_TABLE_ROWS, TableValue, is_valid_grid};
pub use types::*;

use thiserror::Error;

/// Validation failures for a single field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("field has an empty id")]
    MissingId,

    #[error("field '{id}': {axis} must be a finite, non-negative number (got {value})")]
    NegativeCoordinate {
        id: String,
        axis: &'static str,
        value: f64,
    },

    #[error("field '{id}': {axis} must be greater than zero (got {value})")]
    EmptyExtent {
        id: String,
        axis: &'static str,
        value: f64,
    },

    #[error("field '{id}': page numbers start at 1")]
    InvalidPage { id: String },

    #[error("signature '{id}' is already signed")]
    AlreadySigned { id: String },

    #[error("signature '{id}': payload is not a data-URI image")]
    NotAnImage { id: String },
}

/// Prefix every stored signature image starts with.
pub const IMAGE_DATA_URI_PREFIX: &str = "data:image/";

/// Whether a value is an inline data-URI image.
pub fn is_image_data_uri(value: &str) -> bool {
    value.starts_with(IMAGE_DATA_URI_PREFIX)
}

/// Decode a `coordinateFields` payload.
///
/// The backend stores the list either as a JSON array or as a JSON-encoded
/// string holding that array; both are accepted. `null` yields an empty list.
/// Fields arriving without an id get a fresh one, because the id is the only
/// key documents and templates are merged on.
pub fn decode_fields(value: serde_json::Value) -> Result<Vec<Field>, serde_json::Error> {
    let mut fields: Vec<Field> = match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::String(s) if s.trim().is_empty() => Vec::new(),
        serde_json::Value::String(s) => serde_json::from_str(&s)?,
        other => serde_json::from_value(other)?,
    };

    for field in &mut fields {
        if field.id.is_empty() {
            field.id = uuid::Uuid::new_v4().to_string();
            tracing::warn!(
                "[field] '{}' had no id, assigned {}",
                field.label,
                field.id
            );
        }
    }

    Ok(fields)
}

/// Serde adapter for `coordinateFields` keys (string-or-array on input,
/// plain array on output).
pub(crate) fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = serde_json::Value::deserialize(deserializer)?;
    decode_fields(raw).map_err(serde::de::Error::custom)
}
