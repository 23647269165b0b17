//! Field struct types shared by templates, documents and the renderer.

use serde::{Deserialize, Serialize};

use super::{FieldError, is_image_data_uri};
use crate::document::TaskRole;

fn default_font_size() -> f64 {
    14.0
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_page() -> u32 {
    1
}

/// Custom deserializer for field values: accepts a string, a number, a bool,
/// an object/array (re-encoded as JSON text) or null.
///
/// Number fields written by older clients carry raw JSON numbers, and some
/// table values were stored as objects instead of encoded strings.
pub(crate) fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

// ============================================================================
// FIELD TYPE
// ============================================================================

/// What a placed field holds and how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Date,
    Number,
    Table,
    EditorSignature,
    SignerSignature,
    ReviewerSignature,
}

impl FieldType {
    pub fn is_signature(self) -> bool {
        matches!(
            self,
            FieldType::EditorSignature | FieldType::SignerSignature | FieldType::ReviewerSignature
        )
    }

    /// Task role whose assignee signs this field.
    pub fn signature_role(self) -> Option<TaskRole> {
        match self {
            FieldType::EditorSignature => Some(TaskRole::Editor),
            FieldType::SignerSignature => Some(TaskRole::Signer),
            FieldType::ReviewerSignature => Some(TaskRole::Reviewer),
            _ => None,
        }
    }
}

// ============================================================================
// GEOMETRY & FONT
// ============================================================================

/// Pixel box on the canonical 1240×1754 page raster.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FieldBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Font metadata, flattened into the field as `fontSize` / `fontFamily`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(rename = "fontSize", default = "default_font_size")]
    pub size: f64,
    #[serde(rename = "fontFamily", default = "default_font_family")]
    pub family: String,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size: default_font_size(),
            family: default_font_family(),
        }
    }
}

// ============================================================================
// TABLE SHAPE
// ============================================================================

/// Static grid shape defined on the template.
///
/// Cell contents live in the field's `value` (see [`super::TableValue`]);
/// `cells` here are only the template's defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableShape {
    pub rows: usize,
    pub cols: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Vec<String>>>,
}

impl TableShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Default::default()
        }
    }

    /// Default text for a cell, `""` when out of range.
    pub fn default_cell(&self, row: usize, col: usize) -> &str {
        self.cells
            .as_ref()
            .and_then(|rows| rows.get(row))
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// FIELD
// ============================================================================

/// A form element placed on a template page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub rect: FieldBox,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub font: FontSpec,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default, alias = "tableData", skip_serializing_if = "Option::is_none")]
    pub table_shape: Option<TableShape>,
    /// E-mail of the person who signs a signature field.
    #[serde(
        default,
        alias = "signerEmail",
        alias = "reviewerEmail",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee_email: Option<String>,
    #[serde(
        default,
        alias = "signerName",
        alias = "reviewerName",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee_name: Option<String>,
}

impl Field {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        field_type: FieldType,
        rect: FieldBox,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            rect,
            value: None,
            required: false,
            font: FontSpec::default(),
            page: 1,
            table_shape: None,
            assignee_email: None,
            assignee_name: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_table_shape(mut self, shape: TableShape) -> Self {
        self.table_shape = Some(shape);
        self
    }

    pub fn with_assignee(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.assignee_email = Some(email.into());
        self.assignee_name = Some(name.into());
        self
    }

    /// Current value, `""` when unset.
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// True when the value is unset or whitespace only.
    pub fn is_empty(&self) -> bool {
        self.value_str().trim().is_empty()
    }

    pub fn has_signature_image(&self) -> bool {
        is_image_data_uri(self.value_str())
    }

    /// Check the geometric and identity invariants.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.id.is_empty() {
            return Err(FieldError::MissingId);
        }

        for (axis, value) in [
            ("x", self.rect.x),
            ("y", self.rect.y),
            ("width", self.rect.width),
            ("height", self.rect.height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FieldError::NegativeCoordinate {
                    id: self.id.clone(),
                    axis,
                    value,
                });
            }
        }

        for (axis, value) in [("width", self.rect.width), ("height", self.rect.height)] {
            if value <= 0.0 {
                return Err(FieldError::EmptyExtent {
                    id: self.id.clone(),
                    axis,
                    value,
                });
            }
        }

        if self.page == 0 {
            return Err(FieldError::InvalidPage { id: self.id.clone() });
        }

        Ok(())
    }
}

// ============================================================================
// SIGNATURE FIELD
// ============================================================================

/// A signature slot owned by one assignee.
///
/// Created empty when a signer or reviewer is assigned, filled once when that
/// person signs, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureField {
    pub id: String,
    #[serde(default, alias = "signerEmail", alias = "reviewerEmail")]
    pub owner_email: String,
    #[serde(default, alias = "signerName", alias = "reviewerName")]
    pub owner_name: String,
    #[serde(flatten)]
    pub rect: FieldBox,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl SignatureField {
    pub fn new(
        id: impl Into<String>,
        owner_email: impl Into<String>,
        owner_name: impl Into<String>,
        rect: FieldBox,
    ) -> Self {
        Self {
            id: id.into(),
            owner_email: owner_email.into(),
            owner_name: owner_name.into(),
            rect,
            page: 1,
            image_data: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.image_data.as_deref().is_some_and(is_image_data_uri)
    }

    /// Attach the signature image. One signature per slot.
    pub fn sign(&mut self, data_uri: impl Into<String>) -> Result<(), FieldError> {
        if self.is_signed() {
            return Err(FieldError::AlreadySigned { id: self.id.clone() });
        }
        let data_uri = data_uri.into();
        if !is_image_data_uri(&data_uri) {
            return Err(FieldError::NotAnImage { id: self.id.clone() });
        }
        self.image_data = Some(data_uri);
        Ok(())
    }
}
