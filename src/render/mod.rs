//! # Overlay Rendering
//!
//! One renderer for every surface a document is shown on. Fields are turned
//! into positioned [`RenderNode`]s; the output backends draw those nodes.
//!
//! ## Architecture
//!
//! ```text
//! Template fields ─┐
//!                  ├─ merge_fields ─▶ render_fields(surface, scale, page) ─▶ Vec<RenderNode>
//! Document values ─┘                                                          │
//!                                              ┌──────────────────────────────┤
//!                                              ▼                              ▼
//!                                      html::overlay_html /          raster::PageCompositor
//!                                      html::print_html              (PNG over page image)
//! ```
//!
//! ## Surfaces
//!
//! | Surface | Empty text field | Empty signature | Focus targets |
//! |---------|------------------|-----------------|---------------|
//! | `interactive` | label placeholder (+ `*` if required) | name placeholder | yes |
//! | `readonly` | nothing | name placeholder | no |
//! | `print` | nothing | nothing | no |
//!
//! ## Example
//!
//! ```
//! use docflow::document::merge_fields;
//! use docflow::field::{Field, FieldBox, FieldType};
//! use docflow::render::{NodeKind, RenderInput, RenderOptions, render_fields};
//!
//! let field = Field::new("f1", "Name", FieldType::Text, FieldBox::new(100.0, 100.0, 200.0, 40.0));
//! let merged = merge_fields(&[field], &[]);
//! let input = RenderInput::new(&merged.fields);
//!
//! let nodes = render_fields(&input, &RenderOptions::interactive(0.5));
//! assert!(matches!(&nodes[0].kind, NodeKind::Text { text, placeholder: true, .. } if text == "Name"));
//! assert_eq!(nodes[0].rect.left, 50.0);
//!
//! let nodes = render_fields(&input, &RenderOptions::readonly(0.5));
//! assert!(nodes.is_empty());
//! ```

pub mod html;
mod overlay;
pub mod raster;

pub use overlay::{document_page, document_pages, hit_test, render_document, render_fields};

use serde::{Deserialize, Serialize};

use crate::document::{DocumentTask, MergedField};
use crate::field::SignatureField;
use crate::layout::{PRINT_SCALE, ScreenRect};

/// Suffix of a signature placeholder.
pub const SIGNATURE_PLACEHOLDER_SUFFIX: &str = "서명";

/// Marker appended when the viewer is the signature's assignee.
pub const SELF_MARKER: &str = "(본인)";

/// Where the overlay is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Editor: placeholders and click-to-focus.
    #[default]
    Interactive,
    /// Preview and completed views.
    Readonly,
    /// Printed paper.
    Print,
}

impl Surface {
    pub fn shows_placeholders(self) -> bool {
        self != Surface::Print
    }
}

impl std::str::FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interactive" | "editor" => Ok(Surface::Interactive),
            "readonly" | "preview" => Ok(Surface::Readonly),
            "print" => Ok(Surface::Print),
            _ => Err(format!("Unknown surface: {}", s)),
        }
    }
}

/// Parameters of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    #[serde(default)]
    pub surface: Surface,
    /// Canonical-to-surface factor (see [`crate::layout::transform`]).
    pub scale: f64,
    /// 1-based page index; only fields on this page are rendered.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Viewer e-mail, used to mark the viewer's own signature slots.
    #[serde(default)]
    pub viewer_email: Option<String>,
}

fn default_page() -> u32 {
    1
}

impl RenderOptions {
    pub fn new(surface: Surface, scale: f64) -> Self {
        Self {
            surface,
            scale,
            page: 1,
            viewer_email: None,
        }
    }

    pub fn interactive(scale: f64) -> Self {
        Self::new(Surface::Interactive, scale)
    }

    pub fn readonly(scale: f64) -> Self {
        Self::new(Surface::Readonly, scale)
    }

    /// Print surface at the fixed paper scale.
    pub fn print() -> Self {
        Self::new(Surface::Print, PRINT_SCALE)
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn viewed_by(mut self, email: impl Into<String>) -> Self {
        self.viewer_email = Some(email.into());
        self
    }
}

/// What a click on a node selects in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum FocusTarget {
    Field {
        field_id: String,
    },
    Cell {
        field_id: String,
        row: usize,
        col: usize,
    },
}

/// One positioned table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellNode {
    pub row: usize,
    pub col: usize,
    pub rect: ScreenRect,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<FocusTarget>,
}

/// Rendered grid of a table field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableNode {
    /// Header cells, present only when a header text is non-empty.
    pub header: Option<Vec<CellNode>>,
    pub rows: Vec<Vec<CellNode>>,
    pub font_size: f64,
    pub font_family: String,
}

impl TableNode {
    /// Body cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &CellNode> {
        self.rows.iter().flatten()
    }
}

/// Visual content of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Centered text; `placeholder` marks a label shown in place of a value.
    Text {
        text: String,
        font_size: f64,
        font_family: String,
        placeholder: bool,
        required: bool,
    },
    /// Signature image, drawn with contain fit inside the node.
    Image { data_uri: String },
    /// Unsigned signature slot.
    SignaturePlaceholder { text: String },
    Table(TableNode),
}

/// A positioned overlay element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub field_id: String,
    pub rect: ScreenRect,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<FocusTarget>,
}

/// Everything the renderer reads for one document.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub fields: &'a [MergedField],
    pub signature_fields: &'a [SignatureField],
    pub tasks: &'a [DocumentTask],
}

impl<'a> RenderInput<'a> {
    pub fn new(fields: &'a [MergedField]) -> Self {
        Self {
            fields,
            signature_fields: &[],
            tasks: &[],
        }
    }

    pub fn with_signatures(mut self, signature_fields: &'a [SignatureField]) -> Self {
        self.signature_fields = signature_fields;
        self
    }

    pub fn with_tasks(mut self, tasks: &'a [DocumentTask]) -> Self {
        self.tasks = tasks;
        self
    }
}

/// A page ready for output: background image plus overlay nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    pub page: u32,
    /// URL or path of the page image, if the template has one.
    pub image: Option<String>,
    pub scale: f64,
    pub nodes: Vec<RenderNode>,
}
