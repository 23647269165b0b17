//! Field → node conversion shared by every surface.

use std::collections::HashSet;

use super::{
    CellNode, FocusTarget, NodeKind, RenderInput, RenderNode, RenderOptions, RenderedPage,
    SELF_MARKER, SIGNATURE_PLACEHOLDER_SUFFIX, Surface, TableNode,
};
use crate::document::{Document, MergedField};
use crate::field::{Field, SignatureField, TableValue, is_image_data_uri};
use crate::layout::{CellSources, ScreenRect, TableGeometry, TableLayout, transform};

/// Render the fields of one page into positioned nodes.
///
/// Nodes come out in field order (template order, then document-only
/// fields), followed by signature slots that no coordinate field refers to.
/// The output depends only on the input and options.
pub fn render_fields(input: &RenderInput<'_>, opts: &RenderOptions) -> Vec<RenderNode> {
    let mut nodes = Vec::new();

    // Slots drawn through a coordinate field are not drawn again on their own.
    let mut claimed: HashSet<&str> = HashSet::new();
    for merged in input.fields {
        claimed.insert(merged.field.id.as_str());
        if merged.field.field_type.is_signature()
            && let Some(slot) = matching_slot(&merged.field, input.signature_fields)
        {
            claimed.insert(slot.id.as_str());
        }
    }

    for merged in input.fields {
        if merged.field.page != opts.page {
            continue;
        }
        let rect = transform(&merged.field.rect, opts.scale);
        let node = if merged.field.field_type.is_signature() {
            signature_field_node(&merged.field, rect, input, opts)
        } else if let Some(table) = table_node(merged, rect, opts) {
            Some(table)
        } else {
            text_node(&merged.field, rect, opts)
        };
        nodes.extend(node);
    }

    for slot in input.signature_fields {
        if claimed.contains(slot.id.as_str()) || slot.page != opts.page {
            continue;
        }
        let rect = transform(&slot.rect, opts.scale);
        let placeholder = SignatureLabel {
            name: &slot.owner_name,
            email: Some(slot.owner_email.as_str()),
        };
        nodes.extend(signature_node(
            &slot.id,
            rect,
            slot.image_data.as_deref(),
            placeholder,
            opts,
        ));
    }

    nodes
}

/// Render one page of a document (template shapes merged with its values).
pub fn render_document(doc: &Document, opts: &RenderOptions) -> Vec<RenderNode> {
    let merged = doc.merged_fields();
    let input = RenderInput::new(&merged.fields)
        .with_signatures(&doc.data.signature_fields)
        .with_tasks(&doc.tasks);
    render_fields(&input, opts)
}

/// One page of a document with its page image, or `None` past the last page.
pub fn document_page(doc: &Document, opts: &RenderOptions) -> Option<RenderedPage> {
    let page_count = doc.template.as_ref().map(|t| t.page_count()).unwrap_or(1);
    if opts.page == 0 || opts.page > page_count {
        return None;
    }
    let image = doc
        .template
        .as_ref()
        .and_then(|t| t.page_images().into_iter().nth(opts.page as usize - 1));
    Some(RenderedPage {
        page: opts.page,
        image,
        scale: opts.scale,
        nodes: render_document(doc, opts),
    })
}

/// Every page of a document, in page order.
pub fn document_pages(doc: &Document, opts: &RenderOptions) -> Vec<RenderedPage> {
    let page_count = doc.template.as_ref().map(|t| t.page_count()).unwrap_or(1);
    (1..=page_count)
        .filter_map(|page| document_page(doc, &opts.clone().on_page(page)))
        .collect()
}

/// Focus target under a point, topmost node first.
///
/// Table nodes resolve to the cell under the point. Returns `None` off any
/// node or on non-interactive output.
pub fn hit_test(nodes: &[RenderNode], x: f64, y: f64) -> Option<FocusTarget> {
    nodes.iter().rev().find_map(|node| {
        if !node.rect.contains(x, y) {
            return None;
        }
        match &node.kind {
            NodeKind::Table(table) => table
                .cells()
                .find(|cell| cell.rect.contains(x, y))
                .and_then(|cell| cell.focus.clone()),
            _ => node.focus.clone(),
        }
    })
}

fn field_focus(field: &Field, opts: &RenderOptions) -> Option<FocusTarget> {
    (opts.surface == Surface::Interactive).then(|| FocusTarget::Field {
        field_id: field.id.clone(),
    })
}

// ============================================================================
// TEXT
// ============================================================================

fn text_node(field: &Field, rect: ScreenRect, opts: &RenderOptions) -> Option<RenderNode> {
    let (text, placeholder) = if !field.is_empty() {
        (field.value_str().to_string(), false)
    } else if opts.surface == Surface::Interactive {
        (field.label.clone(), true)
    } else {
        return None;
    };

    Some(RenderNode {
        field_id: field.id.clone(),
        rect,
        kind: NodeKind::Text {
            text,
            font_size: field.font.size * opts.scale,
            font_family: field.font.family.clone(),
            placeholder,
            required: placeholder && field.required,
        },
        focus: field_focus(field, opts),
    })
}

// ============================================================================
// TABLE
// ============================================================================

/// Table node, or `None` when the field is not a table or carries no usable
/// grid (malformed value without a template shape renders as text).
fn table_node(merged: &MergedField, rect: ScreenRect, opts: &RenderOptions) -> Option<RenderNode> {
    let field = &merged.field;
    let document_value = TableValue::parse(field.value_str());
    let template_value = merged
        .template
        .as_ref()
        .and_then(|t| TableValue::parse(t.value_str()));

    let geometry =
        TableGeometry::resolve(field, document_value.as_ref().or(template_value.as_ref()))?;
    let layout = TableLayout::compute(&geometry, rect);

    let sources = CellSources {
        document: document_value.as_ref(),
        template: template_value.as_ref(),
        shape: field
            .table_shape
            .as_ref()
            .or_else(|| merged.template.as_ref().and_then(|t| t.table_shape.as_ref())),
    };

    let interactive = opts.surface == Surface::Interactive;
    let header = geometry.headers.as_ref().map(|headers| {
        headers
            .iter()
            .enumerate()
            .map(|(col, text)| CellNode {
                row: 0,
                col,
                rect: layout.header_rect(col),
                text: text.clone(),
                focus: None,
            })
            .collect()
    });

    let rows = (0..geometry.rows)
        .map(|row| {
            (0..geometry.cols)
                .map(|col| CellNode {
                    row,
                    col,
                    rect: layout.cell_rect(row, col),
                    text: sources.text(row, col).to_string(),
                    focus: interactive.then(|| FocusTarget::Cell {
                        field_id: field.id.clone(),
                        row,
                        col,
                    }),
                })
                .collect()
        })
        .collect();

    Some(RenderNode {
        field_id: field.id.clone(),
        rect,
        kind: NodeKind::Table(TableNode {
            header,
            rows,
            font_size: field.font.size * opts.scale,
            font_family: field.font.family.clone(),
        }),
        focus: None,
    })
}

// ============================================================================
// SIGNATURES
// ============================================================================

/// Who a signature placeholder names.
#[derive(Clone, Copy)]
struct SignatureLabel<'a> {
    name: &'a str,
    email: Option<&'a str>,
}

impl SignatureLabel<'_> {
    fn text(&self, viewer: Option<&str>) -> String {
        let is_self = matches!(
            (self.email, viewer),
            (Some(email), Some(viewer)) if !email.is_empty() && email.eq_ignore_ascii_case(viewer)
        );
        if is_self {
            format!("{} {} {}", self.name, SIGNATURE_PLACEHOLDER_SUFFIX, SELF_MARKER)
        } else {
            format!("{} {}", self.name, SIGNATURE_PLACEHOLDER_SUFFIX)
        }
    }
}

fn signature_field_node(
    field: &Field,
    rect: ScreenRect,
    input: &RenderInput<'_>,
    opts: &RenderOptions,
) -> Option<RenderNode> {
    let slot = matching_slot(field, input.signature_fields);

    let image = if field.has_signature_image() {
        Some(field.value_str())
    } else {
        slot.and_then(|s| s.image_data.as_deref())
    };

    let task = field
        .field_type
        .signature_role()
        .and_then(|role| input.tasks.iter().find(|t| t.role == role));

    let email = field
        .assignee_email
        .as_deref()
        .or(slot.map(|s| s.owner_email.as_str()))
        .or(task.map(|t| t.assigned_user_email.as_str()));
    let name = field
        .assignee_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(slot.map(|s| s.owner_name.as_str()).filter(|n| !n.is_empty()))
        .or(task.map(|t| t.display_name()))
        .unwrap_or(&field.label);

    let mut node = signature_node(&field.id, rect, image, SignatureLabel { name, email }, opts)?;
    node.focus = field_focus(field, opts);
    Some(node)
}

/// Signature slot backing a signature-typed field: same id first, then the
/// signed slot of the field's assignee.
fn matching_slot<'a>(field: &Field, slots: &'a [SignatureField]) -> Option<&'a SignatureField> {
    slots.iter().find(|s| s.id == field.id).or_else(|| {
        let email = field.assignee_email.as_deref()?;
        slots
            .iter()
            .find(|s| s.is_signed() && s.owner_email.eq_ignore_ascii_case(email))
    })
}

fn signature_node(
    id: &str,
    rect: ScreenRect,
    image: Option<&str>,
    label: SignatureLabel<'_>,
    opts: &RenderOptions,
) -> Option<RenderNode> {
    let kind = match image.filter(|data| is_image_data_uri(data)) {
        Some(data_uri) => NodeKind::Image {
            data_uri: data_uri.to_string(),
        },
        None if opts.surface.shows_placeholders() => NodeKind::SignaturePlaceholder {
            text: label.text(opts.viewer_email.as_deref()),
        },
        None => return None,
    };

    Some(RenderNode {
        field_id: id.to_string(),
        rect,
        kind,
        focus: None,
    })
}
