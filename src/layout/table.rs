//! # Table Layout
//!
//! Geometry of a table field: an optional header row followed by `rows`
//! body rows of equal height, and `cols` columns sized either by
//! proportional fractions or by an equal split.
//!
//! ```text
//! ┌──────────┬─────────────────────┐  ← header row (only if a header is non-empty)
//! │  Item    │  Amount             │
//! ├──────────┼─────────────────────┤
//! │  cells[0][0]  │  cells[0][1]   │  row height = height / (rows + header)
//! ├──────────┼─────────────────────┤
//! │  ...     │  ...                │
//! └──────────┴─────────────────────┘
//!   0.3 × w       0.7 × w
//! ```
//!
//! The last column and the last row absorb floating-point remainders, so the
//! pieces always add up to the field's rendered size.

use serde::Serialize;

use super::transform::ScreenRect;
use crate::field::{Field, FieldType, TableShape, TableValue, is_valid_grid};

/// Resolved grid description for one table field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGeometry {
    pub rows: usize,
    pub cols: usize,
    /// Normalized column fractions (always `cols` entries summing to 1).
    pub column_widths: Vec<f64>,
    /// Header texts, present only when at least one is non-empty.
    pub headers: Option<Vec<String>>,
}

impl TableGeometry {
    /// Build a geometry from explicit dimensions and optional width fractions.
    pub fn new(rows: usize, cols: usize, column_widths: Option<&[f64]>) -> Self {
        Self {
            rows,
            cols,
            column_widths: normalize_widths(column_widths, cols),
            headers: None,
        }
    }

    pub fn has_header_row(&self) -> bool {
        self.headers.is_some()
    }

    /// Resolve the grid for a table field.
    ///
    /// The template's shape defines the grid when present; otherwise the
    /// parsed value does. Width fractions and headers prefer the value and
    /// fall back to the shape. Returns `None` when the field is not a table
    /// or neither source describes a usable grid. Grids beyond
    /// [`crate::field::MAX_TABLE_ROWS`] × [`crate::field::MAX_TABLE_COLS`]
    /// are not usable.
    pub fn resolve(field: &Field, value: Option<&TableValue>) -> Option<Self> {
        if field.field_type != FieldType::Table {
            return None;
        }

        let shape = field.table_shape.as_ref().filter(|s| is_valid_grid(s.rows, s.cols));
        let value = value.filter(|v| is_valid_grid(v.rows, v.cols));
        let (rows, cols) = match (shape, value) {
            (Some(shape), Some(value)) => {
                if shape.rows != value.rows || shape.cols != value.cols {
                    tracing::warn!(
                        "[table] field '{}': value is {}x{} but template shape is {}x{}, using shape",
                        field.id,
                        value.rows,
                        value.cols,
                        shape.rows,
                        shape.cols
                    );
                }
                (shape.rows, shape.cols)
            }
            (Some(shape), None) => (shape.rows, shape.cols),
            (None, Some(value)) => (value.rows, value.cols),
            (None, None) => return None,
        };

        let widths = value
            .and_then(|v| v.column_widths.as_deref())
            .filter(|w| valid_widths(w, cols))
            .or_else(|| shape.and_then(|s| s.column_widths.as_deref()));

        let headers = value
            .filter(|v| v.has_header_row())
            .and_then(|v| v.column_headers.clone())
            .or_else(|| shape.and_then(shape_headers));

        let mut geometry = Self::new(rows, cols, widths);
        geometry.headers = headers.map(|mut h| {
            h.resize(cols, String::new());
            h
        });
        Some(geometry)
    }
}

fn shape_headers(shape: &TableShape) -> Option<Vec<String>> {
    shape
        .column_headers
        .as_ref()
        .filter(|headers| headers.iter().any(|h| !h.trim().is_empty()))
        .cloned()
}

fn valid_widths(widths: &[f64], cols: usize) -> bool {
    widths.len() == cols
        && widths.iter().all(|w| w.is_finite() && *w >= 0.0)
        && widths.iter().sum::<f64>() > 0.0
}

/// Normalize width fractions to sum to 1, or split equally when the
/// fractions are missing or unusable.
fn normalize_widths(widths: Option<&[f64]>, cols: usize) -> Vec<f64> {
    if cols == 0 {
        return Vec::new();
    }
    match widths {
        Some(w) if valid_widths(w, cols) => {
            let total: f64 = w.iter().sum();
            w.iter().map(|f| f / total).collect()
        }
        _ => vec![1.0 / cols as f64; cols],
    }
}

/// Horizontal extent of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSpan {
    pub left: f64,
    pub width: f64,
}

/// Computed geometry of a table field on a surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLayout {
    /// Bounds of the whole table.
    pub rect: ScreenRect,
    /// Height shared by the header row and every body row.
    pub row_height: f64,
    pub columns: Vec<ColumnSpan>,
    pub rows: usize,
    pub has_header: bool,
}

impl TableLayout {
    /// Lay out `geometry` inside `rect` (already transformed to the surface).
    pub fn compute(geometry: &TableGeometry, rect: ScreenRect) -> Self {
        let row_count = geometry.rows + usize::from(geometry.has_header_row());
        let row_height = if row_count == 0 {
            0.0
        } else {
            rect.height / row_count as f64
        };

        let mut columns = Vec::with_capacity(geometry.cols);
        let mut left = rect.left;
        for (i, fraction) in geometry.column_widths.iter().enumerate() {
            let width = if i + 1 == geometry.cols {
                rect.right() - left
            } else {
                fraction * rect.width
            };
            columns.push(ColumnSpan { left, width });
            left += width;
        }

        Self {
            rect,
            row_height,
            columns,
            rows: geometry.rows,
            has_header: geometry.has_header_row(),
        }
    }

    fn band(&self, index: usize) -> (f64, f64) {
        let total = self.rows + usize::from(self.has_header);
        let top = self.rect.top + index as f64 * self.row_height;
        let height = if index + 1 == total {
            self.rect.bottom() - top
        } else {
            self.row_height
        };
        (top, height)
    }

    fn column(&self, col: usize) -> ColumnSpan {
        self.columns.get(col).copied().unwrap_or(ColumnSpan {
            left: self.rect.right(),
            width: 0.0,
        })
    }

    /// Bounds of a header cell (meaningful only when `has_header`).
    pub fn header_rect(&self, col: usize) -> ScreenRect {
        let (top, height) = self.band(0);
        let span = self.column(col);
        ScreenRect::new(span.left, top, span.width, height)
    }

    /// Bounds of a body cell.
    pub fn cell_rect(&self, row: usize, col: usize) -> ScreenRect {
        let (top, height) = self.band(row + usize::from(self.has_header));
        let span = self.column(col);
        ScreenRect::new(span.left, top, span.width, height)
    }

    /// Column widths in order.
    pub fn column_widths(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.width).collect()
    }
}

/// Ordered fallback sources for cell text.
///
/// Precedence, first non-empty wins:
/// 1. the document's parsed value,
/// 2. the template field's parsed value,
/// 3. the template shape's default cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellSources<'a> {
    pub document: Option<&'a TableValue>,
    pub template: Option<&'a TableValue>,
    pub shape: Option<&'a TableShape>,
}

impl<'a> CellSources<'a> {
    pub fn text(&self, row: usize, col: usize) -> &'a str {
        let candidates = [
            self.document.map(|v| v.cell(row, col)),
            self.template.map(|v| v.cell(row, col)),
            self.shape.map(|s| s.default_cell(row, col)),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
            .unwrap_or("")
    }
}
