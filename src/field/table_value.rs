//! Cell contents of a table field, stored JSON-encoded in the field's value.

use serde::{Deserialize, Serialize};

/// Custom deserializer for table cells: tolerates `null`, numbers and
/// booleans inside the grid, and ragged rows.
fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Vec<Option<Vec<serde_json::Value>>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|row| {
            row.unwrap_or_default()
                .into_iter()
                .map(|cell| match cell {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

/// Largest grid a table field may describe; bigger values are not tables.
pub const MAX_TABLE_ROWS: usize = 500;
pub const MAX_TABLE_COLS: usize = 100;

/// Whether `rows × cols` is a non-empty grid within the table limits.
pub fn is_valid_grid(rows: usize, cols: usize) -> bool {
    (1..=MAX_TABLE_ROWS).contains(&rows) && (1..=MAX_TABLE_COLS).contains(&cols)
}

/// Decoded table field value.
///
/// `cells` may be sparse: missing rows or columns read as empty strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableValue {
    pub rows: usize,
    pub cols: usize,
    #[serde(default, deserialize_with = "deserialize_cells")]
    pub cells: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_headers: Option<Vec<String>>,
}

impl TableValue {
    /// Create an empty `rows × cols` grid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![vec![String::new(); cols]; rows],
            column_widths: None,
            column_headers: None,
        }
    }

    /// Parse a field value. Returns `None` for malformed JSON or a grid with
    /// a zero or oversized dimension, so callers can fall back to plain text
    /// rendering.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<TableValue>(trimmed) {
            Ok(table) if is_valid_grid(table.rows, table.cols) => Some(table),
            Ok(table) => {
                tracing::debug!(
                    "[table] ignoring value with unusable grid ({}x{})",
                    table.rows,
                    table.cols
                );
                None
            }
            Err(e) => {
                tracing::debug!("[table] value is not a table: {}", e);
                None
            }
        }
    }

    /// Encode back to the JSON text stored in the field's value.
    pub fn encode(&self) -> String {
        // Only string/number/option members: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Cell text at `(row, col)`, `""` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set a cell, growing the sparse grid as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, text: impl Into<String>) {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = text.into();
    }

    /// True iff at least one column header is non-empty.
    pub fn has_header_row(&self) -> bool {
        self.column_headers
            .as_ref()
            .is_some_and(|headers| headers.iter().any(|h| !h.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rejects_oversized_grid() {
        assert!(TableValue::parse(r#"{"rows":100000,"cols":100000}"#).is_none());
        assert!(TableValue::parse(r#"{"rows":501,"cols":1}"#).is_none());
        assert!(TableValue::parse(r#"{"rows":1,"cols":101}"#).is_none());
        assert!(TableValue::parse(r#"{"rows":500,"cols":100}"#).is_some());
    }

    #[test]
    fn test_parse_basic() {
        let table = TableValue::parse(r#"{"rows":2,"cols":2,"cells":[["a","b"],["c","d"]]}"#).unwrap();
        assert_eq!(table.rows, 2);
        assert_eq!(table.cols, 2);
        assert_eq!(table.cell(1, 0), "c");
        assert!(!table.has_header_row());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(TableValue::parse("hello").is_none());
        assert!(TableValue::parse("").is_none());
        assert!(TableValue::parse(r#"{"rows":0,"cols":2}"#).is_none());
        assert!(TableValue::parse(r#"{"rows":"x","cols":2}"#).is_none());
    }

    #[test]
    fn test_sparse_cells_read_empty() {
        let table = TableValue::parse(r#"{"rows":3,"cols":2,"cells":[["a","b"],["c"]]}"#).unwrap();
        assert_eq!(table.cell(1, 1), "");
        assert_eq!(table.cell(2, 1), "");
        assert_eq!(table.cell(99, 99), "");
    }

    #[test]
    fn test_tolerates_null_and_numbers() {
        let table =
            TableValue::parse(r#"{"rows":1,"cols":3,"cells":[[null, 12, true]]}"#).unwrap();
        assert_eq!(table.cell(0, 0), "");
        assert_eq!(table.cell(0, 1), "12");
        assert_eq!(table.cell(0, 2), "true");

        let table = TableValue::parse(r#"{"rows":2,"cols":1,"cells":[null, ["x"]]}"#).unwrap();
        assert_eq!(table.cell(0, 0), "");
        assert_eq!(table.cell(1, 0), "x");
    }

    #[test]
    fn test_missing_cells_key() {
        let table = TableValue::parse(r#"{"rows":2,"cols":2}"#).unwrap();
        assert!(table.cells.is_empty());
        assert_eq!(table.cell(0, 0), "");
    }

    #[test]
    fn test_round_trip() {
        let mut table = TableValue::new(2, 3);
        table.set_cell(0, 0, "품목");
        table.set_cell(1, 2, "1,000");
        table.column_widths = Some(vec![0.5, 0.25, 0.25]);

        let decoded = TableValue::parse(&table.encode()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut table = TableValue::parse(r#"{"rows":3,"cols":3,"cells":[]}"#).unwrap();
        table.set_cell(2, 1, "z");
        assert_eq!(table.cells.len(), 3);
        assert_eq!(table.cell(2, 1), "z");
        assert_eq!(table.cell(2, 0), "");
    }

    #[test]
    fn test_header_row_requires_non_empty_header() {
        let mut table = TableValue::new(1, 2);
        table.column_headers = Some(vec!["".into(), "  ".into()]);
        assert!(!table.has_header_row());
        table.column_headers = Some(vec!["".into(), "Qty".into()]);
        assert!(table.has_header_row());
    }
}
