//! Raw data matrix types
//!
//! The matrix is positionally aligned with variable `column_index`: column `c`
//! holds the cells of the variable at index `c`. Every row is kept padded to
//! the matrix width, so a matrix with zero rows still has a column count.

use crate::VariableType;
use serde::{Deserialize, Serialize};

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell of the data matrix.
///
/// Serialised untagged: JSON `null`, a number, or a string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric reading of the cell, parsing text when possible.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_numeric_text(s),
        }
    }

    /// Coerce this cell to fit a variable of the given type and width.
    ///
    /// Numeric types keep numbers, parse numeric text and blank anything else.
    /// STRING renders numbers as text and truncates to `width` characters.
    /// DATE keeps text verbatim and renders numbers as text.
    pub fn coerce(&self, var_type: VariableType, width: u32) -> CellValue {
        match (self, var_type) {
            (CellValue::Empty, _) => CellValue::Empty,
            (CellValue::Number(n), VariableType::String) => {
                CellValue::Text(truncate_chars(&format_number(*n), width))
            }
            (CellValue::Text(s), VariableType::String) => {
                CellValue::Text(truncate_chars(s, width))
            }
            (CellValue::Number(n), VariableType::Date) => CellValue::Text(format_number(*n)),
            (CellValue::Text(s), VariableType::Date) => CellValue::Text(s.clone()),
            (CellValue::Number(n), _) => CellValue::Number(*n),
            (CellValue::Text(s), _) => match parse_numeric_text(s) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Empty,
            },
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn truncate_chars(s: &str, width: u32) -> String {
    s.chars().take(width as usize).collect()
}

// ============================================================================
// DATA MATRIX
// ============================================================================

/// Ordered rows of ordered cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataMatrix {
    rows: Vec<Vec<CellValue>>,
    column_count: usize,
}

impl DataMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from raw rows, padding short rows to the widest one.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut matrix = Self { rows, column_count };
        matrix.pad_rows();
        matrix
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Set a cell, growing rows and columns as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        self.ensure_columns(col);
        while self.rows.len() <= row {
            self.rows.push(vec![CellValue::Empty; self.column_count]);
        }
        self.rows[row][col] = value;
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<CellValue> {
        self.rows
            .iter()
            .map(|r| r.get(col).cloned().unwrap_or_default())
            .collect()
    }

    /// Grow to at least `upto_index + 1` columns. Existing cells are untouched.
    pub fn ensure_columns(&mut self, upto_index: usize) {
        if self.column_count <= upto_index {
            self.column_count = upto_index + 1;
            self.pad_rows();
        }
    }

    /// Insert a blank column at `index`, shifting later columns right.
    ///
    /// An index past the end pads blank columns up to it first.
    pub fn insert_column(&mut self, index: usize) {
        if index > self.column_count {
            self.ensure_columns(index - 1);
        }
        for row in &mut self.rows {
            row.insert(index, CellValue::Empty);
        }
        self.column_count += 1;
    }

    /// Remove the column at `index`, shifting later columns left.
    /// Returns false when the column does not exist.
    pub fn remove_column(&mut self, index: usize) -> bool {
        if index >= self.column_count {
            return false;
        }
        for row in &mut self.rows {
            row.remove(index);
        }
        self.column_count -= 1;
        true
    }

    /// Coerce every cell of a column to the given type and width.
    /// Returns the number of cells that changed.
    pub fn coerce_column(&mut self, col: usize, var_type: VariableType, width: u32) -> usize {
        let mut changed = 0;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                let coerced = cell.coerce(var_type, width);
                if coerced != *cell {
                    *cell = coerced;
                    changed += 1;
                }
            }
        }
        changed
    }

    fn pad_rows(&mut self) {
        let width = self.column_count;
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, CellValue::Empty);
            }
        }
    }
}
