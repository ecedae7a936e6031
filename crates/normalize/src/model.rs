use std::collections::BTreeMap;

use serde::Serialize;

use crate::derive::{GciStrategy, HouseProfitStrategy};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single field value. Source data arrives as text; currency and derived
/// fields are promoted to `Number` by the deriver.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Raw CSV text -> cell. An empty string is a missing value.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Empty
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Missing means empty, or text that is blank after trimming.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell. Text is parsed; unparseable text is `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => parse_number(s),
            Self::Empty => None,
        }
    }

    /// String form used for keys and for the output file.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(v) => format_amount(*v),
        }
    }
}

/// Parse a plain decimal number. Thousands separators and currency symbols
/// are not accepted; non-finite values are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to 2 decimal places, ties to even (12.125 -> 12.12). Negative zero
/// collapses to 0.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round_ties_even() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Two-decimal rendering for currency values.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", round2(value))
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Header + data rows of a tabular text file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first header with exactly this name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (row, col); short rows read as empty.
    pub fn value(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything one run consumes, already loaded into memory.
pub struct NormalizeInput {
    pub source: Table,
    pub reference: Table,
    /// Field names from the target schema example's header line.
    pub target_header: Vec<String>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One agent-deal split row that passed validation.
///
/// Fields are looked up by name; absence is `None`, never a panic. The row's
/// position in the source file is kept for log messages.
#[derive(Debug, Clone, PartialEq)]
pub struct DealSplitRecord {
    pub source_row: usize,
    fields: BTreeMap<String, Cell>,
}

impl DealSplitRecord {
    pub fn new(source_row: usize, fields: BTreeMap<String, Cell>) -> Self {
        Self { source_row, fields }
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Cell::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Cell::to_number)
    }

    pub fn number_or_zero(&self, name: &str) -> f64 {
        self.number(name).unwrap_or(0.0)
    }

    /// Rendered string form; absent fields render as "".
    pub fn rendered(&self, name: &str) -> String {
        self.get(name).map(Cell::render).unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, cell: Cell) {
        self.fields.insert(name.to_string(), cell);
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = (&String, &mut Cell)> {
        self.fields.iter_mut()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rows projected onto the target schema, in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl OutputTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Rendered cell at (row, column name); unknown columns read as "".
    pub fn value(&self, row: usize, name: &str) -> String {
        self.column(name)
            .and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .map(Cell::render)
            .unwrap_or_default()
    }

    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(Cell::render).collect())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub config_name: String,
    pub engine_version: String,
    pub agent_name_column: String,
    pub deal_id_column: String,
    pub loaded: usize,
    pub incomplete_removed: usize,
    pub duplicates_removed: usize,
    pub agent_emails_mapped: usize,
    pub agent_names_unmapped: Vec<String>,
    pub currency_coercion_failures: usize,
    pub gci: GciStrategy,
    pub house_profit: HouseProfitStrategy,
    pub schema_fields: usize,
    pub discrepancy_groups: usize,
    pub nonzero_discrepancies: usize,
    /// Set when the target schema cannot carry a discrepancy.
    pub discrepancy_skipped: Option<String>,
    pub output_rows: usize,
}

pub struct NormalizeOutput {
    pub table: OutputTable,
    pub report: NormalizeReport,
}
