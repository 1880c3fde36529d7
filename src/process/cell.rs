//! One spreadsheet cell → one CSV field (unquoted).

use crate::error::CellError;
use crate::process::{date_parser, utils};
use chrono::NaiveDateTime;
use tracing::warn;

/// Declared type of a cell, as the reader reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Boolean,
    Numeric,
    Formula,
    String,
    Blank,
    Other,
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Boolean => "boolean",
            CellKind::Numeric => "numeric",
            CellKind::Formula => "formula",
            CellKind::String => "string",
            CellKind::Blank => "blank",
            CellKind::Other => "other",
        }
    }
}

/// Raw value carried by a cell. Formula cells carry their cached result.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    pub value: CellValue,
    /// Number format is a date/time pattern.
    pub date_formatted: bool,
}

impl Cell {
    pub fn blank() -> Self {
        Self {
            kind: CellKind::Blank,
            value: CellValue::Empty,
            date_formatted: false,
        }
    }

    pub fn boolean(v: bool) -> Self {
        Self {
            kind: CellKind::Boolean,
            value: CellValue::Bool(v),
            date_formatted: false,
        }
    }

    pub fn number(v: f64) -> Self {
        Self {
            kind: CellKind::Numeric,
            value: CellValue::Number(v),
            date_formatted: false,
        }
    }

    /// Numeric cell holding an Excel serial under a date format.
    pub fn date_serial(serial: f64) -> Self {
        Self {
            kind: CellKind::Numeric,
            value: CellValue::Number(serial),
            date_formatted: true,
        }
    }

    pub fn datetime(dt: NaiveDateTime) -> Self {
        Self {
            kind: CellKind::Numeric,
            value: CellValue::DateTime(dt),
            date_formatted: true,
        }
    }

    pub fn text(v: impl Into<String>) -> Self {
        Self {
            kind: CellKind::String,
            value: CellValue::Text(v.into()),
            date_formatted: false,
        }
    }

    pub fn other(v: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Other,
            value: CellValue::Text(v.into()),
            date_formatted: false,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind == CellKind::Blank
    }
}

/// Canonical field text for `cell`, without the surrounding quotes.
pub fn normalize(cell: &Cell) -> Result<String, CellError> {
    match cell.kind {
        CellKind::Blank => Ok(String::new()),
        CellKind::Boolean => match &cell.value {
            CellValue::Bool(b) => Ok(b.to_string()),
            _ => Err(mismatch(cell, "boolean")),
        },
        CellKind::Numeric | CellKind::Formula => normalize_number(cell),
        CellKind::String => match &cell.value {
            CellValue::Text(s) => Ok(utils::escape_field(s)),
            _ => Err(mismatch(cell, "text")),
        },
        CellKind::Other => Ok(utils::escape_field(&stringify(&cell.value))),
    }
}

/// Like [`normalize`], but a bad cell becomes an empty field and a warning.
pub fn normalize_or_empty(cell: &Cell) -> String {
    normalize(cell).unwrap_or_else(|e| {
        warn!(kind = cell.kind.as_str(), error = %e, "unreadable cell; emitting empty field");
        String::new()
    })
}

/// Integral values lose the decimal point; everything else keeps the
/// shortest round-trip decimal form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        // avoid "-0"
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn normalize_number(cell: &Cell) -> Result<String, CellError> {
    match (&cell.value, cell.date_formatted) {
        (CellValue::DateTime(dt), _) => Ok(date_parser::format_date(dt)),
        (CellValue::Number(v), true) => date_parser::excel_serial_to_datetime(*v)
            .map(|dt| date_parser::format_date(&dt))
            .ok_or(CellError::InvalidDate(*v)),
        (CellValue::Number(v), false) => Ok(format_number(*v)),
        // formula cells can cache a text or boolean result
        (CellValue::Text(s), _) if cell.kind == CellKind::Formula => Ok(utils::escape_field(s)),
        (CellValue::Bool(b), _) if cell.kind == CellKind::Formula => Ok(b.to_string()),
        (CellValue::Empty, _) if cell.kind == CellKind::Formula => Ok(String::new()),
        _ => Err(mismatch(cell, "numeric")),
    }
}

fn stringify(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Number(v) => format_number(*v),
        CellValue::DateTime(dt) => date_parser::format_date(dt),
        CellValue::Text(s) => s.clone(),
    }
}

fn mismatch(cell: &Cell, expected: &'static str) -> CellError {
    CellError::Mismatch {
        kind: cell.kind.as_str(),
        expected,
    }
}
