// src/process/mod.rs
//! Source → CSV extraction: spreadsheets (`sheet`, `workbook`, `cell`)
//! and SQL result sets (`sql`).

pub mod cell;
pub mod date_parser;
pub mod sheet;
pub mod sql;
pub mod utils;
pub mod workbook;

pub use cell::{normalize, Cell, CellKind, CellValue};
pub use sheet::{write_csv, xls_to_csv, ConvertStats};
pub use sql::sql_to_csv;
