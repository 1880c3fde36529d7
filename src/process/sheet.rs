// src/process/sheet.rs

use crate::error::ConversionError;
use crate::process::{
    cell::{normalize_or_empty, Cell},
    utils::{csv_output_path, quote, BOM, LINE_SEPARATOR},
    workbook::Workbook,
};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info};

/// Counters from one conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    pub rows_written: u64,
    pub blank_rows_skipped: u64,
}

/// Build one CSV line (no terminator). `None` when every cell is blank.
pub fn csv_line(cells: &[Cell]) -> Option<String> {
    let mut line = String::new();
    let mut has_content = false;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&quote(&normalize_or_empty(cell)));
        has_content |= !cell.is_blank();
    }
    has_content.then_some(line)
}

/// Stream `rows` to `writer` as quoted, comma-separated lines.
pub fn write_csv<W, I, R>(writer: &mut W, rows: I, use_bom: bool) -> io::Result<ConvertStats>
where
    W: Write,
    I: IntoIterator<Item = R>,
    R: AsRef<[Cell]>,
{
    let mut stats = ConvertStats::default();
    if use_bom {
        writer.write_all(BOM.as_bytes())?;
    }
    for row in rows {
        match csv_line(row.as_ref()) {
            Some(line) => {
                writer.write_all(line.as_bytes())?;
                writer.write_all(LINE_SEPARATOR.as_bytes())?;
                stats.rows_written += 1;
            }
            None => stats.blank_rows_skipped += 1,
        }
    }
    writer.flush()?;
    Ok(stats)
}

/// Convert the first sheet of an `.xls`/`.xlsx` file to `<source>.csv`
/// and return the CSV path.
pub fn xls_to_csv(source: &Path, use_bom: bool) -> Result<PathBuf, ConversionError> {
    let start = Instant::now();
    let mut wb = Workbook::open(source)?;
    debug!(path = %source.display(), format = ?wb.format(), sheets = ?wb.sheet_names(), "opened workbook");
    let rows = wb.first_sheet_rows(source)?;

    let dest = csv_output_path(source);
    let io_err = |source: io::Error| ConversionError::Io {
        path: dest.clone(),
        source,
    };
    let file = File::create(&dest).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    let stats = write_csv(&mut writer, &rows, use_bom).map_err(io_err)?;

    info!(
        source = %source.display(),
        dest = %dest.display(),
        rows = stats.rows_written,
        skipped = stats.blank_rows_skipped,
        elapsed = ?start.elapsed(),
        "converted sheet to csv"
    );
    Ok(dest)
}
