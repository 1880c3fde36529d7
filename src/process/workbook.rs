use crate::error::ConversionError;
use crate::process::cell::Cell;
use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::{fs::File, io::BufReader, path::Path};

/// Spreadsheet container formats we can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Legacy BIFF `.xls`.
    Xls,
    /// Office Open XML `.xlsx`.
    Xlsx,
}

impl Format {
    /// Pick the reader from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xls" => Some(Format::Xls),
            "xlsx" => Some(Format::Xlsx),
            _ => None,
        }
    }
}

/// An open workbook; one variant per on-disk format.
pub enum Workbook {
    Xls(Xls<BufReader<File>>),
    Xlsx(Xlsx<BufReader<File>>),
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, ConversionError> {
        let format = Format::from_path(path)
            .ok_or_else(|| ConversionError::UnsupportedFormat(path.to_path_buf()))?;
        let open_err = |source: calamine::Error| ConversionError::Open {
            path: path.to_path_buf(),
            source,
        };
        match format {
            Format::Xls => open_workbook::<Xls<_>, _>(path)
                .map(Workbook::Xls)
                .map_err(|e| open_err(e.into())),
            Format::Xlsx => open_workbook::<Xlsx<_>, _>(path)
                .map(Workbook::Xlsx)
                .map_err(|e| open_err(e.into())),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Workbook::Xls(_) => Format::Xls,
            Workbook::Xlsx(_) => Format::Xlsx,
        }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        match self {
            Workbook::Xls(wb) => wb.sheet_names(),
            Workbook::Xlsx(wb) => wb.sheet_names(),
        }
    }

    /// Rows of the first sheet as typed cells, one column per position
    /// the sheet declares.
    ///
    /// `.xlsx` cells are read one by one so that a styled cell without a
    /// value (`<c r="D1" s="0"/>`) still widens its row; calamine's
    /// `Range` only keeps cells that hold a value.
    pub fn first_sheet_rows(&mut self, path: &Path) -> Result<Vec<Vec<Cell>>, ConversionError> {
        let open_err = |source: calamine::Error| ConversionError::Open {
            path: path.to_path_buf(),
            source,
        };
        match self {
            Workbook::Xls(wb) => match wb.worksheet_range_at(0) {
                Some(range) => {
                    let range = range.map_err(|e| open_err(e.into()))?;
                    Ok(rows(&range).collect())
                }
                None => Err(ConversionError::NoSheets(path.to_path_buf())),
            },
            Workbook::Xlsx(wb) => {
                let name = wb
                    .sheet_names()
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConversionError::NoSheets(path.to_path_buf()))?;
                let mut reader = wb
                    .worksheet_cells_reader(&name)
                    .map_err(|e| open_err(e.into()))?;
                let mut cells = Vec::new();
                while let Some(cell) = reader.next_cell().map_err(|e| open_err(e.into()))? {
                    let data = Data::from(cell.get_value().clone());
                    cells.push((cell.get_position(), cell_from_data(&data)));
                }
                Ok(grid(cells))
            }
        }
    }
}

/// Rows of a sheet as typed cells.
pub fn rows(range: &Range<Data>) -> impl Iterator<Item = Vec<Cell>> + '_ {
    range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
}

/// Lay positioned `(row, column)` cells out as dense rows spanning the
/// bounding box of all of them. Gaps become blank cells.
pub fn grid<I>(cells: I) -> Vec<Vec<Cell>>
where
    I: IntoIterator<Item = ((u32, u32), Cell)>,
{
    let cells: Vec<_> = cells.into_iter().collect();
    let Some(((top, left), (bottom, right))) = bounds(cells.iter().map(|(pos, _)| *pos)) else {
        return Vec::new();
    };
    let width = (right - left + 1) as usize;
    let height = (bottom - top + 1) as usize;
    let mut rows = vec![vec![Cell::blank(); width]; height];
    for ((r, c), cell) in cells {
        rows[(r - top) as usize][(c - left) as usize] = cell;
    }
    rows
}

fn bounds(positions: impl Iterator<Item = (u32, u32)>) -> Option<((u32, u32), (u32, u32))> {
    positions.fold(None, |acc, (r, c)| match acc {
        None => Some(((r, c), (r, c))),
        Some(((top, left), (bottom, right))) => {
            Some(((top.min(r), left.min(c)), (bottom.max(r), right.max(c))))
        }
    })
}

/// Classify one calamine value. Calamine already resolves formulas to
/// their cached result and flags numbers under a date format.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::blank(),
        Data::Bool(b) => Cell::boolean(*b),
        Data::Int(i) => Cell::number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::DateTime(dt) if dt.is_datetime() => Cell::date_serial(dt.as_f64()),
        Data::DateTime(dt) => Cell::number(dt.as_f64()),
        Data::DateTimeIso(s) => parse_iso(s)
            .map(Cell::datetime)
            .unwrap_or_else(|| Cell::other(s.as_str())),
        Data::DurationIso(s) => Cell::other(s.as_str()),
        Data::Error(e) => Cell::other(e.to_string()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::cell::{CellKind, CellValue};
    use calamine::CellErrorType;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.xls")), Some(Format::Xls));
        assert_eq!(Format::from_path(Path::new("a.XLSX")), Some(Format::Xlsx));
        assert_eq!(Format::from_path(Path::new("a.ods")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn open_rejects_other_extensions() {
        let err = Workbook::open(Path::new("report.csv")).err().unwrap();
        assert!(matches!(err, ConversionError::UnsupportedFormat(_)));
    }

    #[test]
    fn classifies_calamine_values() {
        assert_eq!(cell_from_data(&Data::Empty).kind, CellKind::Blank);
        assert_eq!(cell_from_data(&Data::Bool(true)), Cell::boolean(true));
        assert_eq!(cell_from_data(&Data::Int(7)), Cell::number(7.0));
        assert_eq!(cell_from_data(&Data::Float(3.5)), Cell::number(3.5));
        assert_eq!(cell_from_data(&Data::String("x".into())), Cell::text("x"));
        let err = cell_from_data(&Data::Error(CellErrorType::Div0));
        assert_eq!(err.kind, CellKind::Other);
    }

    #[test]
    fn grid_keeps_declared_empty_cells_and_gaps() {
        let rows = grid(vec![
            ((0, 0), Cell::number(42.0)),
            ((0, 3), Cell::blank()),
            ((2, 1), Cell::text("x")),
        ]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 4));
        assert_eq!(rows[0][0], Cell::number(42.0));
        assert!(rows[0][3].is_blank());
        assert!(rows[1].iter().all(Cell::is_blank));
        assert_eq!(rows[2][1], Cell::text("x"));
    }

    #[test]
    fn grid_starts_at_top_left_cell() {
        let rows = grid(vec![((4, 2), Cell::boolean(true)), ((5, 3), Cell::blank())]);
        assert_eq!(rows, vec![
            vec![Cell::boolean(true), Cell::blank()],
            vec![Cell::blank(), Cell::blank()],
        ]);
        assert!(grid(Vec::new()).is_empty());
    }

    #[test]
    fn iso_dates_become_datetime_cells() {
        let cell = cell_from_data(&Data::DateTimeIso("2022-05-01T10:00:00".into()));
        assert!(matches!(cell.value, CellValue::DateTime(_)));
        assert!(cell.date_formatted);

        let cell = cell_from_data(&Data::DateTimeIso("2022-05-01".into()));
        assert!(matches!(cell.value, CellValue::DateTime(_)));

        let cell = cell_from_data(&Data::DateTimeIso("garbage".into()));
        assert_eq!(cell.kind, CellKind::Other);
    }
}
