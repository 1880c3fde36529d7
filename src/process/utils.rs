use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Line terminator written after each CSV row.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// UTF-8 byte-order mark, written first when a dataset asks for it.
pub const BOM: &str = "\u{feff}";

/// Trim surrounding whitespace and double every embedded quote.
pub fn escape_field(raw: &str) -> String {
    raw.trim().replace('"', "\"\"")
}

/// Wrap an already-escaped field in one pair of double quotes.
pub fn quote(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 2);
    out.push('"');
    out.push_str(field);
    out.push('"');
    out
}

/// `data.xlsx` → `data.xlsx.csv`, next to the source.
pub fn csv_output_path(source: &Path) -> PathBuf {
    let mut name: OsString = source.as_os_str().to_owned();
    name.push(".csv");
    PathBuf::from(name)
}
