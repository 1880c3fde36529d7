// src/process/sql.rs

use crate::error::ConversionError;
use crate::process::utils::{escape_field, quote, BOM, LINE_SEPARATOR};
use futures::TryStreamExt;
use sqlx::{
    any::{install_default_drivers, AnyRow},
    AnyConnection, Connection, Row,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Instant,
};
use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};
use tracing::{info, warn};

/// File name of the query export inside the dataset's directory.
pub const SQL_EXPORT_FILE: &str = "sqlexport.csv";

/// Run `query` against `connection_string` and write the result set to
/// `<dir>/sqlexport.csv`. Rows are streamed into a `.tmp` sibling that
/// replaces the export only once the whole result set is written, so a
/// failing query leaves the previous export in place.
pub async fn sql_to_csv(
    connection_string: &str,
    query: &str,
    dir: &Path,
    use_bom: bool,
) -> Result<PathBuf, ConversionError> {
    let start = Instant::now();
    install_default_drivers();

    let dest = dir.join(SQL_EXPORT_FILE);
    let tmp = dest.with_extension("csv.tmp");
    fs::create_dir_all(dir)
        .await
        .map_err(|source| ConversionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut conn = AnyConnection::connect(connection_string).await?;
    let written = write_rows(&mut conn, query, &tmp, use_bom).await;
    if let Err(e) = conn.close().await {
        warn!(error = %e, "closing database connection failed");
    }
    let rows_written = match written {
        Ok(n) => n,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&tmp).await {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %rm, "could not remove partial export");
                }
            }
            return Err(e);
        }
    };
    fs::rename(&tmp, &dest)
        .await
        .map_err(|source| ConversionError::Io {
            path: dest.clone(),
            source,
        })?;

    info!(
        dest = %dest.display(),
        rows = rows_written,
        elapsed = ?start.elapsed(),
        "exported query to csv"
    );
    Ok(dest)
}

async fn write_rows(
    conn: &mut AnyConnection,
    query: &str,
    path: &Path,
    use_bom: bool,
) -> Result<u64, ConversionError> {
    let io_err = |source: io::Error| ConversionError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).await.map_err(io_err)?);
    if use_bom {
        writer.write_all(BOM.as_bytes()).await.map_err(io_err)?;
    }

    let mut rows = 0u64;
    let mut stream = sqlx::query(query).fetch(&mut *conn);
    while let Some(row) = stream.try_next().await? {
        let mut line = row_line(&row);
        line.push_str(LINE_SEPARATOR);
        writer.write_all(line.as_bytes()).await.map_err(io_err)?;
        rows += 1;
    }
    writer.flush().await.map_err(io_err)?;
    Ok(rows)
}

/// One result row as quoted CSV fields; NULL becomes an empty field.
pub fn row_line(row: &AnyRow) -> String {
    (0..row.len())
        .map(|i| quote(&escape_field(&field_text(row, i))))
        .collect::<Vec<_>>()
        .join(",")
}

fn field_text(row: &AnyRow, i: usize) -> String {
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return v.unwrap_or_default();
    }
    warn!(column = i, "column type not representable as text; emitting empty field");
    String::new()
}
