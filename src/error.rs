// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Unreadable or malformed configuration. Aborts the whole tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("dataset titles `{first}` and `{second}` share the state file `{state_file}`")]
    DuplicateTitle {
        first: String,
        second: String,
        state_file: String,
    },

    #[error("dataset with an empty title")]
    EmptyTitle,
}

/// A single cell whose value cannot be rendered. Never fatal: the field
/// is emitted empty.
#[derive(Debug, Error, PartialEq)]
pub enum CellError {
    #[error("{kind} cell does not hold a {expected} value")]
    Mismatch {
        kind: &'static str,
        expected: &'static str,
    },

    #[error("serial {0} is not a representable date")]
    InvalidDate(f64),
}

/// Failure to turn a dataset's source into an uploadable file. Aborts
/// only that dataset.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("format of file `{0}` not supported")]
    UnsupportedFormat(PathBuf),

    #[error("opening workbook `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook `{0}` has no sheets")]
    NoSheets(PathBuf),

    #[error("writing `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset `{title}` has no `{field}` configured")]
    MissingField { title: String, field: &'static str },

    #[error("running query: {0}")]
    Query(#[from] sqlx::Error),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Network or portal API failure. The staleness state is not advanced.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid portal url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{action}: {source}")]
    Http {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{action} rejected: {message}")]
    Api {
        action: &'static str,
        message: String,
    },

    #[error("{action} returned an unexpected body: {detail}")]
    MalformedResponse {
        action: &'static str,
        detail: String,
    },

    #[error("reading upload file `{path}`: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Problems with a dataset's `.last` file.
#[derive(Debug, Error)]
pub enum StaleStateError {
    #[error("state file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file `{path}` holds `{content}`, not epoch millis")]
    Corrupt { path: PathBuf, content: String },
}

/// Everything that can stop one dataset inside a tick.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    State(#[from] StaleStateError),
}
