//! Periodically converts spreadsheets, SQL query results and raw files to
//! CSV and pushes them to a CKAN open-data portal, remembering per dataset
//! when the last push succeeded.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod process;
pub mod upload;
