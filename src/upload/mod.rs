// src/upload/mod.rs
//! Pushing finished files to the open-data portal.

pub mod ckan;

use crate::error::UploadError;
use std::{future::Future, path::Path};

pub use ckan::CkanClient;

/// Portal endpoint and credential, re-read from config every tick.
#[derive(Debug, Clone, Copy)]
pub struct Portal<'a> {
    pub root_url: &'a str,
    pub api_key: &'a str,
}

/// What the portal accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Resource that now holds the file; differs from the configured key
    /// in append mode.
    pub resource_id: String,
}

/// Capability to place a file into a portal resource.
pub trait Uploader {
    /// Upload `file` into `resource_key`. With `append`, a new dated
    /// resource is created next to `resource_key` and the file goes there.
    fn upload_resource(
        &self,
        portal: &Portal<'_>,
        resource_key: &str,
        file: &Path,
        append: bool,
    ) -> impl Future<Output = Result<UploadReceipt, UploadError>> + Send;
}
