// src/upload/ckan.rs

use crate::error::UploadError;
use crate::process::date_parser::DATE_FORMAT;
use crate::upload::{Portal, UploadReceipt, Uploader};
use chrono::{Local, NaiveDate};
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::{path::Path, time::Duration};
use tracing::{debug, info};
use url::Url;

const API_PREFIX: &str = "/api/3/action/";
const RESOURCE_SHOW: &str = "resource_show";
const RESOURCE_CREATE: &str = "resource_create";
const RESOURCE_UPDATE: &str = "resource_update";

/// `url` given to freshly created resources; the upload that follows
/// replaces it.
const PLACEHOLDER_URL: &str = "dummy";

/// Default request timeout when the config does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Standard CKAN action response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// The parts of a CKAN resource we use.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// CKAN action-API client.
#[derive(Debug, Clone)]
pub struct CkanClient {
    http: Client,
}

impl CkanClient {
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| UploadError::Http {
                action: "building http client",
                source,
            })?;
        Ok(Self::with_http(http))
    }

    /// Wrap an already configured HTTP client.
    pub fn with_http(http: Client) -> Self {
        Self { http }
    }

    /// Look up an existing resource.
    pub async fn resource_show(&self, portal: &Portal<'_>, id: &str) -> Result<Resource, UploadError> {
        let req = self
            .http
            .get(action_url(portal.root_url, RESOURCE_SHOW)?)
            .header(AUTHORIZATION, portal.api_key)
            .query(&[("id", id)]);
        send(RESOURCE_SHOW, req).await
    }

    /// Create an empty resource named `name` under `package_id`.
    pub async fn resource_create(
        &self,
        portal: &Portal<'_>,
        package_id: &str,
        name: &str,
    ) -> Result<Resource, UploadError> {
        let req = self
            .http
            .post(action_url(portal.root_url, RESOURCE_CREATE)?)
            .header(AUTHORIZATION, portal.api_key)
            .json(&json!({
                "package_id": package_id,
                "name": name,
                "url": PLACEHOLDER_URL,
            }));
        send(RESOURCE_CREATE, req).await
    }

    /// Replace the file behind resource `id`.
    pub async fn resource_update(
        &self,
        portal: &Portal<'_>,
        id: &str,
        file: &Path,
    ) -> Result<Resource, UploadError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|source| UploadError::File {
                path: file.to_path_buf(),
                source,
            })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        debug!(id, file = %file.display(), bytes = bytes.len(), "uploading");

        let form = Form::new()
            .text("id", id.to_string())
            .part("upload", Part::bytes(bytes).file_name(file_name));
        let req = self
            .http
            .post(action_url(portal.root_url, RESOURCE_UPDATE)?)
            .header(AUTHORIZATION, portal.api_key)
            .multipart(form);
        send(RESOURCE_UPDATE, req).await
    }
}

impl Uploader for CkanClient {
    /// Plain mode: `resource_update` on `resource_key`.
    /// Append mode: resolve → create → upload, stopping at the first failure.
    async fn upload_resource(
        &self,
        portal: &Portal<'_>,
        resource_key: &str,
        file: &Path,
        append: bool,
    ) -> Result<UploadReceipt, UploadError> {
        let target = if append {
            let existing = self.resource_show(portal, resource_key).await?;
            let base = existing.name.as_deref().unwrap_or(resource_key);
            let name = dated_name(base, Local::now().date_naive());
            let created = self
                .resource_create(portal, &existing.package_id, &name)
                .await?;
            info!(package = %existing.package_id, resource = %created.id, name = %name, "created dated resource");
            created.id
        } else {
            resource_key.to_string()
        };

        let updated = self.resource_update(portal, &target, file).await?;
        info!(resource = %updated.id, file = %file.display(), "resource updated");
        Ok(UploadReceipt {
            resource_id: updated.id,
        })
    }
}

/// `{root}/api/3/action/{action}`, tolerating a trailing slash on root.
pub fn action_url(root_url: &str, action: &str) -> Result<Url, UploadError> {
    let raw = format!("{}{}{}", root_url.trim_end_matches('/'), API_PREFIX, action);
    Url::parse(&raw).map_err(|source| UploadError::Url { url: raw, source })
}

/// Name of the resource created in append mode: original name plus
/// today's date as `dd.MM.yyyy`.
pub fn dated_name(original: &str, today: NaiveDate) -> String {
    format!("{} {}", original.trim(), today.format(DATE_FORMAT))
}

async fn send<T: DeserializeOwned>(action: &'static str, req: RequestBuilder) -> Result<T, UploadError> {
    let resp = req
        .send()
        .await
        .map_err(|source| UploadError::Http { action, source })?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|source| UploadError::Http { action, source })?;
    parse_response(action, status, &body)
}

/// Unwrap a CKAN envelope. Non-2xx statuses and `success: false` are
/// both API failures.
pub fn parse_response<T: DeserializeOwned>(
    action: &'static str,
    status: StatusCode,
    body: &str,
) -> Result<T, UploadError> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(env) if env.success && status.is_success() => {
            env.result.ok_or_else(|| UploadError::MalformedResponse {
                action,
                detail: "missing `result`".to_string(),
            })
        }
        Ok(env) => Err(UploadError::Api {
            action,
            message: env
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| status.to_string()),
        }),
        Err(e) if status.is_success() => Err(UploadError::MalformedResponse {
            action,
            detail: e.to_string(),
        }),
        Err(_) => Err(UploadError::Api {
            action,
            message: format!("{}: {}", status, snippet(body)),
        }),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
