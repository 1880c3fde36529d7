// src/pipeline/mod.rs
//! One scheduling tick: config → staleness → extract → upload → record.

pub mod schedule;

use crate::{
    clock::{Clock, SystemClock},
    config::{self, DatasetConfig, SourceType},
    error::{ConversionError, DatasetError},
    history::{
        state::{Decision, Reason},
        StateStore,
    },
    process::{sql_to_csv, xls_to_csv},
    upload::{Portal, UploadReceipt, Uploader},
};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};

/// Summary of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Config could not be loaded; nothing ran.
    pub config_error: bool,
    /// Placeholder API key; nothing ran.
    pub unconfigured: bool,
    pub pushed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TickReport {
    /// Datasets that got past the staleness check.
    pub fn processed(&self) -> usize {
        self.pushed + self.failed
    }
}

/// What happened to one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pushed {
        reason: Reason,
        receipt: UploadReceipt,
    },
    Skipped {
        last_run: DateTime<Local>,
    },
}

/// Everything a tick needs, passed in explicitly.
pub struct Pusher<U, C = SystemClock> {
    config_path: PathBuf,
    state: StateStore,
    uploader: U,
    clock: C,
}

impl<U: Uploader> Pusher<U, SystemClock> {
    pub fn new(config_path: impl Into<PathBuf>, state: StateStore, uploader: U) -> Self {
        Self::with_clock(config_path, state, uploader, SystemClock)
    }
}

impl<U: Uploader, C: Clock> Pusher<U, C> {
    pub fn with_clock(
        config_path: impl Into<PathBuf>,
        state: StateStore,
        uploader: U,
        clock: C,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            state,
            uploader,
            clock,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Run every configured dataset once. Never fails: problems are logged
    /// and counted, and one dataset's failure does not stop the others.
    pub async fn run_tick(&self) -> TickReport {
        let mut report = TickReport::default();

        // re-read every tick; operators edit the file while we run
        let root = match config::load(&self.config_path) {
            Ok(root) => root,
            Err(e) => {
                error!(error = %e, "failed to load config");
                report.config_error = true;
                return report;
            }
        };
        if root.is_unconfigured() {
            info!("skipping run, configuration is not supplied");
            report.unconfigured = true;
            return report;
        }

        let config_modified = match config::modified_at(&self.config_path) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "cannot read config modification time");
                None
            }
        };
        let portal = Portal {
            root_url: &root.root_url,
            api_key: &root.api_key,
        };

        info!(datasets = root.configs.len(), "number of configurations to run");
        for dataset in &root.configs {
            let span = info_span!("dataset", title = %dataset.title);
            match self
                .run_dataset(&portal, dataset, config_modified)
                .instrument(span)
                .await
            {
                Ok(Outcome::Pushed { .. }) => report.pushed += 1,
                Ok(Outcome::Skipped { .. }) => report.skipped += 1,
                Err(e) => {
                    error!(
                        title = %dataset.title,
                        resource = %dataset.resource_key,
                        error = %e,
                        "problem with resource"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Staleness check, extraction, upload and bookkeeping for one dataset.
    pub async fn run_dataset(
        &self,
        portal: &Portal<'_>,
        dataset: &DatasetConfig,
        config_modified: Option<DateTime<Local>>,
    ) -> Result<Outcome, DatasetError> {
        let now = self.clock.now();
        let modified = config_modified.filter(|_| dataset.push_after_config_change);
        let decision =
            self.state
                .evaluate(&dataset.title, dataset.min_interval_days, now, modified)?;
        let reason = match decision {
            Decision::Due(reason) => reason,
            Decision::Skip { last_run } => {
                info!(last_run = %last_run, "skipping run; last run was too recent");
                return Ok(Outcome::Skipped { last_run });
            }
        };

        info!(
            reason = reason.as_str(),
            source = ?dataset.source_type,
            path = %dataset.path,
            "running pusher"
        );
        let file = extract(dataset).await?;
        info!(file = %file.display(), "parsing complete; pushing to portal");

        let receipt = self
            .uploader
            .upload_resource(portal, &dataset.resource_key, &file, dataset.append_mode)
            .await?;
        self.state.record_success(&dataset.title, self.clock.now())?;
        Ok(Outcome::Pushed { reason, receipt })
    }
}

/// Produce the file to upload for `dataset`.
pub async fn extract(dataset: &DatasetConfig) -> Result<PathBuf, ConversionError> {
    match dataset.source_type {
        SourceType::Xls => {
            let path = PathBuf::from(&dataset.path);
            let use_bom = dataset.use_bom;
            tokio::task::spawn_blocking(move || xls_to_csv(&path, use_bom)).await?
        }
        SourceType::Sql => {
            let connection_string =
                required(dataset, "connectionString", &dataset.connection_string)?;
            let query = required(dataset, "query", &dataset.query)?;
            sql_to_csv(
                connection_string,
                query,
                Path::new(&dataset.path),
                dataset.use_bom,
            )
            .await
        }
        SourceType::Raw => Ok(PathBuf::from(&dataset.path)),
    }
}

fn required<'a>(
    dataset: &DatasetConfig,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, ConversionError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConversionError::MissingField {
            title: dataset.title.clone(),
            field,
        })
}
