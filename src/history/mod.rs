// src/history/mod.rs

pub mod state;

use crate::error::StaleStateError;
use chrono::{DateTime, Days, Local, TimeZone, Utc};
use state::{Decision, Reason};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Suffix of the per-dataset state files.
pub const STATE_EXT: &str = "last";

/// Filesystem-safe name for a dataset title. This is the lookup key for
/// the state file, so it must never change between releases.
pub fn state_key(title: &str) -> String {
    title.replace(&[' ', '/', '\\'][..], "_")
}

/// Instant written for datasets seen for the first time: local midnight,
/// 2000-01-01.
pub fn never_run() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .earliest()
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.into())
}

/// True once `min_interval_days` local calendar days separate `last_run`
/// from `now`.
pub fn interval_elapsed(
    last_run: DateTime<Local>,
    now: DateTime<Local>,
    min_interval_days: u32,
) -> bool {
    match now
        .naive_local()
        .checked_sub_days(Days::new(u64::from(min_interval_days)))
    {
        Some(threshold) => last_run.naive_local() <= threshold,
        None => false,
    }
}

/// Per-dataset "last successful push" timestamps, one `<key>.last` file
/// per dataset holding decimal epoch milliseconds.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StaleStateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StaleStateError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `title`.
    pub fn state_path(&self, title: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", state_key(title), STATE_EXT))
    }

    /// Read the stored timestamp without creating anything.
    /// `Ok(None)` when the file does not exist.
    pub fn read(&self, title: &str) -> Result<Option<DateTime<Local>>, StaleStateError> {
        let path = self.state_path(title);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StaleStateError::Io { path, source }),
        };
        let millis: i64 = content
            .trim()
            .parse()
            .map_err(|_| StaleStateError::Corrupt {
                path: path.clone(),
                content: content.trim().to_string(),
            })?;
        Local
            .timestamp_millis_opt(millis)
            .single()
            .map(Some)
            .ok_or_else(|| StaleStateError::Corrupt {
                path,
                content: content.trim().to_string(),
            })
    }

    /// Last successful push for `title`. A missing file is created with
    /// the [`never_run`] sentinel; a corrupt one counts as never run.
    pub fn last_run(&self, title: &str) -> Result<DateTime<Local>, StaleStateError> {
        match self.read(title) {
            Ok(Some(at)) => Ok(at),
            Ok(None) => {
                let start = never_run();
                self.write(title, start)?;
                debug!(title, "created state file");
                Ok(start)
            }
            Err(StaleStateError::Corrupt { path, content }) => {
                warn!(title, path = %path.display(), content = %content, "corrupt state file; treating as never run");
                Ok(never_run())
            }
            Err(e) => Err(e),
        }
    }

    /// Decide whether `title` must be pushed at `now`.
    ///
    /// `config_modified` is the config file's mtime when the dataset opts
    /// into pushing after config changes, `None` otherwise.
    pub fn evaluate(
        &self,
        title: &str,
        min_interval_days: u32,
        now: DateTime<Local>,
        config_modified: Option<DateTime<Local>>,
    ) -> Result<Decision, StaleStateError> {
        let last_run = self.last_run(title)?;
        if last_run <= never_run() {
            return Ok(Decision::Due(Reason::FirstRun));
        }
        if interval_elapsed(last_run, now, min_interval_days) {
            return Ok(Decision::Due(Reason::IntervalElapsed));
        }
        if config_modified.is_some_and(|m| last_run < m) {
            return Ok(Decision::Due(Reason::ConfigChanged));
        }
        Ok(Decision::Skip { last_run })
    }

    pub fn is_due(
        &self,
        title: &str,
        min_interval_days: u32,
        now: DateTime<Local>,
    ) -> Result<bool, StaleStateError> {
        Ok(self.evaluate(title, min_interval_days, now, None)?.is_due())
    }

    /// Persist `now` as the last successful push. Only call this after the
    /// upload has been confirmed.
    pub fn record_success(&self, title: &str, now: DateTime<Local>) -> Result<(), StaleStateError> {
        self.write(title, now)
    }

    fn write(&self, title: &str, at: DateTime<Local>) -> Result<(), StaleStateError> {
        let final_path = self.state_path(title);
        let tmp_path = final_path.with_extension(format!("{}.tmp", STATE_EXT));
        fs::write(&tmp_path, at.timestamp_millis().to_string()).map_err(|source| {
            StaleStateError::Io {
                path: tmp_path.clone(),
                source,
            }
        })?;
        fs::rename(&tmp_path, &final_path).map_err(|source| StaleStateError::Io {
            path: final_path,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).earliest().unwrap()
    }

    #[test]
    fn state_key_replaces_spaces_and_separators() {
        assert_eq!(state_key("Budget 2024 / Q1"), "Budget_2024___Q1");
        assert_eq!(state_key("plain"), "plain");
        assert_eq!(state_key("Бюджет на общината"), "Бюджет_на_общината");
    }

    #[test]
    fn first_evaluation_is_due_and_creates_sentinel() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        let now = at(2024, 3, 1, 12);

        let decision = store.evaluate("my data", 100_000, now, None).unwrap();
        assert_eq!(decision, Decision::Due(Reason::FirstRun));

        let path = tmp.path().join("my_data.last");
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, never_run().timestamp_millis().to_string());

        // still due until a push succeeds
        assert!(store.is_due("my data", 100_000, now).unwrap());
    }

    #[test]
    fn not_due_right_after_success_then_due_at_boundary() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        let pushed = at(2024, 3, 1, 12);
        store.record_success("ds", pushed).unwrap();

        assert!(!store.is_due("ds", 7, pushed).unwrap());
        assert!(!store.is_due("ds", 7, at(2024, 3, 8, 11)).unwrap());
        assert!(!store
            .is_due("ds", 7, at(2024, 3, 8, 12) - Duration::milliseconds(1))
            .unwrap());
        assert!(store.is_due("ds", 7, at(2024, 3, 8, 12)).unwrap());
        assert!(store.is_due("ds", 7, at(2024, 4, 1, 0)).unwrap());
    }

    #[test]
    fn zero_interval_is_always_due() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        let now = at(2024, 5, 5, 5);
        store.record_success("ds", now).unwrap();
        assert!(store.is_due("ds", 0, now).unwrap());
    }

    #[test]
    fn config_change_overrides_interval() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        let pushed = at(2024, 3, 1, 12);
        store.record_success("ds", pushed).unwrap();
        let now = at(2024, 3, 2, 12);

        let older = Some(at(2024, 2, 1, 0));
        assert!(matches!(
            store.evaluate("ds", 30, now, older).unwrap(),
            Decision::Skip { .. }
        ));

        let newer = Some(at(2024, 3, 2, 9));
        assert_eq!(
            store.evaluate("ds", 30, now, newer).unwrap(),
            Decision::Due(Reason::ConfigChanged)
        );
    }

    #[test]
    fn corrupt_state_counts_as_never_run() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        fs::write(store.state_path("ds"), "not a number").unwrap();

        assert!(matches!(
            store.read("ds"),
            Err(StaleStateError::Corrupt { .. })
        ));
        assert_eq!(
            store.evaluate("ds", 365, at(2024, 1, 1, 0), None).unwrap(),
            Decision::Due(Reason::FirstRun)
        );
    }

    #[test]
    fn state_survives_reopening() {
        let tmp = tempdir().unwrap();
        let pushed = at(2024, 6, 1, 8);
        {
            let store = StateStore::new(tmp.path()).unwrap();
            store.record_success("ds", pushed).unwrap();
        }
        let store = StateStore::new(tmp.path()).unwrap();
        assert_eq!(store.read("ds").unwrap(), Some(pushed));
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn datasets_do_not_share_state() {
        let tmp = tempdir().unwrap();
        let store = StateStore::new(tmp.path()).unwrap();
        let now = at(2024, 6, 1, 8);
        store.record_success("a", now).unwrap();
        assert!(!store.is_due("a", 1, now).unwrap());
        assert!(store.is_due("b", 1, now).unwrap());
    }
}
