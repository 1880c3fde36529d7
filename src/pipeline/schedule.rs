use crate::{clock::Clock, pipeline::Pusher, upload::Uploader};
use std::{future::Future, time::Duration};
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Run ticks every `period` until `shutdown` resolves. The first tick
/// fires immediately. Ticks never overlap: a slow tick delays the next
/// one instead of stacking up behind it. Returns the number of ticks run.
pub async fn run_until<U, C, F>(pusher: &Pusher<U, C>, period: Duration, shutdown: F) -> u64
where
    U: Uploader,
    C: Clock,
    F: Future<Output = ()>,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(ticks, "shutdown requested; stopping scheduler");
                return ticks;
            }
            _ = ticker.tick() => {}
        }

        ticks += 1;
        let report = pusher.run_tick().await;
        info!(
            tick = ticks,
            pushed = report.pushed,
            skipped = report.skipped,
            failed = report.failed,
            unconfigured = report.unconfigured,
            config_error = report.config_error,
            "tick finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::UploadError,
        history::StateStore,
        upload::{Portal, UploadReceipt},
    };
    use std::{
        fs,
        path::Path,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct CountingUploader(Arc<AtomicUsize>);

    impl Uploader for CountingUploader {
        async fn upload_resource(
            &self,
            _portal: &Portal<'_>,
            resource_key: &str,
            _file: &Path,
            _append: bool,
        ) -> Result<UploadReceipt, UploadError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(UploadReceipt {
                resource_id: resource_key.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn runs_first_tick_immediately_and_stops_on_shutdown() {
        let tmp = tempdir().unwrap();
        let raw = tmp.path().join("raw.json");
        fs::write(&raw, "{}").unwrap();
        let config = tmp.path().join("pusher.yml");
        fs::write(
            &config,
            format!(
                "apiKey: k\nrootUrl: http://localhost\nconfigs:\n  - {{ title: r, sourceType: RAW, path: \"{}\", days: 1, resourceKey: key }}\n",
                raw.display()
            ),
        )
        .unwrap();

        let uploader = CountingUploader::default();
        let pusher = Pusher::new(
            &config,
            StateStore::new(tmp.path().join("state")).unwrap(),
            uploader.clone(),
        );

        let ticks = run_until(
            &pusher,
            Duration::from_millis(5),
            time::sleep(Duration::from_millis(60)),
        )
        .await;

        assert!(ticks >= 2, "only {ticks} ticks ran");
        // pushed once, then not due again within a day
        assert_eq!(uploader.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ready_shutdown_runs_no_tick() {
        let tmp = tempdir().unwrap();
        let pusher = Pusher::new(
            tmp.path().join("pusher.yml"),
            StateStore::new(tmp.path()).unwrap(),
            CountingUploader::default(),
        );
        let ticks = run_until(&pusher, DEFAULT_PERIOD, async {}).await;
        assert_eq!(ticks, 0);
    }
}
