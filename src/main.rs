use anyhow::{bail, Context, Result};
use clap::Parser;
use opendata_pusher::{
    config,
    history::StateStore,
    pipeline::{schedule, Pusher},
    upload::{ckan::DEFAULT_TIMEOUT, CkanClient},
};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_FILE: &str = "pusher.yml";

/// Push spreadsheets, query results and files to a CKAN portal on a schedule.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file (default: pusher.yml next to the executable)
    #[arg(env = "PUSHER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the per-dataset `.last` files
    #[arg(long, env = "PUSHER_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Seconds between ticks
    #[arg(long, env = "PUSHER_INTERVAL_SECS", default_value_t = schedule::DEFAULT_PERIOD.as_secs())]
    interval_secs: u64,

    /// Run one tick and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    let args = Args::parse();

    // ─── 2) locate config ────────────────────────────────────────────
    let config_path = match args.config {
        Some(p) => p,
        None => default_config_path()?,
    };
    if !config_path.is_file() {
        bail!("config file {} not found", config_path.display());
    }
    info!(path = %config_path.display(), "using config");
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    // settings that cannot change between ticks come from the first load
    let initial = match config::load(&config_path) {
        Ok(root) => Some(root),
        Err(e) => {
            warn!(error = %e, "config not loadable at startup; using defaults");
            None
        }
    };
    let state_dir = args
        .state_dir
        .or_else(|| initial.as_ref().and_then(|r| r.state_dir.clone()))
        .map(|d| if d.is_relative() { config_dir.join(d) } else { d })
        .unwrap_or_else(|| config_dir.clone());
    let timeout = initial
        .as_ref()
        .and_then(|r| r.request_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    // ─── 3) wire the pipeline ────────────────────────────────────────
    let state = StateStore::new(&state_dir)
        .with_context(|| format!("opening state dir {}", state_dir.display()))?;
    info!(dir = %state.dir().display(), "state dir ready");
    let client = CkanClient::new(timeout).context("building portal client")?;
    let pusher = Pusher::new(config_path, state, client);

    // ─── 4) run ──────────────────────────────────────────────────────
    if args.once {
        let report = pusher.run_tick().await;
        info!(?report, "single tick finished");
        return Ok(());
    }

    let period = Duration::from_secs(args.interval_secs.max(1));
    info!(period = ?period, "scheduler started");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    };
    schedule::run_until(&pusher, period, shutdown).await;

    info!("all done");
    Ok(())
}

fn default_config_path() -> Result<PathBuf> {
    let exe = env::current_exe().context("locating executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(dir.join(DEFAULT_CONFIG_FILE))
}
