use chrono::{DateTime, Local};

/// Why a dataset has to be pushed on this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    /// No usable state file yet.
    FirstRun,
    /// `min_interval_days` have passed since the last push.
    IntervalElapsed,
    /// The config file was touched after the last push.
    ConfigChanged,
}

impl Reason {
    pub fn as_str(&self) -> &str {
        match self {
            Reason::FirstRun => "first run",
            Reason::IntervalElapsed => "interval elapsed",
            Reason::ConfigChanged => "config changed",
        }
    }
}

/// Outcome of a staleness check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Due(Reason),
    Skip { last_run: DateTime<Local> },
}

impl Decision {
    pub fn is_due(&self) -> bool {
        matches!(self, Decision::Due(_))
    }
}
