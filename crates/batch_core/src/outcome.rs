use std::fmt;

use crate::WorkerIndex;

/// Substrings in the fetch tool's output that mean the artifact is unusable.
pub const DEFAULT_FAILURE_MARKERS: &[&str] = &[
    "new Error('Page crashed!')",
    "ERR_HTTP_RESPONSE_CODE_FAILURE",
    "DEBUG:ERROR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    TimedOut,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Completed => write!(f, "completed"),
            JobOutcome::Failed => write!(f, "failed"),
            JobOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// First marker found in `log`, if any.
pub fn find_failure_marker<'m, S: AsRef<str>>(log: &str, markers: &'m [S]) -> Option<&'m str> {
    markers
        .iter()
        .map(|marker| marker.as_ref())
        .find(|marker| !marker.is_empty() && log.contains(*marker))
}

/// Outcome of a process that exited before its deadline.
pub fn classify_log<S: AsRef<str>>(log: &str, markers: &[S]) -> JobOutcome {
    if find_failure_marker(log, markers).is_some() {
        JobOutcome::Failed
    } else {
        JobOutcome::Completed
    }
}

/// Per-worker outcome tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    pub worker: WorkerIndex,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl WorkerReport {
    pub fn new(worker: WorkerIndex) -> Self {
        Self {
            worker,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::TimedOut => self.timed_out += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.completed + self.failed + self.timed_out
    }
}
