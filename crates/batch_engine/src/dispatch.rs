use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use batch_core::{
    partition, MalformedPolicy, PortRangeError, ProxySettings, WorkerIndex, WorkerReport,
    DEFAULT_FAILURE_MARKERS,
};
use batch_logging::{batch_debug, batch_error, batch_info};
use futures_util::future::join_all;
use thiserror::Error;

use crate::catalog::{filter_pending, CatalogError, JobCatalog};
use crate::launcher::Launcher;
use crate::persist::{ensure_output_dir, PersistError};
use crate::worker::{WorkerConfig, WorkerRunner};

/// Everything one batch run needs. Workers receive a [`WorkerConfig`] cut from it.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub mapping_file: PathBuf,
    pub output_root: PathBuf,
    pub browser_path: PathBuf,
    pub worker_count: NonZeroUsize,
    pub timeout: Duration,
    pub failure_markers: Vec<String>,
    pub proxy: ProxySettings,
    pub malformed: MalformedPolicy,
}

impl DispatchConfig {
    pub fn new(
        mapping_file: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        browser_path: impl Into<PathBuf>,
        worker_count: NonZeroUsize,
        timeout: Duration,
    ) -> Self {
        Self {
            mapping_file: mapping_file.into(),
            output_root: output_root.into(),
            browser_path: browser_path.into(),
            worker_count,
            timeout,
            failure_markers: DEFAULT_FAILURE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            proxy: ProxySettings::default(),
            malformed: MalformedPolicy::default(),
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            browser_path: self.browser_path.clone(),
            timeout: self.timeout,
            failure_markers: self.failure_markers.clone(),
        }
    }
}

/// Errors that stop a run before any job is launched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("browser executable not found at {0:?}")]
    BrowserNotFound(PathBuf),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    PortRange(#[from] PortRangeError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Jobs whose source file exists.
    pub loaded: usize,
    /// Jobs skipped because an artifact or placeholder already exists.
    pub already_done: usize,
    pub pending: usize,
    pub reports: Vec<WorkerReport>,
    /// Workers whose task panicked or was cancelled.
    pub aborted_workers: Vec<WorkerIndex>,
}

impl DispatchSummary {
    pub fn completed(&self) -> usize {
        self.reports.iter().map(|r| r.completed).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    pub fn timed_out(&self) -> usize {
        self.reports.iter().map(|r| r.timed_out).sum()
    }

    pub fn attempted(&self) -> usize {
        self.reports.iter().map(WorkerReport::attempted).sum()
    }
}

/// Static-partition worker pool: one shard and one proxy per worker, join-all at the end.
pub struct Dispatcher {
    config: DispatchConfig,
    launcher: Arc<dyn Launcher>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self { config, launcher }
    }

    pub async fn run(&self) -> Result<DispatchSummary, DispatchError> {
        let config = &self.config;
        if !config.browser_path.exists() {
            return Err(DispatchError::BrowserNotFound(config.browser_path.clone()));
        }

        let catalog = JobCatalog::new(&config.output_root, config.malformed);
        let jobs = catalog.load(&config.mapping_file)?;
        let loaded = jobs.len();
        let pending = filter_pending(jobs);

        // Ports are checked for the requested worker count before any sharding, so an
        // oversized pool fails on index 1000 without allocating a shard per worker.
        let proxies = (1..=config.worker_count.get())
            .map(|worker| config.proxy.assign(worker))
            .collect::<Result<Vec<_>, _>>()?;
        let shards = partition(pending.len(), config.worker_count);
        ensure_output_dir(&config.output_root)?;

        batch_info!(
            "dispatching {} jobs to {} workers",
            pending.len(),
            config.worker_count
        );

        let worker_config = config.worker_config();
        let mut workers = Vec::with_capacity(shards.len());
        for (shard, proxy) in shards.iter().zip(proxies) {
            batch_debug!("worker {} gets {} jobs", shard.worker, shard.len());
            let jobs = shard.slice(&pending).to_vec();
            let runner = WorkerRunner::new(worker_config.clone(), self.launcher.clone());
            let handle = tokio::spawn(async move { runner.run(&jobs, &proxy).await });
            workers.push((shard.worker, handle));
        }

        let (indices, handles): (Vec<_>, Vec<_>) = workers.into_iter().unzip();
        let results = join_all(handles).await;

        let mut summary = DispatchSummary {
            loaded,
            already_done: loaded - pending.len(),
            pending: pending.len(),
            ..DispatchSummary::default()
        };
        for (worker, result) in indices.into_iter().zip(results) {
            match result {
                Ok(report) => summary.reports.push(report),
                Err(err) => {
                    batch_error!("worker {} aborted: {}", worker, err);
                    summary.aborted_workers.push(worker);
                }
            }
        }

        batch_info!(
            "run finished: {} attempted, {} completed, {} failed, {} timed out",
            summary.attempted(),
            summary.completed(),
            summary.failed(),
            summary.timed_out()
        );
        Ok(summary)
    }
}
