use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use batch_core::{
    classify_log, find_failure_marker, Job, JobOutcome, ProxyAssignment, WorkerReport,
};
use batch_logging::{batch_error, batch_info, batch_trace, batch_warn};

use crate::launcher::{LaunchRequest, LaunchResult, Launcher};
use crate::persist::{create_job_dir, write_placeholder_in_background};

/// Settings shared by every job a worker runs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub browser_path: PathBuf,
    pub timeout: Duration,
    pub failure_markers: Vec<String>,
}

/// Runs one shard of jobs strictly in order, one fetch process at a time.
pub struct WorkerRunner {
    config: WorkerConfig,
    launcher: Arc<dyn Launcher>,
}

impl WorkerRunner {
    pub fn new(config: WorkerConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self { config, launcher }
    }

    /// Runs every job in `jobs`. Per-job failures are logged and tallied, never returned.
    pub async fn run(&self, jobs: &[Job], proxy: &ProxyAssignment) -> WorkerReport {
        let mut report = WorkerReport::new(proxy.worker);
        batch_info!(
            "worker {} starting {} jobs via {}",
            proxy.worker,
            jobs.len(),
            proxy.http_proxy
        );

        for job in jobs {
            let outcome = self.run_job(job, proxy).await;
            report.record(outcome);
        }

        batch_info!(
            "worker {} finished: {} completed, {} failed, {} timed out",
            report.worker,
            report.completed,
            report.failed,
            report.timed_out
        );
        report
    }

    pub async fn run_job(&self, job: &Job, proxy: &ProxyAssignment) -> JobOutcome {
        if let Some(dir) = job.output_path.parent() {
            if let Err(err) = create_job_dir(dir).await {
                batch_error!("worker {}: {:?}: {}", proxy.worker, dir, err);
                return JobOutcome::Failed;
            }
        }

        let request = LaunchRequest {
            job,
            browser_path: &self.config.browser_path,
            proxy,
            timeout: self.config.timeout,
        };

        match self.launcher.launch(request).await {
            // Nothing ran, so leave the job pending for the next run.
            Err(err) => {
                batch_error!("worker {}: {}: {}", proxy.worker, job.target, err);
                JobOutcome::Failed
            }
            Ok(LaunchResult::TimedOut) => {
                batch_warn!(
                    "worker {}: {} timed out after {:?}",
                    proxy.worker,
                    job.target,
                    self.config.timeout
                );
                self.mark_attempted(job, proxy).await;
                JobOutcome::TimedOut
            }
            Ok(LaunchResult::Exited { code, log }) => {
                batch_trace!("worker {}: {} output:\n{}", proxy.worker, job.target, log);
                let markers = self.config.failure_markers.as_slice();
                let outcome = classify_log(&log, markers);
                match outcome {
                    JobOutcome::Failed => {
                        batch_warn!(
                            "worker {}: {} failed (exit {:?}, found {:?})",
                            proxy.worker,
                            job.target,
                            code,
                            find_failure_marker(&log, markers).unwrap_or_default()
                        );
                        self.mark_attempted(job, proxy).await;
                    }
                    _ => batch_info!(
                        "worker {}: {} {} (exit {:?})",
                        proxy.worker,
                        job.target,
                        outcome,
                        code
                    ),
                }
                outcome
            }
        }
    }

    async fn mark_attempted(&self, job: &Job, proxy: &ProxyAssignment) {
        if let Err(err) = write_placeholder_in_background(job.output_path.clone()).await {
            batch_error!(
                "worker {}: cannot write placeholder {:?}: {}",
                proxy.worker,
                job.output_path,
                err
            );
        }
    }
}
