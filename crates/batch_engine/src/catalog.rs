use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use batch_core::{parse_record, Job, MalformedPolicy, RecordError};
use batch_logging::{batch_debug, batch_info, batch_warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read mapping file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed mapping record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: RecordError,
    },
}

/// Builds the job list from a `source_path,target` mapping file.
#[derive(Debug, Clone)]
pub struct JobCatalog {
    output_root: PathBuf,
    malformed: MalformedPolicy,
}

impl JobCatalog {
    pub fn new(output_root: impl Into<PathBuf>, malformed: MalformedPolicy) -> Self {
        Self {
            output_root: output_root.into(),
            malformed,
        }
    }

    pub fn load(&self, mapping_file: &Path) -> Result<Vec<Job>, CatalogError> {
        let content = fs::read_to_string(mapping_file).map_err(|source| CatalogError::Read {
            path: mapping_file.to_path_buf(),
            source,
        })?;
        let jobs = self.parse(&content)?;
        batch_info!("Loaded {} jobs from {:?}", jobs.len(), mapping_file);
        Ok(jobs)
    }

    /// Parses mapping content, keeping records whose source file exists.
    ///
    /// Output paths are unique across the returned jobs: a later record whose
    /// output path is already taken is treated as malformed.
    pub fn parse(&self, content: &str) -> Result<Vec<Job>, CatalogError> {
        let mut jobs = Vec::new();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let record = match parse_record(raw) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(source) => {
                    self.on_malformed(line, source)?;
                    continue;
                }
            };

            if !record.source_path.exists() {
                batch_debug!("Dropping line {}: {:?} does not exist", line, record.source_path);
                continue;
            }

            let source_path = record.source_path.clone();
            match Job::new(record.source_path, record.target, &self.output_root) {
                Some(job) if claimed.insert(job.output_path.clone()) => jobs.push(job),
                Some(job) => {
                    self.on_malformed(line, RecordError::DuplicateOutput(job.output_path))?
                }
                None => self.on_malformed(line, RecordError::NoJobName(source_path))?,
            }
        }
        Ok(jobs)
    }

    fn on_malformed(&self, line: usize, source: RecordError) -> Result<(), CatalogError> {
        match self.malformed {
            MalformedPolicy::Skip => {
                batch_warn!("Skipping malformed mapping line {}: {}", line, source);
                Ok(())
            }
            MalformedPolicy::Reject => Err(CatalogError::Malformed { line, source }),
        }
    }
}

/// Keeps jobs with no artifact yet. Zero-byte placeholders count as done.
pub fn filter_pending(jobs: Vec<Job>) -> Vec<Job> {
    let total = jobs.len();
    let pending: Vec<Job> = jobs
        .into_iter()
        .filter(|job| !job.output_path.exists())
        .collect();
    batch_info!(
        "{} of {} jobs pending ({} already attempted)",
        pending.len(),
        total,
        total - pending.len()
    );
    pending
}
