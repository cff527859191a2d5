//! Batch core: pure job, partition, proxy and outcome rules.
mod job;
mod outcome;
mod partition;
mod proxy;
mod record;

pub use job::{job_name, output_path_for, Job, GRAPH_EXTENSION, SOURCE_SUFFIX_LEN};
pub use outcome::{
    classify_log, find_failure_marker, JobOutcome, WorkerReport, DEFAULT_FAILURE_MARKERS,
};
pub use partition::{partition, Shard};
pub use proxy::{PortRangeError, ProxyAssignment, ProxySettings, MAX_WORKER_INDEX, NO_PROXY};
pub use record::{parse_record, MalformedPolicy, MappingRecord, RecordError};

/// 1-based index of a worker; also selects its proxy port.
pub type WorkerIndex = usize;
