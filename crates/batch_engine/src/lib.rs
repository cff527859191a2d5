//! Batch engine: catalog IO, child-process launching and worker dispatch.
mod catalog;
mod dispatch;
mod launcher;
mod persist;
mod worker;

pub use catalog::{filter_pending, CatalogError, JobCatalog};
pub use dispatch::{DispatchConfig, DispatchError, DispatchSummary, Dispatcher};
pub use launcher::{
    FetchCommand, LaunchError, LaunchRequest, LaunchResult, Launcher, ProcessLauncher,
};
pub use persist::{
    create_job_dir, ensure_output_dir, write_placeholder, write_placeholder_in_background,
    PersistError,
};
pub use worker::{WorkerConfig, WorkerRunner};
