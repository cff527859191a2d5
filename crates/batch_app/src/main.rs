//! `pagegraph-batch`: crawl a mapping file of pages through per-worker proxies.
mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use batch_core::MalformedPolicy;
use batch_engine::{DispatchConfig, Dispatcher, ProcessLauncher};
use batch_logging::{batch_error, batch_warn, LogDestination};
use clap::Parser;
use log::LevelFilter;

use cli::CliOptions;

fn main() {
    // Usage errors exit with status 2; `--help` exits with 0.
    let options = CliOptions::parse();

    let destination = match &options.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    batch_logging::initialize(destination, LevelFilter::Info);

    if let Err(err) = run(options) {
        batch_error!("{err:#}");
        std::process::exit(1);
    }
}

/// Per-job failures never surface here; only configuration errors do.
fn run(options: CliOptions) -> anyhow::Result<()> {
    let file_config = match &options.config {
        Some(path) => config::load(path)?,
        None => config::FileConfig::default(),
    };

    let mut dispatch = DispatchConfig::new(
        &options.mapping_file,
        &options.output_root,
        &options.browser_path,
        options.workers,
        Duration::from_secs(options.timeout_secs.get()),
    );
    file_config.apply(&mut dispatch);
    if options.strict {
        dispatch.malformed = MalformedPolicy::Reject;
    }

    let launcher = Arc::new(ProcessLauncher::new(file_config.fetch_command()?));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let summary = runtime
        .block_on(Dispatcher::new(dispatch, launcher).run())
        .context("batch aborted before dispatch")?;

    if !summary.aborted_workers.is_empty() {
        batch_warn!(
            "workers {:?} aborted; their remaining jobs stay pending",
            summary.aborted_workers
        );
    }
    Ok(())
}
