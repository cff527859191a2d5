//! Optional RON configuration file.
//!
//! Every field is optional; anything left out keeps the built-in default.
//!
//! ```ron
//! (
//!     fetch_command: Some(["npm", "run", "crawl", "--"]),
//!     launch_flags: Some(["--no-sandbox"]),
//!     failure_markers: Some(["new Error('Page crashed!')", "DEBUG:ERROR"]),
//!     proxy_host: Some("127.0.0.1"),
//!     base_port: Some(9000),
//!     malformed: Some(Reject),
//! )
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use batch_core::MalformedPolicy;
use batch_engine::{DispatchConfig, FetchCommand};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Program followed by the arguments placed before the per-job flags.
    pub fetch_command: Option<Vec<String>>,
    pub launch_flags: Option<Vec<String>>,
    pub failure_markers: Option<Vec<String>>,
    pub proxy_host: Option<String>,
    pub base_port: Option<u16>,
    pub malformed: Option<MalformedPolicy>,
}

pub fn load(path: &Path) -> anyhow::Result<FileConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read config {:?}", path))?;
    parse(&content).with_context(|| format!("invalid config {:?}", path))
}

pub fn parse(content: &str) -> anyhow::Result<FileConfig> {
    Ok(ron::from_str(content)?)
}

impl FileConfig {
    pub fn fetch_command(&self) -> anyhow::Result<FetchCommand> {
        let mut command = FetchCommand::default();
        if let Some(parts) = &self.fetch_command {
            let Some((program, args)) = parts.split_first() else {
                bail!("fetch_command must name a program");
            };
            command.program = program.clone();
            command.args = args.to_vec();
        }
        if let Some(flags) = &self.launch_flags {
            command.launch_flags = flags.clone();
        }
        Ok(command)
    }

    /// Overlays the file settings onto `config`.
    pub fn apply(&self, config: &mut DispatchConfig) {
        if let Some(markers) = &self.failure_markers {
            config.failure_markers = markers.clone();
        }
        if let Some(host) = &self.proxy_host {
            config.proxy.host = host.clone();
        }
        if let Some(port) = self.base_port {
            config.proxy.base_port = port;
        }
        if let Some(policy) = self.malformed {
            config.malformed = policy;
        }
    }
}
