use thiserror::Error;

use crate::WorkerIndex;

/// Highest worker index with a proxy port in the legacy scheme.
pub const MAX_WORKER_INDEX: WorkerIndex = 999;

/// Hosts that always bypass the proxy.
pub const NO_PROXY: &str = "localhost,127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{index} is an unsupported port index")]
pub struct PortRangeError {
    pub index: WorkerIndex,
}

/// Where the per-worker proxies listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    /// Worker `i` uses port `base_port + i`.
    pub base_port: u16,
}

impl Default for ProxySettings {
    fn default() -> Self {
        // 8000 + i reproduces the legacy "800<i>", "80<i>", "8<i>" port strings.
        Self {
            host: "localhost".to_string(),
            base_port: 8000,
        }
    }
}

impl ProxySettings {
    /// Derives the proxy assignment for `index`, which must be in `1..=999`.
    pub fn assign(&self, index: WorkerIndex) -> Result<ProxyAssignment, PortRangeError> {
        let port = self.port(index)?;
        let host_port = format!("{}:{}", self.host, port);
        Ok(ProxyAssignment {
            worker: index,
            port,
            http_proxy: format!("http://{host_port}"),
            https_proxy: format!("https://{host_port}"),
            no_proxy: NO_PROXY.to_string(),
        })
    }

    fn port(&self, index: WorkerIndex) -> Result<u16, PortRangeError> {
        if !(1..=MAX_WORKER_INDEX).contains(&index) {
            return Err(PortRangeError { index });
        }
        u16::try_from(index)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or(PortRangeError { index })
    }
}

/// Egress proxy of one worker. Computed once at dispatch and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAssignment {
    pub worker: WorkerIndex,
    pub port: u16,
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
}

impl ProxyAssignment {
    /// Environment variables to add to the fetch tool's inherited environment.
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("http_proxy", self.http_proxy.clone()),
            ("https_proxy", self.https_proxy.clone()),
            ("no_proxy", self.no_proxy.clone()),
        ]
    }
}
