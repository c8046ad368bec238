// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.server.route.starts_with('/') {
            bail!("server.route must start with '/': {}", self.server.route);
        }
        if self.checks.timeout_ms == 0 {
            bail!("checks.timeout_ms must be greater than zero");
        }
        if self.checks.max_concurrency == 0 {
            bail!("checks.max_concurrency must be greater than zero");
        }
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/': {}", self.metrics.path);
        }
        for probe in &self.probes {
            match crate::health::segments(&probe.path) {
                Ok(segments) if !segments.is_empty() => {}
                _ => bail!("invalid probe path: '{}'", probe.path),
            }
            if probe.timeout_ms == Some(0) {
                bail!("probe '{}' has a zero timeout", probe.path);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    /// Prefix the health endpoint is mounted under.
    #[serde(default = "default_route")]
    pub route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            route: default_route(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Default per-check timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on procedures running at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl ChecksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// A built-in probe registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub path: String,
    #[serde(flatten)]
    pub target: ProbeTarget,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeTarget {
    /// `host:port` that must accept connections.
    Tcp(String),
    /// URL that must answer a GET with 2xx.
    Http(Url),
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_route() -> String {
    "/health".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_max_concurrency() -> usize {
    256
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
