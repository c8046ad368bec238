// src/health/checker.rs
use super::aggregator::Aggregator;
use super::codec::{CheckResponse, ResultCodec};
use super::resolver;
use super::tree::{CheckTree, Leaf};
use super::{CheckResult, HealthError, Procedure};
use crate::config::ChecksConfig;
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The health check registry and its evaluation engine.
///
/// Create one per exposed endpoint and share it behind an `Arc`; checks can
/// be registered and removed while queries are in flight. A query sees each
/// composite as it was when the evaluation reached it.
pub struct HealthChecks {
    tree: CheckTree,
    aggregator: Aggregator,
    default_timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthChecks {
    pub fn new(config: &ChecksConfig) -> Self {
        Self {
            tree: CheckTree::new(),
            aggregator: Aggregator::new(config.max_concurrency),
            default_timeout: config.timeout(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.aggregator = self.aggregator.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Registers `procedure` at `path` under the default timeout. Missing
    /// groups along the path are created; an existing check at `path` is
    /// replaced.
    pub fn register<P: Procedure>(&self, path: &str, procedure: P) -> Result<&Self, HealthError> {
        self.register_with_timeout(path, self.default_timeout, procedure)
    }

    pub fn register_with_timeout<P: Procedure>(
        &self,
        path: &str,
        timeout: Duration,
        procedure: P,
    ) -> Result<&Self, HealthError> {
        self.register_shared(path, timeout, Arc::new(procedure))
    }

    pub fn register_shared(
        &self,
        path: &str,
        timeout: Duration,
        procedure: Arc<dyn Procedure>,
    ) -> Result<&Self, HealthError> {
        self.tree.insert(path, Leaf::new(procedure, timeout))?;
        info!("Registered health check '{}' (timeout {:?})", path, timeout);
        Ok(self)
    }

    /// Removes the check or group at `path` with everything below it.
    pub fn unregister(&self, path: &str) -> Result<(), HealthError> {
        let removed = self.tree.remove(path)?;
        info!("Unregistered health check '{}'", path);

        if let Some(metrics) = &self.metrics {
            let path = resolver::segments(path)?.join("/");
            for check in removed.leaf_paths(&path) {
                metrics.forget_check(&check);
            }
        }
        Ok(())
    }

    /// Evaluates the subtree at `path` and returns the raw verdict tree.
    pub async fn evaluate(&self, path: &str) -> Result<CheckResult, HealthError> {
        let segments = resolver::segments(path)?;
        let node = self.tree.resolve(path)?;
        Ok(self.aggregator.evaluate(node, segments.join("/")).await)
    }

    /// Evaluates the subtree at `path` and renders it for the transport
    /// layer. Never fails: resolution errors become response categories.
    pub async fn check_status(&self, path: &str) -> CheckResponse {
        let is_absolute_root = matches!(resolver::segments(path), Ok(s) if s.is_empty());

        let response = match self.evaluate(path).await {
            Ok(result) => ResultCodec::render(&result, is_absolute_root),
            Err(err) => {
                debug!("Health query for '{}' rejected: {}", path, err);
                CheckResponse::from(err)
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_query(response.category);
        }
        debug!("Health query for '{}': {:?}", path, response.category);
        response
    }
}
