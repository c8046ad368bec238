// src/health/aggregator.rs
use super::resolver::SEPARATOR;
use super::runner::ProcedureRunner;
use super::tree::Node;
use super::CheckResult;
use crate::metrics::MetricsCollector;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::debug;

/// Evaluates subtrees: leaves through the [`ProcedureRunner`], composites by
/// fanning out to all children at once and folding their verdicts.
pub struct Aggregator {
    runner: ProcedureRunner,
    permits: Arc<Semaphore>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Aggregator {
    /// At most `max_concurrency` procedures run at the same time across all
    /// evaluations sharing this aggregator. A procedure that outlives its
    /// timeout keeps its slot until it actually finishes.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            runner: ProcedureRunner::new(),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// `path` is the normalized full path of `node` (empty for the root); its
    /// last segment becomes the result id.
    pub fn evaluate(&self, node: Node, path: String) -> BoxFuture<'_, CheckResult> {
        async move {
            let id = path
                .rsplit(SEPARATOR)
                .next()
                .filter(|name| !name.is_empty())
                .map(str::to_string);

            match node {
                Node::Leaf(leaf) => {
                    // The permit is taken before the clock starts.
                    let permit = self.permits.clone().acquire_owned().await.ok();
                    let start = Instant::now();
                    let (result, kind) = self
                        .runner
                        .run_holding(leaf.procedure(), leaf.timeout(), permit)
                        .await;

                    if let Some(metrics) = &self.metrics {
                        metrics.record_check(&path, kind, result.status, start.elapsed());
                    }
                    result.named(id)
                }
                Node::Composite(composite) => {
                    let snapshot = composite.snapshot();
                    let evaluations = snapshot
                        .iter()
                        .map(|(name, child)| self.evaluate(child.clone(), child_path(&path, name)));
                    let checks = join_all(evaluations).await;

                    let result = CheckResult::composite(checks);
                    debug!(
                        "Evaluated '{}': {} ({} checks, execution failure: {})",
                        path,
                        result.status,
                        snapshot.len(),
                        result.execution_failure
                    );
                    result.named(id)
                }
            }
        }
        .boxed()
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}
