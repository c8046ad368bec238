// src/metrics/collector.rs
use crate::health::{Outcome, RunKind, StatusCategory};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Check metrics
    pub check_runs_total: IntCounterVec,
    pub check_execution_failures_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,

    // Query metrics
    pub queries_total: IntCounterVec,
    pub queries_in_flight: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let check_runs_total = IntCounterVec::new(
            Opts::new("health_check_runs_total", "Total number of check executions"),
            &["check", "outcome"],
        )?;
        registry.register(Box::new(check_runs_total.clone()))?;

        let check_execution_failures_total = IntCounterVec::new(
            Opts::new(
                "health_check_execution_failures_total",
                "Checks that could not run correctly",
            ),
            &["check", "kind"],
        )?;
        registry.register(Box::new(check_execution_failures_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new("health_check_duration_seconds", "Check duration in seconds"),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let queries_total = IntCounterVec::new(
            Opts::new("health_queries_total", "Total number of health queries"),
            &["category"],
        )?;
        registry.register(Box::new(queries_total.clone()))?;

        let queries_in_flight =
            IntGauge::new("health_queries_in_flight", "Health queries being answered")?;
        registry.register(Box::new(queries_in_flight.clone()))?;

        Ok(Self {
            check_runs_total,
            check_execution_failures_total,
            check_duration_seconds,
            queries_total,
            queries_in_flight,
        })
    }

    pub fn record_check(&self, check: &str, kind: RunKind, outcome: Outcome, duration: Duration) {
        self.check_runs_total
            .with_label_values(&[check, outcome.as_str()])
            .inc();

        if kind.is_execution_failure() {
            self.check_execution_failures_total
                .with_label_values(&[check, kind.as_str()])
                .inc();
        }

        self.check_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());
    }

    /// Drops every series labelled with `check`, once it is unregistered.
    pub fn forget_check(&self, check: &str) {
        for outcome in [Outcome::Up, Outcome::Down] {
            let _ = self
                .check_runs_total
                .remove_label_values(&[check, outcome.as_str()]);
        }
        for kind in [RunKind::Raised, RunKind::Panicked, RunKind::TimedOut] {
            let _ = self
                .check_execution_failures_total
                .remove_label_values(&[check, kind.as_str()]);
        }
        let _ = self.check_duration_seconds.remove_label_values(&[check]);
    }

    pub fn record_query(&self, category: StatusCategory) {
        self.queries_total
            .with_label_values(&[category.as_str()])
            .inc();
    }

    /// Counts a query as in flight until the returned guard is dropped,
    /// including when the request future is abandoned mid-evaluation.
    pub fn track_query(self: &Arc<Self>) -> InFlightQuery {
        self.queries_in_flight.inc();
        InFlightQuery {
            metrics: self.clone(),
        }
    }
}

pub struct InFlightQuery {
    metrics: Arc<MetricsCollector>,
}

impl Drop for InFlightQuery {
    fn drop(&mut self) {
        self.metrics.queries_in_flight.dec();
    }
}
