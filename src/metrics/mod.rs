// src/metrics/mod.rs
mod collector;

pub use collector::{InFlightQuery, MetricsCollector, MetricsRegistry};
