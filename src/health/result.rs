// src/health/result.rs
use super::{Outcome, Status};
use serde_json::{Map, Value};

pub(crate) const CAUSE: &str = "cause";
pub(crate) const EXECUTION_FAILURE: &str = "procedure-execution-failure";
pub(crate) const TIMEOUT_CAUSE: &str = "Timeout";

/// Evaluated view of one node of the check tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Node name; `None` for the tree root and for results not yet attached
    /// to a node.
    pub id: Option<String>,
    pub status: Outcome,
    pub details: CheckDetails,
    /// True when this leaf, or any leaf below this composite, failed to
    /// execute (timeout, raised error or panic).
    pub execution_failure: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckDetails {
    Leaf { data: Map<String, Value> },
    Composite { checks: Vec<CheckResult> },
}

impl CheckResult {
    pub(crate) fn completed(status: Status) -> Self {
        let (status, data) = status.into_parts();
        Self {
            id: None,
            status,
            details: CheckDetails::Leaf { data },
            execution_failure: false,
        }
    }

    pub(crate) fn failed(cause: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(CAUSE.to_string(), Value::String(cause.into()));
        Self {
            id: None,
            status: Outcome::Down,
            details: CheckDetails::Leaf { data },
            execution_failure: false,
        }
    }

    pub(crate) fn execution_failed(cause: impl Into<String>) -> Self {
        let mut result = Self::failed(cause);
        if let CheckDetails::Leaf { data } = &mut result.details {
            data.insert(EXECUTION_FAILURE.to_string(), Value::Bool(true));
        }
        result.execution_failure = true;
        result
    }

    /// Folds already evaluated children into a composite verdict: UP only
    /// when every child is UP (so an empty composite is UP).
    pub(crate) fn composite(checks: Vec<CheckResult>) -> Self {
        let status = if checks.iter().all(|c| c.status.is_up()) {
            Outcome::Up
        } else {
            Outcome::Down
        };
        let execution_failure = checks.iter().any(|c| c.execution_failure);
        Self {
            id: None,
            status,
            details: CheckDetails::Composite { checks },
            execution_failure,
        }
    }

    pub(crate) fn named(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.details, CheckDetails::Leaf { .. })
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        match &self.details {
            CheckDetails::Leaf { data } => Some(data),
            CheckDetails::Composite { .. } => None,
        }
    }

    pub fn checks(&self) -> &[CheckResult] {
        match &self.details {
            CheckDetails::Composite { checks } => checks,
            CheckDetails::Leaf { .. } => &[],
        }
    }

    /// Immediate child with the given id.
    pub fn check(&self, id: &str) -> Option<&CheckResult> {
        self.checks().iter().find(|c| c.id.as_deref() == Some(id))
    }
}
