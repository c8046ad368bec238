// src/health/status.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// UP/DOWN verdict of a check or of an aggregated subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Up,
    Down,
}

impl Outcome {
    pub fn is_up(self) -> bool {
        self == Outcome::Up
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Up => "UP",
            Outcome::Down => "DOWN",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a procedure reports when it completes: an outcome plus opaque,
/// flat diagnostic data.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    outcome: Outcome,
    data: Map<String, Value>,
}

impl Status {
    pub fn ok() -> Self {
        Self::ok_with(Map::new())
    }

    pub fn ko() -> Self {
        Self::ko_with(Map::new())
    }

    pub fn ok_with(data: Map<String, Value>) -> Self {
        Self {
            outcome: Outcome::Up,
            data,
        }
    }

    pub fn ko_with(data: Map<String, Value>) -> Self {
        Self {
            outcome: Outcome::Down,
            data,
        }
    }

    /// Adds one diagnostic entry, replacing any previous value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_up(&self) -> bool {
        self.outcome.is_up()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_parts(self) -> (Outcome, Map<String, Value>) {
        (self.outcome, self.data)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}
