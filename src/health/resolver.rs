// src/health/resolver.rs
use super::tree::{Composite, Node};
use super::HealthError;
use std::sync::Arc;

pub const SEPARATOR: char = '/';

/// Splits a check path into its segments. Leading and trailing separators
/// are ignored, so `""` and `"/"` both name the root; an empty segment in
/// the middle (`"a//b"`) is invalid.
pub fn segments(path: &str) -> Result<Vec<&str>, HealthError> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(SEPARATOR)
        .map(|segment| {
            if segment.is_empty() {
                Err(HealthError::InvalidPath(path.to_string()))
            } else {
                Ok(segment)
            }
        })
        .collect()
}

/// Walks the tree from the root to the node a path names.
pub struct PathResolver<'a> {
    root: &'a Arc<Composite>,
}

impl<'a> PathResolver<'a> {
    pub fn new(root: &'a Arc<Composite>) -> Self {
        Self { root }
    }

    pub fn resolve(&self, path: &str) -> Result<Node, HealthError> {
        let segments = segments(path)?;
        self.walk(&segments, path)
    }

    /// `path` is only used for error reporting.
    pub(crate) fn walk(&self, segments: &[&str], path: &str) -> Result<Node, HealthError> {
        let mut current = Node::Composite(self.root.clone());
        for segment in segments {
            let composite = match &current {
                Node::Composite(composite) => composite.clone(),
                Node::Leaf(_) => return Err(HealthError::InvalidPath(path.to_string())),
            };
            current = composite
                .child(segment)
                .ok_or_else(|| HealthError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }
}
