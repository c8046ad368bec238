// src/health/tree.rs
use super::resolver::{self, PathResolver};
use super::{HealthError, Procedure};
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A registered check: one procedure and the timeout it runs under.
pub struct Leaf {
    procedure: Arc<dyn Procedure>,
    timeout: Duration,
}

impl Leaf {
    pub fn new(procedure: Arc<dyn Procedure>, timeout: Duration) -> Self {
        Self { procedure, timeout }
    }

    pub fn procedure(&self) -> Arc<dyn Procedure> {
        self.procedure.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub type Children = Vec<(String, Node)>;

/// Named group of checks. Children are kept in insertion order and are
/// published as immutable snapshots, so readers never observe a half-applied
/// mutation.
pub struct Composite {
    children: ArcSwap<Children>,
}

impl Composite {
    pub fn new() -> Self {
        Self {
            children: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Arc<Children> {
        self.children.load_full()
    }

    pub fn child(&self, name: &str) -> Option<Node> {
        self.children
            .load()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.children.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.load().len()
    }

    // Callers must hold the tree's mutation lock.
    fn upsert(&self, name: &str, node: Node) {
        let mut children = Vec::clone(&self.children.load());
        match children.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = node,
            None => children.push((name.to_string(), node)),
        }
        self.children.store(Arc::new(children));
    }

    fn remove(&self, name: &str) -> Option<Node> {
        let mut children = Vec::clone(&self.children.load());
        let index = children.iter().position(|(n, _)| n == name)?;
        let (_, node) = children.remove(index);
        self.children.store(Arc::new(children));
        Some(node)
    }
}

impl Default for Composite {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub enum Node {
    Leaf(Arc<Leaf>),
    Composite(Arc<Composite>),
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Full paths of every leaf at or below this node, given its own `path`.
    pub fn leaf_paths(&self, path: &str) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_leaf_paths(path.to_string(), &mut paths);
        paths
    }

    fn collect_leaf_paths(&self, path: String, paths: &mut Vec<String>) {
        match self {
            Node::Leaf(_) => paths.push(path),
            Node::Composite(composite) => {
                for (name, child) in composite.snapshot().iter() {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{}{}{}", path, resolver::SEPARATOR, name)
                    };
                    child.collect_leaf_paths(child_path, paths);
                }
            }
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf(leaf) => f.debug_struct("Leaf").field("timeout", &leaf.timeout).finish(),
            Node::Composite(composite) => f
                .debug_struct("Composite")
                .field("children", &composite.len())
                .finish(),
        }
    }
}

/// Slash-delimited namespace of checks rooted at an anonymous composite.
pub struct CheckTree {
    root: Arc<Composite>,
    mutation: Mutex<()>,
}

impl CheckTree {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Composite::new()),
            mutation: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Arc<Composite> {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> Result<Node, HealthError> {
        PathResolver::new(&self.root).resolve(path)
    }

    /// Binds `leaf` at `path`, creating missing composites on the way.
    /// An existing leaf at `path` is replaced in place.
    pub fn insert(&self, path: &str, leaf: Leaf) -> Result<(), HealthError> {
        let segments = resolver::segments(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(HealthError::invalid_registration(
                path,
                "the root cannot hold a procedure",
            ));
        };

        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        // Conflicts can only come from nodes that already exist, and those
        // are all visited before the first composite gets created.
        let mut current = self.root.clone();
        for segment in parents {
            current = match current.child(segment) {
                Some(Node::Composite(composite)) => composite,
                Some(Node::Leaf(_)) => {
                    return Err(HealthError::invalid_registration(
                        path,
                        format!("'{}' is already a check", segment),
                    ));
                }
                None => {
                    let composite = Arc::new(Composite::new());
                    current.upsert(segment, Node::Composite(composite.clone()));
                    composite
                }
            };
        }

        if let Some(Node::Composite(_)) = current.child(name) {
            return Err(HealthError::invalid_registration(
                path,
                "a group of checks is already registered there",
            ));
        }
        current.upsert(name, Node::Leaf(Arc::new(leaf)));
        Ok(())
    }

    /// Detaches the node at `path` together with its whole subtree and hands
    /// it back. Parents left empty are kept.
    pub fn remove(&self, path: &str) -> Result<Node, HealthError> {
        let segments = resolver::segments(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(HealthError::InvalidPath(path.to_string()));
        };

        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        let parent = match PathResolver::new(&self.root).walk(parents, path)? {
            Node::Composite(composite) => composite,
            Node::Leaf(_) => return Err(HealthError::InvalidPath(path.to_string())),
        };
        parent
            .remove(name)
            .ok_or_else(|| HealthError::NotFound(path.to_string()))
    }
}

impl Default for CheckTree {
    fn default() -> Self {
        Self::new()
    }
}
