// src/health/mod.rs
mod aggregator;
mod checker;
mod codec;
mod error;
mod procedure;
pub mod probes;
mod resolver;
mod result;
mod runner;
mod status;
mod tree;

pub use aggregator::Aggregator;
pub use checker::HealthChecks;
pub use codec::{CheckResponse, ResultCodec, StatusCategory};
pub use error::{HealthError, ProcedureError};
pub use procedure::{callback, Callback, Completion, Procedure};
pub use resolver::{segments, PathResolver, SEPARATOR};
pub use result::{CheckDetails, CheckResult};
pub use runner::{ProcedureRunner, RunKind};
pub use status::{Outcome, Status};
pub use tree::{CheckTree, Composite, Leaf, Node};
