//! Executors: the Query Executor (D), Action Executor (E), and Mapping
//! Resolver (F).

pub mod action;
pub mod mapping;
pub mod query;

pub use action::{ActionOutcome, redact_for_logging};
pub use mapping::resolve_all;
pub use query::QueryOutcome;
