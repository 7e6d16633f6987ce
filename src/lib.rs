//! The XFeature engine library.

/// Top-level application state, configuration, and error types.
pub mod app;

/// Dialect-tagged database handle (Query/Action execution backend).
pub mod db;

/// Executors: Query Executor (D), Action Executor (E), Mapping Resolver (F).
pub mod exec;

/// Feature Document (A) and Parameter Extractor / Dialect Adapter (B).
pub mod feature;

/// Grid Projection (G) and the presentation-type map.
pub mod grid;

/// Mock Store (C): fixture resolution, loading, and capture.
pub mod mock;

/// HTTP surface, wiring the façade to axum routes.
pub mod routes;

/// Feature Service façade (H).
pub mod service;
