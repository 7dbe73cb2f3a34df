//! Ticket domain
//!
//! - [`status`] - status engine (pure)
//! - [`visibility`] - per-viewer visibility filter (pure)
//! - [`service`] - write path: permission checks, engine, persistence
//! - [`query`] - filtered, sorted, paginated listings
//! - [`dashboard`] - aggregate counts for the dashboard

pub mod dashboard;
pub mod query;
pub mod service;
pub mod status;
pub mod visibility;

pub use status::StatusContext;
pub use visibility::{Viewer, VisibilityScope, canonical_name};
