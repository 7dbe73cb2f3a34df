//! API routes
//!
//! - [`health`] - liveness and database check
//! - [`auth`] - login and current user
//! - [`tickets`] - ticket listing, CRUD and transitions
//! - [`dashboard`] - aggregate counts
//! - [`countries`] - country catalog
//! - [`devices`] - device catalog
//! - [`users`] - user provisioning and country grants
//! - [`responsibles`] - assignable technicians

pub mod auth;
pub mod health;

pub mod countries;
pub mod dashboard;
pub mod devices;
pub mod responsibles;
pub mod tickets;
pub mod users;

pub use crate::utils::{AppError, AppResult};
