//! Core building blocks shared by the poller and the HTTP handlers.

pub mod error;
pub mod store;

pub use error::{DashboardError, DashboardResult};
pub use store::{RouterStore, Snapshot};
