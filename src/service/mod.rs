//! HTTP endpoints exposed by the dashboard.

pub mod dashboard;
pub mod health;

pub use dashboard::DashboardHttpApp;
pub use health::{check_health, HealthStatus};
