//! A read-only dashboard for Traefik.
//!
//! A background poller periodically reads the Traefik API router list, turns
//! it into display records and publishes them to a shared store. An HTTP app
//! renders the store as a page and exposes a health endpoint that probes the
//! Traefik API directly.

pub mod config;
pub mod core;
pub mod icons;
pub mod logging;
pub mod metrics;
pub mod poller;
pub mod render;
pub mod service;
pub mod traefik;
pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod testing;
