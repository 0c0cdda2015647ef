//! Everything that knows about Traefik: its API, its router records and its
//! rule syntax.

pub mod client;
pub mod router;
pub mod rule;

pub use client::TraefikClient;
pub use router::{normalize_routers, DisplayRouter, RawRouter};
pub use rule::{extract_url, HostRuleExtractor, RuleExtractor};
