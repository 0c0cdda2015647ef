use serde::{Deserialize, Serialize};

use super::rule::RuleExtractor;

/// Suffix Traefik gives its own bookkeeping routers (`api@internal`, ...).
pub const INTERNAL_SUFFIX: &str = "internal";

pub const STATUS_ENABLED: &str = "enabled";
pub const STATUS_DISABLED: &str = "disabled";

/// A router as returned by `GET /api/http/routers`.
///
/// Only the fields the dashboard shows are decoded; Traefik sends many more.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRouter {
    pub name: String,
    pub rule: String,
    pub service: String,
    pub status: String,
    #[serde(rename = "entryPoints")]
    pub entry_points: Vec<String>,
    pub tls: Option<serde_json::Value>,
}

/// A router ready to be rendered.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayRouter {
    pub name: String,
    pub rule: String,
    pub service: String,
    /// Always [`STATUS_ENABLED`] or [`STATUS_DISABLED`]
    pub status: String,
    pub entry_points: Vec<String>,
    pub tls: bool,
    pub url: String,
    /// Path under `/icons/`, filled in by the poller when icons are enabled
    pub icon: Option<String>,
}

impl DisplayRouter {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }

    pub fn has_url(&self) -> bool {
        self.url != super::rule::NO_URL
    }
}

pub fn is_internal(router: &RawRouter) -> bool {
    router.name.ends_with(INTERNAL_SUFFIX)
}

/// Anything other than an explicit `disabled` counts as enabled.
pub fn normalize_status(status: &str) -> &'static str {
    if status == STATUS_DISABLED {
        STATUS_DISABLED
    } else {
        STATUS_ENABLED
    }
}

/// Turns the upstream router list into display records, keeping input order
/// and dropping Traefik's internal routers.
pub fn normalize_routers(raw: &[RawRouter], extractor: &dyn RuleExtractor) -> Vec<DisplayRouter> {
    raw.iter()
        .filter(|router| !is_internal(router))
        .map(|router| DisplayRouter {
            name: router.name.clone(),
            rule: router.rule.clone(),
            service: router.service.clone(),
            status: normalize_status(&router.status).to_string(),
            entry_points: router.entry_points.clone(),
            tls: router.tls.as_ref().is_some_and(|tls| !tls.is_null()),
            url: extractor.extract_url(&router.rule),
            icon: None,
        })
        .collect()
}
