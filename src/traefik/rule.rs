use once_cell::sync::Lazy;
use regex::Regex;

/// URL shown for routers whose rule carries no host.
pub const NO_URL: &str = "#";

static HOST_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host\(`([^`]+)`\)").expect("host rule pattern is valid"));

static HOST_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host\s*\(([^)]*)\)").expect("host group pattern is valid"));

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("quoted value pattern is valid"));

/// Maps a router rule expression to the external URL operators should open.
///
/// Implementations never fail: a rule without a recognizable host yields
/// [`NO_URL`].
pub trait RuleExtractor: Send + Sync {
    fn extract_url(&self, rule: &str) -> String;
}

/// Extractor for Traefik v2/v3 rules using ``Host(`example.com`)``.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostRuleExtractor;

impl RuleExtractor for HostRuleExtractor {
    fn extract_url(&self, rule: &str) -> String {
        extract_url(rule)
    }
}

/// Returns `https://<host>` for the first ``Host(`<host>`)`` in `rule`,
/// or `#` when there is none.
pub fn extract_url(rule: &str) -> String {
    HOST_RULE
        .captures(rule)
        .and_then(|caps| caps.get(1))
        .map(|host| format!("https://{}", host.as_str()))
        .unwrap_or_else(|| NO_URL.to_string())
}

/// Every backquoted host inside every `Host(...)` group, in rule order.
///
/// Unlike [`extract_url`] this understands the multi-host form
/// ``Host(`a.example.com`, `b.example.com`)``.
pub fn extract_hosts(rule: &str) -> Vec<String> {
    HOST_GROUP
        .captures_iter(rule)
        .filter_map(|caps| caps.get(1))
        .flat_map(|group| {
            QUOTED
                .captures_iter(group.as_str())
                .filter_map(|caps| caps.get(1).map(|h| h.as_str().to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}
