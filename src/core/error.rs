//! Unified error handling for the dashboard
//!
//! Every failure the poller, the health probe or the renderer can hit is
//! expressed as a [`DashboardError`] so callers decide in one place whether
//! to absorb it (polling) or surface it (health endpoint).

use std::fmt;

/// Error kinds produced while talking to Traefik or building a page.
#[derive(Debug)]
pub enum DashboardError {
    /// The Traefik API base URL is not configured
    ConfigurationMissing(String),

    /// Transport failure or timeout while talking to Traefik
    Connectivity(String),

    /// Traefik answered with a non-success HTTP status
    UnexpectedStatus(u16),

    /// The response body is not a list of routers
    Decode(String),

    /// Page rendering failed
    Render(String),

    /// Local file I/O (icon cache)
    Io(std::io::Error),
}

impl DashboardError {
    /// Message without the category prefix, as reported by the health endpoint.
    pub fn detail(&self) -> String {
        match self {
            DashboardError::ConfigurationMissing(msg)
            | DashboardError::Connectivity(msg)
            | DashboardError::Decode(msg)
            | DashboardError::Render(msg) => msg.clone(),
            DashboardError::UnexpectedStatus(code) => format!("unexpected status code: {code}"),
            DashboardError::Io(err) => err.to_string(),
        }
    }
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::ConfigurationMissing(msg) => write!(f, "Configuration missing: {msg}"),
            DashboardError::Connectivity(msg) => write!(f, "Error fetching HTTP routers: {msg}"),
            DashboardError::UnexpectedStatus(code) => write!(f, "Unexpected status code: {code}"),
            DashboardError::Decode(msg) => write!(f, "Error decoding response: {msg}"),
            DashboardError::Render(msg) => write!(f, "Render error: {msg}"),
            DashboardError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Io(err)
    }
}

// reqwest hides the useful part (connection refused, timed out) in the source chain
impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Connectivity(error_chain(&err))
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

/// Result type alias for dashboard operations
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;

/// Joins an error and all of its sources into a single line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
