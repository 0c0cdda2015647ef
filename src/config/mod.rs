use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, trace};
use pingora::server::configuration::{Opt, ServerConf};
use pingora_error::{ErrorType::*, OrErr, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment variable holding the Traefik API base URL.
pub const TRAEFIK_API_ENV: &str = "TRAEFIK_API";
pub const PORT_ENV: &str = "PORT";
pub const HOST_ENV: &str = "HOST";

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub pingora: ServerConf,

    #[validate(nested)]
    pub listener: Listener,
    #[validate(nested)]
    pub traefik: Traefik,
    #[validate(nested)]
    pub icons: Icons,

    pub log: Option<Log>,
    pub prometheus: Option<Prometheus>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> Result<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path).or_err_with(ReadError, || {
            format!("Unable to read conf file from {path}")
        })?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    /// Config file (if any) with command line and environment overrides applied.
    pub fn load_with_opt_override(opt: &Opt) -> Result<Self> {
        let mut conf = match &opt.conf {
            Some(path) => Self::load_from_yaml(path)?,
            None => Self::default(),
        };
        conf.merge_with_opt(opt);
        conf.merge_with_env(|key| std::env::var(key).ok())?;

        conf.validate()
            .or_err_with(FileReadError, || "Conf validation failed")?;

        Ok(conf)
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str).or_err_with(ReadError, || {
            format!("Unable to parse yaml conf {conf_str}")
        })?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .or_err_with(FileReadError, || "Conf file valid failed")?;

        Ok(conf)
    }

    pub fn merge_with_opt(&mut self, opt: &Opt) {
        if opt.daemon {
            self.pingora.daemon = true;
        }
    }

    /// Applies `TRAEFIK_API`, `PORT` and `HOST` on top of the file values.
    ///
    /// Empty variables count as unset.
    pub fn merge_with_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api) = lookup(TRAEFIK_API_ENV) {
            self.traefik.api = Some(api);
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.listener.port = port
                .trim()
                .parse()
                .or_err_with(ReadError, || format!("Invalid {PORT_ENV} value {port}"))?;
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.listener.host = host;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Listener {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Listener {
    /// `host:port`, with bare IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Traefik {
    /// Base URL of the Traefik API, e.g. `http://traefik:8080`.
    /// Not validated here: a bad URL shows up as unhealthy on `/health`.
    pub api: Option<String>,
    /// Request timeout in seconds, shared by polling and health checks
    #[validate(range(min = 1))]
    pub timeout: u64,
    /// Seconds between two polls
    #[validate(range(min = 1))]
    pub poll_interval: u64,
}

impl Default for Traefik {
    fn default() -> Self {
        Self {
            api: None,
            timeout: 5,
            poll_interval: 30,
        }
    }
}

impl Traefik {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Icons {
    pub enabled: bool,
    /// Local cache directory
    pub dir: PathBuf,
    /// Raw content base of the icon repository
    #[validate(url)]
    pub repository: String,
    #[validate(range(min = 1))]
    pub timeout: u64,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("icons"),
            repository: "https://raw.githubusercontent.com/homarr-labs/dashboard-icons/main"
                .to_string(),
            timeout: 6,
        }
    }
}

impl Icons {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prometheus {
    pub address: SocketAddr,
}
