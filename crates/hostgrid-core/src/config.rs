//! hostgrid.toml configuration parser.
//!
//! Every key is optional; missing values fall back to the defaults below.
//! `CUSTOM_DOMAIN_CNAME_TARGET` and `HOSTGRID_ROOT_DOMAIN` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT_DOMAIN: &str = "localhost";
pub const DEFAULT_CNAME_TARGET: &str = "cname.hostgrid.dev";
pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_PORT: u16 = 8443;
pub const DEFAULT_DATA_DIR: &str = "/var/lib/hostgrid";
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;

pub const ENV_CNAME_TARGET: &str = "CUSTOM_DOMAIN_CNAME_TARGET";
pub const ENV_ROOT_DOMAIN: &str = "HOSTGRID_ROOT_DOMAIN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostgridConfig {
    pub domain: DomainConfig,
    pub server: ServerConfig,
    pub dns: DnsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DomainConfig {
    /// Domain under which tenant subdomains are issued.
    pub root_domain: String,
    /// Hostname every custom domain must CNAME to.
    pub cname_target: String,
    /// Scheme used when building public site URLs.
    pub protocol: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            root_domain: DEFAULT_ROOT_DOMAIN.to_string(),
            cname_target: DEFAULT_CNAME_TARGET.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

/// Upstream nameservers used for CNAME verification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DnsUpstream {
    /// Whatever `/etc/resolv.conf` says.
    #[default]
    System,
    Cloudflare,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DnsConfig {
    pub upstream: DnsUpstream,
    pub timeout_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            upstream: DnsUpstream::default(),
            timeout_secs: DEFAULT_DNS_TIMEOUT_SECS,
        }
    }
}

impl HostgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostgridConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if given (defaults otherwise), then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(target) = non_empty(ENV_CNAME_TARGET) {
            self.domain.cname_target = target;
        }
        if let Some(root) = non_empty(ENV_ROOT_DOMAIN) {
            self.domain.root_domain = root;
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
