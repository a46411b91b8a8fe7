//! CNAME resolution for custom-domain verification.
//!
//! The registry talks to DNS through [`CnameResolver`] so verification can
//! run against real nameservers ([`HickoryResolver`]) or a fixed table
//! ([`StaticResolver`]) in tests and offline setups.
//!
//! The registry enforces no timeout of its own; the resolver's options do.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use thiserror::Error;
use tracing::debug;

use hostgrid_core::DnsUpstream;

/// Why a CNAME lookup produced no answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("no CNAME records for {0}")]
    NoRecords(String),

    #[error("CNAME lookup for {host} failed: {message}")]
    Lookup { host: String, message: String },

    #[error("resolver setup failed: {0}")]
    Setup(String),
}

/// Boxed future alias for CNAME lookups.
pub type CnameLookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, DnsError>> + Send + 'a>>;

/// Resolves the CNAME targets of a hostname.
pub trait CnameResolver: Send + Sync {
    fn resolve_cname<'a>(&'a self, host: &'a str) -> CnameLookupFuture<'a>;
}

/// Compare two hostnames ignoring case and a trailing root dot.
pub fn cname_matches(candidate: &str, expected: &str) -> bool {
    let normalize = |name: &str| name.trim().trim_end_matches('.').to_ascii_lowercase();
    normalize(candidate) == normalize(expected)
}

// ── Hickory ────────────────────────────────────────────────────────

/// Resolver backed by hickory's tokio resolver.
pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Build a resolver for `upstream` with a per-query `timeout`.
    pub fn new(upstream: DnsUpstream, timeout: Duration) -> Result<Self, DnsError> {
        let (config, mut opts) = match upstream {
            DnsUpstream::System => hickory_resolver::system_conf::read_system_conf()
                .map_err(|e| DnsError::Setup(e.to_string()))?,
            DnsUpstream::Cloudflare => (ResolverConfig::cloudflare(), ResolverOpts::default()),
            DnsUpstream::Google => (ResolverConfig::google(), ResolverOpts::default()),
        };
        opts.timeout = timeout;
        // Verification must observe record changes promptly.
        opts.cache_size = 0;

        debug!(?upstream, ?timeout, "CNAME resolver configured");
        Ok(Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        })
    }
}

impl CnameResolver for HickoryResolver {
    fn resolve_cname<'a>(&'a self, host: &'a str) -> CnameLookupFuture<'a> {
        Box::pin(async move {
            debug!(host, "looking up CNAME");
            let lookup = self
                .inner
                .lookup(host, RecordType::CNAME)
                .await
                .map_err(|e| DnsError::Lookup {
                    host: host.to_string(),
                    message: e.to_string(),
                })?;

            let targets: Vec<String> = lookup
                .record_iter()
                .filter_map(|record| record.data().and_then(|d| d.as_cname()))
                .map(|cname| cname.to_string())
                .collect();

            if targets.is_empty() {
                return Err(DnsError::NoRecords(host.to_string()));
            }
            debug!(host, ?targets, "CNAME lookup answered");
            Ok(targets)
        })
    }
}

// ── Static table ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum StaticAnswer {
    Targets(Vec<String>),
    Fail(String),
}

/// Fixed host → CNAME table. Unknown hosts fail like NXDOMAIN.
#[derive(Debug, Default)]
pub struct StaticResolver {
    answers: RwLock<HashMap<String, StaticAnswer>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups for `host` with `targets`.
    pub fn set_cname<I, S>(&self, host: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets = targets.into_iter().map(Into::into).collect();
        let mut answers = self.answers.write().unwrap_or_else(PoisonError::into_inner);
        answers.insert(host.to_ascii_lowercase(), StaticAnswer::Targets(targets));
    }

    /// Make lookups for `host` fail with `message` (timeout, SERVFAIL, ...).
    pub fn set_failure(&self, host: &str, message: &str) {
        let mut answers = self.answers.write().unwrap_or_else(PoisonError::into_inner);
        answers.insert(
            host.to_ascii_lowercase(),
            StaticAnswer::Fail(message.to_string()),
        );
    }

    /// Forget `host`; lookups fall back to NXDOMAIN.
    pub fn clear(&self, host: &str) {
        let mut answers = self.answers.write().unwrap_or_else(PoisonError::into_inner);
        answers.remove(&host.to_ascii_lowercase());
    }
}

impl CnameResolver for StaticResolver {
    fn resolve_cname<'a>(&'a self, host: &'a str) -> CnameLookupFuture<'a> {
        let answer = {
            let answers = self.answers.read().unwrap_or_else(PoisonError::into_inner);
            answers.get(&host.to_ascii_lowercase()).cloned()
        };
        Box::pin(async move {
            match answer {
                Some(StaticAnswer::Targets(targets)) if !targets.is_empty() => Ok(targets),
                Some(StaticAnswer::Targets(_)) => Err(DnsError::NoRecords(host.to_string())),
                Some(StaticAnswer::Fail(message)) => Err(DnsError::Lookup {
                    host: host.to_string(),
                    message,
                }),
                None => Err(DnsError::Lookup {
                    host: host.to_string(),
                    message: "NXDOMAIN".to_string(),
                }),
            }
        })
    }
}
