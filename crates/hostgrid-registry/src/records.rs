//! Persisted record shapes and the key namespace they live under.
//!
//! | Prefix | Example key | Value |
//! |---|---|---|
//! | `subdomain:` | `subdomain:acme` | [`SiteRecord`] |
//! | `custom-domain:` | `custom-domain:acme.com` | [`DomainMapping`] |
//! | `domain:` | `domain:acme.com` | [`DomainAlias`], only while the mapping is active |
//!
//! Field names are camelCase on disk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SITE_PREFIX: &str = "subdomain:";
pub const MAPPING_PREFIX: &str = "custom-domain:";
pub const ALIAS_PREFIX: &str = "domain:";

/// Shown for sites whose stored icon is missing.
pub const PLACEHOLDER_EMOJI: &str = "❓";

pub fn site_key(subdomain: &str) -> String {
    format!("{SITE_PREFIX}{subdomain}")
}

pub fn mapping_key(domain: &str) -> String {
    format!("{MAPPING_PREFIX}{domain}")
}

pub fn alias_key(domain: &str) -> String {
    format!("{ALIAS_PREFIX}{domain}")
}

// ── Site ───────────────────────────────────────────────────────────

/// Page layout a tenant picked at registration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Hero,
    Minimal,
}

/// A registered subdomain.
///
/// Everything except `emoji` and `createdAt` may be absent on records
/// written by older releases. Unknown keys are carried in `extra` so a
/// read-modify-write never drops them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(default, alias = "ownerEmail", skip_serializing_if = "Option::is_none")]
    pub owner_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SiteRecord {
    pub fn is_published(&self) -> bool {
        self.is_published.unwrap_or(false)
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner_identity.as_deref()
    }
}

// ── Custom domain ──────────────────────────────────────────────────

/// Verification state of a custom domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    /// Attached, CNAME not confirmed yet.
    Pending,
    /// CNAME confirmed; the routing alias exists.
    Active,
    /// Last explicit verification saw a CNAME pointing elsewhere.
    Failed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }
}

/// `custom-domain:<fqdn>` → which tenant claimed it and how far verification got.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainMapping {
    pub subdomain: String,
    pub cname_target: String,
    pub status: DomainStatus,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<u64>,
}

/// Lenient view of a mapping used when scanning. Only the back-reference
/// is needed to cascade deletes, so a mapping with other damaged fields
/// still gets cleaned up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MappingRef {
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub cname_target: Option<String>,
    #[serde(default)]
    pub status: Option<DomainStatus>,
}

/// `domain:<fqdn>` → tenant. Consulted by request routing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainAlias {
    pub subdomain: String,
}
