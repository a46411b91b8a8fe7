//! Read-only projections: the owner's site listing, public lookups, and
//! host-based routing. Nothing here writes to the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hostgrid_state::KvStoreExt;

use crate::error::{RegistryError, RegistryResult};
use crate::ownership::{Owned, Principal};
use crate::records::*;
use crate::registry::{Registry, SITE_NOT_FOUND};
use crate::validate;

/// A custom domain as shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub domain: String,
    pub status: DomainStatus,
    pub cname_target: String,
}

/// A site joined with its custom domains, with defaults filled in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub subdomain: String,
    pub title: String,
    pub bio: String,
    pub emoji: String,
    pub template: Template,
    pub is_published: bool,
    pub owner_identity: String,
    pub created_at: u64,
    pub custom_domains: Vec<DomainSummary>,
}

impl SiteSummary {
    fn project(
        subdomain: &str,
        site: Option<SiteRecord>,
        custom_domains: Vec<DomainSummary>,
    ) -> Self {
        let site = site.unwrap_or_default();
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Self {
            subdomain: subdomain.to_string(),
            title: non_empty(site.title).unwrap_or_else(|| subdomain.to_string()),
            bio: site.bio.unwrap_or_default(),
            emoji: non_empty(site.emoji).unwrap_or_else(|| PLACEHOLDER_EMOJI.to_string()),
            template: site.template.unwrap_or_default(),
            is_published: site.is_published.unwrap_or(false),
            owner_identity: site.owner_identity.unwrap_or_default(),
            created_at: site.created_at.unwrap_or_default(),
            custom_domains,
        }
    }
}

/// How a hostname was matched to a tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    CustomDomain,
    Subdomain,
}

/// A hostname resolved to a published tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutedSite {
    pub subdomain: String,
    pub via: RouteKind,
    pub site: SiteRecord,
}

impl Registry {
    /// Every custom domain, grouped by the subdomain it references.
    fn domains_by_subdomain(&self) -> RegistryResult<HashMap<String, Vec<DomainSummary>>> {
        let keys = self.store.keys(MAPPING_PREFIX)?;
        let values = self.store.mget_json::<MappingRef>(&keys)?;

        let mut grouped: HashMap<String, Vec<DomainSummary>> = HashMap::new();
        for (key, value) in keys.iter().zip(values) {
            let Some(MappingRef {
                subdomain: Some(subdomain),
                cname_target,
                status,
            }) = value
            else {
                continue;
            };
            let domain = key.strip_prefix(MAPPING_PREFIX).unwrap_or(key);
            grouped.entry(subdomain).or_default().push(DomainSummary {
                domain: domain.to_string(),
                status: status.unwrap_or(DomainStatus::Pending),
                cname_target: cname_target.unwrap_or_else(|| self.settings.cname_target.clone()),
            });
        }
        Ok(grouped)
    }

    /// All sites with their custom domains, optionally only those owned by
    /// `owner`. Damaged or partial records are listed with defaults.
    pub fn list_sites(&self, owner: Option<&Principal>) -> RegistryResult<Vec<SiteSummary>> {
        let keys = self.store.keys(SITE_PREFIX)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values = self.store.mget_json::<SiteRecord>(&keys)?;
        let mut domains = self.domains_by_subdomain()?;

        let sites: Vec<SiteSummary> = keys
            .iter()
            .zip(values)
            .map(|(key, site)| {
                let subdomain = key.strip_prefix(SITE_PREFIX).unwrap_or(key);
                let custom_domains = domains.remove(subdomain).unwrap_or_default();
                SiteSummary::project(subdomain, site, custom_domains)
            })
            .filter(|site| owner.is_none_or(|owner| site.owner_identity == owner.as_str()))
            .collect();

        debug!(count = sites.len(), filtered = owner.is_some(), "sites listed");
        Ok(sites)
    }

    /// One owned site with its custom domains.
    pub fn site_for_owner(
        &self,
        subdomain: &str,
        principal: &Principal,
    ) -> RegistryResult<SiteSummary> {
        let subdomain = validate::sanitize_subdomain(subdomain);
        let Some(site) = self.store.get_json::<SiteRecord>(&site_key(&subdomain))? else {
            return Err(RegistryError::not_found(SITE_NOT_FOUND));
        };
        let site = Owned::from(site).claim(principal, SITE_NOT_FOUND)?;
        let custom_domains = self
            .domains_by_subdomain()?
            .remove(&subdomain)
            .unwrap_or_default();
        Ok(SiteSummary::project(&subdomain, Some(site), custom_domains))
    }

    /// A site as the public sees it: present and published, or nothing.
    pub fn public_site(&self, subdomain: &str) -> RegistryResult<Option<SiteRecord>> {
        let subdomain = validate::sanitize_subdomain(subdomain);
        if subdomain.is_empty() {
            return Ok(None);
        }
        let site = self.store.get_json::<SiteRecord>(&site_key(&subdomain))?;
        Ok(site.filter(SiteRecord::is_published))
    }

    /// Resolve an incoming request's `Host` to a published tenant.
    ///
    /// A verified custom domain (`domain:<host>`) wins; otherwise the host
    /// must be exactly `<name>.<root>`. The root itself and `www` are never
    /// tenants.
    pub fn route_host(&self, host: &str) -> RegistryResult<Option<RoutedSite>> {
        let host = validate::bare_host(host);
        if host.is_empty() {
            return Ok(None);
        }

        let (subdomain, via) = match self.store.get_json::<DomainAlias>(&alias_key(&host))? {
            Some(alias) => (alias.subdomain, RouteKind::CustomDomain),
            None => {
                let root = validate::bare_host(&self.settings.root_domain);
                let Some(name) = host.strip_suffix(&format!(".{root}")) else {
                    return Ok(None);
                };
                if name.is_empty() || name.contains('.') || name == "www" {
                    return Ok(None);
                }
                (name.to_string(), RouteKind::Subdomain)
            }
        };

        let routed = self.public_site(&subdomain)?.map(|site| RoutedSite {
            subdomain,
            via,
            site,
        });
        debug!(%host, found = routed.is_some(), "host routed");
        Ok(routed)
    }
}
