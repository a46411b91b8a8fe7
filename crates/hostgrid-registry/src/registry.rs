//! Registry — the operations that keep sites, custom-domain mappings, and
//! routing aliases consistent.
//!
//! Each operation is an independent read-modify-write over the store with
//! no locking and no cross-key transaction. Two registrations of the same
//! name can both pass the existence check; the later write wins. A delete
//! cascade enumerates mappings once, so a mapping attached after that scan
//! survives. Every delete is by key and tolerates a missing key, so a
//! retried cascade converges.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hostgrid_core::{HostgridConfig, epoch_millis};
use hostgrid_state::{KvStore, KvStoreExt};

use crate::dns::{CnameResolver, cname_matches};
use crate::error::{RegistryError, RegistryResult};
use crate::ownership::{Owned, Principal};
use crate::records::*;
use crate::validate;

pub(crate) const SITE_NOT_FOUND: &str = "Site not found.";
const DOMAIN_NOT_FOUND: &str = "Custom domain not found.";
const DOMAIN_NOT_ALLOWED: &str = "You are not allowed to manage this domain.";

/// Immutable settings the registry is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub root_domain: String,
    pub cname_target: String,
    pub protocol: String,
}

impl RegistrySettings {
    pub fn from_config(config: &HostgridConfig) -> Self {
        Self {
            root_domain: config.domain.root_domain.clone(),
            cname_target: config.domain.cname_target.clone(),
            protocol: config.domain.protocol.clone(),
        }
    }

    /// Public URL of a tenant's native subdomain.
    pub fn site_url(&self, subdomain: &str) -> String {
        format!("{}://{}.{}", self.protocol, subdomain, self.root_domain)
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSite {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// A custom domain as reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDomain {
    pub domain: String,
    pub status: DomainStatus,
    pub cname_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<u64>,
}

impl AttachedDomain {
    fn from_mapping(domain: &str, mapping: &DomainMapping) -> Self {
        Self {
            domain: domain.to_string(),
            status: mapping.status,
            cname_target: mapping.cname_target.clone(),
            verified_at: mapping.verified_at,
        }
    }
}

/// Successful registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub subdomain: String,
    pub site_url: String,
    pub site: SiteRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<AttachedDomain>,
}

/// What a delete removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deletion {
    pub subdomain: String,
    pub removed_domains: Vec<String>,
}

/// Multi-tenant registry over a key-value store and a CNAME resolver.
#[derive(Clone)]
pub struct Registry {
    pub(crate) store: Arc<dyn KvStore>,
    resolver: Arc<dyn CnameResolver>,
    pub(crate) settings: Arc<RegistrySettings>,
}

impl Registry {
    pub fn new(
        store: Arc<dyn KvStore>,
        resolver: Arc<dyn CnameResolver>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            store,
            resolver,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Load a site and check it belongs to `principal`.
    fn owned_site(&self, subdomain: &str, principal: &Principal) -> RegistryResult<SiteRecord> {
        match self.store.get_json::<SiteRecord>(&site_key(subdomain))? {
            Some(site) => Owned::from(site).claim(principal, SITE_NOT_FOUND),
            None => Err(RegistryError::not_found(SITE_NOT_FOUND)),
        }
    }

    /// True if DNS currently points `domain` at the configured target.
    /// Lookup failures are logged and reported as `Err`.
    async fn cname_points_at_target(&self, domain: &str) -> Result<bool, crate::dns::DnsError> {
        let targets = self.resolver.resolve_cname(domain).await?;
        let expected = &self.settings.cname_target;
        Ok(targets.iter().any(|t| cname_matches(t, expected)))
    }

    fn new_mapping(&self, subdomain: &str, status: DomainStatus) -> DomainMapping {
        DomainMapping {
            subdomain: subdomain.to_string(),
            cname_target: self.settings.cname_target.clone(),
            status,
            created_at: epoch_millis(),
            verified_at: None,
        }
    }

    // ── Register ───────────────────────────────────────────────────

    /// Register a subdomain and optionally attach a custom domain.
    ///
    /// Checks run in order and the first failure is returned. The site is
    /// written before the custom domain is examined, so a bad custom domain
    /// leaves the site registered without one.
    pub async fn register_site(
        &self,
        input: NewSite,
        principal: &Principal,
    ) -> RegistryResult<Registration> {
        if input.subdomain.trim().is_empty()
            || input.icon.trim().is_empty()
            || input.title.trim().is_empty()
            || input.bio.trim().is_empty()
        {
            return Err(RegistryError::validation(
                "Subdomain, icon, title, and bio are required.",
            ));
        }
        if !validate::is_valid_icon(&input.icon) {
            return Err(RegistryError::validation(
                "Please enter a valid emoji (maximum 10 characters).",
            ));
        }
        let subdomain =
            validate::validate_subdomain(&input.subdomain).map_err(RegistryError::validation)?;

        let key = site_key(&subdomain);
        if self.store.get(&key)?.is_some() {
            return Err(RegistryError::conflict("This subdomain is already taken."));
        }

        let site = SiteRecord {
            title: Some(input.title),
            bio: Some(input.bio),
            emoji: Some(input.icon),
            template: Some(input.template),
            is_published: Some(input.is_published),
            owner_identity: Some(principal.as_str().to_string()),
            created_at: Some(epoch_millis()),
            extra: Default::default(),
        };
        self.store.set_json(&key, &site)?;
        info!(%subdomain, owner = %principal, "site registered");

        let custom_domain = input
            .custom_domain
            .as_deref()
            .map(validate::normalize_domain)
            .filter(|d| !d.is_empty());

        let attached = match custom_domain {
            Some(domain) => Some(self.attach_at_registration(&subdomain, &domain).await?),
            None => None,
        };

        Ok(Registration {
            site_url: self.settings.site_url(&subdomain),
            subdomain,
            site,
            custom_domain: attached,
        })
    }

    /// The registration-time attach: an immediate DNS probe decides between
    /// `active` and `pending`, and a lookup failure is just `pending`.
    async fn attach_at_registration(
        &self,
        subdomain: &str,
        domain: &str,
    ) -> RegistryResult<AttachedDomain> {
        if !validate::is_valid_domain(domain) {
            return Err(RegistryError::validation(
                "Invalid custom domain format. Example: domain.com",
            ));
        }
        let key = mapping_key(domain);
        if self.store.get(&key)?.is_some() {
            return Err(RegistryError::conflict("This custom domain is already connected."));
        }

        let status = match self.cname_points_at_target(domain).await {
            Ok(true) => DomainStatus::Active,
            Ok(false) => DomainStatus::Pending,
            Err(e) => {
                warn!(%domain, error = %e, "CNAME not resolvable yet, leaving pending");
                DomainStatus::Pending
            }
        };

        let mut mapping = self.new_mapping(subdomain, status);
        if status == DomainStatus::Active {
            mapping.verified_at = Some(mapping.created_at);
        }
        self.store.set_json(&key, &mapping)?;
        if status == DomainStatus::Active {
            self.store.set_json(
                &alias_key(domain),
                &DomainAlias {
                    subdomain: subdomain.to_string(),
                },
            )?;
        } else {
            // A cascade interrupted earlier can leave an alias behind.
            self.store.delete(&alias_key(domain))?;
        }
        info!(%domain, %subdomain, status = status.as_str(), "custom domain attached");
        Ok(AttachedDomain::from_mapping(domain, &mapping))
    }

    // ── Delete ─────────────────────────────────────────────────────

    /// Delete a site and every mapping and alias pointing at it.
    pub async fn delete_site(
        &self,
        subdomain: &str,
        principal: &Principal,
    ) -> RegistryResult<Deletion> {
        let subdomain = validate::sanitize_subdomain(subdomain);
        self.owned_site(&subdomain, principal)?;

        self.store.delete(&site_key(&subdomain))?;

        let keys = self.store.keys(MAPPING_PREFIX)?;
        let mappings = self.store.mget_json::<MappingRef>(&keys)?;
        let mut removed_domains = Vec::new();
        for (key, mapping) in keys.iter().zip(mappings) {
            let Some(mapping) = mapping else { continue };
            if mapping.subdomain.as_deref() != Some(subdomain.as_str()) {
                continue;
            }
            let Some(domain) = key.strip_prefix(MAPPING_PREFIX) else {
                continue;
            };
            self.store.delete(key)?;
            // Unconditional: the alias may never have existed.
            self.store.delete(&alias_key(domain))?;
            removed_domains.push(domain.to_string());
        }

        info!(%subdomain, domains = removed_domains.len(), "site deleted");
        Ok(Deletion {
            subdomain,
            removed_domains,
        })
    }

    // ── Publish ────────────────────────────────────────────────────

    /// Set `isPublished`, rewriting the whole record with every other field
    /// as it was.
    pub async fn set_published(
        &self,
        subdomain: &str,
        published: bool,
        principal: &Principal,
    ) -> RegistryResult<SiteRecord> {
        let subdomain = validate::sanitize_subdomain(subdomain);
        let mut site = self.owned_site(&subdomain, principal)?;
        site.is_published = Some(published);
        self.store.set_json(&site_key(&subdomain), &site)?;
        info!(%subdomain, published, "publish state changed");
        Ok(site)
    }

    // ── Attach ─────────────────────────────────────────────────────

    /// Attach a custom domain to an owned site in `pending` state.
    /// Verification is a separate call.
    pub async fn attach_domain(
        &self,
        subdomain: &str,
        raw_domain: &str,
        principal: &Principal,
    ) -> RegistryResult<AttachedDomain> {
        let subdomain = validate::sanitize_subdomain(subdomain);
        self.owned_site(&subdomain, principal)?;

        let domain = validate::normalize_domain(raw_domain);
        if !validate::is_valid_domain(&domain) {
            return Err(RegistryError::validation(
                "Invalid custom domain format. Example: domain.com",
            ));
        }
        if validate::is_within_root(&domain, &self.settings.root_domain) {
            return Err(RegistryError::validation(format!(
                "Custom domains cannot be under {}; use the subdomain itself instead.",
                self.settings.root_domain
            )));
        }

        let key = mapping_key(&domain);
        if self.store.get(&key)?.is_some() {
            return Err(RegistryError::conflict("This custom domain is already connected."));
        }

        let mapping = self.new_mapping(&subdomain, DomainStatus::Pending);
        self.store.set_json(&key, &mapping)?;
        self.store.delete(&alias_key(&domain))?;
        info!(%domain, %subdomain, "custom domain attached, pending verification");
        Ok(AttachedDomain::from_mapping(&domain, &mapping))
    }

    // ── Verify ─────────────────────────────────────────────────────

    /// Re-check a custom domain's CNAME and move its state.
    ///
    /// - target matches: `active`, `verifiedAt = now`, alias written
    /// - answer without the target: `failed`, alias removed, retryable error
    /// - lookup failure: nothing written, same retryable error
    pub async fn verify_domain(
        &self,
        raw_domain: &str,
        principal: &Principal,
    ) -> RegistryResult<AttachedDomain> {
        let domain = validate::normalize_domain(raw_domain);
        let key = mapping_key(&domain);
        let Some(mut mapping) = self.store.get_json::<DomainMapping>(&key)? else {
            return Err(RegistryError::not_found(DOMAIN_NOT_FOUND));
        };

        let site = self.store.get_json::<SiteRecord>(&site_key(&mapping.subdomain))?;
        let owner = site.and_then(|s| s.owner_identity);
        Owned::new((), owner).claim(principal, DOMAIN_NOT_ALLOWED)?;

        let unresolved = || RegistryError::DnsUnresolved {
            expected: self.settings.cname_target.clone(),
        };

        match self.cname_points_at_target(&domain).await {
            Ok(true) => {
                mapping.status = DomainStatus::Active;
                mapping.verified_at = Some(epoch_millis());
                self.store.set_json(&key, &mapping)?;
                self.store.set_json(
                    &alias_key(&domain),
                    &DomainAlias {
                        subdomain: mapping.subdomain.clone(),
                    },
                )?;
                info!(%domain, subdomain = %mapping.subdomain, "custom domain verified");
                Ok(AttachedDomain::from_mapping(&domain, &mapping))
            }
            Ok(false) => {
                mapping.status = DomainStatus::Failed;
                self.store.set_json(&key, &mapping)?;
                // Alias only lives while the mapping is active.
                self.store.delete(&alias_key(&domain))?;
                warn!(%domain, expected = %self.settings.cname_target, "CNAME points elsewhere");
                Err(unresolved())
            }
            Err(e) => {
                warn!(%domain, error = %e, "CNAME lookup failed, status unchanged");
                Err(unresolved())
            }
        }
    }
}
