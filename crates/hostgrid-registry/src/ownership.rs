//! Ownership guard.
//!
//! The auth layer hands the registry an opaque [`Principal`]; records carry
//! the identity that created them. [`Owned`] pairs the two so every
//! mutating operation goes through the same check.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::records::SiteRecord;

/// Stable identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(identity: &str) -> Self {
        Self::new(identity)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entity together with the identity that owns it.
#[derive(Debug, Clone)]
pub struct Owned<T> {
    entity: T,
    owner: Option<String>,
}

impl<T> Owned<T> {
    pub fn new(entity: T, owner: Option<String>) -> Self {
        Self { entity, owner }
    }

    /// An empty identity owns nothing, even a record with an empty owner.
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        !principal.as_str().is_empty() && self.owner.as_deref() == Some(principal.as_str())
    }

    /// Hand out the entity if `principal` owns it, otherwise `NotFound`
    /// with the same message a missing entity would produce.
    pub fn claim(self, principal: &Principal, not_found: &str) -> RegistryResult<T> {
        if self.is_owned_by(principal) {
            Ok(self.entity)
        } else {
            Err(RegistryError::not_found(not_found))
        }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    pub fn into_inner(self) -> T {
        self.entity
    }
}

impl From<SiteRecord> for Owned<SiteRecord> {
    fn from(site: SiteRecord) -> Self {
        let owner = site.owner_identity.clone();
        Self::new(site, owner)
    }
}
