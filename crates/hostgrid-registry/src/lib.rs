//! hostgrid-registry — the multi-tenant domain registry.
//!
//! Keeps three record kinds consistent in a shared key-value store:
//!
//! - `subdomain:<name>` — the tenant's site, owned by whoever registered it
//! - `custom-domain:<fqdn>` — an external domain claimed by a site, with its
//!   CNAME verification state (`pending`, `active`, `failed`)
//! - `domain:<fqdn>` — the routing alias, present only while the mapping is
//!   `active`
//!
//! # Verification states
//!
//! ```text
//!   attach ──► pending ──verify ok──► active
//!                 │                     ▲
//!           verify mismatch             │
//!                 ▼                     │
//!               failed ───verify ok─────┘
//! ```
//!
//! A lookup failure during explicit verification leaves the state as it
//! was; the same failure during registration records `pending`.

pub mod dns;
pub mod error;
pub mod lookup;
pub mod ownership;
pub mod records;
pub mod registry;
pub mod validate;

pub use dns::{CnameResolver, DnsError, HickoryResolver, StaticResolver, cname_matches};
pub use error::{RegistryError, RegistryResult};
pub use lookup::{DomainSummary, RouteKind, RoutedSite, SiteSummary};
pub use ownership::{Owned, Principal};
pub use records::{DomainAlias, DomainMapping, DomainStatus, SiteRecord, Template};
pub use registry::{AttachedDomain, Deletion, NewSite, Registration, Registry, RegistrySettings};
