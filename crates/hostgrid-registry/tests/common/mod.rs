//! Shared fixtures for registry integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use hostgrid_registry::*;
use hostgrid_state::StateStore;

pub const ROOT: &str = "hostgrid.dev";
pub const TARGET: &str = "cname.hostgrid.dev";

pub fn settings() -> RegistrySettings {
    RegistrySettings {
        root_domain: ROOT.to_string(),
        cname_target: TARGET.to_string(),
        protocol: "https".to_string(),
    }
}

pub struct Harness {
    pub registry: Registry,
    pub store: StateStore,
    pub dns: Arc<StaticResolver>,
}

pub fn harness() -> Harness {
    let store = StateStore::open_in_memory().unwrap();
    let dns = Arc::new(StaticResolver::new());
    let registry = Registry::new(Arc::new(store.clone()), dns.clone(), settings());
    Harness {
        registry,
        store,
        dns,
    }
}

pub fn new_site(subdomain: &str) -> NewSite {
    NewSite {
        subdomain: subdomain.to_string(),
        icon: "🚀".to_string(),
        title: "Acme Rockets".to_string(),
        bio: "Rockets, mostly.".to_string(),
        template: Template::Hero,
        is_published: true,
        custom_domain: None,
    }
}

pub fn alice() -> Principal {
    Principal::new("alice@example.com")
}

pub fn bob() -> Principal {
    Principal::new("bob@example.com")
}
