//! Interleavings the registry accepts: no locks, last write wins per key,
//! and cascades that only see mappings present when they scan.

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use hostgrid_registry::*;
use hostgrid_state::{KvStore, KvStoreExt, StateResult, StateStore};

type Hook = Box<dyn FnOnce(&StateStore) + Send>;

/// Wraps a store and runs a one-shot hook at a chosen point, simulating a
/// competing request landing between two steps of an operation.
struct InterleavingStore {
    inner: StateStore,
    before_set: Mutex<Option<(String, Hook)>>,
    after_keys: Mutex<Option<(String, Hook)>>,
}

impl InterleavingStore {
    fn new(inner: StateStore) -> Self {
        Self {
            inner,
            before_set: Mutex::new(None),
            after_keys: Mutex::new(None),
        }
    }

    fn before_set(&self, key: &str, hook: impl FnOnce(&StateStore) + Send + 'static) {
        *self.before_set.lock().unwrap() = Some((key.to_string(), Box::new(hook)));
    }

    fn after_keys(&self, prefix: &str, hook: impl FnOnce(&StateStore) + Send + 'static) {
        *self.after_keys.lock().unwrap() = Some((prefix.to_string(), Box::new(hook)));
    }

    fn fire(slot: &Mutex<Option<(String, Hook)>>, key: &str, store: &StateStore) {
        let hook = {
            let mut slot = slot.lock().unwrap();
            match slot.as_ref() {
                Some((wanted, _)) if wanted == key => slot.take().map(|(_, hook)| hook),
                _ => None,
            }
        };
        if let Some(hook) = hook {
            hook(store);
        }
    }
}

impl KvStore for InterleavingStore {
    fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StateResult<()> {
        Self::fire(&self.before_set, key, &self.inner);
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> StateResult<bool> {
        self.inner.delete(key)
    }

    fn keys(&self, prefix: &str) -> StateResult<Vec<String>> {
        let keys = self.inner.keys(prefix)?;
        Self::fire(&self.after_keys, prefix, &self.inner);
        Ok(keys)
    }
}

fn interleaved() -> (Registry, Arc<InterleavingStore>, StateStore) {
    let inner = StateStore::open_in_memory().unwrap();
    let store = Arc::new(InterleavingStore::new(inner.clone()));
    let registry = Registry::new(store.clone(), Arc::new(StaticResolver::new()), settings());
    (registry, store, inner)
}

#[tokio::test]
async fn racing_registrations_last_writer_wins() {
    let (registry, store, inner) = interleaved();

    // Bob's registration lands after Alice's existence check, before her write.
    store.before_set("subdomain:acme", |s| {
        let bob_site = SiteRecord {
            title: Some("Bob's".to_string()),
            owner_identity: Some("bob@example.com".to_string()),
            ..Default::default()
        };
        s.set_json("subdomain:acme", &bob_site).unwrap();
    });

    registry.register_site(new_site("acme"), &alice()).await.unwrap();

    // No error for anyone; Bob's record was silently overwritten.
    let stored: SiteRecord = inner.get_json("subdomain:acme").unwrap().unwrap();
    assert_eq!(stored.owner(), Some("alice@example.com"));
    assert_eq!(stored.title.as_deref(), Some("Acme Rockets"));
}

#[tokio::test]
async fn mapping_attached_after_cascade_scan_survives_orphaned() {
    let (registry, store, inner) = interleaved();
    registry.register_site(new_site("acme"), &alice()).await.unwrap();
    registry.attach_domain("acme", "acme.com", &alice()).await.unwrap();

    store.after_keys("custom-domain:", |s| {
        let late = DomainMapping {
            subdomain: "acme".to_string(),
            cname_target: TARGET.to_string(),
            status: DomainStatus::Pending,
            created_at: 1,
            verified_at: None,
        };
        s.set_json("custom-domain:late.com", &late).unwrap();
    });

    let deletion = registry.delete_site("acme", &alice()).await.unwrap();

    assert_eq!(deletion.removed_domains, vec!["acme.com"]);
    assert!(inner.get("custom-domain:acme.com").unwrap().is_none());
    assert!(inner.get("custom-domain:late.com").unwrap().is_some());
    assert!(inner.get("subdomain:acme").unwrap().is_none());
}

#[tokio::test]
async fn interrupted_cascade_can_be_finished_by_key_deletes() {
    let store = StateStore::open_in_memory().unwrap();
    let registry = Registry::new(
        Arc::new(store.clone()),
        Arc::new(StaticResolver::new()),
        settings(),
    );

    registry.register_site(new_site("acme"), &alice()).await.unwrap();
    registry.attach_domain("acme", "acme.com", &alice()).await.unwrap();

    // Simulate a crash after the site delete: mapping left behind, alias never existed.
    store.delete("subdomain:acme").unwrap();

    // Finishing the cascade by key is safe whether or not each key exists.
    assert!(store.delete("custom-domain:acme.com").unwrap());
    assert!(!store.delete("domain:acme.com").unwrap());
    assert!(!store.delete("custom-domain:acme.com").unwrap());
    assert!(store.keys("").unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_registrations_of_distinct_names_all_land() {
    let h = harness();
    let mut tasks = Vec::new();
    for i in 0..16 {
        let registry = h.registry.clone();
        tasks.push(tokio::spawn(async move {
            let owner = Principal::new(format!("user-{i}"));
            registry.register_site(new_site(&format!("site-{i}")), &owner).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let sites = h.registry.list_sites(None).unwrap();
    assert_eq!(sites.len(), 16);
    let one = h.registry.list_sites(Some(&Principal::new("user-3"))).unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].subdomain, "site-3");
}

/// Leave `shop.com` with an alias to `acme` but no mapping, as a cascade
/// that died between its mapping and alias deletes would.
async fn strand_alias(h: &Harness) {
    h.dns.set_cname("shop.com", [TARGET]);
    h.registry.register_site(new_site("acme"), &alice()).await.unwrap();
    h.registry.attach_domain("acme", "shop.com", &alice()).await.unwrap();
    h.registry.verify_domain("shop.com", &alice()).await.unwrap();

    h.store.delete("subdomain:acme").unwrap();
    h.store.delete("custom-domain:shop.com").unwrap();
    assert!(h.store.get("domain:shop.com").unwrap().is_some());
}

#[tokio::test]
async fn pending_attach_clears_stranded_alias() {
    let h = harness();
    strand_alias(&h).await;

    h.registry.register_site(new_site("bobs"), &bob()).await.unwrap();
    let attached = h.registry.attach_domain("bobs", "shop.com", &bob()).await.unwrap();
    assert_eq!(attached.status, DomainStatus::Pending);
    assert!(h.store.get("domain:shop.com").unwrap().is_none());

    // Someone else taking the old name must not receive bob's domain.
    let mallory = Principal::new("mallory@example.com");
    h.registry.register_site(new_site("acme"), &mallory).await.unwrap();
    assert!(h.registry.route_host("shop.com").unwrap().is_none());
}

#[tokio::test]
async fn pending_registration_clears_stranded_alias() {
    let h = harness();
    strand_alias(&h).await;
    h.dns.set_failure("shop.com", "SERVFAIL");

    let mut site = new_site("bobs");
    site.custom_domain = Some("shop.com".to_string());
    let registration = h.registry.register_site(site, &bob()).await.unwrap();

    let domain = registration.custom_domain.unwrap();
    assert_eq!(domain.status, DomainStatus::Pending);
    assert!(h.store.get("domain:shop.com").unwrap().is_none());
    assert!(h.registry.route_host("shop.com").unwrap().is_none());
}
