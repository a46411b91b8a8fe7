//! StateStore — redb-backed record persistence for Hostgrid.
//!
//! Implements [`KvStore`] over a single `records` table. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::kv::KvStore;
use crate::tables::RECORDS;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent record store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory record store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    /// Create the records table if it doesn't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(RECORDS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl KvStore for StateStore {
    fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "record stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "record deleted");
        Ok(existed)
    }

    fn keys(&self, prefix: &str) -> StateResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            let key = key.value();
            if key.starts_with(prefix) {
                results.push(key.to_string());
            }
        }
        Ok(results)
    }

    fn mget(&self, keys: &[String]) -> StateResult<Vec<Option<Vec<u8>>>> {
        // One read transaction for the whole batch.
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let value = table
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            results.push(value);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let store = StateStore::open_in_memory().unwrap();

        store.set("subdomain:acme", b"{}").unwrap();
        let retrieved = store.get("subdomain:acme").unwrap();

        assert_eq!(retrieved.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get("subdomain:nothing").unwrap().is_none());
    }

    #[test]
    fn set_overwrites() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("subdomain:acme", b"1").unwrap();
        store.set("subdomain:acme", b"2").unwrap();

        assert_eq!(store.get("subdomain:acme").unwrap().as_deref(), Some(&b"2"[..]));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("domain:acme.com", b"{}").unwrap();

        assert!(store.delete("domain:acme.com").unwrap());
        assert!(!store.delete("domain:acme.com").unwrap());
        assert!(store.get("domain:acme.com").unwrap().is_none());
    }

    #[test]
    fn keys_filters_by_prefix() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("subdomain:b", b"{}").unwrap();
        store.set("subdomain:a", b"{}").unwrap();
        store.set("custom-domain:a.com", b"{}").unwrap();
        store.set("domain:a.com", b"{}").unwrap();

        assert_eq!(store.keys("subdomain:").unwrap(), vec!["subdomain:a", "subdomain:b"]);
        assert_eq!(store.keys("domain:").unwrap(), vec!["domain:a.com"]);
        assert_eq!(store.keys("custom-domain:").unwrap(), vec!["custom-domain:a.com"]);
    }

    #[test]
    fn mget_preserves_order_and_gaps() {
        let store = StateStore::open_in_memory().unwrap();
        store.set("subdomain:a", b"a").unwrap();
        store.set("subdomain:c", b"c").unwrap();

        let keys = vec![
            "subdomain:c".to_string(),
            "subdomain:b".to_string(),
            "subdomain:a".to_string(),
        ];
        let values = store.mget(&keys).unwrap();

        assert_eq!(values[0].as_deref(), Some(&b"c"[..]));
        assert!(values[1].is_none());
        assert_eq!(values[2].as_deref(), Some(&b"a"[..]));
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.keys("subdomain:").unwrap().is_empty());
        assert!(store.mget(&[]).unwrap().is_empty());
        assert!(!store.delete("nope").unwrap());
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.set("subdomain:acme", b"{\"emoji\":\"x\"}").unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        assert!(store.get("subdomain:acme").unwrap().is_some());
    }
}
