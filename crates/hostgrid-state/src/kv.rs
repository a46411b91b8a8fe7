//! The key-value seam the registry is written against.
//!
//! [`KvStore`] moves opaque bytes; [`KvStoreExt`] layers JSON on top and is
//! implemented for every store, including `dyn KvStore`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};

/// Generic get/set/delete/keys/multi-get over string keys.
pub trait KvStore: Send + Sync {
    /// Fetch the raw value stored under `key`.
    fn get(&self, key: &str) -> StateResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing whatever was there.
    fn set(&self, key: &str, value: &[u8]) -> StateResult<()>;

    /// Remove `key`. Returns true if it existed; a missing key is not an error.
    fn delete(&self, key: &str) -> StateResult<bool>;

    /// All keys starting with `prefix`, in lexicographic order.
    fn keys(&self, prefix: &str) -> StateResult<Vec<String>>;

    /// Fetch several keys at once. The result has one slot per requested key.
    fn mget(&self, keys: &[String]) -> StateResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }
}

/// JSON helpers over any [`KvStore`].
pub trait KvStoreExt: KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StateResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StateError::Deserialize {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StateError::Serialize(e.to_string()))?;
        self.set(key, &bytes)
    }

    /// Like [`KvStore::mget`], but values that fail to decode come back as
    /// `None` instead of failing the whole batch.
    fn mget_json<T: DeserializeOwned>(&self, keys: &[String]) -> StateResult<Vec<Option<T>>> {
        let raw = self.mget(keys)?;
        Ok(keys
            .iter()
            .zip(raw)
            .map(|(key, bytes)| {
                let bytes = bytes?;
                match serde_json::from_slice(&bytes) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        debug!(%key, error = %e, "skipping undecodable record");
                        None
                    }
                }
            })
            .collect())
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
