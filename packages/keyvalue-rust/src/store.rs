//! Key-value storage traits.
//!
//! A store is bound to one *collection*, a namespace that maps onto one
//! partition of the backing table. Keys are the item sort keys within it.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::KeyValueError;

/// Key-value contract for one collection.
///
/// Used as `Arc<dyn KeyValueStore<V>>`.
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    /// The collection this store is bound to.
    fn collection_name(&self) -> &str;

    /// Whether `key` currently resolves to a value. Falsy values count.
    async fn has(&self, key: &str) -> Result<bool, KeyValueError>;

    /// Value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<V>, KeyValueError>;

    /// [`get`](Self::get), falling back to `default` when the key is absent.
    async fn get_or(&self, key: &str, default: V) -> Result<V, KeyValueError> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Values of the keys that exist; absent keys are omitted.
    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, V>, KeyValueError>;

    /// Every key-value pair of the collection.
    async fn get_all(&self) -> Result<HashMap<String, V>, KeyValueError>;

    /// Unconditional upsert.
    async fn set(&self, key: &str, value: &V) -> Result<(), KeyValueError>;

    /// Upserts every entry of `data`, batched. Not atomic across entries.
    async fn set_multiple(&self, data: &HashMap<String, V>) -> Result<(), KeyValueError>;

    /// Writes `value` only when `key` is absent. Returns whether this call
    /// created the item.
    async fn set_if_not_exists(&self, key: &str, value: &V) -> Result<bool, KeyValueError>;

    /// Moves the value stored under `key` to `new_key`, replacing whatever
    /// `new_key` held. A missing `key` is a no-op.
    async fn rename(&self, key: &str, new_key: &str) -> Result<(), KeyValueError>;

    /// Removes `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), KeyValueError>;

    /// Removes every key in `keys`, batched. Duplicates are ignored.
    async fn delete_multiple(&self, keys: &[String]) -> Result<(), KeyValueError>;

    /// Deletes every item of the collection. Not atomic.
    async fn delete_all(&self) -> Result<(), KeyValueError>;
}

/// Key-value contract whose items may carry a time to live.
///
/// Items past their expiry are absent from every read.
#[async_trait]
pub trait ExpirableKeyValueStore<V>: KeyValueStore<V>
where
    V: Send + Sync + 'static,
{
    /// Upsert that expires `ttl_secs` seconds from now.
    async fn set_with_expire(&self, key: &str, value: &V, ttl_secs: i64) -> Result<(), KeyValueError>;

    /// Conditional write that treats an expired item as absent.
    async fn set_with_expire_if_not_exists(
        &self,
        key: &str,
        value: &V,
        ttl_secs: i64,
    ) -> Result<bool, KeyValueError>;

    /// Batched upsert; all items share one expiry computed at call entry.
    async fn set_multiple_with_expire(
        &self,
        data: &HashMap<String, V>,
        ttl_secs: i64,
    ) -> Result<(), KeyValueError>;
}
