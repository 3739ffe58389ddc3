//! Factories handing out one storage instance per collection.
//!
//! A factory is owned by the composition root. The first [`get`] for a
//! collection builds its storage; later calls return the same `Arc`.
//!
//! [`get`]: KeyValueFactory::get

use std::sync::Arc;

use dashmap::DashMap;
use widekv_client::{Clock, Connection, ConnectionRegistry, SystemClock};

use crate::codec::Codec;
use crate::config::KeyValueSettings;
use crate::error::KeyValueError;
use crate::impls::{DynamoDbStorage, DynamoDbStorageExpirable};

/// Builds and caches [`DynamoDbStorage`] instances by collection name.
pub struct KeyValueFactory<V> {
    connection: Arc<Connection>,
    codec: Arc<dyn Codec<V>>,
    table: String,
    stores: DashMap<String, Arc<DynamoDbStorage<V>>>,
}

impl<V> KeyValueFactory<V>
where
    V: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(connection: Arc<Connection>, codec: Arc<dyn Codec<V>>, table: impl Into<String>) -> Self {
        Self {
            connection,
            codec,
            table: table.into(),
            stores: DashMap::new(),
        }
    }

    /// Resolves the configured connection alias through `registry`.
    ///
    /// # Errors
    ///
    /// Fatal configuration errors from the registry, such as an unknown alias.
    pub async fn from_settings(
        registry: &ConnectionRegistry,
        settings: &KeyValueSettings,
        codec: Arc<dyn Codec<V>>,
    ) -> Result<Self, KeyValueError> {
        let connection = registry.database(&settings.connection).await?;
        Ok(Self::new(connection, codec, &settings.table))
    }

    /// Storage for `collection`, built on first request.
    #[must_use]
    pub fn get(&self, collection: &str) -> Arc<DynamoDbStorage<V>> {
        if let Some(store) = self.stores.get(collection) {
            return Arc::clone(store.value());
        }
        let store = self.stores.entry(collection.to_string()).or_insert_with(|| {
            Arc::new(DynamoDbStorage::new(
                collection,
                Arc::clone(&self.connection),
                Arc::clone(&self.codec),
                &self.table,
            ))
        });
        Arc::clone(store.value())
    }

    /// Number of collections built so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

/// Builds and caches [`DynamoDbStorageExpirable`] instances by collection name.
pub struct KeyValueExpirableFactory<V> {
    connection: Arc<Connection>,
    codec: Arc<dyn Codec<V>>,
    clock: Arc<dyn Clock>,
    table: String,
    index: String,
    stores: DashMap<String, Arc<DynamoDbStorageExpirable<V>>>,
}

impl<V> KeyValueExpirableFactory<V>
where
    V: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        connection: Arc<Connection>,
        codec: Arc<dyn Codec<V>>,
        clock: Arc<dyn Clock>,
        table: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            codec,
            clock,
            table: table.into(),
            index: index.into(),
            stores: DashMap::new(),
        }
    }

    /// Resolves the configured connection alias through `registry` and reads
    /// time from the system clock.
    ///
    /// # Errors
    ///
    /// Fatal configuration errors from the registry, such as an unknown alias.
    pub async fn from_settings(
        registry: &ConnectionRegistry,
        settings: &KeyValueSettings,
        codec: Arc<dyn Codec<V>>,
    ) -> Result<Self, KeyValueError> {
        let connection = registry.database(&settings.connection).await?;
        Ok(Self::new(
            connection,
            codec,
            Arc::new(SystemClock),
            &settings.expirable_table,
            &settings.expire_index,
        ))
    }

    /// Storage for `collection`, built on first request.
    #[must_use]
    pub fn get(&self, collection: &str) -> Arc<DynamoDbStorageExpirable<V>> {
        if let Some(store) = self.stores.get(collection) {
            return Arc::clone(store.value());
        }
        let store = self.stores.entry(collection.to_string()).or_insert_with(|| {
            Arc::new(DynamoDbStorageExpirable::new(
                collection,
                Arc::clone(&self.connection),
                Arc::clone(&self.codec),
                &self.table,
                &self.index,
                Arc::clone(&self.clock),
            ))
        });
        Arc::clone(store.value())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
