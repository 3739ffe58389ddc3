//! Named connections.
//!
//! A [`ConnectionRegistry`] is owned by the composition root. It hands out
//! one shared [`Connection`] per alias, building it on first request through
//! a pluggable [`Connector`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::backend::BackingStore;
use crate::backends::MemoryBackend;
use crate::config::{ClientSettings, ConnectionSettings, DEFAULT_ALIAS};
use crate::connection::Connection;
use crate::error::{ConfigError, StoreError};

/// Creates the backing-store client for a configured alias.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        alias: &str,
        settings: &ConnectionSettings,
    ) -> anyhow::Result<Arc<dyn BackingStore>>;
}

/// Connector producing in-memory backends.
///
/// By default every alias gets its own empty store. [`MemoryConnector::shared`]
/// points every alias at one store instead.
#[derive(Default)]
pub struct MemoryConnector {
    shared: Option<Arc<MemoryBackend>>,
    per_alias: DashMap<String, Arc<MemoryBackend>>,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared(backend: Arc<MemoryBackend>) -> Self {
        Self {
            shared: Some(backend),
            per_alias: DashMap::new(),
        }
    }

    /// The store handed out for `alias`, once connected.
    #[must_use]
    pub fn backend(&self, alias: &str) -> Option<Arc<MemoryBackend>> {
        self.shared
            .clone()
            .or_else(|| self.per_alias.get(alias).map(|b| Arc::clone(b.value())))
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        alias: &str,
        _settings: &ConnectionSettings,
    ) -> anyhow::Result<Arc<dyn BackingStore>> {
        let backend = match &self.shared {
            Some(shared) => Arc::clone(shared),
            None => Arc::clone(
                self.per_alias
                    .entry(alias.to_string())
                    .or_insert_with(|| Arc::new(MemoryBackend::new()))
                    .value(),
            ),
        };
        Ok(backend)
    }
}

/// Connector producing DynamoDB clients from settings.
#[cfg(feature = "aws")]
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsConnector;

#[cfg(feature = "aws")]
#[async_trait]
impl Connector for AwsConnector {
    async fn connect(
        &self,
        _alias: &str,
        settings: &ConnectionSettings,
    ) -> anyhow::Result<Arc<dyn BackingStore>> {
        Ok(Arc::new(crate::backends::AwsBackend::from_settings(settings).await))
    }
}

/// Get-or-create cache of connections keyed by alias.
pub struct ConnectionRegistry {
    settings: ClientSettings,
    connector: Arc<dyn Connector>,
    connections: DashMap<String, Arc<Connection>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(settings: ClientSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            connections: DashMap::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Returns the connection for `alias`, connecting on first use.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownAlias`] when `alias` is not configured, and
    /// [`StoreError::Transport`] when the connector fails.
    pub async fn database(&self, alias: &str) -> Result<Arc<Connection>, StoreError> {
        if let Some(existing) = self.connections.get(alias) {
            return Ok(Arc::clone(existing.value()));
        }
        let settings = self
            .settings
            .get(alias)
            .ok_or_else(|| ConfigError::UnknownAlias(alias.to_string()))?;
        let backend = self
            .connector
            .connect(alias, settings)
            .await
            .map_err(|e| StoreError::Transport(format!("{e:#}")))?;
        info!(alias, region = %settings.region, "connection established");

        // A concurrent caller may have won the race; keep the first one.
        let connection = self
            .connections
            .entry(alias.to_string())
            .or_insert_with(|| Arc::new(Connection::new(alias, backend, settings.clone())));
        Ok(Arc::clone(connection.value()))
    }

    /// Shorthand for [`database`](Self::database) with [`DEFAULT_ALIAS`].
    ///
    /// # Errors
    ///
    /// Same as [`database`](Self::database).
    pub async fn default_database(&self) -> Result<Arc<Connection>, StoreError> {
        self.database(DEFAULT_ALIAS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(connector: Arc<MemoryConnector>) -> ConnectionRegistry {
        let settings = ClientSettings::new()
            .with_connection(DEFAULT_ALIAS, ConnectionSettings::default())
            .with_connection("reports", ConnectionSettings::default());
        ConnectionRegistry::new(settings, connector)
    }

    #[tokio::test]
    async fn same_alias_yields_same_connection() {
        let registry = registry(Arc::new(MemoryConnector::new()));
        let first = registry.default_database().await.unwrap();
        let second = registry.database(DEFAULT_ALIAS).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = registry.database("reports").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.alias(), "reports");
    }

    #[tokio::test]
    async fn unknown_alias_is_fatal() {
        let registry = registry(Arc::new(MemoryConnector::new()));
        let err = registry.database("nope").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err, StoreError::Config(ConfigError::UnknownAlias("nope".into())));
    }

    #[tokio::test]
    async fn per_alias_connector_isolates_stores() {
        let connector = Arc::new(MemoryConnector::new());
        let registry = registry(Arc::clone(&connector));
        registry.default_database().await.unwrap();
        registry.database("reports").await.unwrap();
        let a = connector.backend(DEFAULT_ALIAS).unwrap();
        let b = connector.backend("reports").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn shared_connector_reuses_one_store() {
        let backend = Arc::new(MemoryBackend::new());
        let connector = Arc::new(MemoryConnector::shared(Arc::clone(&backend)));
        let registry = registry(Arc::clone(&connector));
        registry.database("reports").await.unwrap();
        assert!(Arc::ptr_eq(&connector.backend("reports").unwrap(), &backend));
    }
}
