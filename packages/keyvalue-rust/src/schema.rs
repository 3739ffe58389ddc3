//! Table layout of key-value storage and its provisioning.
//!
//! Both tables key items by `(collection, name)`. The expiring table also
//! carries a global secondary index on `(collection, expire)` so that the
//! live items of a collection can be read without touching expired ones.

use tracing::info;
use widekv_client::requests::{
    AttributeDefinition, CreateTableInput, GlobalSecondaryIndex, IndexProjection, KeySchema,
    ListTablesInput, ScalarAttributeType,
};
use widekv_client::Connection;

use crate::config::KeyValueSettings;
use crate::error::KeyValueError;

/// Partition key: the collection name.
pub const COLLECTION: &str = "collection";
/// Sort key: the key within the collection.
pub const NAME: &str = "name";
/// Encoded application value.
pub const VALUE: &str = "value";
/// Expiry, in seconds since the Unix epoch.
pub const EXPIRE: &str = "expire";

/// Expiry stamped on items written without a time to live.
pub const NEVER_EXPIRES: i64 = i64::MAX;

/// Definition of the persistent table. Billing is left to the connection defaults.
#[must_use]
pub fn key_value_table(table: &str) -> CreateTableInput {
    CreateTableInput {
        table_name: table.to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new(COLLECTION, ScalarAttributeType::S),
            AttributeDefinition::new(NAME, ScalarAttributeType::S),
        ],
        key_schema: KeySchema::new(COLLECTION, Some(NAME)),
        global_secondary_indexes: Vec::new(),
        billing: None,
    }
}

/// Definition of the expiring table, with its `(collection, expire)` index.
#[must_use]
pub fn expirable_table(table: &str, index: &str) -> CreateTableInput {
    let mut input = key_value_table(table);
    input
        .attribute_definitions
        .push(AttributeDefinition::new(EXPIRE, ScalarAttributeType::N));
    input.global_secondary_indexes.push(GlobalSecondaryIndex {
        index_name: index.to_string(),
        key_schema: KeySchema::new(COLLECTION, Some(EXPIRE)),
        projection: IndexProjection::All,
        provisioned_throughput: None,
    });
    input
}

/// Creates whichever key-value tables are missing and returns their names.
///
/// # Errors
///
/// Fatal setup errors only: missing billing defaults, or a table that never
/// became active.
pub async fn provision(
    connection: &Connection,
    settings: &KeyValueSettings,
) -> Result<Vec<String>, KeyValueError> {
    let existing = connection.list_tables(ListTablesInput::default()).await;
    let wanted = [
        key_value_table(&settings.table),
        expirable_table(&settings.expirable_table, &settings.expire_index),
    ];

    let mut created = Vec::new();
    for table in wanted {
        if existing.contains(&table.table_name) {
            continue;
        }
        let name = table.table_name.clone();
        if connection.create_table(table).await? {
            info!(table = %name, alias = connection.alias(), "key-value table created");
            created.push(name);
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use widekv_client::{
        BillingMode, ConfigError, ConnectionSettings, MemoryBackend, StoreError,
    };

    use super::*;

    fn connection(settings: ConnectionSettings) -> Connection {
        Connection::new("default", Arc::new(MemoryBackend::new()), settings)
    }

    fn billed() -> ConnectionSettings {
        ConnectionSettings {
            aws_billing: Some(BillingMode::PayPerRequest),
            ..ConnectionSettings::default()
        }
    }

    #[test]
    fn expirable_table_indexes_collection_and_expire() {
        let input = expirable_table("kv_exp", "by_expire");
        assert_eq!(input.key_schema, KeySchema::new(COLLECTION, Some(NAME)));
        let index = &input.global_secondary_indexes[0];
        assert_eq!(index.index_name, "by_expire");
        assert_eq!(index.key_schema, KeySchema::new(COLLECTION, Some(EXPIRE)));
        assert!(input
            .attribute_definitions
            .iter()
            .any(|def| def.name == EXPIRE && def.attribute_type == ScalarAttributeType::N));
    }

    #[tokio::test]
    async fn provision_creates_only_missing_tables() {
        let conn = connection(billed());
        let settings = KeyValueSettings::default();
        assert!(conn.create_table(key_value_table(&settings.table)).await.unwrap());

        let created = provision(&conn, &settings).await.unwrap();
        assert_eq!(created, vec![settings.expirable_table.clone()]);
        assert!(provision(&conn, &settings).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provision_without_billing_is_fatal() {
        let err = provision(&connection(ConnectionSettings::default()), &KeyValueSettings::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            KeyValueError::Store(StoreError::Config(ConfigError::MissingBilling {
                alias: "default".into()
            }))
        );
    }
}
