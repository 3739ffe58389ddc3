//! Persistent key-value storage on one table.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use widekv_client::requests::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, KeysAndAttributes,
    PutItemInput, QueryInput, UpdateItemInput, WriteRequest,
};
use widekv_client::{AttributeValue, Condition, Connection, Item, KeyCondition, ReturnValues, Update};

use crate::codec::Codec;
use crate::error::{CodecError, KeyValueError};
use crate::schema::{COLLECTION, NAME, VALUE};
use crate::store::KeyValueStore;

/// Write requests per batch write.
pub const BATCH_WRITE_LIMIT: usize = 25;
/// Keys per batch get.
pub const BATCH_GET_LIMIT: usize = 50;

/// Key-value store for one collection, items keyed `(collection, name)`.
///
/// Holds no per-call state; share it freely behind an `Arc`.
pub struct DynamoDbStorage<V> {
    collection: String,
    table: String,
    connection: Arc<Connection>,
    codec: Arc<dyn Codec<V>>,
}

impl<V> DynamoDbStorage<V>
where
    V: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        connection: Arc<Connection>,
        codec: Arc<dyn Codec<V>>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            table: table.into(),
            connection,
            codec,
        }
    }

    /// Name of the backing table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Primary key of `name` in this collection.
    pub(crate) fn key(&self, name: &str) -> Item {
        Item::from([
            (COLLECTION.to_string(), AttributeValue::s(self.collection.as_str())),
            (NAME.to_string(), AttributeValue::s(name)),
        ])
    }

    pub(crate) fn partition(&self) -> KeyCondition {
        KeyCondition::partition(COLLECTION, AttributeValue::s(self.collection.as_str()))
    }

    pub(crate) fn encode(&self, value: &V) -> Result<AttributeValue, KeyValueError> {
        Ok(AttributeValue::B(self.codec.encode(value)?))
    }

    /// Full item for `name`, with `extra` attributes such as the expiry.
    pub(crate) fn item(
        &self,
        name: &str,
        value: &V,
        extra: &[(&str, AttributeValue)],
    ) -> Result<Item, KeyValueError> {
        let mut item = self.key(name);
        item.insert(VALUE.to_string(), self.encode(value)?);
        for (attribute, value) in extra {
            item.insert((*attribute).to_string(), value.clone());
        }
        Ok(item)
    }

    /// Decodes the `value` attribute; `None` when the item has none.
    pub(crate) fn decode(&self, item: &Item) -> Result<Option<V>, KeyValueError> {
        match item.get(VALUE) {
            None => Ok(None),
            Some(AttributeValue::B(bytes)) => Ok(Some(self.codec.decode(bytes)?)),
            Some(AttributeValue::S(text)) => Ok(Some(self.codec.decode(text.as_bytes())?)),
            Some(other) => Err(CodecError::UnexpectedType(other.type_name()).into()),
        }
    }

    /// Decodes an item read with both `name` and `value` projected.
    pub(crate) fn decode_named(&self, item: &Item) -> Result<Option<(String, V)>, KeyValueError> {
        let Some(name) = item.get(NAME).and_then(AttributeValue::as_s) else {
            return Ok(None);
        };
        Ok(self.decode(item)?.map(|value| (name.to_string(), value)))
    }

    pub(crate) fn decode_all(&self, items: &[Item]) -> Result<HashMap<String, V>, KeyValueError> {
        let mut values = HashMap::with_capacity(items.len());
        for item in items {
            if let Some((name, value)) = self.decode_named(item)? {
                values.insert(name, value);
            }
        }
        Ok(values)
    }

    pub(crate) async fn put(&self, item: Item) -> bool {
        self.connection
            .put_item(PutItemInput::new(&self.table, item))
            .await
    }

    /// Puts `items` in batches of at most [`BATCH_WRITE_LIMIT`].
    pub(crate) async fn put_batches(&self, items: Vec<Item>) {
        for batch in into_batches(items, BATCH_WRITE_LIMIT) {
            let requests = batch.into_iter().map(|item| WriteRequest::Put { item }).collect();
            self.write_batch(requests).await;
        }
    }

    async fn write_batch(&self, requests: Vec<WriteRequest>) {
        let input = BatchWriteItemInput {
            request_items: HashMap::from([(self.table.clone(), requests)]),
        };
        if !self.connection.batch_write_item(input).await {
            warn!(table = %self.table, collection = %self.collection, "batch write failed");
        }
    }

    /// Single conditional write setting `attributes`. Returns whether it applied.
    pub(crate) async fn write_if(
        &self,
        name: &str,
        attributes: Vec<(String, AttributeValue)>,
        condition: Condition,
    ) -> bool {
        let mut input = UpdateItemInput::new(
            &self.table,
            self.key(name),
            Update {
                set: attributes,
                remove: Vec::new(),
            },
        );
        input.condition = Some(condition);
        input.return_values = ReturnValues::AllNew;
        self.connection.update_item(input).await.is_some()
    }

    /// Moves the item under `key` to `new_key`, overwriting the destination.
    ///
    /// The destination is written before the source is deleted, so a failure
    /// in between leaves two copies rather than none. `is_live` decides
    /// whether the source counts as present.
    pub(crate) async fn move_item(
        &self,
        key: &str,
        new_key: &str,
        is_live: impl Fn(&Item) -> bool + Send,
    ) {
        if key == new_key {
            return;
        }
        let mut get = GetItemInput::new(&self.table, self.key(key));
        get.consistent_read = Some(true);
        let Some(mut item) = self.connection.get_item(get).await else {
            debug!(collection = %self.collection, key, "rename source missing");
            return;
        };
        if !is_live(&item) {
            debug!(collection = %self.collection, key, "rename source expired");
            return;
        }
        item.insert(NAME.to_string(), AttributeValue::s(new_key));
        if !self.put(item).await {
            warn!(collection = %self.collection, key, new_key, "rename aborted, source kept");
            return;
        }
        self.connection
            .delete_item(DeleteItemInput::new(&self.table, self.key(key)))
            .await;
    }
}

/// Keys in first-seen order with duplicates dropped.
pub(crate) fn unique(keys: &[String]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .map(String::as_str)
        .filter(|key| seen.insert(*key))
        .collect()
}

pub(crate) fn into_batches<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

#[async_trait]
impl<V> KeyValueStore<V> for DynamoDbStorage<V>
where
    V: Send + Sync + 'static,
{
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn has(&self, key: &str) -> Result<bool, KeyValueError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<V>, KeyValueError> {
        let mut input = GetItemInput::new(&self.table, self.key(key));
        input.projection = Some(vec![VALUE.to_string()]);
        match self.connection.get_item(input).await {
            Some(item) => self.decode(&item),
            None => Ok(None),
        }
    }

    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, V>, KeyValueError> {
        let keys = unique(keys);
        if let [only] = keys.as_slice() {
            return Ok(self
                .get(only)
                .await?
                .map(|value| HashMap::from([((*only).to_string(), value)]))
                .unwrap_or_default());
        }

        let mut values = HashMap::with_capacity(keys.len());
        for batch in keys.chunks(BATCH_GET_LIMIT) {
            let request = KeysAndAttributes {
                keys: batch.iter().map(|key| self.key(key)).collect(),
                projection: Some(vec![NAME.to_string(), VALUE.to_string()]),
                consistent_read: None,
            };
            let input = BatchGetItemInput {
                request_items: HashMap::from([(self.table.clone(), request)]),
            };
            let mut responses = self.connection.batch_get_item(input).await;
            let found = responses.remove(&self.table).unwrap_or_default();
            values.extend(self.decode_all(&found)?);
        }
        Ok(values)
    }

    async fn get_all(&self) -> Result<HashMap<String, V>, KeyValueError> {
        let input = QueryInput::new(&self.table, self.partition()).projection([NAME, VALUE]);
        let items = self.connection.query(input).await;
        self.decode_all(&items)
    }

    async fn set(&self, key: &str, value: &V) -> Result<(), KeyValueError> {
        let item = self.item(key, value, &[])?;
        self.put(item).await;
        Ok(())
    }

    async fn set_multiple(&self, data: &HashMap<String, V>) -> Result<(), KeyValueError> {
        let items = data
            .iter()
            .map(|(key, value)| self.item(key, value, &[]))
            .collect::<Result<Vec<_>, _>>()?;
        self.put_batches(items).await;
        Ok(())
    }

    async fn set_if_not_exists(&self, key: &str, value: &V) -> Result<bool, KeyValueError> {
        let encoded = self.encode(value)?;
        Ok(self
            .write_if(key, vec![(VALUE.to_string(), encoded)], Condition::not_exists(VALUE))
            .await)
    }

    async fn rename(&self, key: &str, new_key: &str) -> Result<(), KeyValueError> {
        self.move_item(key, new_key, |_| true).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeyValueError> {
        self.connection
            .delete_item(DeleteItemInput::new(&self.table, self.key(key)))
            .await;
        Ok(())
    }

    async fn delete_multiple(&self, keys: &[String]) -> Result<(), KeyValueError> {
        let deletes: Vec<WriteRequest> = unique(keys)
            .into_iter()
            .map(|key| WriteRequest::Delete { key: self.key(key) })
            .collect();
        for batch in into_batches(deletes, BATCH_WRITE_LIMIT) {
            self.write_batch(batch).await;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), KeyValueError> {
        let input = QueryInput::new(&self.table, self.partition()).projection([NAME]);
        let names: Vec<String> = self
            .connection
            .query(input)
            .await
            .iter()
            .filter_map(|item| item.get(NAME).and_then(AttributeValue::as_s))
            .map(str::to_string)
            .collect();
        debug!(table = %self.table, collection = %self.collection, count = names.len(), "deleting collection");
        self.delete_multiple(&names).await
    }
}
