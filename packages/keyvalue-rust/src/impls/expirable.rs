//! Key-value storage whose items carry an expiry.
//!
//! Expired items stay in the table until the store's own TTL sweep reclaims
//! them. Every read filters on `expire > now`, and enumeration goes through
//! the `(collection, expire)` index so it never walks expired items.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use widekv_client::requests::QueryInput;
use widekv_client::{
    AttributeValue, Clock, Comparator, Condition, Connection, Item, KeyCondition, SortPredicate,
};

use super::storage::{unique, DynamoDbStorage};
use crate::codec::Codec;
use crate::error::KeyValueError;
use crate::schema::{EXPIRE, NAME, NEVER_EXPIRES, VALUE};
use crate::store::{ExpirableKeyValueStore, KeyValueStore};

/// [`DynamoDbStorage`] with expiry, on a table carrying the expire index.
pub struct DynamoDbStorageExpirable<V> {
    storage: DynamoDbStorage<V>,
    clock: Arc<dyn Clock>,
    index: String,
}

impl<V> DynamoDbStorageExpirable<V>
where
    V: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        connection: Arc<Connection>,
        codec: Arc<dyn Codec<V>>,
        table: impl Into<String>,
        index: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage: DynamoDbStorage::new(collection, connection, codec, table),
            clock,
            index: index.into(),
        }
    }

    /// Name of the backing table.
    #[must_use]
    pub fn table(&self) -> &str {
        self.storage.table()
    }

    fn expire_at(&self, ttl_secs: i64) -> i64 {
        self.clock.now().saturating_add(ttl_secs)
    }

    fn live_after(now: i64) -> Condition {
        Condition::gt(EXPIRE, AttributeValue::number(now))
    }

    async fn upsert(&self, key: &str, value: &V, expire: i64) -> Result<(), KeyValueError> {
        let item = self
            .storage
            .item(key, value, &[(EXPIRE, AttributeValue::number(expire))])?;
        self.storage.put(item).await;
        Ok(())
    }

    async fn upsert_all(&self, data: &HashMap<String, V>, expire: i64) -> Result<(), KeyValueError> {
        let stamp = [(EXPIRE, AttributeValue::number(expire))];
        let items = data
            .iter()
            .map(|(key, value)| self.storage.item(key, value, &stamp))
            .collect::<Result<Vec<_>, _>>()?;
        self.storage.put_batches(items).await;
        Ok(())
    }

    /// Conditional write that also succeeds over an expired item.
    async fn create_if_absent(&self, key: &str, value: &V, expire: i64) -> Result<bool, KeyValueError> {
        let encoded = self.storage.encode(value)?;
        let now = self.clock.now();
        let condition = Condition::not_exists(VALUE)
            .or(Condition::le(EXPIRE, AttributeValue::number(now)));
        Ok(self
            .storage
            .write_if(
                key,
                vec![
                    (VALUE.to_string(), encoded),
                    (EXPIRE.to_string(), AttributeValue::number(expire)),
                ],
                condition,
            )
            .await)
    }
}

fn is_live(item: &Item, now: i64) -> bool {
    item.get(EXPIRE)
        .and_then(AttributeValue::as_i64)
        .is_some_and(|expire| expire > now)
}

#[async_trait]
impl<V> KeyValueStore<V> for DynamoDbStorageExpirable<V>
where
    V: Send + Sync + 'static,
{
    fn collection_name(&self) -> &str {
        self.storage.collection_name()
    }

    async fn has(&self, key: &str) -> Result<bool, KeyValueError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<V>, KeyValueError> {
        let condition = self.storage.partition().with_sort(
            NAME,
            SortPredicate::Compare(Comparator::Eq, AttributeValue::s(key)),
        );
        let input = QueryInput::new(self.storage.table(), condition)
            .filter(Self::live_after(self.clock.now()))
            .projection([VALUE])
            .limit(1);
        match self.storage.connection().query(input).await.first() {
            Some(item) => self.storage.decode(item),
            None => Ok(None),
        }
    }

    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, V>, KeyValueError> {
        let mut values = HashMap::new();
        for key in unique(keys) {
            if let Some(value) = self.get(key).await? {
                values.insert(key.to_string(), value);
            }
        }
        Ok(values)
    }

    async fn get_all(&self) -> Result<HashMap<String, V>, KeyValueError> {
        let condition = KeyCondition {
            sort_key: Some((
                EXPIRE.to_string(),
                SortPredicate::Compare(Comparator::Gt, AttributeValue::number(self.clock.now())),
            )),
            ..self.storage.partition()
        };
        let input = QueryInput::new(self.storage.table(), condition)
            .index(&self.index)
            .projection([NAME, VALUE]);
        let items = self.storage.connection().query(input).await;
        self.storage.decode_all(&items)
    }

    async fn set(&self, key: &str, value: &V) -> Result<(), KeyValueError> {
        self.upsert(key, value, NEVER_EXPIRES).await
    }

    async fn set_multiple(&self, data: &HashMap<String, V>) -> Result<(), KeyValueError> {
        self.upsert_all(data, NEVER_EXPIRES).await
    }

    async fn set_if_not_exists(&self, key: &str, value: &V) -> Result<bool, KeyValueError> {
        self.create_if_absent(key, value, NEVER_EXPIRES).await
    }

    async fn rename(&self, key: &str, new_key: &str) -> Result<(), KeyValueError> {
        let now = self.clock.now();
        self.storage
            .move_item(key, new_key, move |item| is_live(item, now))
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeyValueError> {
        self.storage.delete(key).await
    }

    async fn delete_multiple(&self, keys: &[String]) -> Result<(), KeyValueError> {
        self.storage.delete_multiple(keys).await
    }

    async fn delete_all(&self) -> Result<(), KeyValueError> {
        self.storage.delete_all().await
    }
}

#[async_trait]
impl<V> ExpirableKeyValueStore<V> for DynamoDbStorageExpirable<V>
where
    V: Send + Sync + 'static,
{
    async fn set_with_expire(&self, key: &str, value: &V, ttl_secs: i64) -> Result<(), KeyValueError> {
        self.upsert(key, value, self.expire_at(ttl_secs)).await
    }

    async fn set_with_expire_if_not_exists(
        &self,
        key: &str,
        value: &V,
        ttl_secs: i64,
    ) -> Result<bool, KeyValueError> {
        self.create_if_absent(key, value, self.expire_at(ttl_secs)).await
    }

    async fn set_multiple_with_expire(
        &self,
        data: &HashMap<String, V>,
        ttl_secs: i64,
    ) -> Result<(), KeyValueError> {
        self.upsert_all(data, self.expire_at(ttl_secs)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use widekv_client::requests::GetItemInput;
    use widekv_client::{BillingMode, ConnectionSettings, ManualClock, MemoryBackend, Operation};

    use super::*;
    use crate::codec::JsonCodec;
    use crate::schema::expirable_table;

    const TABLE: &str = "key_value_expire";
    const INDEX: &str = "expired_index";
    const T0: i64 = 1_700_000_000;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        clock: Arc<ManualClock>,
        store: DynamoDbStorageExpirable<String>,
    }

    /// Moves one second forward every time it is read.
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> i64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(T0));
        let (backend, store) = store_with_clock(clock.clone()).await;
        Fixture { backend, clock, store }
    }

    async fn store_with_clock(
        clock: Arc<dyn Clock>,
    ) -> (Arc<MemoryBackend>, DynamoDbStorageExpirable<String>) {
        let backend = Arc::new(MemoryBackend::new());
        let settings = ConnectionSettings {
            aws_billing: Some(BillingMode::PayPerRequest),
            ..ConnectionSettings::default()
        };
        let connection = Arc::new(Connection::new("default", backend.clone(), settings));
        connection
            .create_table(expirable_table(TABLE, INDEX))
            .await
            .unwrap();
        let store = DynamoDbStorageExpirable::new(
            "sessions",
            connection,
            Arc::new(JsonCodec::<String>::new()),
            TABLE,
            INDEX,
            clock,
        );
        (backend, store)
    }

    fn v(text: &str) -> String {
        text.to_string()
    }

    async fn stored_expire(store: &DynamoDbStorageExpirable<String>, key: &str) -> Option<i64> {
        store
            .storage
            .connection()
            .get_item(GetItemInput::new(TABLE, store.storage.key(key)))
            .await
            .and_then(|item| item.get(EXPIRE).and_then(AttributeValue::as_i64))
    }

    #[tokio::test]
    async fn value_disappears_once_ttl_passes() {
        let f = fixture().await;
        f.store.set_with_expire("token", &v("abc"), 1).await.unwrap();
        assert_eq!(f.store.get("token").await.unwrap(), Some(v("abc")));

        f.clock.advance(1);
        assert_eq!(f.store.get("token").await.unwrap(), None);
        assert!(!f.store.has("token").await.unwrap());
        assert!(f.store.get_all().await.unwrap().is_empty());
        // still physically present until the store sweeps it
        assert_eq!(f.backend.item_count(TABLE), 1);
    }

    #[tokio::test]
    async fn plain_set_never_expires() {
        let f = fixture().await;
        f.store.set("pinned", &v("x")).await.unwrap();
        assert_eq!(stored_expire(&f.store, "pinned").await, Some(NEVER_EXPIRES));
        f.clock.advance(10 * 365 * 24 * 3600);
        assert_eq!(f.store.get_all().await.unwrap(), HashMap::from([(v("pinned"), v("x"))]));
    }

    #[tokio::test]
    async fn ttl_saturates_and_non_positive_ttl_is_expired() {
        let f = fixture().await;
        f.store.set_with_expire("far", &v("1"), i64::MAX).await.unwrap();
        assert_eq!(stored_expire(&f.store, "far").await, Some(i64::MAX));

        f.store.set_with_expire("gone", &v("2"), 0).await.unwrap();
        assert!(!f.store.has("gone").await.unwrap());
    }

    #[tokio::test]
    async fn create_if_absent_reclaims_expired_item() {
        let f = fixture().await;
        assert!(f.store.set_with_expire_if_not_exists("lock", &v("a"), 30).await.unwrap());
        assert!(!f.store.set_with_expire_if_not_exists("lock", &v("b"), 30).await.unwrap());
        assert_eq!(f.store.get("lock").await.unwrap(), Some(v("a")));

        f.clock.advance(30);
        assert!(f.store.set_with_expire_if_not_exists("lock", &v("c"), 30).await.unwrap());
        assert_eq!(f.store.get("lock").await.unwrap(), Some(v("c")));
        assert_eq!(stored_expire(&f.store, "lock").await, Some(T0 + 60));
    }

    #[tokio::test]
    async fn plain_create_if_absent_stamps_no_expiry() {
        let f = fixture().await;
        assert!(f.store.set_if_not_exists("k", &v("1")).await.unwrap());
        assert_eq!(stored_expire(&f.store, "k").await, Some(NEVER_EXPIRES));
        assert!(!f.store.set_if_not_exists("k", &v("2")).await.unwrap());
    }

    #[tokio::test]
    async fn batch_shares_one_expiry() {
        let (backend, store) = store_with_clock(Arc::new(TickingClock(AtomicI64::new(T0)))).await;
        let data: HashMap<String, String> =
            (0..60).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        store.set_multiple_with_expire(&data, 600).await.unwrap();
        assert_eq!(backend.request_count(Operation::BatchWriteItem), 3);
        for key in data.keys() {
            assert_eq!(stored_expire(&store, key).await, Some(T0 + 600), "{key}");
        }
        assert_eq!(store.get_all().await.unwrap(), data);
    }

    #[tokio::test]
    async fn get_all_reads_the_expire_index() {
        let f = fixture().await;
        f.store.set_with_expire("short", &v("1"), 5).await.unwrap();
        f.store.set_with_expire("long", &v("2"), 500).await.unwrap();
        f.clock.advance(10);
        f.backend.reset_stats();

        let all = f.store.get_all().await.unwrap();
        assert_eq!(all, HashMap::from([(v("long"), v("2"))]));
        assert_eq!(f.backend.request_count(Operation::Query), 1);
    }

    #[tokio::test]
    async fn items_without_expiry_are_not_live() {
        let f = fixture().await;
        let item = f.store.storage.item("bare", &v("x"), &[]).unwrap();
        assert!(f.store.storage.put(item).await);
        assert_eq!(f.store.get("bare").await.unwrap(), None);
        assert!(f.store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_multiple_issues_point_reads() {
        let f = fixture().await;
        f.store.set_with_expire("a", &v("1"), 60).await.unwrap();
        f.store.set_with_expire("b", &v("2"), 1).await.unwrap();
        f.clock.advance(1);
        f.backend.reset_stats();

        let keys = vec![v("a"), v("b"), v("c"), v("a")];
        let found = f.store.get_multiple(&keys).await.unwrap();
        assert_eq!(found, HashMap::from([(v("a"), v("1"))]));
        assert_eq!(f.backend.request_count(Operation::Query), 3);
        assert_eq!(f.backend.request_count(Operation::BatchGetItem), 0);
    }

    #[tokio::test]
    async fn rename_keeps_expiry_and_skips_expired_source() {
        let f = fixture().await;
        f.store.set_with_expire("old", &v("1"), 60).await.unwrap();
        f.store.rename("old", "new").await.unwrap();
        assert_eq!(f.store.get("new").await.unwrap(), Some(v("1")));
        assert_eq!(f.store.get("old").await.unwrap(), None);
        assert_eq!(stored_expire(&f.store, "new").await, Some(T0 + 60));

        f.store.set_with_expire("stale", &v("2"), 1).await.unwrap();
        f.clock.advance(5);
        f.store.rename("stale", "fresh").await.unwrap();
        assert_eq!(stored_expire(&f.store, "fresh").await, None);
    }

    #[tokio::test]
    async fn delete_all_removes_expired_items_too() {
        let f = fixture().await;
        f.store.set_with_expire("a", &v("1"), 1).await.unwrap();
        f.store.set("b", &v("2")).await.unwrap();
        f.clock.advance(2);
        f.store.delete_all().await.unwrap();
        assert_eq!(f.backend.item_count(TABLE), 0);
    }
}
