//! Connection facade over a [`BackingStore`].
//!
//! [`Connection`] turns the store's one-page, fallible calls into simple
//! operations with uniform semantics:
//!
//! - Reads without a `limit` follow continuation tokens and concatenate every
//!   page; reads with a `limit` return the first page only.
//! - Reads that leave `consistent_read` unset get the per-table policy from
//!   [`ConnectionSettings`], resolved once per table and cached.
//! - Every data operation comes in two flavours. `try_*` returns the backend
//!   error; the plain variant logs it and yields the empty value instead.
//! - Table creation and deletion block until the store reports the expected
//!   state, polling with a bounded budget. Running out of budget, like a
//!   missing billing default, is fatal and always returned as `Err`.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, trace, warn};

use crate::backend::BackingStore;
use crate::config::ConnectionSettings;
use crate::error::{ConfigError, StoreError};
use crate::requests::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput, ListTablesInput,
    PutItemInput, QueryInput, ScanInput, TableStatus, UpdateItemInput, UpdateTableInput,
};
use crate::types::Item;

/// Normalizing facade over one backing-store client.
pub struct Connection {
    alias: String,
    backend: Arc<dyn BackingStore>,
    settings: ConnectionSettings,
    /// Resolved read consistency per table.
    consistency: DashMap<String, bool>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("alias", &self.alias)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Connection {
    #[must_use]
    pub fn new(
        alias: impl Into<String>,
        backend: Arc<dyn BackingStore>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            alias: alias.into(),
            backend,
            settings,
            consistency: DashMap::new(),
        }
    }

    /// Alias this connection was registered under.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Settings the connection was opened with.
    #[must_use]
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Raw access to the backing store, bypassing every facade policy.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn BackingStore> {
        &self.backend
    }

    /// Read consistency used for `table` when a request leaves it unset.
    pub fn consistent_read(&self, table: &str) -> bool {
        if let Some(cached) = self.consistency.get(table) {
            return *cached;
        }
        let resolved = self.settings.consistent_read_for(table);
        self.consistency.insert(table.to_string(), resolved);
        resolved
    }

    /// Fills an unset consistency flag. Index reads are left alone since
    /// global secondary indexes reject consistent reads.
    fn apply_consistency(&self, table: &str, index: Option<&str>, flag: &mut Option<bool>) {
        if flag.is_none() && index.is_none() {
            *flag = Some(self.consistent_read(table));
        }
    }

    /// Converts a failed call into the empty value, logging it.
    fn absorb<T: Default>(&self, operation: &'static str, table: &str, result: Result<T, StoreError>) -> T {
        match result {
            Ok(value) => value,
            Err(StoreError::ConditionalCheckFailed) => {
                debug!(alias = %self.alias, table, operation, "conditional check failed");
                T::default()
            }
            Err(err) => {
                error!(alias = %self.alias, table, operation, error = %err, "backing store call failed");
                T::default()
            }
        }
    }

    // -- Reads ---------------------------------------------------------------

    /// Runs a query, following continuation tokens unless `limit` is set.
    ///
    /// # Errors
    ///
    /// Returns the first backend error; items from earlier pages are discarded.
    pub async fn try_query(&self, mut input: QueryInput) -> Result<Vec<Item>, StoreError> {
        self.apply_consistency(
            &input.table_name,
            input.index_name.as_deref(),
            &mut input.consistent_read,
        );
        if input.limit.is_some() {
            return Ok(self.backend.query(input).await?.items);
        }
        let mut items = Vec::new();
        let mut pages = 0_usize;
        loop {
            let page = self.backend.query(input.clone()).await?;
            pages += 1;
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(token) => input.exclusive_start_key = Some(token),
                None => break,
            }
        }
        trace!(table = %input.table_name, pages, items = items.len(), "query complete");
        Ok(items)
    }

    /// [`try_query`](Self::try_query), with failures logged and read as no items.
    pub async fn query(&self, input: QueryInput) -> Vec<Item> {
        let table = input.table_name.clone();
        let result = self.try_query(input).await;
        self.absorb("query", &table, result)
    }

    /// Runs a scan, following continuation tokens unless `limit` is set.
    ///
    /// # Errors
    ///
    /// Returns the first backend error; items from earlier pages are discarded.
    pub async fn try_scan(&self, mut input: ScanInput) -> Result<Vec<Item>, StoreError> {
        self.apply_consistency(
            &input.table_name,
            input.index_name.as_deref(),
            &mut input.consistent_read,
        );
        if input.limit.is_some() {
            return Ok(self.backend.scan(input).await?.items);
        }
        let mut items = Vec::new();
        loop {
            let page = self.backend.scan(input.clone()).await?;
            items.extend(page.items);
            match page.last_evaluated_key {
                Some(token) => input.exclusive_start_key = Some(token),
                None => return Ok(items),
            }
        }
    }

    /// [`try_scan`](Self::try_scan), with failures logged and read as no items.
    pub async fn scan(&self, input: ScanInput) -> Vec<Item> {
        let table = input.table_name.clone();
        let result = self.try_scan(input).await;
        self.absorb("scan", &table, result)
    }

    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn try_get_item(&self, mut input: GetItemInput) -> Result<Option<Item>, StoreError> {
        self.apply_consistency(&input.table_name, None, &mut input.consistent_read);
        self.backend.get_item(input).await
    }

    /// Fetches one item; `None` when it is missing or the call failed.
    pub async fn get_item(&self, input: GetItemInput) -> Option<Item> {
        let table = input.table_name.clone();
        let result = self.try_get_item(input).await;
        self.absorb("get_item", &table, result)
    }

    // -- Single-item writes --------------------------------------------------

    /// # Errors
    ///
    /// Returns the backend error, including
    /// [`StoreError::ConditionalCheckFailed`].
    pub async fn try_put_item(&self, input: PutItemInput) -> Result<Option<Item>, StoreError> {
        self.backend.put_item(input).await
    }

    /// Returns whether the write was applied.
    pub async fn put_item(&self, input: PutItemInput) -> bool {
        let table = input.table_name.clone();
        let result = self.try_put_item(input).await.map(|_| true);
        self.absorb("put_item", &table, result)
    }

    /// # Errors
    ///
    /// Returns the backend error, including
    /// [`StoreError::ConditionalCheckFailed`].
    pub async fn try_update_item(&self, input: UpdateItemInput) -> Result<Option<Item>, StoreError> {
        self.backend.update_item(input).await
    }

    /// Returns the attributes selected by `return_values`, `None` on failure.
    pub async fn update_item(&self, input: UpdateItemInput) -> Option<Item> {
        let table = input.table_name.clone();
        let result = self.try_update_item(input).await;
        self.absorb("update_item", &table, result)
    }

    /// # Errors
    ///
    /// Returns the backend error, including
    /// [`StoreError::ConditionalCheckFailed`].
    pub async fn try_delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError> {
        self.backend.delete_item(input).await
    }

    /// Deletes one item. Returns the old item only when `AllOld` was requested.
    pub async fn delete_item(&self, input: DeleteItemInput) -> Option<Item> {
        let table = input.table_name.clone();
        let result = self.try_delete_item(input).await;
        self.absorb("delete_item", &table, result)
    }

    // -- Batches -------------------------------------------------------------

    /// Issues one batch get. No chunking happens here; callers keep batches
    /// within the store ceiling.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn try_batch_get_item(
        &self,
        mut input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, StoreError> {
        for (table, request) in &mut input.request_items {
            self.apply_consistency(table, None, &mut request.consistent_read);
        }
        let output = self.backend.batch_get_item(input).await?;
        if !output.unprocessed_keys.is_empty() {
            let pending: usize = output.unprocessed_keys.values().map(|k| k.keys.len()).sum();
            warn!(alias = %self.alias, pending, "batch get left keys unprocessed");
        }
        Ok(output)
    }

    /// Items found per table; empty on failure.
    pub async fn batch_get_item(&self, input: BatchGetItemInput) -> HashMap<String, Vec<Item>> {
        let tables = table_list(input.request_items.keys());
        let result = self.try_batch_get_item(input).await.map(|output| output.responses);
        self.absorb("batch_get_item", &tables, result)
    }

    /// Issues one batch write.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn try_batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        let output = self.backend.batch_write_item(input).await?;
        if !output.unprocessed_items.is_empty() {
            let pending: usize = output.unprocessed_items.values().map(Vec::len).sum();
            warn!(alias = %self.alias, pending, "batch write left items unprocessed");
        }
        Ok(output)
    }

    /// Returns whether the call was accepted by the store.
    pub async fn batch_write_item(&self, input: BatchWriteItemInput) -> bool {
        let tables = table_list(input.request_items.keys());
        let result = self.try_batch_write_item(input).await.map(|_| true);
        self.absorb("batch_write_item", &tables, result)
    }

    // -- Table administration ------------------------------------------------

    /// Creates a table and waits for it to become active.
    ///
    /// Billing left unset is taken from the table settings, then from the
    /// connection default. Provisioned tables hand their throughput down to
    /// indexes that declare none.
    ///
    /// Returns `Ok(false)` when the store refused the request.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingBilling`] when no billing is configured, and
    /// [`StoreError::WaiterExhausted`] when the table never became active.
    pub async fn create_table(&self, mut input: CreateTableInput) -> Result<bool, StoreError> {
        let billing = match input.billing {
            Some(billing) => billing,
            None => self
                .settings
                .billing_for(&input.table_name)
                .ok_or_else(|| ConfigError::MissingBilling {
                    alias: self.alias.clone(),
                })?,
        };
        input.billing = Some(billing);
        if let Some(throughput) = billing.throughput() {
            for index in &mut input.global_secondary_indexes {
                index.provisioned_throughput.get_or_insert(throughput);
            }
        }

        let table = input.table_name.clone();
        if let Err(err) = self.backend.create_table(input).await {
            error!(alias = %self.alias, table = %table, operation = "create_table", error = %err, "backing store call failed");
            return Ok(false);
        }
        self.wait_until(&table, true).await?;
        debug!(alias = %self.alias, table = %table, "table created");
        Ok(true)
    }

    /// Returns whether the store accepted the change.
    pub async fn update_table(&self, input: UpdateTableInput) -> bool {
        let table = input.table_name.clone();
        let result = self.backend.update_table(input).await.map(|()| true);
        self.absorb("update_table", &table, result)
    }

    /// Deletes a table and waits for it to disappear.
    ///
    /// Returns `Ok(false)` when the store refused the request.
    ///
    /// # Errors
    ///
    /// [`StoreError::WaiterExhausted`] when the table never went away.
    pub async fn delete_table(&self, input: DeleteTableInput) -> Result<bool, StoreError> {
        let table = input.table_name.clone();
        if let Err(err) = self.backend.delete_table(input).await {
            error!(alias = %self.alias, table = %table, operation = "delete_table", error = %err, "backing store call failed");
            return Ok(false);
        }
        self.wait_until(&table, false).await?;
        self.consistency.remove(&table);
        debug!(alias = %self.alias, table = %table, "table deleted");
        Ok(true)
    }

    /// Lists table names, following pagination unless `limit` is set.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    pub async fn try_list_tables(&self, mut input: ListTablesInput) -> Result<Vec<String>, StoreError> {
        if input.limit.is_some() {
            return Ok(self.backend.list_tables(input).await?.table_names);
        }
        let mut names = Vec::new();
        loop {
            let page = self.backend.list_tables(input.clone()).await?;
            names.extend(page.table_names);
            match page.last_evaluated_table_name {
                Some(last) => input.exclusive_start_table_name = Some(last),
                None => return Ok(names),
            }
        }
    }

    /// [`try_list_tables`](Self::try_list_tables), with failures read as no tables.
    pub async fn list_tables(&self, input: ListTablesInput) -> Vec<String> {
        let result = self.try_list_tables(input).await;
        self.absorb("list_tables", "*", result)
    }

    /// Polls until `table` is active (`exists`) or gone (`!exists`).
    async fn wait_until(&self, table: &str, exists: bool) -> Result<(), StoreError> {
        let waiter = &self.settings.waiter;
        // A zero budget still polls once.
        let max_attempts = waiter.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.backend.describe_table(table).await {
                Ok(Some(TableStatus::Active)) if exists => return Ok(()),
                Ok(None) if !exists => return Ok(()),
                Ok(status) => trace!(table, attempt, ?status, "waiting for table"),
                Err(err) => warn!(table, attempt, error = %err, "describe table failed while waiting"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(waiter.delay()).await;
            }
        }
        Err(StoreError::WaiterExhausted {
            table: table.to_string(),
            attempts: max_attempts,
        })
    }
}

fn table_list<'a>(tables: impl Iterator<Item = &'a String>) -> String {
    let mut names: Vec<&str> = tables.map(String::as_str).collect();
    names.sort_unstable();
    names.join(",")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backends::{MemoryBackend, Operation};
    use crate::config::{TableSettings, WaiterSettings};
    use crate::expression::{Condition, KeyCondition, Update};
    use crate::requests::{
        AttributeDefinition, BillingMode, GlobalSecondaryIndex, IndexProjection, KeySchema,
        KeysAndAttributes, ReturnValues, ScalarAttributeType, WriteRequest,
    };
    use crate::types::AttributeValue;

    const TABLE: &str = "key_value";

    fn table_input(name: &str) -> CreateTableInput {
        CreateTableInput {
            table_name: name.to_string(),
            attribute_definitions: vec![
                AttributeDefinition::new("collection", ScalarAttributeType::S),
                AttributeDefinition::new("name", ScalarAttributeType::S),
                AttributeDefinition::new("expire", ScalarAttributeType::N),
            ],
            key_schema: KeySchema::new("collection", Some("name")),
            global_secondary_indexes: vec![GlobalSecondaryIndex {
                index_name: "expired_index".to_string(),
                key_schema: KeySchema::new("collection", Some("expire")),
                projection: IndexProjection::All,
                provisioned_throughput: None,
            }],
            billing: None,
        }
    }

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            aws_billing: Some(BillingMode::PayPerRequest),
            ..ConnectionSettings::default()
        }
    }

    fn row(name: &str) -> Item {
        Item::from([
            ("collection".to_string(), AttributeValue::s("c")),
            ("name".to_string(), AttributeValue::s(name)),
            ("value".to_string(), AttributeValue::B(name.as_bytes().to_vec())),
        ])
    }

    fn key(name: &str) -> Item {
        Item::from([
            ("collection".to_string(), AttributeValue::s("c")),
            ("name".to_string(), AttributeValue::s(name)),
        ])
    }

    async fn connection(backend: Arc<MemoryBackend>, settings: ConnectionSettings) -> Connection {
        let conn = Connection::new("default", backend, settings);
        assert!(conn.create_table(table_input(TABLE)).await.unwrap());
        conn
    }

    async fn seed(conn: &Connection, count: usize) {
        for i in 0..count {
            assert!(conn.put_item(PutItemInput::new(TABLE, row(&format!("k{i:03}")))).await);
        }
    }

    fn partition() -> KeyCondition {
        KeyCondition::partition("collection", AttributeValue::s("c"))
    }

    #[tokio::test]
    async fn unlimited_query_concatenates_every_page() {
        let backend = Arc::new(MemoryBackend::new().with_page_size(3));
        let conn = connection(Arc::clone(&backend), settings()).await;
        seed(&conn, 10).await;

        let items = conn.query(QueryInput::new(TABLE, partition())).await;
        assert_eq!(items.len(), 10);
        assert_eq!(items[0]["name"], AttributeValue::s("k000"));
        assert_eq!(items[9]["name"], AttributeValue::s("k009"));
        assert_eq!(backend.request_count(Operation::Query), 4);
    }

    #[tokio::test]
    async fn limited_query_returns_first_page_only() {
        let backend = Arc::new(MemoryBackend::new().with_page_size(3));
        let conn = connection(Arc::clone(&backend), settings()).await;
        seed(&conn, 10).await;

        let items = conn.query(QueryInput::new(TABLE, partition()).limit(2)).await;
        assert_eq!(items.len(), 2);
        assert_eq!(backend.request_count(Operation::Query), 1);
    }

    #[tokio::test]
    async fn failure_on_a_later_page_discards_earlier_pages() {
        let backend = Arc::new(MemoryBackend::new().with_page_size(3));
        let conn = connection(Arc::clone(&backend), settings()).await;
        seed(&conn, 10).await;

        backend.fail_nth(Operation::Query, 2, StoreError::Transport("reset".into()));
        assert_eq!(
            conn.try_query(QueryInput::new(TABLE, partition())).await,
            Err(StoreError::Transport("reset".into()))
        );

        backend.fail_nth(Operation::Query, 2, StoreError::Transport("reset".into()));
        assert!(conn.query(QueryInput::new(TABLE, partition())).await.is_empty());
    }

    #[tokio::test]
    async fn scan_follows_pagination_too() {
        let backend = Arc::new(MemoryBackend::new().with_page_size(4));
        let conn = connection(Arc::clone(&backend), settings()).await;
        seed(&conn, 9).await;
        assert_eq!(conn.scan(ScanInput::new(TABLE)).await.len(), 9);
        assert_eq!(backend.request_count(Operation::Scan), 3);
    }

    #[tokio::test]
    async fn absorbing_reads_return_empty_values() {
        let backend = Arc::new(MemoryBackend::new());
        let conn = Connection::new("default", backend, settings());
        assert!(conn.query(QueryInput::new("missing", partition())).await.is_empty());
        assert!(conn.get_item(GetItemInput::new("missing", key("a"))).await.is_none());
        assert!(!conn.put_item(PutItemInput::new("missing", row("a"))).await);
        assert!(matches!(
            conn.try_get_item(GetItemInput::new("missing", key("a"))).await,
            Err(StoreError::ResourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn consistency_policy_is_resolved_per_table_and_cached() {
        let mut settings = settings();
        settings.table_settings.insert(
            TABLE.to_string(),
            TableSettings {
                consistent_read: Some(true),
                aws_billing: None,
            },
        );
        let conn = Connection::new("default", Arc::new(MemoryBackend::new()), settings);
        assert!(conn.consistent_read(TABLE));
        assert!(!conn.consistent_read("other"));
        assert_eq!(conn.consistency.len(), 2);
    }

    #[tokio::test]
    async fn index_queries_never_get_consistent_reads() {
        let mut settings = settings();
        settings.consistent_read = true;
        let backend = Arc::new(MemoryBackend::new());
        let conn = connection(Arc::clone(&backend), settings).await;
        seed(&conn, 1).await;
        let mut input = QueryInput::new(TABLE, partition()).index("expired_index");
        assert!(conn.try_query(input.clone()).await.is_ok());

        input.consistent_read = Some(true);
        assert!(matches!(
            conn.try_query(input).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn conditional_update_reports_failure_as_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let conn = connection(backend, settings()).await;
        let create = || {
            let mut input = UpdateItemInput::new(
                TABLE,
                key("a"),
                Update::new().set("value", AttributeValue::B(vec![1])),
            );
            input.condition = Some(Condition::not_exists("value"));
            input.return_values = ReturnValues::AllNew;
            input
        };
        assert!(conn.update_item(create()).await.is_some());
        assert!(conn.update_item(create()).await.is_none());
        assert_eq!(
            conn.try_update_item(create()).await,
            Err(StoreError::ConditionalCheckFailed)
        );
    }

    #[tokio::test]
    async fn batch_calls_pass_through() {
        let backend = Arc::new(MemoryBackend::new());
        let conn = connection(Arc::clone(&backend), settings()).await;
        let write = BatchWriteItemInput {
            request_items: HashMap::from([(
                TABLE.to_string(),
                vec![
                    WriteRequest::Put { item: row("a") },
                    WriteRequest::Put { item: row("b") },
                ],
            )]),
        };
        assert!(conn.batch_write_item(write).await);

        let get = BatchGetItemInput {
            request_items: HashMap::from([(
                TABLE.to_string(),
                KeysAndAttributes {
                    keys: vec![key("a"), key("b"), key("z")],
                    ..KeysAndAttributes::default()
                },
            )]),
        };
        let found = conn.batch_get_item(get).await;
        assert_eq!(found[TABLE].len(), 2);

        let empty = BatchWriteItemInput::default();
        assert!(!conn.batch_write_item(empty).await);
    }

    #[tokio::test]
    async fn create_table_without_billing_is_fatal() {
        let conn = Connection::new(
            "reports",
            Arc::new(MemoryBackend::new()),
            ConnectionSettings::default(),
        );
        let err = conn.create_table(table_input(TABLE)).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err,
            StoreError::Config(ConfigError::MissingBilling {
                alias: "reports".into()
            })
        );
    }

    #[tokio::test]
    async fn provisioned_billing_reaches_indexes() {
        let mut settings = ConnectionSettings::default();
        settings.aws_billing = Some(BillingMode::Provisioned {
            read_capacity_units: 5,
            write_capacity_units: 5,
        });
        let backend = Arc::new(MemoryBackend::new());
        let conn = Connection::new("default", backend, settings);
        assert!(conn.create_table(table_input(TABLE)).await.unwrap());
    }

    #[tokio::test]
    async fn creating_an_existing_table_is_absorbed() {
        let backend = Arc::new(MemoryBackend::new());
        let conn = connection(backend, settings()).await;
        assert!(!conn.create_table(table_input(TABLE)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_polls_until_table_is_active() {
        let backend = Arc::new(MemoryBackend::new().with_lifecycle_delay(Duration::from_secs(5)));
        let conn = Connection::new("default", Arc::clone(&backend) as Arc<dyn BackingStore>, settings());
        assert!(conn.create_table(table_input(TABLE)).await.unwrap());
        // Polled at 0s, 3s and 6s.
        assert_eq!(backend.request_count(Operation::DescribeTable), 3);

        assert!(conn
            .delete_table(DeleteTableInput {
                table_name: TABLE.into()
            })
            .await
            .unwrap());
        assert!(conn.list_tables(ListTablesInput::default()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_gives_up_after_its_budget() {
        let backend = Arc::new(MemoryBackend::new().with_lifecycle_delay(Duration::from_secs(60)));
        let mut settings = settings();
        settings.waiter = WaiterSettings {
            delay_secs: 1,
            max_attempts: 4,
        };
        let conn = Connection::new("default", Arc::clone(&backend) as Arc<dyn BackingStore>, settings);
        let err = conn.create_table(table_input(TABLE)).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::WaiterExhausted {
                table: TABLE.into(),
                attempts: 4
            }
        );
        assert_eq!(backend.request_count(Operation::DescribeTable), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_still_polls_once() {
        let backend = Arc::new(MemoryBackend::new());
        let mut settings = settings();
        settings.waiter = WaiterSettings {
            delay_secs: 1,
            max_attempts: 0,
        };
        let conn = Connection::new("default", Arc::clone(&backend) as Arc<dyn BackingStore>, settings);
        assert!(conn.create_table(table_input(TABLE)).await.unwrap());
        assert_eq!(backend.request_count(Operation::DescribeTable), 1);
    }

    #[tokio::test]
    async fn list_tables_follows_pagination() {
        let backend = Arc::new(MemoryBackend::new());
        let conn = Connection::new("default", backend, settings());
        for name in ["a", "b", "c", "d", "e"] {
            assert!(conn.create_table(table_input(name)).await.unwrap());
        }
        assert_eq!(conn.list_tables(ListTablesInput::default()).await.len(), 5);
        let first = conn
            .list_tables(ListTablesInput {
                exclusive_start_table_name: None,
                limit: Some(2),
            })
            .await;
        assert_eq!(first, vec!["a", "b"]);
    }
}
