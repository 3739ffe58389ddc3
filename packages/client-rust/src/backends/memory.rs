//! In-memory [`BackingStore`] implementation backed by [`DashMap`].
//!
//! Each table is an ordered map from primary key to item behind a
//! `parking_lot::RwLock`. The backend honours the parts of the wire contract
//! the storage layer depends on: key schemas and sparse global secondary
//! indexes, `Limit` counted before filtering, continuation tokens, batch
//! ceilings, conditional writes and table lifecycle. It also counts requests
//! per operation and can be told to fail chosen calls, which is what the
//! facade and storage tests use it for.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ordered_float::OrderedFloat;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::backend::BackingStore;
use crate::error::StoreError;
use crate::requests::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    BillingMode, CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput,
    IndexProjection, KeySchema, ListTablesInput, ListTablesOutput, Page, PutItemInput, QueryInput,
    ReturnValues, ScanInput, TableStatus, UpdateItemInput, UpdateTableInput, WriteRequest,
};
use crate::expression::{Condition, KeyCondition};
use crate::types::{project, AttributeValue, Item};

/// Items evaluated per page when the request sets no smaller limit.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Write requests accepted by one `BatchWriteItem` call.
pub const MAX_BATCH_WRITE: usize = 25;
/// Keys accepted by one `BatchGetItem` call.
pub const MAX_BATCH_GET: usize = 100;
/// Table names returned by one `ListTables` call.
pub const MAX_LIST_TABLES: usize = 100;

/// Backing-store operations, used to address request counters and
/// scheduled failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Scan,
    GetItem,
    PutItem,
    UpdateItem,
    DeleteItem,
    BatchGetItem,
    BatchWriteItem,
    CreateTable,
    UpdateTable,
    DeleteTable,
    ListTables,
    DescribeTable,
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Orderable form of a scalar key attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyPart {
    N(OrderedFloat<f64>),
    S(String),
    B(Vec<u8>),
}

impl KeyPart {
    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::S(s) => Some(Self::S(s.clone())),
            AttributeValue::B(b) => Some(Self::B(b.clone())),
            AttributeValue::N(n) => n.trim().parse::<f64>().ok().map(|f| Self::N(OrderedFloat(f))),
            _ => None,
        }
    }
}

type PrimaryKey = (KeyPart, Option<KeyPart>);

fn validation(message: impl Into<String>) -> StoreError {
    StoreError::Validation(message.into())
}

fn not_found(table: &str) -> StoreError {
    StoreError::ResourceNotFound(format!("table {table} not found"))
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Creating { ready_at: Instant },
    Active,
    Deleting { gone_at: Instant },
}

struct MemoryTable {
    definition: CreateTableInput,
    lifecycle: Mutex<Lifecycle>,
    rows: RwLock<BTreeMap<PrimaryKey, Item>>,
}

impl MemoryTable {
    fn new(definition: CreateTableInput, delay: Duration) -> Self {
        let lifecycle = if delay.is_zero() {
            Lifecycle::Active
        } else {
            Lifecycle::Creating {
                ready_at: Instant::now() + delay,
            }
        };
        Self {
            definition,
            lifecycle: Mutex::new(lifecycle),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Current status; `None` once a deletion has completed.
    fn status(&self) -> Option<TableStatus> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Creating { ready_at } if Instant::now() >= ready_at => {
                *lifecycle = Lifecycle::Active;
                Some(TableStatus::Active)
            }
            Lifecycle::Creating { .. } => Some(TableStatus::Creating),
            Lifecycle::Active => Some(TableStatus::Active),
            Lifecycle::Deleting { gone_at } if Instant::now() >= gone_at => None,
            Lifecycle::Deleting { .. } => Some(TableStatus::Deleting),
        }
    }

    fn key_schema(&self) -> &KeySchema {
        &self.definition.key_schema
    }

    /// Checks a value against the declared type of an attribute.
    fn key_part(&self, attribute: &str, value: &AttributeValue) -> Result<KeyPart, StoreError> {
        let declared = self
            .definition
            .attribute_definitions
            .iter()
            .find(|def| def.name == attribute)
            .map(|def| def.attribute_type);
        match declared {
            Some(ty) if ty.as_str() == value.type_name() => KeyPart::from_value(value)
                .ok_or_else(|| validation(format!("invalid number for key attribute {attribute}"))),
            Some(ty) => Err(validation(format!(
                "type mismatch for key attribute {attribute}: expected {}, got {}",
                ty.as_str(),
                value.type_name()
            ))),
            None => Err(validation(format!("{attribute} is not a key attribute"))),
        }
    }

    /// Primary key from a key map holding exactly the key attributes.
    fn primary_key(&self, key: &Item) -> Result<PrimaryKey, StoreError> {
        let expected = self.key_schema().attributes().count();
        if key.len() != expected {
            return Err(validation("the provided key element does not match the schema"));
        }
        self.primary_key_of(key)
    }

    /// Primary key read out of a full item.
    fn primary_key_of(&self, item: &Item) -> Result<PrimaryKey, StoreError> {
        let schema = self.key_schema();
        let partition = item
            .get(&schema.partition_key)
            .ok_or_else(|| validation(format!("missing key attribute {}", schema.partition_key)))?;
        let partition = self.key_part(&schema.partition_key, partition)?;
        let sort = match &schema.sort_key {
            None => None,
            Some(name) => {
                let value = item
                    .get(name)
                    .ok_or_else(|| validation(format!("missing key attribute {name}")))?;
                Some(self.key_part(name, value)?)
            }
        };
        Ok((partition, sort))
    }

    /// Rejects items whose declared (key or index key) attributes carry the wrong type.
    fn check_item(&self, item: &Item) -> Result<PrimaryKey, StoreError> {
        for def in &self.definition.attribute_definitions {
            if let Some(value) = item.get(&def.name) {
                self.key_part(&def.name, value)?;
            }
        }
        self.primary_key_of(item)
    }

    fn read_target(&self, index_name: Option<&str>) -> Result<ReadTarget, StoreError> {
        let table_keys: Vec<String> = self.key_schema().attributes().map(str::to_string).collect();
        let Some(index_name) = index_name else {
            return Ok(ReadTarget {
                key_schema: self.key_schema().clone(),
                order: table_keys,
                index_projection: None,
            });
        };
        let index = self
            .definition
            .global_secondary_indexes
            .iter()
            .find(|gsi| gsi.index_name == index_name)
            .ok_or_else(|| validation(format!("the table does not have the specified index: {index_name}")))?;
        let mut order: Vec<String> = index.key_schema.attributes().map(str::to_string).collect();
        for key in table_keys {
            if !order.contains(&key) {
                order.push(key);
            }
        }
        Ok(ReadTarget {
            key_schema: index.key_schema.clone(),
            order,
            index_projection: Some(index.projection.clone()),
        })
    }

    /// Items visible through `target`, sorted by their order key.
    fn candidates(&self, target: &ReadTarget) -> Vec<(Vec<KeyPart>, Item)> {
        let rows = self.rows.read();
        let mut out: Vec<(Vec<KeyPart>, Item)> = rows
            .values()
            .filter_map(|item| {
                let order = target.order_key(item)?;
                Some((order, target.view(item)))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// What a query or scan reads: the base table or one of its indexes.
struct ReadTarget {
    key_schema: KeySchema,
    /// Index key attributes, then table key attributes. Forms both the sort
    /// order and the continuation token.
    order: Vec<String>,
    index_projection: Option<IndexProjection>,
}

impl ReadTarget {
    /// `None` for items missing an index key (sparse index).
    fn order_key(&self, item: &Item) -> Option<Vec<KeyPart>> {
        self.order
            .iter()
            .map(|name| item.get(name).and_then(KeyPart::from_value))
            .collect()
    }

    fn view(&self, item: &Item) -> Item {
        match &self.index_projection {
            None | Some(IndexProjection::All) => item.clone(),
            Some(IndexProjection::KeysOnly) => project(item, &self.order),
            Some(IndexProjection::Include(extra)) => {
                let mut attributes = self.order.clone();
                attributes.extend(extra.iter().cloned());
                project(item, &attributes)
            }
        }
    }

    fn check_key_condition(&self, key: &KeyCondition) -> Result<(), StoreError> {
        if key.partition_key != self.key_schema.partition_key {
            return Err(validation(format!(
                "query condition missed key schema element: {}",
                self.key_schema.partition_key
            )));
        }
        if let Some((sort, _)) = &key.sort_key {
            if self.key_schema.sort_key.as_deref() != Some(sort.as_str()) {
                return Err(validation(format!("{sort} is not the sort key")));
            }
        }
        Ok(())
    }
}

/// Parameters shared by queries and scans once validated.
struct PageRequest<'a> {
    limit: Option<u32>,
    forward: bool,
    exclusive_start_key: Option<&'a Item>,
    filter: Option<&'a Condition>,
    projection: Option<&'a [String]>,
}

fn check_limit(limit: Option<u32>) -> Result<(), StoreError> {
    if limit == Some(0) {
        return Err(validation("limit must be at least 1"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

struct ScheduledFailure {
    operation: Operation,
    remaining: usize,
    error: StoreError,
}

/// In-memory wide-column store.
pub struct MemoryBackend {
    tables: DashMap<String, Arc<MemoryTable>>,
    page_size: usize,
    lifecycle_delay: Duration,
    requests: DashMap<Operation, usize>,
    largest_batch: DashMap<Operation, usize>,
    failures: Mutex<Vec<ScheduledFailure>>,
}

impl MemoryBackend {
    /// Creates an empty store whose tables become active immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            lifecycle_delay: Duration::ZERO,
            requests: DashMap::new(),
            largest_batch: DashMap::new(),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Caps the number of items evaluated per query or scan page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Keeps created tables `CREATING` and deleted tables `DELETING` for `delay`.
    #[must_use]
    pub fn with_lifecycle_delay(mut self, delay: Duration) -> Self {
        self.lifecycle_delay = delay;
        self
    }

    /// Number of calls made to `operation`, failed ones included.
    #[must_use]
    pub fn request_count(&self, operation: Operation) -> usize {
        self.requests.get(&operation).map_or(0, |count| *count)
    }

    /// Largest number of keys or write requests seen in one batch call.
    #[must_use]
    pub fn largest_batch(&self, operation: Operation) -> usize {
        self.largest_batch.get(&operation).map_or(0, |size| *size)
    }

    /// Clears request counters and batch-size records.
    pub fn reset_stats(&self) {
        self.requests.clear();
        self.largest_batch.clear();
    }

    /// Makes the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        self.fail_nth(operation, 1, error);
    }

    /// Makes the `nth` upcoming call (1-based) to `operation` fail with `error`.
    pub fn fail_nth(&self, operation: Operation, nth: usize, error: StoreError) {
        self.failures.lock().push(ScheduledFailure {
            operation,
            remaining: nth.max(1),
            error,
        });
    }

    /// Number of items currently stored in `table`, expired ones included.
    #[must_use]
    pub fn item_count(&self, table: &str) -> usize {
        self.tables
            .get(table)
            .map_or(0, |t| t.value().rows.read().len())
    }

    fn begin(&self, operation: Operation) -> Result<(), StoreError> {
        *self.requests.entry(operation).or_insert(0) += 1;
        let mut fired = None;
        self.failures.lock().retain_mut(|failure| {
            if failure.operation != operation {
                return true;
            }
            failure.remaining = failure.remaining.saturating_sub(1);
            if failure.remaining == 0 && fired.is_none() {
                fired = Some(failure.error.clone());
                return false;
            }
            true
        });
        fired.map_or(Ok(()), Err)
    }

    fn record_batch(&self, operation: Operation, size: usize) {
        let mut largest = self.largest_batch.entry(operation).or_insert(0);
        if size > *largest {
            *largest = size;
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// An active table, or `ResourceNotFound`.
    fn table(&self, name: &str) -> Result<Arc<MemoryTable>, StoreError> {
        match self.lookup(name) {
            Some(table) if table.status() == Some(TableStatus::Active) => Ok(table),
            _ => Err(not_found(name)),
        }
    }

    fn read_page(
        &self,
        mut candidates: Vec<(Vec<KeyPart>, Item)>,
        target: &ReadTarget,
        request: &PageRequest<'_>,
    ) -> Result<Page, StoreError> {
        if !request.forward {
            candidates.reverse();
        }
        let start = match request.exclusive_start_key {
            None => 0,
            Some(token) => {
                let token = target
                    .order_key(token)
                    .ok_or_else(|| validation("the provided starting key is invalid"))?;
                candidates
                    .iter()
                    .position(|(key, _)| if request.forward { *key > token } else { *key < token })
                    .unwrap_or(candidates.len())
            }
        };
        let remaining = &candidates[start..];
        let cap = request
            .limit
            .map_or(self.page_size, |limit| (limit as usize).min(self.page_size));
        let evaluated = &remaining[..cap.min(remaining.len())];
        let last_evaluated_key = if remaining.len() > evaluated.len() {
            evaluated.last().map(|(_, item)| project(item, &target.order))
        } else {
            None
        };
        let items = evaluated
            .iter()
            .filter(|(_, item)| request.filter.map_or(true, |f| f.evaluate(item)))
            .map(|(_, item)| match request.projection {
                Some(attributes) => project(item, attributes),
                None => item.clone(),
            })
            .collect();
        Ok(Page {
            items,
            last_evaluated_key,
        })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_condition(condition: Option<&Condition>, current: Option<&Item>) -> Result<(), StoreError> {
    let Some(condition) = condition else {
        return Ok(());
    };
    let empty = Item::new();
    if condition.evaluate(current.unwrap_or(&empty)) {
        Ok(())
    } else {
        Err(StoreError::ConditionalCheckFailed)
    }
}

fn old_values_only(return_values: ReturnValues) -> Result<(), StoreError> {
    match return_values {
        ReturnValues::None | ReturnValues::AllOld => Ok(()),
        other => Err(validation(format!(
            "return values {} not supported for this operation",
            other.as_str()
        ))),
    }
}

#[async_trait]
impl BackingStore for MemoryBackend {
    async fn query(&self, input: QueryInput) -> Result<Page, StoreError> {
        self.begin(Operation::Query)?;
        check_limit(input.limit)?;
        let table = self.table(&input.table_name)?;
        if input.index_name.is_some() && input.consistent_read == Some(true) {
            return Err(validation("consistent reads are not supported on global secondary indexes"));
        }
        let target = table.read_target(input.index_name.as_deref())?;
        target.check_key_condition(&input.key_condition)?;

        let key_filter = input.key_condition.to_condition();
        let candidates = table
            .candidates(&target)
            .into_iter()
            .filter(|(_, item)| key_filter.evaluate(item))
            .collect();
        self.read_page(
            candidates,
            &target,
            &PageRequest {
                limit: input.limit,
                forward: input.scan_index_forward.unwrap_or(true),
                exclusive_start_key: input.exclusive_start_key.as_ref(),
                filter: input.filter.as_ref(),
                projection: input.projection.as_deref(),
            },
        )
    }

    async fn scan(&self, input: ScanInput) -> Result<Page, StoreError> {
        self.begin(Operation::Scan)?;
        check_limit(input.limit)?;
        let table = self.table(&input.table_name)?;
        if input.index_name.is_some() && input.consistent_read == Some(true) {
            return Err(validation("consistent reads are not supported on global secondary indexes"));
        }
        let target = table.read_target(input.index_name.as_deref())?;
        let candidates = table.candidates(&target);
        self.read_page(
            candidates,
            &target,
            &PageRequest {
                limit: input.limit,
                forward: true,
                exclusive_start_key: input.exclusive_start_key.as_ref(),
                filter: input.filter.as_ref(),
                projection: input.projection.as_deref(),
            },
        )
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, StoreError> {
        self.begin(Operation::GetItem)?;
        let table = self.table(&input.table_name)?;
        let key = table.primary_key(&input.key)?;
        let rows = table.rows.read();
        Ok(rows.get(&key).map(|item| match &input.projection {
            Some(attributes) => project(item, attributes),
            None => item.clone(),
        }))
    }

    async fn put_item(&self, input: PutItemInput) -> Result<Option<Item>, StoreError> {
        self.begin(Operation::PutItem)?;
        old_values_only(input.return_values)?;
        let table = self.table(&input.table_name)?;
        let key = table.check_item(&input.item)?;
        let mut rows = table.rows.write();
        check_condition(input.condition.as_ref(), rows.get(&key))?;
        let old = rows.insert(key, input.item);
        Ok(old.filter(|_| input.return_values == ReturnValues::AllOld))
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<Option<Item>, StoreError> {
        self.begin(Operation::UpdateItem)?;
        let table = self.table(&input.table_name)?;
        let key = table.primary_key(&input.key)?;
        if let Some(attribute) = input
            .update
            .attributes()
            .find(|name| table.key_schema().attributes().any(|key| key == *name))
        {
            return Err(validation(format!(
                "cannot update attribute {attribute}: this attribute is part of the key"
            )));
        }

        let mut rows = table.rows.write();
        let old = rows.get(&key).cloned();
        check_condition(input.condition.as_ref(), old.as_ref())?;
        let mut new = old.clone().unwrap_or_else(|| input.key.clone());
        input.update.apply(&mut new);
        table.check_item(&new)?;
        rows.insert(key, new.clone());

        let updated: Vec<String> = input.update.attributes().map(str::to_string).collect();
        Ok(match input.return_values {
            ReturnValues::None => None,
            ReturnValues::AllOld => old,
            ReturnValues::AllNew => Some(new),
            ReturnValues::UpdatedOld => old.map(|item| project(&item, &updated)),
            ReturnValues::UpdatedNew => Some(project(&new, &updated)),
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError> {
        self.begin(Operation::DeleteItem)?;
        old_values_only(input.return_values)?;
        let table = self.table(&input.table_name)?;
        let key = table.primary_key(&input.key)?;
        let mut rows = table.rows.write();
        check_condition(input.condition.as_ref(), rows.get(&key))?;
        let old = rows.remove(&key);
        Ok(old.filter(|_| input.return_values == ReturnValues::AllOld))
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, StoreError> {
        self.begin(Operation::BatchGetItem)?;
        let total: usize = input.request_items.values().map(|r| r.keys.len()).sum();
        self.record_batch(Operation::BatchGetItem, total);
        if total == 0 {
            return Err(validation("batch get requires at least one key"));
        }
        if total > MAX_BATCH_GET {
            return Err(validation(format!(
                "too many items requested for the batch get: {total} > {MAX_BATCH_GET}"
            )));
        }

        let mut output = BatchGetItemOutput::default();
        for (table_name, request) in input.request_items {
            let table = self.table(&table_name)?;
            let mut seen = HashSet::new();
            let mut keys = Vec::with_capacity(request.keys.len());
            for key in &request.keys {
                let key = table.primary_key(key)?;
                if !seen.insert(key.clone()) {
                    return Err(validation("provided list of item keys contains duplicates"));
                }
                keys.push(key);
            }
            let rows = table.rows.read();
            let found = keys
                .iter()
                .filter_map(|key| rows.get(key))
                .map(|item| match &request.projection {
                    Some(attributes) => project(item, attributes),
                    None => item.clone(),
                })
                .collect();
            output.responses.insert(table_name, found);
        }
        Ok(output)
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        self.begin(Operation::BatchWriteItem)?;
        let total: usize = input.request_items.values().map(Vec::len).sum();
        self.record_batch(Operation::BatchWriteItem, total);
        if total == 0 {
            return Err(validation("batch write requires at least one request"));
        }
        if total > MAX_BATCH_WRITE {
            return Err(validation(format!(
                "too many items in the batch write: {total} > {MAX_BATCH_WRITE}"
            )));
        }

        // Validate the whole batch before applying any of it.
        let mut planned = Vec::with_capacity(input.request_items.len());
        for (table_name, requests) in input.request_items {
            let table = self.table(&table_name)?;
            let mut seen = HashSet::new();
            let mut writes = Vec::with_capacity(requests.len());
            for request in requests {
                let (key, item) = match request {
                    WriteRequest::Put { item } => (table.check_item(&item)?, Some(item)),
                    WriteRequest::Delete { key } => (table.primary_key(&key)?, None),
                };
                if !seen.insert(key.clone()) {
                    return Err(validation("provided list of item keys contains duplicates"));
                }
                writes.push((key, item));
            }
            planned.push((table, writes));
        }

        for (table, writes) in planned {
            let mut rows = table.rows.write();
            for (key, item) in writes {
                match item {
                    Some(item) => rows.insert(key, item),
                    None => rows.remove(&key),
                };
            }
        }
        Ok(BatchWriteItemOutput::default())
    }

    async fn create_table(&self, input: CreateTableInput) -> Result<(), StoreError> {
        self.begin(Operation::CreateTable)?;
        let defined = |name: &str| input.attribute_definitions.iter().any(|def| def.name == name);
        let key_attributes = input
            .key_schema
            .attributes()
            .chain(input.global_secondary_indexes.iter().flat_map(|gsi| gsi.key_schema.attributes()));
        for name in key_attributes {
            if !defined(name) {
                return Err(validation(format!("key attribute {name} has no attribute definition")));
            }
        }
        match input.billing {
            None => {
                return Err(validation(
                    "read and write capacity units must be specified when billing mode is provisioned",
                ))
            }
            Some(BillingMode::Provisioned { .. }) => {
                if let Some(gsi) = input
                    .global_secondary_indexes
                    .iter()
                    .find(|gsi| gsi.provisioned_throughput.is_none())
                {
                    return Err(validation(format!(
                        "provisioned throughput missing for index {}",
                        gsi.index_name
                    )));
                }
            }
            Some(BillingMode::PayPerRequest) => {}
        }

        let name = input.table_name.clone();
        let table = Arc::new(MemoryTable::new(input, self.lifecycle_delay));
        match self.tables.entry(name) {
            Entry::Occupied(mut existing) => {
                if existing.get().status().is_some() {
                    return Err(StoreError::ResourceInUse(format!(
                        "table already exists: {}",
                        existing.key()
                    )));
                }
                existing.insert(table);
            }
            Entry::Vacant(slot) => {
                slot.insert(table);
            }
        }
        Ok(())
    }

    async fn update_table(&self, input: UpdateTableInput) -> Result<(), StoreError> {
        self.begin(Operation::UpdateTable)?;
        // Billing is not modelled beyond creation-time validation.
        self.table(&input.table_name).map(|_| ())
    }

    async fn delete_table(&self, input: DeleteTableInput) -> Result<(), StoreError> {
        self.begin(Operation::DeleteTable)?;
        let table = self
            .lookup(&input.table_name)
            .ok_or_else(|| not_found(&input.table_name))?;
        match table.status() {
            None => return Err(not_found(&input.table_name)),
            Some(TableStatus::Active) => {}
            Some(_) => {
                return Err(StoreError::ResourceInUse(format!(
                    "table {} is being created or deleted",
                    input.table_name
                )))
            }
        }
        if self.lifecycle_delay.is_zero() {
            self.tables.remove(&input.table_name);
        } else {
            *table.lifecycle.lock() = Lifecycle::Deleting {
                gone_at: Instant::now() + self.lifecycle_delay,
            };
        }
        Ok(())
    }

    async fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, StoreError> {
        self.begin(Operation::ListTables)?;
        check_limit(input.limit)?;
        let mut names: Vec<String> = self
            .tables
            .iter()
            .filter(|entry| entry.value().status().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        if let Some(start) = &input.exclusive_start_table_name {
            names.retain(|name| name > start);
        }
        let cap = input
            .limit
            .map_or(MAX_LIST_TABLES, |limit| (limit as usize).min(MAX_LIST_TABLES));
        let last_evaluated_table_name = if names.len() > cap {
            names.truncate(cap);
            names.last().cloned()
        } else {
            None
        };
        Ok(ListTablesOutput {
            table_names: names,
            last_evaluated_table_name,
        })
    }

    async fn describe_table(&self, table_name: &str) -> Result<Option<TableStatus>, StoreError> {
        self.begin(Operation::DescribeTable)?;
        Ok(self.lookup(table_name).and_then(|table| table.status()))
    }
}
