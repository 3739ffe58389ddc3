//! Strongly-typed request and response shapes, one per backing-store operation.
//!
//! Every optional wire parameter is an `Option` (or an empty collection) so
//! that "unset" stays distinguishable from an explicit value. In particular
//! `consistent_read: None` lets the [`Connection`](crate::Connection) apply
//! its per-table policy.

use std::collections::HashMap;

use serde::Deserialize;

use crate::expression::{Condition, KeyCondition, Update};
use crate::types::Item;

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Parameters of a `Query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInput {
    pub table_name: String,
    /// Query a secondary index instead of the base table.
    pub index_name: Option<String>,
    pub key_condition: KeyCondition,
    /// Post-read filter; applied after `limit` counts evaluated items.
    pub filter: Option<Condition>,
    /// Attributes to return. `None` returns whole items.
    pub projection: Option<Vec<String>>,
    /// Maximum number of items evaluated for one page.
    pub limit: Option<u32>,
    pub consistent_read: Option<bool>,
    /// Ascending sort-key order when `None` or `Some(true)`.
    pub scan_index_forward: Option<bool>,
    pub exclusive_start_key: Option<Item>,
}

impl QueryInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>, key_condition: KeyCondition) -> Self {
        Self {
            table_name: table_name.into(),
            index_name: None,
            key_condition,
            filter: None,
            projection: None,
            limit: None,
            consistent_read: None,
            scan_index_forward: None,
            exclusive_start_key: None,
        }
    }

    #[must_use]
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn projection<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Parameters of a `Scan` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanInput {
    pub table_name: String,
    pub index_name: Option<String>,
    pub filter: Option<Condition>,
    pub projection: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub consistent_read: Option<bool>,
    pub exclusive_start_key: Option<Item>,
}

impl ScanInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// One page of a `Query` or `Scan`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    /// Continuation token; `None` once the last page has been returned.
    pub last_evaluated_key: Option<Item>,
}

/// Parameters of a `GetItem` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GetItemInput {
    pub table_name: String,
    pub key: Item,
    pub projection: Option<Vec<String>>,
    pub consistent_read: Option<bool>,
}

impl GetItemInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Item) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            projection: None,
            consistent_read: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Single-item writes
// ---------------------------------------------------------------------------

/// Which attributes a write returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnValues {
    #[default]
    None,
    AllOld,
    AllNew,
    UpdatedOld,
    UpdatedNew,
}

impl ReturnValues {
    /// Wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

/// Parameters of a `PutItem` call. Only `None` and `AllOld` are legal return values.
#[derive(Debug, Clone, PartialEq)]
pub struct PutItemInput {
    pub table_name: String,
    pub item: Item,
    pub condition: Option<Condition>,
    pub return_values: ReturnValues,
}

impl PutItemInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>, item: Item) -> Self {
        Self {
            table_name: table_name.into(),
            item,
            condition: None,
            return_values: ReturnValues::None,
        }
    }
}

/// Parameters of an `UpdateItem` call. Creates the item when it is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItemInput {
    pub table_name: String,
    pub key: Item,
    pub update: Update,
    pub condition: Option<Condition>,
    pub return_values: ReturnValues,
}

impl UpdateItemInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Item, update: Update) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            update,
            condition: None,
            return_values: ReturnValues::None,
        }
    }
}

/// Parameters of a `DeleteItem` call. Only `None` and `AllOld` are legal return values.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteItemInput {
    pub table_name: String,
    pub key: Item,
    pub condition: Option<Condition>,
    pub return_values: ReturnValues,
}

impl DeleteItemInput {
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Item) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            condition: None,
            return_values: ReturnValues::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// Keys requested from one table in a `BatchGetItem` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeysAndAttributes {
    pub keys: Vec<Item>,
    pub projection: Option<Vec<String>>,
    pub consistent_read: Option<bool>,
}

/// Parameters of a `BatchGetItem` call, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetItemInput {
    pub request_items: HashMap<String, KeysAndAttributes>,
}

/// Result of a `BatchGetItem` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetItemOutput {
    pub responses: HashMap<String, Vec<Item>>,
    /// Keys the store did not get to; callers may resubmit them.
    pub unprocessed_keys: HashMap<String, KeysAndAttributes>,
}

/// One write inside a `BatchWriteItem` call.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put { item: Item },
    Delete { key: Item },
}

/// Parameters of a `BatchWriteItem` call, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteItemInput {
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

/// Result of a `BatchWriteItem` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteItemOutput {
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}

// ---------------------------------------------------------------------------
// Table administration
// ---------------------------------------------------------------------------

/// Billing configuration of a table.
///
/// Deserializes from `{"mode": "pay_per_request"}` or
/// `{"mode": "provisioned", "read_capacity_units": 5, "write_capacity_units": 5}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillingMode {
    PayPerRequest,
    Provisioned {
        read_capacity_units: i64,
        write_capacity_units: i64,
    },
}

impl BillingMode {
    /// Throughput to apply to provisioned tables and their indexes.
    #[must_use]
    pub fn throughput(self) -> Option<ProvisionedThroughput> {
        match self {
            Self::PayPerRequest => None,
            Self::Provisioned {
                read_capacity_units,
                write_capacity_units,
            } => Some(ProvisionedThroughput {
                read_capacity_units,
                write_capacity_units,
            }),
        }
    }
}

/// Read/write capacity of a provisioned table or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarAttributeType {
    S,
    N,
    B,
}

impl ScalarAttributeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        }
    }
}

/// Declared type of a key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: String,
    pub attribute_type: ScalarAttributeType,
}

impl AttributeDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, attribute_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Primary key layout of a table or index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    #[must_use]
    pub fn new(partition_key: impl Into<String>, sort_key: Option<&str>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.map(str::to_string),
        }
    }

    /// Key attribute names, partition key first.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }
}

/// Attributes copied into a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexProjection {
    All,
    KeysOnly,
    Include(Vec<String>),
}

/// Global secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSecondaryIndex {
    pub index_name: String,
    pub key_schema: KeySchema,
    pub projection: IndexProjection,
    /// Required for provisioned tables; filled from the table billing when unset.
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// Parameters of a `CreateTable` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableInput {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: KeySchema,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Filled from connection settings by the facade when unset.
    pub billing: Option<BillingMode>,
}

/// Parameters of an `UpdateTable` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTableInput {
    pub table_name: String,
    pub billing: Option<BillingMode>,
}

/// Parameters of a `DeleteTable` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTableInput {
    pub table_name: String,
}

/// Parameters of a `ListTables` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTablesInput {
    pub exclusive_start_table_name: Option<String>,
    pub limit: Option<u32>,
}

/// One page of table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTablesOutput {
    pub table_names: Vec<String>,
    pub last_evaluated_table_name: Option<String>,
}

/// Lifecycle state of a table as reported by `DescribeTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Updating,
    Deleting,
    Active,
    /// Exists but cannot serve requests: archiving, archived, or with
    /// inaccessible encryption credentials.
    Unavailable,
}
