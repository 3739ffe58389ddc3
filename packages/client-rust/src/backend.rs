//! The backing-store seam.
//!
//! [`BackingStore`] is the one trait every store adapter implements. It is a
//! thin, strictly-typed mirror of the wire operations: one call, one page, no
//! retries and no policy. Pagination, consistency defaults, billing defaults
//! and error absorption are layered on top by [`Connection`](crate::Connection).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::requests::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput, ListTablesInput,
    ListTablesOutput, Page, PutItemInput, QueryInput, ScanInput, TableStatus, UpdateItemInput,
    UpdateTableInput,
};
use crate::types::Item;

/// Raw request/response interface of a wide-column store.
///
/// Implementations must be `Send + Sync`; a single instance is shared by
/// every storage handle built on the same connection.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Returns one page of a key-conditioned read.
    async fn query(&self, input: QueryInput) -> Result<Page, StoreError>;

    /// Returns one page of a full-table read.
    async fn scan(&self, input: ScanInput) -> Result<Page, StoreError>;

    /// Point lookup by primary key.
    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, StoreError>;

    /// Writes a whole item. Returns the previous item when
    /// [`ReturnValues::AllOld`](crate::ReturnValues::AllOld) was requested.
    async fn put_item(&self, input: PutItemInput) -> Result<Option<Item>, StoreError>;

    /// Applies an update expression, creating the item when it is missing.
    async fn update_item(&self, input: UpdateItemInput) -> Result<Option<Item>, StoreError>;

    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError>;

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, StoreError>;

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError>;

    /// Starts creating a table. The table may not be usable until
    /// [`describe_table`](Self::describe_table) reports it active.
    async fn create_table(&self, input: CreateTableInput) -> Result<(), StoreError>;

    async fn update_table(&self, input: UpdateTableInput) -> Result<(), StoreError>;

    /// Starts deleting a table.
    async fn delete_table(&self, input: DeleteTableInput) -> Result<(), StoreError>;

    async fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, StoreError>;

    /// Reports the lifecycle state of a table, `None` when it does not exist.
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableStatus>, StoreError>;
}
