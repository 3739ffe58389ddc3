//! [`BackingStore`] adapter over `aws-sdk-dynamodb`.
//!
//! Typed expressions are rendered to expression strings through one
//! [`ExpressionContext`] per request, so every attribute name travels as a
//! `#n` placeholder and every value as a `:v` placeholder.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as sdk;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use crate::backend::BackingStore;
use crate::config::ConnectionSettings;
use crate::error::StoreError;
use crate::expression::{render_projection, ExpressionContext};
use crate::requests::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput,
    BillingMode, CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput,
    IndexProjection, KeySchema, KeysAndAttributes, ListTablesInput, ListTablesOutput, Page,
    ProvisionedThroughput, PutItemInput, QueryInput, ReturnValues, ScalarAttributeType, ScanInput,
    TableStatus, UpdateItemInput, UpdateTableInput, WriteRequest,
};
use crate::types::{AttributeValue, Item};

type SdkItem = HashMap<String, sdk::AttributeValue>;

/// Backing store talking to DynamoDB (or a compatible endpoint).
#[derive(Debug, Clone)]
pub struct AwsBackend {
    client: Client,
}

impl AwsBackend {
    /// Wraps an already configured SDK client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds an SDK client from connection settings.
    ///
    /// Static credentials are used when both key and secret are set;
    /// otherwise the default provider chain applies.
    pub async fn from_settings(settings: &ConnectionSettings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()));
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (&settings.aws_access_key, &settings.aws_secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "widekv-settings",
            ));
        }
        let config = loader.load().await;
        debug!(
            region = %settings.region,
            endpoint = ?settings.endpoint,
            api_version = %settings.version,
            "dynamodb client configured"
        );
        Self::new(Client::new(&config))
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_sdk(value: AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::S(s) => sdk::AttributeValue::S(s),
        AttributeValue::N(n) => sdk::AttributeValue::N(n),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b)),
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(b),
        AttributeValue::Null(n) => sdk::AttributeValue::Null(n),
        AttributeValue::L(list) => sdk::AttributeValue::L(list.into_iter().map(to_sdk).collect()),
        AttributeValue::M(map) => sdk::AttributeValue::M(to_sdk_item(map)),
        AttributeValue::Ss(set) => sdk::AttributeValue::Ss(set),
        AttributeValue::Ns(set) => sdk::AttributeValue::Ns(set),
        AttributeValue::Bs(set) => sdk::AttributeValue::Bs(set.into_iter().map(Blob::new).collect()),
    }
}

fn from_sdk(value: sdk::AttributeValue) -> AttributeValue {
    match value {
        sdk::AttributeValue::S(s) => AttributeValue::S(s),
        sdk::AttributeValue::N(n) => AttributeValue::N(n),
        sdk::AttributeValue::B(b) => AttributeValue::B(b.into_inner()),
        sdk::AttributeValue::Bool(b) => AttributeValue::Bool(b),
        sdk::AttributeValue::L(list) => AttributeValue::L(list.into_iter().map(from_sdk).collect()),
        sdk::AttributeValue::M(map) => AttributeValue::M(from_sdk_item(map)),
        sdk::AttributeValue::Ss(set) => AttributeValue::Ss(set),
        sdk::AttributeValue::Ns(set) => AttributeValue::Ns(set),
        sdk::AttributeValue::Bs(set) => {
            AttributeValue::Bs(set.into_iter().map(Blob::into_inner).collect())
        }
        // `Null` plus any variant added by a newer SDK.
        _ => AttributeValue::Null(true),
    }
}

fn to_sdk_item(item: Item) -> SdkItem {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

fn from_sdk_item(item: SdkItem) -> Item {
    item.into_iter().map(|(k, v)| (k, from_sdk(v))).collect()
}

fn to_sdk_values(values: Option<HashMap<String, AttributeValue>>) -> Option<SdkItem> {
    values.map(to_sdk_item)
}

fn return_value(values: ReturnValues) -> sdk::ReturnValue {
    match values {
        ReturnValues::None => sdk::ReturnValue::None,
        ReturnValues::AllOld => sdk::ReturnValue::AllOld,
        ReturnValues::AllNew => sdk::ReturnValue::AllNew,
        ReturnValues::UpdatedOld => sdk::ReturnValue::UpdatedOld,
        ReturnValues::UpdatedNew => sdk::ReturnValue::UpdatedNew,
    }
}

fn limit(value: Option<u32>) -> Option<i32> {
    value.map(|l| i32::try_from(l).unwrap_or(i32::MAX))
}

/// Resolves a rendered projection (`#n0, #n1`) back to attribute names.
fn resolve_projection(
    projection: Option<&str>,
    names: Option<&HashMap<String, String>>,
) -> Option<Vec<String>> {
    let projection = projection?;
    Some(
        projection
            .split(',')
            .map(str::trim)
            .map(|token| {
                names
                    .and_then(|names| names.get(token))
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .collect(),
    )
}

fn key_schema_elements(schema: &KeySchema) -> Result<Vec<sdk::KeySchemaElement>, StoreError> {
    let mut elements = vec![sdk::KeySchemaElement::builder()
        .attribute_name(&schema.partition_key)
        .key_type(sdk::KeyType::Hash)
        .build()
        .map_err(build_error)?];
    if let Some(sort) = &schema.sort_key {
        elements.push(
            sdk::KeySchemaElement::builder()
                .attribute_name(sort)
                .key_type(sdk::KeyType::Range)
                .build()
                .map_err(build_error)?,
        );
    }
    Ok(elements)
}

fn throughput(value: ProvisionedThroughput) -> Result<sdk::ProvisionedThroughput, StoreError> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(value.read_capacity_units)
        .write_capacity_units(value.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn billing_mode(billing: BillingMode) -> sdk::BillingMode {
    match billing {
        BillingMode::PayPerRequest => sdk::BillingMode::PayPerRequest,
        BillingMode::Provisioned { .. } => sdk::BillingMode::Provisioned,
    }
}

fn scalar_type(ty: ScalarAttributeType) -> sdk::ScalarAttributeType {
    match ty {
        ScalarAttributeType::S => sdk::ScalarAttributeType::S,
        ScalarAttributeType::N => sdk::ScalarAttributeType::N,
        ScalarAttributeType::B => sdk::ScalarAttributeType::B,
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn build_error(err: BuildError) -> StoreError {
    StoreError::Validation(err.to_string())
}

fn map_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some("ResourceNotFoundException") => StoreError::ResourceNotFound(message),
        Some("ResourceInUseException") => StoreError::ResourceInUse(message),
        Some("ConditionalCheckFailedException") => StoreError::ConditionalCheckFailed,
        Some("ValidationException") => StoreError::Validation(message),
        Some(
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "RequestLimitExceeded",
        ) => StoreError::Throughput(message),
        _ => StoreError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

// ---------------------------------------------------------------------------
// BackingStore
// ---------------------------------------------------------------------------

#[async_trait]
impl BackingStore for AwsBackend {
    async fn query(&self, input: QueryInput) -> Result<Page, StoreError> {
        let mut ctx = ExpressionContext::new();
        let key_condition = input.key_condition.render(&mut ctx);
        let filter = input.filter.as_ref().map(|f| f.render(&mut ctx));
        let projection = input
            .projection
            .as_deref()
            .map(|attributes| render_projection(attributes, &mut ctx));
        let (names, values) = ctx.into_parts();

        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .key_condition_expression(key_condition)
            .set_filter_expression(filter)
            .set_projection_expression(projection)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_values(values))
            .set_limit(limit(input.limit))
            .set_consistent_read(input.consistent_read)
            .set_scan_index_forward(input.scan_index_forward)
            .set_exclusive_start_key(input.exclusive_start_key.map(to_sdk_item))
            .send()
            .await
            .map_err(map_error)?;

        Ok(Page {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_sdk_item)
                .collect(),
            last_evaluated_key: output.last_evaluated_key.map(from_sdk_item),
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<Page, StoreError> {
        let mut ctx = ExpressionContext::new();
        let filter = input.filter.as_ref().map(|f| f.render(&mut ctx));
        let projection = input
            .projection
            .as_deref()
            .map(|attributes| render_projection(attributes, &mut ctx));
        let (names, values) = ctx.into_parts();

        let output = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_filter_expression(filter)
            .set_projection_expression(projection)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_values(values))
            .set_limit(limit(input.limit))
            .set_consistent_read(input.consistent_read)
            .set_exclusive_start_key(input.exclusive_start_key.map(to_sdk_item))
            .send()
            .await
            .map_err(map_error)?;

        Ok(Page {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_sdk_item)
                .collect(),
            last_evaluated_key: output.last_evaluated_key.map(from_sdk_item),
        })
    }

    async fn get_item(&self, input: GetItemInput) -> Result<Option<Item>, StoreError> {
        let mut ctx = ExpressionContext::new();
        let projection = input
            .projection
            .as_deref()
            .map(|attributes| render_projection(attributes, &mut ctx));
        let (names, _) = ctx.into_parts();

        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_projection_expression(projection)
            .set_expression_attribute_names(names)
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(map_error)?;
        Ok(output.item.map(from_sdk_item))
    }

    async fn put_item(&self, input: PutItemInput) -> Result<Option<Item>, StoreError> {
        let mut ctx = ExpressionContext::new();
        let condition = input.condition.as_ref().map(|c| c.render(&mut ctx));
        let (names, values) = ctx.into_parts();

        let output = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(to_sdk_item(input.item)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_values(values))
            .return_values(return_value(input.return_values))
            .send()
            .await
            .map_err(map_error)?;
        Ok(output.attributes.map(from_sdk_item))
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<Option<Item>, StoreError> {
        let mut ctx = ExpressionContext::new();
        let update = (!input.update.is_empty()).then(|| input.update.render(&mut ctx));
        let condition = input.condition.as_ref().map(|c| c.render(&mut ctx));
        let (names, values) = ctx.into_parts();

        let output = self
            .client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_update_expression(update)
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_values(values))
            .return_values(return_value(input.return_values))
            .send()
            .await
            .map_err(map_error)?;
        Ok(output.attributes.map(from_sdk_item))
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<Option<Item>, StoreError> {
        let mut ctx = ExpressionContext::new();
        let condition = input.condition.as_ref().map(|c| c.render(&mut ctx));
        let (names, values) = ctx.into_parts();

        let output = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_values(values))
            .return_values(return_value(input.return_values))
            .send()
            .await
            .map_err(map_error)?;
        Ok(output.attributes.map(from_sdk_item))
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, StoreError> {
        let mut request_items = HashMap::with_capacity(input.request_items.len());
        for (table, request) in input.request_items {
            let mut ctx = ExpressionContext::new();
            let projection = request
                .projection
                .as_deref()
                .map(|attributes| render_projection(attributes, &mut ctx));
            let (names, _) = ctx.into_parts();
            let keys_and_attributes = sdk::KeysAndAttributes::builder()
                .set_keys(Some(request.keys.into_iter().map(to_sdk_item).collect()))
                .set_projection_expression(projection)
                .set_expression_attribute_names(names)
                .set_consistent_read(request.consistent_read)
                .build()
                .map_err(build_error)?;
            request_items.insert(table, keys_and_attributes);
        }

        let output = self
            .client
            .batch_get_item()
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(map_error)?;

        let responses = output
            .responses
            .unwrap_or_default()
            .into_iter()
            .map(|(table, items)| (table, items.into_iter().map(from_sdk_item).collect()))
            .collect();
        let unprocessed_keys = output
            .unprocessed_keys
            .unwrap_or_default()
            .into_iter()
            .map(|(table, pending)| {
                let projection = resolve_projection(
                    pending.projection_expression.as_deref(),
                    pending.expression_attribute_names.as_ref(),
                );
                (
                    table,
                    KeysAndAttributes {
                        keys: pending.keys.into_iter().map(from_sdk_item).collect(),
                        projection,
                        consistent_read: pending.consistent_read,
                    },
                )
            })
            .collect();
        Ok(BatchGetItemOutput {
            responses,
            unprocessed_keys,
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        let mut request_items = HashMap::with_capacity(input.request_items.len());
        for (table, requests) in input.request_items {
            let mut writes = Vec::with_capacity(requests.len());
            for request in requests {
                let write = match request {
                    WriteRequest::Put { item } => sdk::WriteRequest::builder()
                        .put_request(
                            sdk::PutRequest::builder()
                                .set_item(Some(to_sdk_item(item)))
                                .build()
                                .map_err(build_error)?,
                        )
                        .build(),
                    WriteRequest::Delete { key } => sdk::WriteRequest::builder()
                        .delete_request(
                            sdk::DeleteRequest::builder()
                                .set_key(Some(to_sdk_item(key)))
                                .build()
                                .map_err(build_error)?,
                        )
                        .build(),
                };
                writes.push(write);
            }
            request_items.insert(table, writes);
        }

        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(map_error)?;

        let unprocessed_items = output
            .unprocessed_items
            .unwrap_or_default()
            .into_iter()
            .map(|(table, writes)| {
                let writes = writes
                    .into_iter()
                    .filter_map(|write| match (write.put_request, write.delete_request) {
                        (Some(put), _) => Some(WriteRequest::Put {
                            item: from_sdk_item(put.item),
                        }),
                        (None, Some(delete)) => Some(WriteRequest::Delete {
                            key: from_sdk_item(delete.key),
                        }),
                        (None, None) => None,
                    })
                    .collect();
                (table, writes)
            })
            .collect();
        Ok(BatchWriteItemOutput { unprocessed_items })
    }

    async fn create_table(&self, input: CreateTableInput) -> Result<(), StoreError> {
        let attribute_definitions = input
            .attribute_definitions
            .iter()
            .map(|def| {
                sdk::AttributeDefinition::builder()
                    .attribute_name(&def.name)
                    .attribute_type(scalar_type(def.attribute_type))
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut indexes = Vec::with_capacity(input.global_secondary_indexes.len());
        for gsi in &input.global_secondary_indexes {
            let projection = match &gsi.projection {
                IndexProjection::All => sdk::Projection::builder()
                    .projection_type(sdk::ProjectionType::All)
                    .build(),
                IndexProjection::KeysOnly => sdk::Projection::builder()
                    .projection_type(sdk::ProjectionType::KeysOnly)
                    .build(),
                IndexProjection::Include(attributes) => sdk::Projection::builder()
                    .projection_type(sdk::ProjectionType::Include)
                    .set_non_key_attributes(Some(attributes.clone()))
                    .build(),
            };
            indexes.push(
                sdk::GlobalSecondaryIndex::builder()
                    .index_name(&gsi.index_name)
                    .set_key_schema(Some(key_schema_elements(&gsi.key_schema)?))
                    .projection(projection)
                    .set_provisioned_throughput(
                        gsi.provisioned_throughput.map(throughput).transpose()?,
                    )
                    .build()
                    .map_err(build_error)?,
            );
        }

        self.client
            .create_table()
            .table_name(input.table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema_elements(&input.key_schema)?))
            .set_global_secondary_indexes((!indexes.is_empty()).then_some(indexes))
            .set_billing_mode(input.billing.map(billing_mode))
            .set_provisioned_throughput(
                input
                    .billing
                    .and_then(BillingMode::throughput)
                    .map(throughput)
                    .transpose()?,
            )
            .send()
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn update_table(&self, input: UpdateTableInput) -> Result<(), StoreError> {
        self.client
            .update_table()
            .table_name(input.table_name)
            .set_billing_mode(input.billing.map(billing_mode))
            .set_provisioned_throughput(
                input
                    .billing
                    .and_then(BillingMode::throughput)
                    .map(throughput)
                    .transpose()?,
            )
            .send()
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn delete_table(&self, input: DeleteTableInput) -> Result<(), StoreError> {
        self.client
            .delete_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, StoreError> {
        let output = self
            .client
            .list_tables()
            .set_exclusive_start_table_name(input.exclusive_start_table_name)
            .set_limit(limit(input.limit))
            .send()
            .await
            .map_err(map_error)?;
        Ok(ListTablesOutput {
            table_names: output.table_names.unwrap_or_default(),
            last_evaluated_table_name: output.last_evaluated_table_name,
        })
    }

    async fn describe_table(&self, table_name: &str) -> Result<Option<TableStatus>, StoreError> {
        let output = match self.client.describe_table().table_name(table_name).send().await {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                return Ok(None)
            }
            Err(err) => return Err(map_error(err)),
        };
        Ok(output
            .table
            .and_then(|table| table.table_status)
            .map(|status| table_status(&status)))
    }
}

/// Only `ACTIVE` counts as ready; unknown future statuses do not.
fn table_status(status: &sdk::TableStatus) -> TableStatus {
    match status {
        sdk::TableStatus::Active => TableStatus::Active,
        sdk::TableStatus::Creating => TableStatus::Creating,
        sdk::TableStatus::Updating => TableStatus::Updating,
        sdk::TableStatus::Deleting => TableStatus::Deleting,
        _ => TableStatus::Unavailable,
    }
}
