//! Paginated reads return every matching item exactly once, whatever the page size.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use widekv_client::requests::{
    AttributeDefinition, CreateTableInput, KeySchema, PutItemInput, QueryInput,
    ScalarAttributeType, ScanInput,
};
use widekv_client::{
    AttributeValue, BillingMode, Connection, ConnectionSettings, Item, KeyCondition, MemoryBackend,
};

fn table() -> CreateTableInput {
    CreateTableInput {
        table_name: "items".to_string(),
        attribute_definitions: vec![
            AttributeDefinition::new("collection", ScalarAttributeType::S),
            AttributeDefinition::new("name", ScalarAttributeType::S),
        ],
        key_schema: KeySchema::new("collection", Some("name")),
        global_secondary_indexes: Vec::new(),
        billing: Some(BillingMode::PayPerRequest),
    }
}

fn item(collection: &str, name: &str) -> Item {
    Item::from([
        ("collection".to_string(), AttributeValue::s(collection)),
        ("name".to_string(), AttributeValue::s(name)),
    ])
}

fn names(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|i| i.get("name").and_then(AttributeValue::as_s).map(str::to_string))
        .collect()
}

async fn run(page_size: usize, target: usize, noise: usize) -> (Vec<String>, usize) {
    let backend = Arc::new(MemoryBackend::new().with_page_size(page_size));
    let conn = Connection::new("default", backend, ConnectionSettings::default());
    conn.create_table(table()).await.unwrap();
    for i in 0..target {
        assert!(conn.put_item(PutItemInput::new("items", item("target", &format!("{i:05}")))).await);
    }
    for i in 0..noise {
        assert!(conn.put_item(PutItemInput::new("items", item("noise", &format!("{i:05}")))).await);
    }
    let queried = conn
        .query(QueryInput::new(
            "items",
            KeyCondition::partition("collection", AttributeValue::s("target")),
        ))
        .await;
    let scanned = conn.scan(ScanInput::new("items")).await;
    (names(&queried), scanned.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn query_and_scan_see_each_item_once(
        page_size in 1_usize..20,
        target in 0_usize..60,
        noise in 0_usize..20,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (queried, scanned) = runtime.block_on(run(page_size, target, noise));

        prop_assert_eq!(queried.len(), target);
        let unique: HashSet<_> = queried.iter().collect();
        prop_assert_eq!(unique.len(), target);
        let mut sorted = queried.clone();
        sorted.sort();
        prop_assert_eq!(sorted, queried);
        prop_assert_eq!(scanned, target + noise);
    }
}
