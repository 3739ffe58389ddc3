//! Key-value contract, exercised through the factories on the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use widekv_client::{
    BillingMode, ClientSettings, ConnectionRegistry, ConnectionSettings, ManualClock,
    MemoryBackend, MemoryConnector, Operation, StoreError, DEFAULT_ALIAS,
};
use widekv_keyvalue::{
    provision, ExpirableKeyValueStore, JsonCodec, KeyValueExpirableFactory, KeyValueFactory,
    KeyValueSettings, KeyValueStore, MsgPackCodec,
};

const T0: i64 = 1_700_000_000;

struct Harness {
    backend: Arc<MemoryBackend>,
    clock: Arc<ManualClock>,
    plain: KeyValueFactory<String>,
    expiring: KeyValueExpirableFactory<String>,
}

async fn harness() -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let settings = ClientSettings::new().with_connection(
        DEFAULT_ALIAS,
        ConnectionSettings {
            aws_billing: Some(BillingMode::PayPerRequest),
            ..ConnectionSettings::default()
        },
    );
    let registry = ConnectionRegistry::new(
        settings,
        Arc::new(MemoryConnector::shared(Arc::clone(&backend))),
    );
    let kv = KeyValueSettings::default();
    let connection = registry.default_database().await.unwrap();
    provision(&connection, &kv).await.unwrap();

    let clock = Arc::new(ManualClock::new(T0));
    let plain = KeyValueFactory::<String>::from_settings(&registry, &kv, Arc::new(JsonCodec::new()))
        .await
        .unwrap();
    let expiring = KeyValueExpirableFactory::<String>::new(
        connection,
        Arc::new(JsonCodec::new()),
        clock.clone(),
        &kv.expirable_table,
        &kv.expire_index,
    );
    Harness {
        backend,
        clock,
        plain,
        expiring,
    }
}

fn s(text: &str) -> String {
    text.to_string()
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let h = harness().await;
    let plain = h.plain.get("users");
    let expiring = h.expiring.get("users");

    plain.set("alice", &s("admin")).await.unwrap();
    expiring.set("alice", &s("session")).await.unwrap();

    assert_eq!(plain.get("alice").await.unwrap(), Some(s("admin")));
    assert_eq!(expiring.get("alice").await.unwrap(), Some(s("session")));
}

#[tokio::test]
async fn never_written_key_reads_as_default() {
    let h = harness().await;
    let plain = h.plain.get("users");
    let expiring = h.expiring.get("users");

    assert_eq!(plain.get_or("ghost", s("fallback")).await.unwrap(), "fallback");
    assert!(!plain.has("ghost").await.unwrap());
    assert_eq!(expiring.get_or("ghost", s("fallback")).await.unwrap(), "fallback");
    assert!(!expiring.has("ghost").await.unwrap());
}

#[tokio::test]
async fn set_if_not_exists_only_creates_once() {
    let h = harness().await;
    for store in [
        h.plain.get("locks") as Arc<dyn KeyValueStore<String>>,
        h.expiring.get("locks") as Arc<dyn KeyValueStore<String>>,
    ] {
        assert!(store.set_if_not_exists("job", &s("v1")).await.unwrap());
        assert!(!store.set_if_not_exists("job", &s("v2")).await.unwrap());
        assert_eq!(store.get("job").await.unwrap(), Some(s("v1")));
    }
}

#[tokio::test]
async fn get_multiple_splits_into_batch_gets() {
    let h = harness().await;
    let store = h.plain.get("bulk");
    let data: HashMap<String, String> = (0..120).map(|i| (format!("k{i:03}"), format!("v{i}"))).collect();
    store.set_multiple(&data).await.unwrap();

    let mut keys: Vec<String> = (0..130).map(|i| format!("k{i:03}")).collect();
    keys.sort();
    h.backend.reset_stats();
    let found = store.get_multiple(&keys).await.unwrap();

    assert_eq!(found, data);
    assert_eq!(h.backend.request_count(Operation::BatchGetItem), 130_usize.div_ceil(50));
    assert_eq!(h.backend.largest_batch(Operation::BatchGetItem), 50);
}

#[tokio::test]
async fn expired_value_reads_as_absent() {
    let h = harness().await;
    let store = h.expiring.get("sessions");
    store.set_with_expire("token", &s("abc"), 1).await.unwrap();
    assert_eq!(store.get("token").await.unwrap(), Some(s("abc")));

    h.clock.advance(2);
    assert_eq!(store.get_or("token", s("none")).await.unwrap(), "none");
    assert!(!store.get_all().await.unwrap().contains_key("token"));
}

#[tokio::test]
async fn delete_all_empties_the_collection() {
    let h = harness().await;
    let store = h.plain.get("letters");
    let other = h.plain.get("digits");
    for key in ["a", "b", "c"] {
        store.set(key, &s(key)).await.unwrap();
    }
    other.set("1", &s("one")).await.unwrap();

    store.delete_all().await.unwrap();

    assert!(store.get_all().await.unwrap().is_empty());
    for key in ["a", "b", "c"] {
        assert!(!store.has(key).await.unwrap());
    }
    assert!(other.has("1").await.unwrap());
}

#[tokio::test]
async fn rename_moves_the_value() {
    let h = harness().await;
    let store = h.plain.get("files");
    store.set("draft", &s("contents")).await.unwrap();
    store.rename("draft", "final").await.unwrap();

    assert_eq!(store.get("final").await.unwrap(), Some(s("contents")));
    assert_eq!(store.get_or("draft", s("gone")).await.unwrap(), "gone");

    // missing source leaves the destination alone
    store.rename("draft", "final").await.unwrap();
    assert_eq!(store.get("final").await.unwrap(), Some(s("contents")));
}

#[tokio::test]
async fn backend_outage_reads_as_empty() {
    let h = harness().await;
    let store = h.plain.get("flaky");
    store.set("k", &s("v")).await.unwrap();

    h.backend
        .fail_next(Operation::Query, StoreError::Throughput("rate exceeded".into()));
    assert!(store.get_all().await.unwrap().is_empty());
    h.backend
        .fail_next(Operation::UpdateItem, StoreError::Transport("reset".into()));
    assert!(!store.set_if_not_exists("other", &s("v")).await.unwrap());

    assert_eq!(store.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn msgpack_values_round_trip() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Cart {
        items: Vec<String>,
        total_cents: u64,
    }

    let h = harness().await;
    let factory = KeyValueFactory::<Cart>::new(
        Arc::new(widekv_client::Connection::new(
            DEFAULT_ALIAS,
            h.backend.clone(),
            ConnectionSettings::default(),
        )),
        Arc::new(MsgPackCodec::new()),
        "key_value",
    );
    let carts = factory.get("carts");
    let cart = Cart {
        items: vec![s("book")],
        total_cents: 1299,
    };
    carts.set("u1", &cart).await.unwrap();
    assert_eq!(carts.get("u1").await.unwrap(), Some(cart));
}
