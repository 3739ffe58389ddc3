//! Key-value smoke run.
//!
//! Provisions the key-value tables and drives one collection of each kind
//! through every operation, failing on the first mismatch.
//!
//! Usage:
//!   kv-smoke --items 120
//!   kv-smoke --backend aws --settings client.json --collection smoke

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use widekv_client::{
    BillingMode, ClientSettings, ConnectionRegistry, ConnectionSettings, Connector,
    MemoryConnector, DEFAULT_ALIAS,
};
use widekv_keyvalue::{
    provision, ExpirableKeyValueStore, JsonCodec, KeyValueExpirableFactory, KeyValueFactory,
    KeyValueSettings, KeyValueStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Aws,
}

/// Exercise key-value storage end to end.
#[derive(Parser, Debug)]
#[command(name = "kv-smoke", about = "End-to-end smoke run of widekv key-value storage")]
struct Args {
    /// Backing store to run against.
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Client settings JSON (alias -> connection). Defaults to one pay-per-request alias.
    #[arg(long, env = "WIDEKV_SETTINGS")]
    settings: Option<String>,

    /// Key-value settings JSON (connection alias, table names).
    #[arg(long, env = "WIDEKV_KEYVALUE_SETTINGS")]
    keyvalue_settings: Option<String>,

    /// Collection to write into. Cleared at the end of the run.
    #[arg(long, default_value = "kv-smoke")]
    collection: String,

    /// Number of items written in bulk.
    #[arg(long, default_value_t = 120)]
    items: usize,

    /// TTL of expiring items, in seconds.
    #[arg(long, default_value_t = 300)]
    ttl: i64,
}

fn read_json(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn client_settings(args: &Args) -> Result<ClientSettings> {
    match &args.settings {
        Some(path) => Ok(ClientSettings::from_json(&read_json(path)?)?),
        None => Ok(ClientSettings::new().with_connection(
            DEFAULT_ALIAS,
            ConnectionSettings {
                aws_billing: Some(BillingMode::PayPerRequest),
                ..ConnectionSettings::default()
            },
        )),
    }
}

fn connector(backend: Backend) -> Result<Arc<dyn Connector>> {
    match backend {
        Backend::Memory => Ok(Arc::new(MemoryConnector::new())),
        #[cfg(feature = "aws")]
        Backend::Aws => Ok(Arc::new(widekv_client::AwsConnector)),
        #[cfg(not(feature = "aws"))]
        Backend::Aws => anyhow::bail!("kv-smoke was built without the `aws` feature"),
    }
}

async fn run_plain(factory: &KeyValueFactory<String>, collection: &str, items: usize) -> Result<()> {
    let store = factory.get(collection);
    store.delete_all().await?;

    let data: HashMap<String, String> = (0..items)
        .map(|i| (format!("key-{i:05}"), format!("value-{i}")))
        .collect();
    store.set_multiple(&data).await?;
    let all = store.get_all().await?;
    ensure!(all == data, "get_all returned {} of {} items", all.len(), data.len());

    let mut keys: Vec<String> = data.keys().cloned().collect();
    keys.push("never-written".to_string());
    let found = store.get_multiple(&keys).await?;
    ensure!(found == data, "get_multiple returned {} of {} items", found.len(), data.len());

    ensure!(store.set_if_not_exists("once", &"first".to_string()).await?, "first create refused");
    ensure!(!store.set_if_not_exists("once", &"second".to_string()).await?, "second create applied");

    store.rename("once", "renamed").await?;
    ensure!(!store.has("once").await?, "rename left the source");
    ensure!(
        store.get("renamed").await?.as_deref() == Some("first"),
        "rename lost the value"
    );

    store.delete_all().await?;
    ensure!(store.get_all().await?.is_empty(), "delete_all left items");
    info!(collection, items, "persistent storage passed");
    Ok(())
}

async fn run_expirable(
    factory: &KeyValueExpirableFactory<String>,
    collection: &str,
    ttl: i64,
) -> Result<()> {
    let store = factory.get(collection);
    store.delete_all().await?;

    store.set_with_expire("live", &"yes".to_string(), ttl).await?;
    store.set_with_expire("dead", &"no".to_string(), -1).await?;
    store.set("pinned", &"always".to_string()).await?;

    ensure!(store.has("live").await?, "live item missing");
    ensure!(!store.has("dead").await?, "expired item visible");
    let all = store.get_all().await?;
    ensure!(
        all.len() == 2 && all.contains_key("pinned"),
        "get_all returned {:?}",
        all.keys().collect::<Vec<_>>()
    );

    ensure!(
        store
            .set_with_expire_if_not_exists("dead", &"again".to_string(), ttl)
            .await?,
        "expired item blocked create"
    );

    store.delete_all().await?;
    info!(collection, ttl, "expirable storage passed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let keyvalue = match &args.keyvalue_settings {
        Some(path) => KeyValueSettings::from_json(&read_json(path)?)?,
        None => KeyValueSettings::default(),
    };
    let registry = ConnectionRegistry::new(client_settings(&args)?, connector(args.backend)?);

    let connection = registry.database(&keyvalue.connection).await?;
    let created = provision(&connection, &keyvalue).await?;
    info!(alias = %keyvalue.connection, ?created, "tables ready");

    let plain = KeyValueFactory::<String>::from_settings(&registry, &keyvalue, Arc::new(JsonCodec::new())).await?;
    let expiring =
        KeyValueExpirableFactory::<String>::from_settings(&registry, &keyvalue, Arc::new(JsonCodec::new()))
            .await?;

    run_plain(&plain, &args.collection, args.items).await?;
    run_expirable(&expiring, &args.collection, args.ttl).await?;

    println!("kv-smoke: ok ({:?}, collection {})", args.backend, args.collection);
    Ok(())
}
