use distributed_multimap::bucket::id::BucketIdGenerator;
use distributed_multimap::collection::config::CollectionConfig;
use distributed_multimap::collection::store::CollectionStore;
use distributed_multimap::storage::memory::MemoryStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help") {
        eprintln!(
            "Usage: {} [--keys <n>] [--collection <name>] [--config <file.json>]",
            args[0]
        );
        eprintln!(
            "       [--max-bucket-size <n>] [--min-compaction-bucket-size <n>] [--transfer-expire-millis <ms>]"
        );
        eprintln!("Example: {} --keys 100000 --max-bucket-size 200", args[0]);

        std::process::exit(1);
    }

    let mut keys: usize = 10_000;
    let mut collection_name = "item1".to_string();
    let mut config_path: Option<String> = None;
    let mut max_bucket_size: Option<usize> = None;
    let mut min_compaction_bucket_size: Option<usize> = None;
    let mut transfer_expire_millis: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--keys", Some(value)) => {
                keys = value.parse()?;
                i += 2;
            }
            ("--collection", Some(value)) => {
                collection_name = value.clone();
                i += 2;
            }
            ("--config", Some(value)) => {
                config_path = Some(value.clone());
                i += 2;
            }
            ("--max-bucket-size", Some(value)) => {
                max_bucket_size = Some(value.parse()?);
                i += 2;
            }
            ("--min-compaction-bucket-size", Some(value)) => {
                min_compaction_bucket_size = Some(value.parse()?);
                i += 2;
            }
            ("--transfer-expire-millis", Some(value)) => {
                transfer_expire_millis = Some(value.parse()?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => CollectionConfig::from_file(path)?,
        None => CollectionConfig::default(),
    };
    if let Some(size) = max_bucket_size {
        config.max_bucket_size = size;
    }
    if let Some(size) = min_compaction_bucket_size {
        config.min_compaction_bucket_size = size;
    }
    if let Some(millis) = transfer_expire_millis {
        config.transfer_expire_millis = millis;
    }

    config.validate()?;
    tracing::info!("Collection config: {:?}", config);

    // 1. Storage layer:
    let store = Arc::new(MemoryStore::new());
    let sweeper = store
        .clone()
        .spawn_expiry_sweeper(config.transfer_expire());

    // 2. Collection layer:
    let ids = Arc::new(BucketIdGenerator::new());
    tracing::info!("Bucket id instance: {:x}", ids.instance());

    let items = Arc::new(CollectionStore::<String, String, ItemRecord, MemoryStore>::new(
        store.clone(),
        ids.clone(),
        config,
    )?);

    // 3. Spawn stats reporter:
    let stats_items = items.clone();
    let stats_store = store.clone();
    let stats_name = collection_name.clone();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            interval.tick().await;
            match stats_items.partition_table(&stats_name).await {
                Ok(Some(table)) => tracing::info!(
                    "Collection stats: {} entries in {} buckets, {} store records",
                    table.total_size(),
                    table.bucket_count(),
                    stats_store.len()
                ),
                Ok(None) => tracing::info!("Collection stats: collection does not exist"),
                Err(e) => tracing::error!("Failed to read partition table: {}", e),
            }
        }
    });

    // 4. Insert:
    let started = Instant::now();
    for n in 0..keys {
        let record = ItemRecord {
            name: format!("item {}", n),
            quantity: n as u64,
        };
        items
            .put(&collection_name, format!("valueKey{}", n), record)
            .await?;
    }
    tracing::info!("Inserted {} entries in {:?}", keys, started.elapsed());

    // 5. Read back:
    let started = Instant::now();
    let mut scanned = 0;
    for bucket_id in items.bucket_ids(&collection_name).await? {
        scanned += items.values_by_bucket_id(bucket_id).await?.len();
    }
    tracing::info!(
        "Scanned {} entries bucket by bucket in {:?}",
        scanned,
        started.elapsed()
    );

    if let Some(table) = items.partition_table(&collection_name).await? {
        let largest = (0..table.bucket_count()).map(|i| table.count(i)).max();
        let smallest = (0..table.bucket_count()).map(|i| table.count(i)).min();
        tracing::info!(
            "{} buckets, sizes between {:?} and {:?}",
            table.bucket_count(),
            smallest,
            largest
        );
    }

    // 6. Remove:
    let started = Instant::now();
    for n in 0..keys {
        items
            .remove(&collection_name, &format!("valueKey{}", n))
            .await?;
    }
    tracing::info!("Removed {} entries in {:?}", keys, started.elapsed());

    // 7. Wait for redirects to expire:
    tokio::time::sleep(items.config().transfer_expire() * 2).await;
    tracing::info!("{} store records left after expiry", store.len());

    reporter.abort();
    sweeper.abort();

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    name: String,
    quantity: u64,
}
