//! Property-based tests for the durable queue

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

use gestion_sync::client::local_db::{KeyValueStore, MemoryStore, SqliteStore};
use gestion_sync::client::offline::QueueStore;
use gestion_sync::shared::operation::WriteMethod;

fn write_method() -> impl Strategy<Value = WriteMethod> {
    prop_oneof![
        Just(WriteMethod::Post),
        Just(WriteMethod::Put),
        Just(WriteMethod::Delete),
        Just(WriteMethod::Patch),
    ]
}

fn intent() -> impl Strategy<Value = (WriteMethod, String, Option<i64>)> {
    (write_method(), "/(clientes|ofertas|ordenes|facturas)(/[0-9]{1,3})?", proptest::option::of(any::<i64>()))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_enqueue_order_survives_reload(intents in proptest::collection::vec(intent(), 0..20)) {
        let rt = runtime();
        rt.block_on(async {
            let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
            let queue = QueueStore::new(store.clone(), "cola_sync", "/api");

            for (method, path, value) in &intents {
                queue.enqueue(*method, path, value.map(|v| json!({"valor": v}))).await;
            }
            let written = queue.read_all().await;

            // A fresh store handle over the same storage sees the same list
            let reloaded = QueueStore::new(store, "cola_sync", "/api").read_all().await;
            prop_assert_eq!(&reloaded, &written);

            prop_assert_eq!(written.len(), intents.len());
            for (op, (method, path, value)) in written.iter().zip(&intents) {
                prop_assert_eq!(op.method, *method);
                prop_assert_eq!(&op.path, &format!("/api{}", path));
                prop_assert_eq!(op.body.clone(), value.map(|v| json!({"valor": v})));
            }
            Ok(())
        })?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_sqlite_queue_roundtrip(intents in proptest::collection::vec(intent(), 1..10)) {
        let rt = runtime();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let db = dir.path().join("local.db");

            let written = {
                let store = SqliteStore::open(&db).await.unwrap();
                let queue = QueueStore::new(Arc::new(store.clone()), "cola_sync", "/api");
                for (method, path, _) in &intents {
                    queue.enqueue(*method, path, None).await;
                }
                let written = queue.read_all().await;
                store.pool().close().await;
                written
            };

            let reopened = SqliteStore::open(&db).await.unwrap();
            let reloaded = QueueStore::new(Arc::new(reopened), "cola_sync", "/api").read_all().await;
            prop_assert_eq!(reloaded, written);
            Ok(())
        })?;
    }
}
