use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront_seed_core::config::{CollectionIds, PurgeOptions, SeedConfig};
use storefront_seed_core::contract::{
    BlobStore, Document, DocumentStore, Fields, MockBlobStore, MockDocumentStore, StoreError,
    StoredFile,
};
use storefront_seed_core::memory::MemoryStore;
use storefront_seed_core::purge::{purge_all, purge_bucket, purge_collection, PurgeTarget};
use storefront_seed_core::SeedError;

fn fields(n: usize) -> Fields {
    let mut f = Fields::new();
    f.insert("name".into(), json!(format!("stale-{n}")));
    f
}

fn config(concurrent_targets: bool) -> SeedConfig {
    SeedConfig {
        bucket_id: "images".into(),
        collections: CollectionIds {
            categories: "categories".into(),
            customizations: "customizations".into(),
            menu: "menu".into(),
            menu_customizations: "menu_customizations".into(),
        },
        purge: PurgeOptions {
            concurrency: 4,
            concurrent_targets,
        },
    }
}

#[tokio::test]
async fn purge_empties_collection_across_pages() {
    // 60 documents behind a 25-per-page listing: purge must keep going until empty.
    let store = MemoryStore::with_page_size(25);
    for n in 0..60 {
        store.insert_document("menu", &format!("doc-{n}"), fields(n));
    }

    let report = purge_collection(&store, "menu", 8)
        .await
        .expect("purge should succeed");

    assert_eq!(report.deleted, 60);
    assert_eq!(report.target, PurgeTarget::Collection("menu".into()));
    assert!(store.list_documents("menu").await.unwrap().is_empty());
}

/// Document store whose deletions take a while, recording how many overlap.
#[derive(Default)]
struct SlowDeleteStore {
    ids: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl DocumentStore for SlowDeleteStore {
    async fn list_documents(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .ids
            .lock()
            .unwrap()
            .iter()
            .map(|id| Document {
                id: id.clone(),
                fields: Fields::new(),
            })
            .collect())
    }

    async fn create_document(
        &self,
        _collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        self.ids.lock().unwrap().push(id.to_string());
        Ok(Document {
            id: id.to_string(),
            fields,
        })
    }

    async fn delete_document(&self, _collection: &str, id: &str) -> Result<(), StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.ids.lock().unwrap().retain(|d| d != id);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn purge_keeps_at_most_concurrency_deletions_in_flight() {
    let store = SlowDeleteStore::default();
    for n in 0..40 {
        store
            .create_document("menu", &format!("doc-{n}"), Fields::new())
            .await
            .unwrap();
    }

    let report = purge_collection(&store, "menu", 3).await.unwrap();

    assert_eq!(report.deleted, 40);
    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 3);
    assert!(store.list_documents("menu").await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_of_empty_collection_is_a_no_op() {
    let store = MemoryStore::new();
    let report = purge_collection(&store, "categories", 8).await.unwrap();
    assert_eq!(report.deleted, 0);
}

#[tokio::test]
async fn purge_attempts_every_deletion_and_reports_all_failures() {
    let mut store = MockDocumentStore::new();
    store.expect_list_documents().times(1).returning(|_| {
        Ok((0..5)
            .map(|n| Document {
                id: format!("doc-{n}"),
                fields: Fields::new(),
            })
            .collect())
    });

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    store
        .expect_delete_document()
        .times(5)
        .returning(move |_, id| {
            counter.fetch_add(1, Ordering::SeqCst);
            if id == "doc-1" || id == "doc-3" {
                Err(StoreError::Rejected {
                    status: 500,
                    message: "boom".into(),
                })
            } else {
                Ok(())
            }
        });

    let err = purge_collection(&store, "menu", 2).await.unwrap_err();

    assert_eq!(attempts.load(Ordering::SeqCst), 5, "all deletions attempted");
    match err {
        SeedError::Purge {
            attempted,
            failures,
            ..
        } => {
            assert_eq!(attempted, 5);
            let mut failed: Vec<_> = failures.into_iter().map(|f| f.id).collect();
            failed.sort();
            assert_eq!(failed, vec!["doc-1".to_string(), "doc-3".to_string()]);
        }
        other => panic!("expected purge failure, got {other:?}"),
    }
}

#[tokio::test]
async fn purge_detects_a_listing_that_never_shrinks() {
    // The store acknowledges deletions but keeps listing the same document.
    let mut store = MockDocumentStore::new();
    store.expect_list_documents().times(2).returning(|_| {
        Ok(vec![Document {
            id: "ghost".into(),
            fields: Fields::new(),
        }])
    });
    store
        .expect_delete_document()
        .times(1)
        .returning(|_, _| Ok(()));

    let err = purge_collection(&store, "menu", 4).await.unwrap_err();
    assert!(
        matches!(err, SeedError::PurgeStalled { ref id, .. } if id == "ghost"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn purge_bucket_removes_every_file() {
    let mut blobs = MockBlobStore::new();
    let mut listed = 0;
    blobs.expect_list_files().times(2).returning(move |_| {
        listed += 1;
        if listed == 1 {
            Ok(vec![
                StoredFile {
                    id: "f1".into(),
                    name: "a.png".into(),
                    mime_type: "image/png".into(),
                    size: 1,
                },
                StoredFile {
                    id: "f2".into(),
                    name: "b.png".into(),
                    mime_type: "image/png".into(),
                    size: 2,
                },
            ])
        } else {
            Ok(vec![])
        }
    });
    blobs.expect_delete_file().times(2).returning(|_, _| Ok(()));

    let report = purge_bucket(&blobs, "images", 8).await.unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(report.target, PurgeTarget::Bucket("images".into()));
}

#[tokio::test]
async fn purge_all_clears_every_target() {
    for concurrent_targets in [false, true] {
        let store = MemoryStore::new();
        for collection in ["categories", "customizations", "menu", "menu_customizations"] {
            for n in 0..3 {
                store.insert_document(collection, &format!("{collection}-{n}"), fields(n));
            }
        }
        store.insert_file(
            "images",
            StoredFile {
                id: "img".into(),
                name: "img.png".into(),
                mime_type: "image/png".into(),
                size: 4,
            },
        );

        let reports = purge_all(&config(concurrent_targets), &store, &store)
            .await
            .expect("purge_all should succeed");

        assert_eq!(reports.len(), 5);
        assert_eq!(reports.iter().map(|r| r.deleted).sum::<usize>(), 13);
        for collection in ["categories", "customizations", "menu", "menu_customizations"] {
            assert!(store.documents(collection).is_empty(), "{collection} not empty");
        }
        assert!(store.list_files("images").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn purge_all_surfaces_listing_failure() {
    let mut docs = MockDocumentStore::new();
    docs.expect_list_documents().returning(|collection| {
        if collection == "menu" {
            Err(StoreError::Decode("garbled listing".into()))
        } else {
            Ok(vec![])
        }
    });
    let mut blobs = MockBlobStore::new();
    blobs.expect_list_files().returning(|_| Ok(vec![]));

    let err = purge_all(&config(false), &docs, &blobs).await.unwrap_err();
    assert!(
        matches!(err, SeedError::List { target: PurgeTarget::Collection(ref c), .. } if c == "menu"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn purge_all_attempts_every_target_before_failing() {
    let mut docs = MockDocumentStore::new();
    docs.expect_list_documents().times(4).returning(|collection| {
        if collection == "categories" {
            Err(StoreError::Rejected {
                status: 503,
                message: "unavailable".into(),
            })
        } else {
            Ok(vec![])
        }
    });
    let mut blobs = MockBlobStore::new();
    blobs.expect_list_files().times(1).returning(|_| Ok(vec![]));

    let err = purge_all(&config(false), &docs, &blobs).await.unwrap_err();
    assert!(
        matches!(err, SeedError::List { target: PurgeTarget::Collection(ref c), .. } if c == "categories"),
        "got {err:?}"
    );
}
