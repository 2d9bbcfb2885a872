//! In-memory document and blob store for tests.
//!
//! Behaves like a remote store from the pipeline's point of view: listings can
//! be paginated, and creates in chosen collections can be made to fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::contract::{
    BlobStore, Document, DocumentStore, FetchedImage, Fields, ImageFetcher, NewFile, StoreError,
    StoredFile,
};

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    buckets: BTreeMap<String, BTreeMap<String, StoredFile>>,
    failing_collections: HashSet<String>,
}

/// Thread-safe in-memory store implementing both [`DocumentStore`] and [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listings return at most `page_size` entries, like a paginated remote API.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// Every subsequent create in `collection` is rejected.
    pub fn fail_creates_in(&self, collection: &str) {
        self.lock().failing_collections.insert(collection.to_string());
    }

    pub fn insert_document(&self, collection: &str, id: &str, fields: Fields) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    pub fn insert_file(&self, bucket: &str, file: StoredFile) {
        self.lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(file.id.clone(), file);
    }

    /// Every document in a collection, ignoring the page size.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every file in a bucket, ignoring the page size.
    pub fn files(&self, bucket: &str) -> Vec<StoredFile> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|files| files.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        match self.page_size {
            Some(n) => items.into_iter().take(n).collect(),
            None => items,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.page(self.documents(collection)))
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let mut state = self.lock();
        if state.failing_collections.contains(collection) {
            return Err(StoreError::Rejected {
                status: 500,
                message: format!("injected failure in {collection}"),
            });
        }
        let docs = state.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::Rejected {
                status: 409,
                message: format!("document {id} already exists"),
            });
        }
        docs.insert(id.to_string(), fields.clone());
        Ok(Document {
            id: id.to_string(),
            fields,
        })
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.lock()
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::Rejected {
                status: 404,
                message: format!("document {id} not found in {collection}"),
            })
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list_files(&self, bucket: &str) -> Result<Vec<StoredFile>, StoreError> {
        Ok(self.page(self.files(bucket)))
    }

    async fn create_file(&self, bucket: &str, file: NewFile) -> Result<StoredFile, StoreError> {
        let stored = StoredFile {
            id: file.id,
            name: file.name,
            mime_type: file.content_type,
            size: file.size,
        };
        self.insert_file(bucket, stored.clone());
        Ok(stored)
    }

    async fn delete_file(&self, bucket: &str, id: &str) -> Result<(), StoreError> {
        self.lock()
            .buckets
            .get_mut(bucket)
            .and_then(|files| files.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::Rejected {
                status: 404,
                message: format!("file {id} not found in {bucket}"),
            })
    }

    fn file_view_url(&self, bucket: &str, id: &str) -> String {
        format!("memory://{bucket}/{id}/view")
    }
}

/// Image source that answers every fetch with the same bytes.
#[derive(Debug, Clone)]
pub struct StaticImageFetcher {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Default for StaticImageFetcher {
    fn default() -> Self {
        Self {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        }
    }
}

#[async_trait]
impl ImageFetcher for StaticImageFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedImage, StoreError> {
        Ok(FetchedImage {
            bytes: self.bytes.clone(),
            content_type: self.content_type.clone(),
        })
    }
}
