//! Resource purge: empties a collection or a bucket.
//!
//! Deletions for one target are fanned out with at most `concurrency` requests
//! in flight. Every deletion in a batch is attempted; failures are collected
//! and reported together once the batch has settled.
//!
//! Store listings may be paginated, so a purge keeps listing and deleting until
//! the listing comes back empty.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::{PurgeOptions, SeedConfig};
use crate::contract::{BlobStore, DocumentStore, StoreError};
use crate::error::SeedError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeTarget {
    Collection(String),
    Bucket(String),
}

impl fmt::Display for PurgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeTarget::Collection(id) => write!(f, "collection {id}"),
            PurgeTarget::Bucket(id) => write!(f, "bucket {id}"),
        }
    }
}

/// A deletion that did not go through.
#[derive(Debug)]
pub struct DeleteFailure {
    pub id: String,
    pub error: StoreError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub target: PurgeTarget,
    pub deleted: usize,
}

/// Deletes every document in `collection`.
pub async fn purge_collection<D>(
    store: &D,
    collection: &str,
    concurrency: usize,
) -> Result<PurgeReport, SeedError>
where
    D: DocumentStore + ?Sized,
{
    let target = PurgeTarget::Collection(collection.to_string());
    purge_until_empty(
        target,
        concurrency,
        move || async move {
            store
                .list_documents(collection)
                .await
                .map(|docs| docs.into_iter().map(|d| d.id).collect())
        },
        move |id: String| async move { store.delete_document(collection, &id).await },
    )
    .await
}

/// Deletes every file in `bucket`.
pub async fn purge_bucket<B>(
    store: &B,
    bucket: &str,
    concurrency: usize,
) -> Result<PurgeReport, SeedError>
where
    B: BlobStore + ?Sized,
{
    let target = PurgeTarget::Bucket(bucket.to_string());
    purge_until_empty(
        target,
        concurrency,
        move || async move {
            store
                .list_files(bucket)
                .await
                .map(|files| files.into_iter().map(|f| f.id).collect())
        },
        move |id: String| async move { store.delete_file(bucket, &id).await },
    )
    .await
}

/// Purges every collection the pipeline writes, then the image bucket.
///
/// Targets run one after another unless `concurrent_targets` is set. Either way
/// all targets are attempted before the first failure is returned.
pub async fn purge_all<D, B>(
    config: &SeedConfig,
    docs: &D,
    blobs: &B,
) -> Result<Vec<PurgeReport>, SeedError>
where
    D: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let PurgeOptions {
        concurrency,
        concurrent_targets,
    } = config.purge;
    let [categories, customizations, menu, links] = config.collections.purge_order();

    let results = if concurrent_targets {
        info!("[PURGE] Purging all targets concurrently");
        let (a, b, c, d, e) = futures::join!(
            purge_collection(docs, categories, concurrency),
            purge_collection(docs, customizations, concurrency),
            purge_collection(docs, menu, concurrency),
            purge_collection(docs, links, concurrency),
            purge_bucket(blobs, &config.bucket_id, concurrency),
        );
        vec![a, b, c, d, e]
    } else {
        let mut results = Vec::with_capacity(5);
        for collection in [categories, customizations, menu, links] {
            results.push(purge_collection(docs, collection, concurrency).await);
        }
        results.push(purge_bucket(blobs, &config.bucket_id, concurrency).await);
        results
    };

    let mut reports = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(error = %e, "[PURGE][ERROR] Purge target failed");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

async fn purge_until_empty<L, LF, X, XF>(
    target: PurgeTarget,
    concurrency: usize,
    list: L,
    delete: X,
) -> Result<PurgeReport, SeedError>
where
    L: Fn() -> LF,
    LF: Future<Output = Result<Vec<String>, StoreError>>,
    X: Fn(String) -> XF,
    XF: Future<Output = Result<(), StoreError>>,
{
    info!(purge_target = %target, "[PURGE] Starting purge");
    let mut deleted: HashSet<String> = HashSet::new();

    loop {
        let ids = list().await.map_err(|e| {
            error!(purge_target = %target, error = %e, "[PURGE][ERROR] Listing failed");
            SeedError::List {
                target: target.clone(),
                source: e,
            }
        })?;
        if ids.is_empty() {
            break;
        }
        if let Some(id) = ids.iter().find(|id| deleted.contains(*id)) {
            warn!(purge_target = %target, id = %id, "[PURGE] Deleted id listed again");
            return Err(SeedError::PurgeStalled {
                target,
                id: id.clone(),
            });
        }

        let attempted = ids.len();
        debug!(purge_target = %target, batch = attempted, concurrency, "[PURGE] Deleting batch");
        let failures = delete_batch(&ids, concurrency, &delete).await;
        if !failures.is_empty() {
            error!(
                purge_target = %target,
                attempted,
                failed = failures.len(),
                "[PURGE][ERROR] Deletions failed"
            );
            return Err(SeedError::Purge {
                target,
                attempted,
                failures,
            });
        }
        deleted.extend(ids);
    }

    info!(purge_target = %target, deleted = deleted.len(), "[PURGE] Target emptied");
    Ok(PurgeReport {
        target,
        deleted: deleted.len(),
    })
}

/// Issues one deletion per id, at most `concurrency` at a time, and waits for all of them.
async fn delete_batch<X, XF>(ids: &[String], concurrency: usize, delete: &X) -> Vec<DeleteFailure>
where
    X: Fn(String) -> XF,
    XF: Future<Output = Result<(), StoreError>>,
{
    stream::iter(ids.iter().cloned())
        .map(|id| async move {
            let outcome = delete(id.clone()).await;
            (id, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|(id, outcome)| async move {
            match outcome {
                Ok(()) => None,
                Err(error) => {
                    warn!(id = %id, error = %error, "[PURGE] Deletion failed");
                    Some(DeleteFailure { id, error })
                }
            }
        })
        .collect()
        .await
}
