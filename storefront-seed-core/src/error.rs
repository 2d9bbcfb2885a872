use std::fmt;

use crate::contract::StoreError;
use crate::dataset::DatasetError;
use crate::purge::{DeleteFailure, PurgeTarget};
use crate::seed::SeedStage;

/// Why a seeding run stopped. Every variant is fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("failed to list {target}: {source}")]
    List {
        target: PurgeTarget,
        #[source]
        source: StoreError,
    },

    #[error(
        "purge of {target} failed: {} of {attempted} deletions failed (first: {})",
        .failures.len(),
        first_failure(.failures)
    )]
    Purge {
        target: PurgeTarget,
        attempted: usize,
        failures: Vec<DeleteFailure>,
    },

    #[error("purge of {target} stalled: {id} was listed again after it was deleted")]
    PurgeStalled { target: PurgeTarget, id: String },

    #[error("failed to fetch image {url}: {source}")]
    ImageFetch {
        url: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to upload image {url} to bucket {bucket}: {source}")]
    ImageUpload {
        url: String,
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode {name:?} for collection {collection}: {source}")]
    Encode {
        collection: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to create {name:?} in collection {collection} during {stage}: {source}")]
    Create {
        stage: SeedStage,
        collection: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("unresolved {kind} reference {name:?} from menu item {item:?}")]
    UnresolvedReference {
        kind: ReferenceKind,
        name: String,
        item: String,
    },
}

/// Which name→id map a lookup went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Category,
    Customization,
    MenuItem,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Category => "category",
            ReferenceKind::Customization => "customization",
            ReferenceKind::MenuItem => "menu item",
        })
    }
}

fn first_failure(failures: &[DeleteFailure]) -> String {
    failures
        .first()
        .map(|f| format!("{}: {}", f.id, f.error))
        .unwrap_or_else(|| "none recorded".to_string())
}
