use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Settings for one seeding run: where everything lives and how hard to hit the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Bucket holding the re-hosted menu images.
    pub bucket_id: String,
    pub collections: CollectionIds,
    #[serde(default)]
    pub purge: PurgeOptions,
}

/// Identifiers of the four collections the pipeline writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionIds {
    pub categories: String,
    pub customizations: String,
    pub menu: String,
    /// Join collection linking menu items to customizations.
    pub menu_customizations: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeOptions {
    /// Maximum number of deletions in flight for one purge target.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Purge the collections and the bucket at the same time instead of one after another.
    #[serde(default)]
    pub concurrent_targets: bool,
}

fn default_concurrency() -> usize {
    8
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            concurrent_targets: false,
        }
    }
}

impl SeedConfig {
    pub fn trace_loaded(&self) {
        info!(
            bucket_id = %self.bucket_id,
            categories = %self.collections.categories,
            customizations = %self.collections.customizations,
            menu = %self.collections.menu,
            menu_customizations = %self.collections.menu_customizations,
            purge_concurrency = self.purge.concurrency,
            concurrent_targets = self.purge.concurrent_targets,
            "Loaded SeedConfig"
        );
        debug!(?self, "SeedConfig loaded (full debug)");
    }
}

impl CollectionIds {
    /// Collections in the order they are purged.
    pub fn purge_order(&self) -> [&str; 4] {
        [
            &self.categories,
            &self.customizations,
            &self.menu,
            &self.menu_customizations,
        ]
    }
}
