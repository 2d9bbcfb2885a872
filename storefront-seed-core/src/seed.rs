//! Seeding orchestrator: purge → categories → customizations → menu items → links.
//!
//! A run is an explicit state machine over [`SeedStage`]. Each stage completes
//! fully before the next begins, because later stages resolve names through the
//! name→id maps earlier stages fill in.
//!
//! # Stages
//! - [`SeedStage::Purging`]: empties every collection and the image bucket.
//! - [`SeedStage::Categories`] / [`SeedStage::Customizations`]: create the leaf entities.
//! - [`SeedStage::MenuItems`]: per item, import the image, then create the item
//!   with its category resolved.
//! - [`SeedStage::Links`]: one join document per declared (menu item, customization) pair.
//!
//! # Error Handling
//! Every failure is fatal. The run stops in the failing stage, logs the stage,
//! and returns the error. Nothing is rolled back; running again is the
//! recovery path, and it is safe because every run purges first.
//!
//! Before purging, the dataset is validated so that a run which would fail on
//! an unresolved reference never destroys the existing data.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use tracing::{error, info, info_span, Instrument};

use crate::config::SeedConfig;
use crate::contract::{BlobStore, DocumentStore, ImageFetcher};
use crate::create::{create_category, create_customization, create_link, create_menu_item};
use crate::dataset::Dataset;
use crate::error::{ReferenceKind, SeedError};
use crate::image::{import_image, ImportedImage};
use crate::purge::{purge_all, PurgeReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedStage {
    Purging,
    Categories,
    Customizations,
    MenuItems,
    Links,
    Done,
}

impl SeedStage {
    pub fn next(self) -> Self {
        match self {
            SeedStage::Purging => SeedStage::Categories,
            SeedStage::Categories => SeedStage::Customizations,
            SeedStage::Customizations => SeedStage::MenuItems,
            SeedStage::MenuItems => SeedStage::Links,
            SeedStage::Links | SeedStage::Done => SeedStage::Done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeedStage::Purging => "PURGING",
            SeedStage::Categories => "CATEGORIES",
            SeedStage::Customizations => "CUSTOMIZATIONS",
            SeedStage::MenuItems => "MENU_ITEMS",
            SeedStage::Links => "LINKS",
            SeedStage::Done => "DONE",
        }
    }
}

impl fmt::Display for SeedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed run created. The name→id maps double as the run's lookup tables.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub purged: Vec<PurgeReport>,
    pub categories: BTreeMap<String, String>,
    pub customizations: BTreeMap<String, String>,
    pub menu_items: BTreeMap<String, String>,
    pub images: BTreeMap<String, ImportedImage>,
    pub links: Vec<LinkReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkReport {
    pub link_id: String,
    pub menu_item: String,
    pub customization: String,
}

/// Drives one seeding run against a document store, a blob store and an image source.
pub struct Seeder<'a, D: ?Sized, B: ?Sized, F: ?Sized> {
    config: &'a SeedConfig,
    docs: &'a D,
    blobs: &'a B,
    images: &'a F,
    preflight: bool,
}

impl<'a, D, B, F> Seeder<'a, D, B, F>
where
    D: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
    F: ImageFetcher + ?Sized,
{
    pub fn new(config: &'a SeedConfig, docs: &'a D, blobs: &'a B, images: &'a F) -> Self {
        Self {
            config,
            docs,
            blobs,
            images,
            preflight: true,
        }
    }

    /// Skip dataset validation before purging. References are still checked
    /// when they are resolved, so a bad dataset fails mid-run instead.
    pub fn without_preflight(mut self) -> Self {
        self.preflight = false;
        self
    }

    pub async fn run(&self, dataset: &Dataset) -> Result<SeedReport, SeedError> {
        info!("[SEED] Starting seeding run");
        if self.preflight {
            dataset.validate()?;
            info!("[SEED] Dataset passed preflight validation");
        }

        let mut report = SeedReport::default();
        let mut stage = SeedStage::Purging;
        while stage != SeedStage::Done {
            let span = info_span!("seed_stage", stage = %stage);
            let started = Instant::now();
            let result = self
                .execute(stage, dataset, &mut report)
                .instrument(span)
                .await;
            match result {
                Ok(()) => {
                    info!(
                        stage = %stage,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "[SEED] Stage complete"
                    );
                }
                Err(e) => {
                    error!(stage = %stage, error = %e, "[SEED][ERROR] Stage failed, halting run");
                    return Err(e);
                }
            }
            stage = stage.next();
        }

        info!(
            categories = report.categories.len(),
            customizations = report.customizations.len(),
            menu_items = report.menu_items.len(),
            links = report.links.len(),
            "[SEED] Seeding complete"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        stage: SeedStage,
        dataset: &Dataset,
        report: &mut SeedReport,
    ) -> Result<(), SeedError> {
        let collections = &self.config.collections;
        match stage {
            SeedStage::Purging => {
                info!("[SEED] Clearing existing data");
                report.purged = purge_all(self.config, self.docs, self.blobs).await?;
            }
            SeedStage::Categories => {
                info!(count = dataset.categories.len(), "[SEED] Creating categories");
                for cat in &dataset.categories {
                    let id = create_category(self.docs, collections, cat).await?;
                    report.categories.insert(cat.name.clone(), id);
                }
            }
            SeedStage::Customizations => {
                info!(count = dataset.customizations.len(), "[SEED] Creating customizations");
                for cus in &dataset.customizations {
                    let id = create_customization(self.docs, collections, cus).await?;
                    report.customizations.insert(cus.name.clone(), id);
                }
            }
            SeedStage::MenuItems => {
                info!(count = dataset.menu.len(), "[SEED] Creating menu items");
                for item in &dataset.menu {
                    let category_id = resolve(
                        &report.categories,
                        ReferenceKind::Category,
                        &item.category_name,
                        &item.name,
                    )?
                    .to_string();
                    let image = import_image(
                        self.images,
                        self.blobs,
                        &self.config.bucket_id,
                        &item.image_url,
                    )
                    .await?;
                    let id = create_menu_item(
                        self.docs,
                        collections,
                        item,
                        &image.view_url,
                        &category_id,
                    )
                    .await?;
                    report.menu_items.insert(item.name.clone(), id);
                    report.images.insert(item.name.clone(), image);
                }
            }
            SeedStage::Links => {
                info!(count = dataset.link_count(), "[SEED] Linking menu items to customizations");
                for item in &dataset.menu {
                    let menu_id = resolve(
                        &report.menu_items,
                        ReferenceKind::MenuItem,
                        &item.name,
                        &item.name,
                    )?;
                    for cus_name in &item.customizations {
                        let customization_id = resolve(
                            &report.customizations,
                            ReferenceKind::Customization,
                            cus_name,
                            &item.name,
                        )?;
                        let link_id =
                            create_link(self.docs, collections, menu_id, customization_id).await?;
                        report.links.push(LinkReport {
                            link_id,
                            menu_item: item.name.clone(),
                            customization: cus_name.clone(),
                        });
                    }
                }
            }
            SeedStage::Done => {}
        }
        Ok(())
    }
}

/// Convenience wrapper: run a full seed with default options.
pub async fn seed<D, B, F>(
    config: &SeedConfig,
    docs: &D,
    blobs: &B,
    images: &F,
    dataset: &Dataset,
) -> Result<SeedReport, SeedError>
where
    D: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
    F: ImageFetcher + ?Sized,
{
    Seeder::new(config, docs, blobs, images).run(dataset).await
}

fn resolve<'m>(
    map: &'m BTreeMap<String, String>,
    kind: ReferenceKind,
    name: &str,
    item: &str,
) -> Result<&'m str, SeedError> {
    map.get(name).map(String::as_str).ok_or_else(|| {
        error!(kind = %kind, name = %name, item = %item, "[SEED][ERROR] Unresolved reference");
        SeedError::UnresolvedReference {
            kind,
            name: name.to_string(),
            item: item.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_dependency_order() {
        let mut stage = SeedStage::Purging;
        let mut seen = vec![stage];
        while stage != SeedStage::Done {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                SeedStage::Purging,
                SeedStage::Categories,
                SeedStage::Customizations,
                SeedStage::MenuItems,
                SeedStage::Links,
                SeedStage::Done,
            ]
        );
        assert_eq!(SeedStage::Done.next(), SeedStage::Done);
        assert_eq!(SeedStage::MenuItems.to_string(), "MENU_ITEMS");
    }
}
