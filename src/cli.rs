///
/// This module implements the CLI interface for storefront-seed: command parsing,
/// argument validation, the async entrypoint, and user-visible output.
///
/// All pipeline logic (dataset, purge, image import, creators, orchestration)
/// lives in the [`storefront-seed-core`] crate. This module is strictly CLI glue.
///
/// ## Commands
/// - `seed`: purge the configured collections and bucket, then repopulate them.
/// - `purge`: only empty the configured collections and bucket.
/// - `validate`: check a dataset offline without touching any store.
///
/// ## How To Use
/// - For command-line users: use the installed `storefront-seed` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`storefront-seed-core`]: ../../storefront-seed-core/
use crate::appwrite::AppwriteClient;
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use storefront_seed_core::dataset::Dataset;
use storefront_seed_core::image::HttpImageFetcher;
use storefront_seed_core::purge::purge_all;
use storefront_seed_core::seed::seed;

/// CLI for storefront-seed: reset and repopulate the storefront backend.
#[derive(Parser)]
#[clap(
    name = "storefront-seed",
    version,
    about = "Reset a storefront's Appwrite database and image bucket and seed it with menu data"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Purge all seeded collections and the image bucket, then seed them from the dataset
    Seed {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Dataset JSON file; overrides the config's `dataset` entry
        #[clap(long)]
        data: Option<PathBuf>,
    },
    /// Delete every document in the seeded collections and every file in the image bucket
    Purge {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Check a dataset for unresolved references and invalid values without touching any store
    Validate {
        /// Dataset JSON file; the bundled dataset is checked when omitted
        #[clap(long)]
        data: Option<PathBuf>,
    },
}

fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    match path {
        Some(path) => Dataset::from_path(path)
            .with_context(|| format!("Failed to load dataset {}", path.display())),
        None => {
            tracing::info!("No dataset path given, using bundled dataset");
            Dataset::bundled().context("Failed to load bundled dataset")
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Seed { config, data } => {
            let config = load_config(config)?;
            let dataset = load_dataset(data.as_deref().or(config.dataset.as_deref()))?;
            let client = AppwriteClient::new(&config.appwrite)?;
            let images = HttpImageFetcher::new();
            tracing::info!(command = "seed", "Starting seeding run");
            println!("Seeding starting...");
            match seed(&config.seed, &client, &client, &images, &dataset).await {
                Ok(report) => {
                    tracing::info!(command = "seed", "Seeding complete");
                    println!("Seeding complete.\nReport:");
                    println!("{:#?}", report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "seed", error = %e, "Seeding failed");
                    Err(anyhow::Error::new(e).context("Seeding failed"))
                }
            }
        }
        Commands::Purge { config } => {
            let config = load_config(config)?;
            let client = AppwriteClient::new(&config.appwrite)?;
            tracing::info!(command = "purge", "Starting purge");
            match purge_all(&config.seed, &client, &client).await {
                Ok(reports) => {
                    for report in &reports {
                        println!("Purged {}: {} deleted", report.target, report.deleted);
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "purge", error = %e, "Purge failed");
                    Err(anyhow::Error::new(e).context("Purge failed"))
                }
            }
        }
        Commands::Validate { data } => {
            let dataset = load_dataset(data.as_deref())?;
            dataset.validate().context("Dataset validation failed")?;
            println!(
                "Dataset is valid: {} categories, {} customizations, {} menu items, {} links.",
                dataset.categories.len(),
                dataset.customizations.len(),
                dataset.menu.len(),
                dataset.link_count()
            );
            Ok(())
        }
    }
}
