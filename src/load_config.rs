/// `load_config` module: loads the static YAML config and injects secrets from the environment.
///
/// This is the only place where the user-supplied YAML is parsed and mapped to
/// the strongly-typed settings the rest of the binary uses.
///
/// # Responsibilities
/// - Parse the config file into [`CliConfig`] (Appwrite connection + [`SeedConfig`])
/// - Inject `APPWRITE_API_KEY` from the environment; it never lives in the file
/// - Let `APPWRITE_ENDPOINT` / `APPWRITE_PROJECT_ID` override the file values
///
/// # Errors
/// All errors use `anyhow::Error` for context-rich diagnostics and are surfaced
/// at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use storefront_seed_core::config::SeedConfig;
use tracing::{error, info};

pub const API_KEY_ENV: &str = "APPWRITE_API_KEY";
pub const ENDPOINT_ENV: &str = "APPWRITE_ENDPOINT";
pub const PROJECT_ID_ENV: &str = "APPWRITE_PROJECT_ID";

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    /// Base URL of the Appwrite API, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    /// Injected from `APPWRITE_API_KEY`; never read from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub appwrite: AppwriteSettings,
    pub seed: SeedConfig,
    /// Dataset file to seed from; the bundled dataset is used when absent.
    #[serde(default)]
    pub dataset: Option<PathBuf>,
}

/// Loads a static YAML config file (no secrets) and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        info!(endpoint = %endpoint, "{ENDPOINT_ENV} overrides configured endpoint");
        config.appwrite.endpoint = endpoint;
    }
    if let Ok(project_id) = std::env::var(PROJECT_ID_ENV) {
        info!(project_id = %project_id, "{PROJECT_ID_ENV} overrides configured project");
        config.appwrite.project_id = project_id;
    }
    config.appwrite.endpoint = config.appwrite.endpoint.trim_end_matches('/').to_string();

    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => {
            info!("{API_KEY_ENV} found in env");
            config.appwrite.api_key = Some(key);
        }
        _ => info!("{API_KEY_ENV} not set; only offline commands will work"),
    }

    if !config.appwrite.endpoint.starts_with("http://")
        && !config.appwrite.endpoint.starts_with("https://")
    {
        error!(endpoint = %config.appwrite.endpoint, "Endpoint is not an http(s) URL");
        anyhow::bail!(
            "appwrite.endpoint must be an http(s) URL, got {:?}",
            config.appwrite.endpoint
        );
    }
    if config.seed.purge.concurrency == 0 {
        anyhow::bail!("seed.purge.concurrency must be at least 1");
    }

    config.seed.trace_loaded();
    info!(
        endpoint = %config.appwrite.endpoint,
        project_id = %config.appwrite.project_id,
        database_id = %config.appwrite.database_id,
        dataset = ?config.dataset,
        "Config loaded and merged successfully"
    );
    Ok(config)
}
