mod file_config;

pub use file_config::FileConfig;

use crate::playlist_store::{AssociationPolicy, DEFAULT_BATCH_SIZE};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DB_PATH: &str = "spotify_data.db";
pub const DEFAULT_EXTENSION: &str = "json";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub extension: String,
    pub workers: Option<usize>,
    pub batch_size: usize,
    pub association_policy: AssociationPolicy,
    pub progress: bool,
    pub dry_run: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            extension: DEFAULT_EXTENSION.to_string(),
            workers: None,
            batch_size: DEFAULT_BATCH_SIZE,
            association_policy: AssociationPolicy::default(),
            progress: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    /// Without the leading dot.
    pub extension: String,
    pub workers: usize,
    pub batch_size: usize,
    pub association_policy: AssociationPolicy,
    pub progress: bool,
    pub dry_run: bool,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.data_dir.clone());
        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());
        if db_path.is_dir() {
            bail!("db_path points to a directory: {:?}", db_path);
        }

        let extension = file
            .extension
            .unwrap_or_else(|| cli.extension.clone())
            .trim_start_matches('.')
            .to_string();
        if extension.is_empty() {
            bail!("extension must not be empty");
        }

        let workers = file
            .workers
            .or(cli.workers)
            .unwrap_or_else(default_workers);
        if workers == 0 {
            bail!("workers must be at least 1");
        }

        let batch_size = file.batch_size.unwrap_or(cli.batch_size);
        if batch_size == 0 {
            bail!("batch_size must be at least 1");
        }

        Ok(AppConfig {
            data_dir,
            db_path,
            extension,
            workers,
            batch_size,
            association_policy: file
                .association_policy
                .unwrap_or(cli.association_policy),
            progress: file.progress.unwrap_or(cli.progress),
            dry_run: file.dry_run.unwrap_or(cli.dry_run),
        })
    }
}
