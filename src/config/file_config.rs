use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::playlist_store::AssociationPolicy;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Input
    pub data_dir: Option<String>,
    pub extension: Option<String>,
    pub workers: Option<usize>,

    // Store
    pub db_path: Option<String>,
    pub batch_size: Option<usize>,
    pub association_policy: Option<AssociationPolicy>,

    // Run
    pub progress: Option<bool>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
