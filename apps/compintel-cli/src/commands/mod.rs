pub mod companies;
pub mod ingest;
pub mod resolve;
pub mod search;

use std::path::PathBuf;

use anyhow::{Context, Result};
use compintel_core::config::{Config, Settings};
use compintel_core::mapping::SharedMappingStore;
use compintel_text::TantivyStore;

/// Loaded configuration shared by every command.
pub struct Workspace {
    pub config: Config,
    pub settings: Settings,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let config = Config::load().context("failed to load configuration")?;
        let settings = config.settings()?;
        Ok(Self { config, settings })
    }

    pub fn mappings_path(&self) -> PathBuf {
        self.config.path(&self.settings.mappings.path)
    }

    /// A corrupt mapping file is an error here, never an empty store.
    pub fn open_mappings(&self) -> Result<SharedMappingStore> {
        let path = self.mappings_path();
        SharedMappingStore::load(&path)
            .with_context(|| format!("failed to load company mappings from {}", path.display()))
    }

    pub fn open_store(&self) -> Result<TantivyStore> {
        let dir = self.config.path(&self.settings.index.tantivy_dir);
        TantivyStore::open(&dir).with_context(|| format!("failed to open tantivy index at {}", dir.display()))
    }
}
