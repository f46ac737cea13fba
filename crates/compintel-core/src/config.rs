//! Layered configuration and path helpers.
//!
//! Uses Figment to merge typed defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_CHUNKING__CHUNK_SIZE=256`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against the config directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::loader::LoaderConfig;
use crate::validate::ValidationConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub path: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self { path: "data/company_mappings.json".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub roots: Vec<String>,
    pub extensions: Vec<String>,
    /// Directory names ingested first, in this order.
    pub priority_dirs: Vec<String>,
    pub limit: Option<usize>,
    /// Documents per batch; the alias snapshot is refreshed between batches.
    pub batch_docs: usize,
    pub store_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            roots: vec!["internal_data".to_string(), "output".to_string()],
            extensions: loader.extensions,
            priority_dirs: loader.priority_dirs,
            limit: loader.limit,
            batch_docs: 64,
            store_batch_size: 50,
        }
    }
}

impl IngestConfig {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            extensions: self.extensions.clone(),
            priority_dirs: self.priority_dirs.clone(),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub tantivy_dir: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { tantivy_dir: "data/indexes/tantivy".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub validation: ValidationConfig,
    pub mappings: MappingConfig,
    pub ingest: IngestConfig,
    pub index: IndexConfig,
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(base_dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    /// Resolves a configured path against the directory the config came from.
    pub fn path(&self, configured: &str) -> PathBuf {
        resolve_with_base(&self.base_dir, configured)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.chunking.validate()?;
        if settings.ingest.store_batch_size == 0 {
            anyhow::bail!("ingest.store_batch_size must be greater than 0");
        }
        if settings.ingest.batch_docs == 0 {
            anyhow::bail!("ingest.batch_docs must be greater than 0");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
