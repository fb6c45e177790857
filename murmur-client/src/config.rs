use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/api";
pub const DEFAULT_STORAGE_ROOT: &str = "http://127.0.0.1:3000/storage";
/// Rows added to the fetch window by each `load_more`
pub const DEFAULT_PAGE_INCREMENT: usize = 4;

/// Client settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL of the backend REST API
    pub server_url: String,
    /// Public root that remote media paths are resolved against
    pub storage_root: String,
    pub page_increment: usize,
    /// Where downloaded media is cached for sharing
    pub cache_dir: PathBuf,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Some(PathBuf::from("murmur.toml")))
    }

    /// Build settings from an optional TOML file, defaults and `MURMUR_*` env vars
    pub fn load(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server_url", DEFAULT_SERVER_URL)?
            .set_default("storage_root", DEFAULT_STORAGE_ROOT)?
            .set_default("page_increment", DEFAULT_PAGE_INCREMENT as i64)?
            .set_default(
                "cache_dir",
                default_cache_dir().to_string_lossy().into_owned(),
            )?;

        if let Some(path) = config_file {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        // Environment variables have the highest priority
        if let Ok(url) = std::env::var("MURMUR_SERVER_URL") {
            builder = builder.set_override("server_url", url)?;
        }
        if let Ok(root) = std::env::var("MURMUR_STORAGE_ROOT") {
            builder = builder.set_override("storage_root", root)?;
        }
        if let Ok(step) = std::env::var("MURMUR_PAGE_INCREMENT") {
            builder = builder.set_override("page_increment", step)?;
        }
        if let Ok(dir) = std::env::var("MURMUR_CACHE_DIR") {
            builder = builder.set_override("cache_dir", dir)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.page_increment == 0 {
            return Err(ConfigError::Message(
                "page_increment must be greater than zero".to_string(),
            ));
        }
        Ok(settings)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("murmur")
}
