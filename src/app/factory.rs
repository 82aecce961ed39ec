use crate::{app::service::MemoryService, config::Config, storage};
use anyhow::{Context, Result};
use homedir::my_home;

const BASE_PATH_ENV: &str = "MEMO_BASE_PATH";

/// Wires config, storage and the memory service together.
pub struct AppFactory;

impl AppFactory {
    /// Resolve and create the base directory.
    ///
    /// Precedence: explicit path, then `MEMO_BASE_PATH`, then `~/.local/share/memo`.
    pub fn get_paths(base_path: Option<String>) -> Result<AppPaths> {
        let base_path = match base_path {
            Some(path) => path,
            None => Self::get_base_path()?,
        };

        std::fs::create_dir_all(&base_path)
            .with_context(|| format!("Failed to create base directory {base_path}"))?;

        Ok(AppPaths { base_path })
    }

    pub fn create_config(paths: &AppPaths) -> Result<Config> {
        Config::load_with(&paths.base_path)
    }

    pub fn create_service(paths: &AppPaths, config: &Config) -> Result<MemoryService> {
        let storage_mgr = storage::BackendLocal::new(&paths.base_path)
            .with_context(|| format!("Failed to open storage at {}", paths.base_path))?;

        MemoryService::open(config, Box::new(storage_mgr)).context("Failed to load memories")
    }

    fn get_base_path() -> Result<String> {
        if let Ok(path) = std::env::var(BASE_PATH_ENV) {
            return Ok(path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;

        Ok(format!("{}/.local/share/memo", home.to_string_lossy()))
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
