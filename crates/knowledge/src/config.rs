//! Knowledge base configuration management.

use crate::types::KnowledgeBaseConfig;
use ragcheck_core::config::STATE_DIR;
use ragcheck_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load a table's configuration.
///
/// Loads from `.ragcheck/knowledge/<table>/config.yaml` if it exists,
/// otherwise returns defaults for the given table name.
pub fn load_config(workspace: &Path, table: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, table);

    if !config_path.exists() {
        tracing::debug!(
            "Using default knowledge base config for '{}' (no config file found)",
            table
        );
        return Ok(KnowledgeBaseConfig {
            table: table.to_string(),
            ..Default::default()
        });
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    // Directory name wins over the file contents
    config.table = table.to_string();

    tracing::debug!("Loaded knowledge base config for '{}'", table);
    Ok(config)
}

/// Save a table's configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.table);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge base config for '{}'", config.table);
    Ok(())
}

/// Get the base directory for a table.
pub fn get_base_dir(workspace: &Path, table: &str) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge").join(table)
}

/// Get the path to a table's config file.
pub fn get_config_path(workspace: &Path, table: &str) -> PathBuf {
    get_base_dir(workspace, table).join("config.yaml")
}

/// Storage directory for a table: the configured location, else `index/`
/// under the table's base directory. Relative locations resolve against
/// the workspace.
pub fn get_storage_dir(workspace: &Path, config: &KnowledgeBaseConfig) -> PathBuf {
    match &config.location {
        Some(location) if location.is_absolute() => location.clone(),
        Some(location) => workspace.join(location),
        None => get_base_dir(workspace, &config.table).join("index"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreBackend;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "hours").unwrap();

        assert_eq!(config.table, "hours");
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeBaseConfig {
            table: "hours".to_string(),
            chunk_size: 20,
            backend: StoreBackend::LanceDb,
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), "hours").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_storage_dir_resolution() {
        let workspace = Path::new("/work");
        let mut config = KnowledgeBaseConfig::default();
        assert_eq!(
            get_storage_dir(workspace, &config),
            PathBuf::from("/work/.ragcheck/knowledge/context/index")
        );

        config.location = Some(PathBuf::from("data/store"));
        assert_eq!(get_storage_dir(workspace, &config), PathBuf::from("/work/data/store"));

        config.location = Some(PathBuf::from("/srv/store"));
        assert_eq!(get_storage_dir(workspace, &config), PathBuf::from("/srv/store"));
    }
}
