use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Directory holding the redb metadata database
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory of the content-addressed blob store
    pub blob_storage_path: String,
    /// Remove unreferenced blobs before serving traffic
    pub sweep_on_startup: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_storage_path: "./blobs".to_string(),
            sweep_on_startup: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = env_flag("TEST_MODE").unwrap_or(false);

        let max_upload_size = match std::env::var("MAX_UPLOAD_SIZE") {
            Ok(raw) => raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MAX_UPLOAD_SIZE must be a byte count, got '{raw}'"
                ))
            })?,
            Err(_) => 50 * 1024 * 1024, // 50MB
        };

        let blob_storage_path =
            std::env::var("BLOB_STORAGE_PATH").unwrap_or_else(|_| "./blobs".to_string());

        let sweep_on_startup = env_flag("SWEEP_ON_STARTUP").unwrap_or(true);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                blob_storage_path,
                sweep_on_startup,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if usize::try_from(self.max_upload_size).is_err() {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE does not fit in memory on this platform".to_string(),
            ));
        }

        if self.storage.blob_storage_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "BLOB_STORAGE_PATH cannot be empty".to_string(),
            ));
        }

        if self.test_mode {
            tracing::warn!("TEST_MODE is enabled. Never run this configuration in production.");
        }

        Ok(())
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_upload_size: u64) -> Config {
        Config {
            node: NodeConfig {
                bind_address: "127.0.0.1:0".to_string(),
                data_dir: "./data".to_string(),
            },
            storage: StorageConfig::default(),
            test_mode: false,
            max_upload_size,
        }
    }

    #[test]
    fn test_validate_rejects_zero_upload_size() {
        assert!(config(0).validate().is_err());
        assert!(config(1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_blob_path() {
        let mut cfg = config(1024);
        cfg.storage.blob_storage_path = "  ".to_string();
        assert!(cfg.validate().is_err());
    }
}
