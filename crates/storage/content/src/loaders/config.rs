//! Engine configuration loader.

use std::path::Path;

use storage_core::StorageConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Keys missing from the file keep their [`StorageConfig::default`] values.
    pub fn load(path: &Path) -> LoadResult<StorageConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<StorageConfig> {
        let config: StorageConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("max_slots = 12\n").unwrap();
        assert_eq!(config.max_slots, 12);
        assert_eq!(config.default_item_capacity, StorageConfig::MAX_ITEM_STACK);
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(ConfigLoader::parse("max_slots = \"many\"\n").is_err());
    }
}
