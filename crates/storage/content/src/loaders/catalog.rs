//! Resource catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use storage_core::{Catalog, Resource, ResourceDefinition};

use crate::loaders::{LoadResult, read_file};

/// Resource catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub resources: Vec<ResourceDefinition>,
}

/// Loader for resource catalogs from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog from a RON file.
    ///
    /// Handles are assigned in file order, so the same file always yields the
    /// same handles.
    pub fn load<R: Resource>(path: &Path) -> LoadResult<Catalog<R>> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load catalog {}: {}", path.display(), e))
    }

    pub fn parse<R: Resource>(content: &str) -> LoadResult<Catalog<R>> {
        let file: CatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog RON: {}", e))?;
        let catalog = Catalog::new(file.resources)?;
        tracing::debug!(kind = %R::KIND, resources = catalog.len(), "loaded catalog");

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use storage_core::{ItemHandle, ResourceOracle};

    use super::*;

    #[test]
    fn test_parse_catalog() {
        let catalog = CatalogLoader::parse::<ItemHandle>(
            r#"(
                resources: [
                    (identifier: "bucket", max_amount: Some(16)),
                    (identifier: "water_bucket", max_amount: Some(1), remainder: Some("bucket")),
                ],
            )"#,
        )
        .unwrap();

        let water = catalog.handle("water_bucket").unwrap();
        assert_eq!(catalog.max_amount(water), Some(1));
        assert_eq!(catalog.remainder(water), catalog.handle("bucket"));
    }

    #[test]
    fn test_invalid_catalog_is_reported() {
        let error = CatalogLoader::parse::<ItemHandle>(
            r#"(resources: [(identifier: "a"), (identifier: "a")])"#,
        )
        .unwrap_err();
        assert!(error.to_string().contains("more than once"));
    }
}
