//! Content factory for building machine storages from data files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage_core::{Catalog, FluidHandle, ItemHandle, MachineSpec, MachineStorage, StorageConfig};

use crate::loaders::{CatalogLoader, ConfigLoader, LoadResult, SpecLoader};

/// Content factory that loads storage content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml      (optional)
/// ├── items.ron
/// ├── fluids.ron
/// └── machines/
///     ├── furnace.ron
///     └── refinery.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `config.toml`, or defaults if absent.
    pub fn load_config(&self) -> LoadResult<StorageConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(StorageConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the item catalog from `items.ron`.
    pub fn load_items(&self) -> LoadResult<Catalog<ItemHandle>> {
        CatalogLoader::load(&self.data_dir.join("items.ron"))
    }

    /// Load the fluid catalog from `fluids.ron`.
    pub fn load_fluids(&self) -> LoadResult<Catalog<FluidHandle>> {
        CatalogLoader::load(&self.data_dir.join("fluids.ron"))
    }

    /// Load and resolve the layout in `machines/{name}.ron`.
    pub fn load_machine_spec(
        &self,
        name: &str,
        items: &Catalog<ItemHandle>,
        fluids: &Catalog<FluidHandle>,
        config: &StorageConfig,
    ) -> LoadResult<MachineSpec> {
        let path = self.data_dir.join("machines").join(format!("{}.ron", name));
        let def = SpecLoader::load(&path)?;
        SpecLoader::resolve(&def, items, fluids, config)
            .map_err(|e| anyhow::anyhow!("Invalid machine layout {}: {}", path.display(), e))
    }

    /// Load everything needed for `name` and build its storages.
    pub fn build_machine(&self, name: &str) -> LoadResult<MachineStorage> {
        let config = self.load_config()?;
        let items = self.load_items()?;
        let fluids = self.load_fluids()?;
        let spec = self.load_machine_spec(name, &items, &fluids, &config)?;
        let machine = MachineStorage::new(spec, Arc::new(items), Arc::new(fluids), &config)?;
        tracing::info!(
            machine = name,
            items = machine.items().size(),
            fluids = machine.fluids().size(),
            energy = machine.energy().capacity(),
            "built machine storage"
        );

        Ok(machine)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
