//! Content loaders for reading storage data from files.
//!
//! Catalogs and layouts are RON, engine configuration is TOML.

pub mod catalog;
pub mod config;
pub mod factory;
pub mod spec;

pub use catalog::CatalogLoader;
pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use spec::{FilterDef, MachineSpecDef, SlotSpecDef, SpecLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
