//! Data-driven content for the storage engine.
//!
//! Loads the files a device definition is built from:
//! - Resource catalogs (RON), one per resource kind
//! - Machine storage layouts (RON)
//! - Engine configuration (TOML)
//!
//! Layout files name resources by identifier; loaders resolve them against
//! the catalogs and hand back ready-to-build `storage-core` specs.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogLoader, ConfigLoader, ContentFactory, FilterDef, MachineSpecDef, SlotSpecDef,
    SpecLoader,
};
