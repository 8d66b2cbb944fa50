//! Machine storage layout loader.
//!
//! Layout files describe slots by identifier; they become engine specs only
//! once resolved against the catalogs for their resource kinds.

use std::path::Path;

use serde::{Deserialize, Serialize};
use storage_core::{
    Catalog, EnergySpec, FluidHandle, ItemHandle, MachineSpec, Resource, ResourceFilter,
    ResourceKind, SlotDisplay, SlotSpec, StorageConfig, StorageSpec, TransferType,
};

use crate::loaders::{LoadResult, read_file};

/// Insertion filter as written in layout files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterDef {
    #[default]
    Any,
    Nothing,
    /// Only the named resources.
    Resources(Vec<String>),
    /// Only resources whose overlay carries the key.
    OverlayKey(String),
}

/// One slot (or a run of identical slots) as written in layout files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpecDef {
    /// Falls back to the configured default for the resource kind.
    #[serde(default)]
    pub capacity: Option<u64>,
    #[serde(default)]
    pub transfer: TransferType,
    #[serde(default)]
    pub filter: FilterDef,
    #[serde(default)]
    pub display: Option<SlotDisplay>,
    /// Number of identical slots this entry expands to.
    #[serde(default = "one")]
    pub count: usize,
}

fn one() -> usize {
    1
}

impl Default for SlotSpecDef {
    fn default() -> Self {
        Self {
            capacity: None,
            transfer: TransferType::default(),
            filter: FilterDef::default(),
            display: None,
            count: one(),
        }
    }
}

/// Machine layout structure for RON files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSpecDef {
    #[serde(default)]
    pub items: Vec<SlotSpecDef>,
    #[serde(default)]
    pub fluids: Vec<SlotSpecDef>,
    #[serde(default)]
    pub energy: Option<EnergySpec>,
}

/// Loader for machine layouts from RON files.
pub struct SpecLoader;

impl SpecLoader {
    /// Load a layout definition without resolving it.
    pub fn load(path: &Path) -> LoadResult<MachineSpecDef> {
        let content = read_file(path)?;
        let def: MachineSpecDef = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse machine layout RON: {}", e))?;

        Ok(def)
    }

    /// Resolve a layout against the item and fluid catalogs.
    pub fn resolve(
        def: &MachineSpecDef,
        items: &Catalog<ItemHandle>,
        fluids: &Catalog<FluidHandle>,
        config: &StorageConfig,
    ) -> LoadResult<MachineSpec> {
        let mut spec = MachineSpec::new()
            .with_items(Self::storage(&def.items, items, config)?)
            .with_fluids(Self::storage(&def.fluids, fluids, config)?);
        if let Some(energy) = def.energy {
            spec = spec.with_energy(energy);
        }
        Ok(spec)
    }

    /// Expand and resolve the slot entries for one resource kind.
    pub fn storage<R: Resource>(
        slots: &[SlotSpecDef],
        catalog: &Catalog<R>,
        config: &StorageConfig,
    ) -> LoadResult<StorageSpec<R>> {
        let mut spec = StorageSpec::new();
        for def in slots {
            let slot = Self::slot(def, catalog, config)?;
            for _ in 0..def.count {
                spec.push(slot.clone());
            }
        }
        spec.validate(config)?;

        Ok(spec)
    }

    fn slot<R: Resource>(
        def: &SlotSpecDef,
        catalog: &Catalog<R>,
        config: &StorageConfig,
    ) -> LoadResult<SlotSpec<R>> {
        let capacity = def.capacity.unwrap_or(match R::KIND {
            ResourceKind::Item => config.default_item_capacity,
            ResourceKind::Fluid => config.default_fluid_capacity,
        });
        let mut slot = SlotSpec::new(capacity)
            .with_transfer(def.transfer)
            .with_filter(Self::filter(&def.filter, catalog)?);
        if let Some(display) = def.display {
            slot = slot.with_display(display.x, display.y);
        }

        Ok(slot)
    }

    fn filter<R: Resource>(def: &FilterDef, catalog: &Catalog<R>) -> LoadResult<ResourceFilter<R>> {
        Ok(match def {
            FilterDef::Any => ResourceFilter::Any,
            FilterDef::Nothing => ResourceFilter::Nothing,
            FilterDef::OverlayKey(key) => ResourceFilter::OverlayKey(key.clone()),
            FilterDef::Resources(identifiers) => ResourceFilter::Resources(
                identifiers
                    .iter()
                    .map(|identifier| {
                        catalog.handle(identifier).ok_or_else(|| {
                            anyhow::anyhow!("Filter names unknown {} '{}'", R::KIND, identifier)
                        })
                    })
                    .collect::<LoadResult<Vec<_>>>()?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use storage_core::{Overlay, ResourceDefinition};

    use super::*;

    fn items() -> Catalog<ItemHandle> {
        Catalog::new(vec![
            ResourceDefinition::new("coal"),
            ResourceDefinition::new("battery"),
        ])
        .unwrap()
    }

    fn fluids() -> Catalog<FluidHandle> {
        Catalog::new(vec![ResourceDefinition::new("oil")]).unwrap()
    }

    #[test]
    fn test_resolve_layout() {
        let def: MachineSpecDef = ron::from_str(
            r#"(
                items: [
                    (transfer: processing, filter: Resources(["battery"]), display: Some((x: 8, y: 62))),
                    (capacity: Some(32), transfer: input, count: 2),
                ],
                fluids: [(transfer: output)],
                energy: Some((capacity: 30000, max_input: 120)),
            )"#,
        )
        .unwrap();

        let spec = SpecLoader::resolve(&def, &items(), &fluids(), &StorageConfig::default()).unwrap();
        assert_eq!(spec.items.len(), 3);
        assert_eq!(spec.items.slots()[0].capacity, StorageConfig::MAX_ITEM_STACK);
        assert!(spec.items.slots()[0].filter.allows(ItemHandle(1), &Overlay::EMPTY));
        assert!(!spec.items.slots()[0].filter.allows(ItemHandle(0), &Overlay::EMPTY));
        assert_eq!(spec.items.slots()[2].capacity, 32);
        assert_eq!(spec.fluids.slots()[0].capacity, StorageConfig::DEFAULT_FLUID_CAPACITY);
        assert_eq!(spec.energy.map(|energy| energy.max_output), Some(0));
    }

    #[test]
    fn test_unknown_filter_resource_is_reported() {
        let def = MachineSpecDef {
            items: vec![SlotSpecDef {
                filter: FilterDef::Resources(vec!["diamond".into()]),
                ..SlotSpecDef::default()
            }],
            ..MachineSpecDef::default()
        };
        let error = SpecLoader::resolve(&def, &items(), &fluids(), &StorageConfig::default())
            .unwrap_err();
        assert!(error.to_string().contains("diamond"));
    }

    #[test]
    fn test_oversized_item_slot_is_rejected() {
        let def = [SlotSpecDef {
            capacity: Some(65),
            ..SlotSpecDef::default()
        }];
        assert!(SpecLoader::storage(&def, &items(), &StorageConfig::default()).is_err());
    }
}
