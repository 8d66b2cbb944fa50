//! Per-device storage bundle: items, fluids and energy.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::energy::{EnergySpec, EnergyStorage};
use crate::resource::{FluidHandle, ItemHandle, ResourceOracle};
use crate::slot::RecordError;
use crate::storage::{ResourceStorage, SpecError, StorageRecord, StorageSpec};
use crate::sync::SyncBatch;
use crate::transaction::Transaction;

/// Construction-time layout of a device's storages.
#[derive(Clone, Debug, Default)]
pub struct MachineSpec {
    pub items: StorageSpec<ItemHandle>,
    pub fluids: StorageSpec<FluidHandle>,
    /// `None` for devices that do not use energy.
    pub energy: Option<EnergySpec>,
}

impl MachineSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, items: StorageSpec<ItemHandle>) -> Self {
        self.items = items;
        self
    }

    pub fn with_fluids(mut self, fluids: StorageSpec<FluidHandle>) -> Self {
        self.fluids = fluids;
        self
    }

    pub fn with_energy(mut self, energy: EnergySpec) -> Self {
        self.energy = Some(energy);
        self
    }
}

/// Persisted form of a [`MachineStorage`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineRecord {
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: StorageRecord,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fluids: StorageRecord,
    #[cfg_attr(feature = "serde", serde(default))]
    pub energy: u64,
}

#[cfg(feature = "serde")]
impl MachineRecord {
    pub fn to_json(&self) -> Result<String, RecordError> {
        serde_json::to_string_pretty(self).map_err(|e| RecordError::Codec(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json).map_err(|e| RecordError::Codec(e.to_string()))
    }

    pub fn to_bincode(&self) -> Result<Vec<u8>, RecordError> {
        bincode::serialize(self).map_err(|e| RecordError::Codec(e.to_string()))
    }

    pub fn from_bincode(bytes: &[u8]) -> Result<Self, RecordError> {
        bincode::deserialize(bytes).map_err(|e| RecordError::Codec(e.to_string()))
    }
}

/// The storages of one device.
///
/// Cloning yields another handle to the same storages.
#[derive(Clone, Debug)]
pub struct MachineStorage {
    items: ResourceStorage<ItemHandle>,
    fluids: ResourceStorage<FluidHandle>,
    energy: EnergyStorage,
}

impl MachineStorage {
    pub fn new(
        spec: MachineSpec,
        items: Arc<dyn ResourceOracle<ItemHandle>>,
        fluids: Arc<dyn ResourceOracle<FluidHandle>>,
        config: &StorageConfig,
    ) -> Result<Self, SpecError> {
        let items = if spec.items.is_empty() {
            ResourceStorage::empty()
        } else {
            ResourceStorage::with_config(spec.items, items, config)?
        };
        let fluids = if spec.fluids.is_empty() {
            ResourceStorage::empty()
        } else {
            ResourceStorage::with_config(spec.fluids, fluids, config)?
        };
        let energy = match spec.energy {
            Some(energy) => EnergyStorage::new(energy)?,
            None => EnergyStorage::empty(),
        };
        Ok(Self {
            items,
            fluids,
            energy,
        })
    }

    pub fn items(&self) -> &ResourceStorage<ItemHandle> {
        &self.items
    }

    pub fn fluids(&self) -> &ResourceStorage<FluidHandle> {
        &self.fluids
    }

    pub fn energy(&self) -> &EnergyStorage {
        &self.energy
    }

    /// Sum of the three storages' counters; moves on any committed change.
    pub fn modifications(&self) -> u64 {
        self.items.modifications() + self.fluids.modifications() + self.energy.modifications()
    }

    /// Installs one listener for changes to any of the three storages.
    ///
    /// A change made from inside the listener to a different storage of the
    /// same machine does not re-enter it.
    pub fn set_listener(&self, listener: impl FnMut() + 'static) {
        fn forward<F: FnMut() + 'static>(shared: &Rc<RefCell<F>>) -> impl FnMut() + 'static {
            let shared = Rc::clone(shared);
            move || {
                if let Ok(mut listener) = shared.try_borrow_mut() {
                    (&mut *listener)();
                }
            }
        }

        let shared = Rc::new(RefCell::new(listener));
        self.items.set_listener(forward(&shared));
        self.fluids.set_listener(forward(&shared));
        self.energy.set_listener(forward(&shared));
    }

    pub fn to_record(&self) -> Result<MachineRecord, RecordError> {
        Ok(MachineRecord {
            items: self.items.to_record()?,
            fluids: self.fluids.to_record()?,
            energy: self.energy.to_record(),
        })
    }

    /// Loads every storage from `record`, or nothing if any part is invalid.
    pub fn from_record(&self, record: &MachineRecord) -> Result<(), RecordError> {
        self.from_record_tx(record, None)
    }

    pub fn from_record_tx(
        &self,
        record: &MachineRecord,
        tx: Option<&mut Transaction<'_>>,
    ) -> Result<(), RecordError> {
        let items = self.items.stage_record(&record.items)?;
        let fluids = self.fluids.stage_record(&record.fluids)?;
        let energy = self.energy.stage_record(record.energy)?;

        let mut tx = Transaction::open_within(tx);
        self.items.apply_staged_tx(items, &mut tx);
        self.fluids.apply_staged_tx(fluids, &mut tx);
        self.energy.set_energy(energy, Some(&mut tx));
        tx.commit();
        Ok(())
    }

    /// Batch registering items, fluids and energy, in that order.
    ///
    /// Device-specific fields may be registered after these three.
    pub fn sync_batch(&self) -> SyncBatch {
        let mut batch = SyncBatch::new();
        batch.register(self.items.clone());
        batch.register(self.fluids.clone());
        batch.register(self.energy.clone());
        batch
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::overlay::Overlay;
    use crate::resource::{Catalog, ResourceDefinition};
    use crate::slot::{SlotRecord, SlotSpec};

    fn machine() -> MachineStorage {
        let items = Catalog::<ItemHandle>::new(vec![
            ResourceDefinition::new("coal"),
            ResourceDefinition::new("steel"),
        ])
        .unwrap();
        let fluids = Catalog::<FluidHandle>::new(vec![ResourceDefinition::new("oil")]).unwrap();
        let spec = MachineSpec::new()
            .with_items(StorageSpec::uniform(2, SlotSpec::new(64)))
            .with_fluids(StorageSpec::uniform(1, SlotSpec::new(StorageConfig::FLUID_BUCKET * 4)))
            .with_energy(EnergySpec::new(10_000, 200, 0));
        MachineStorage::new(spec, Arc::new(items), Arc::new(fluids), &StorageConfig::default())
            .unwrap()
    }

    #[test]
    fn modifications_cover_every_storage() {
        let machine = machine();
        let start = machine.modifications();
        machine.items().insert(ItemHandle(0), &Overlay::EMPTY, 3);
        machine.fluids().insert(FluidHandle(0), &Overlay::EMPTY, 500);
        machine.energy().insert(100);
        assert_eq!(machine.modifications(), start + 3);
    }

    #[test]
    fn one_listener_sees_all_storages() {
        let machine = machine();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        machine.set_listener(move || counter.set(counter.get() + 1));

        machine.items().insert(ItemHandle(1), &Overlay::EMPTY, 1);
        machine.energy().insert(1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn record_load_is_all_or_nothing() {
        let machine = machine();
        let good = MachineRecord {
            items: StorageRecord::new(vec![SlotRecord::new("steel", Overlay::EMPTY, 9)]),
            fluids: StorageRecord::new(vec![SlotRecord::new("oil", Overlay::EMPTY, 81_000)]),
            energy: 4_000,
        };
        machine.from_record(&good).unwrap();
        assert_eq!(machine.to_record().unwrap().energy, 4_000);

        let bad = MachineRecord {
            energy: 20_000,
            ..MachineRecord::default()
        };
        assert!(matches!(
            machine.from_record(&bad),
            Err(RecordError::EnergyExceedsCapacity { .. })
        ));
        assert_eq!(machine.items().slot(0).amount(), 9);
        assert_eq!(machine.energy().amount(), 4_000);
    }

    #[test]
    fn sync_batch_mirrors_machine() {
        let sender = machine();
        let receiver = machine();
        let mut outgoing = sender.sync_batch();
        let incoming = receiver.sync_batch();

        sender.items().insert(ItemHandle(0), &Overlay::EMPTY.with("grade", 3i64), 70);
        sender.energy().insert(640);
        incoming.decode(&outgoing.encode().unwrap().unwrap()).unwrap();
        assert_eq!(receiver.items().digest().unwrap(), sender.items().digest().unwrap());
        assert_eq!(receiver.energy().amount(), 640);

        sender.fluids().insert(FluidHandle(0), &Overlay::EMPTY, 1_000);
        incoming.decode(&outgoing.encode().unwrap().unwrap()).unwrap();
        assert_eq!(receiver.fluids().slot(0).amount(), 1_000);
        assert_eq!(outgoing.encode().unwrap(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn record_persists_as_json() {
        let machine = machine();
        machine.energy().insert(12);
        let record = machine.to_record().unwrap();
        let json = record.to_json().unwrap();
        assert_eq!(MachineRecord::from_json(&json).unwrap(), record);
        assert_eq!(MachineRecord::from_bincode(&record.to_bincode().unwrap()).unwrap(), record);
    }
}
