//! Storage aggregates: ordered, fixed-size collections of slots.
//!
//! Whole-storage operations fan out across member slots left to right.
//! A [`ResourceStorage`] is itself a shared view: cloning it, or taking a
//! [`sub_storage`](ResourceStorage::sub_storage), never copies slot state.

mod notifier;
mod record;
mod spec;

pub(crate) use notifier::ChangeNotifier;
pub use record::StorageRecord;
pub use spec::{SpecError, StorageSpec};

use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::overlay::Overlay;
use crate::resource::{Resource, ResourceOracle, ResourceSelector};
use crate::slot::{RecordError, ResourceSlot, SlotState, StagedContents};
use crate::transaction::Transaction;
use crate::wire::{WireError, WireReader, WireWriter};

/// Ordered collection of resource slots of one kind.
#[derive(Clone)]
pub struct ResourceStorage<R: Resource> {
    slots: Rc<[ResourceSlot<R>]>,
    notifier: Rc<ChangeNotifier>,
}

impl<R: Resource> ResourceStorage<R> {
    /// Builds a storage with the default [`StorageConfig`] limits.
    pub fn new(
        spec: StorageSpec<R>,
        oracle: Arc<dyn ResourceOracle<R>>,
    ) -> Result<Self, SpecError> {
        Self::with_config(spec, oracle, &StorageConfig::default())
    }

    pub fn with_config(
        spec: StorageSpec<R>,
        oracle: Arc<dyn ResourceOracle<R>>,
        config: &StorageConfig,
    ) -> Result<Self, SpecError> {
        spec.validate(config)?;
        let notifier = Rc::new(ChangeNotifier::default());
        let slots: Rc<[ResourceSlot<R>]> = spec
            .into_slots()
            .into_iter()
            .map(|slot_spec| {
                let slot = ResourceSlot::new(slot_spec, Arc::clone(&oracle));
                slot.attach_owner(&notifier);
                slot
            })
            .collect();
        tracing::debug!(kind = %R::KIND, slots = slots.len(), "built resource storage");
        Ok(Self { slots, notifier })
    }

    /// A storage with no slots, for devices lacking this resource kind.
    pub fn empty() -> Self {
        Self {
            slots: Rc::from(Vec::new()),
            notifier: Rc::new(ChangeNotifier::default()),
        }
    }

    // ===== slot access =====

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn slot(&self, index: usize) -> &ResourceSlot<R> {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[ResourceSlot<R>] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSlot<R>> {
        self.slots.iter()
    }

    /// View over `range` sharing slots (and the change listener) with `self`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the storage.
    pub fn sub_storage(&self, range: Range<usize>) -> Self {
        Self {
            slots: self.slots[range].iter().cloned().collect(),
            notifier: Rc::clone(&self.notifier),
        }
    }

    /// View over arbitrary slots, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn sub_storage_of(&self, indices: &[usize]) -> Self {
        Self {
            slots: indices.iter().map(|&index| self.slots[index].clone()).collect(),
            notifier: Rc::clone(&self.notifier),
        }
    }

    // ===== change tracking =====

    /// Sum of every member slot's modification counter.
    pub fn modifications(&self) -> u64 {
        self.slots.iter().map(ResourceSlot::modifications).sum()
    }

    /// Per-slot counters, in slot order.
    pub fn counters(&self) -> Vec<u64> {
        self.slots.iter().map(ResourceSlot::modifications).collect()
    }

    /// Installs the callback fired after every committed change to any slot.
    ///
    /// Views created from this storage share the listener.
    pub fn set_listener(&self, listener: impl FnMut() + 'static) {
        self.notifier.set_listener(Some(Box::new(listener)));
    }

    pub fn clear_listener(&self) {
        self.notifier.set_listener(None);
    }

    // ===== queries =====

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ResourceSlot::is_empty)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(ResourceSlot::is_full)
    }

    pub fn can_insert(&self, resource: R, overlay: &Overlay) -> bool {
        self.slots.iter().any(|slot| slot.can_insert(resource, overlay))
    }

    /// True if the whole of `amount` fits across the storage.
    pub fn can_insert_amount(&self, resource: R, overlay: &Overlay, amount: u64) -> bool {
        self.try_insert(resource, overlay, amount) == amount
    }

    /// Amount [`insert`](Self::insert) would accept, without mutating.
    pub fn try_insert(&self, resource: R, overlay: &Overlay, amount: u64) -> u64 {
        let mut accepted = 0;
        for slot in self.slots.iter() {
            if accepted == amount {
                break;
            }
            accepted += slot.try_insert(resource, overlay, amount - accepted);
        }
        accepted
    }

    pub fn contains(&self, resource: R) -> bool {
        self.slots.iter().any(|slot| slot.contains(resource))
    }

    pub fn contains_matching(&self, resource: R, overlay: Option<&Overlay>) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.contains_matching(resource, overlay))
    }

    /// Total amount held by slots matching `selector`.
    pub fn count(&self, selector: ResourceSelector<'_, R>) -> u64 {
        self.slots
            .iter()
            .map(|slot| slot.try_extract(selector, u64::MAX))
            .sum()
    }

    /// True if matching slots together hold at least `amount`.
    pub fn can_extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> bool {
        self.try_extract(selector, amount) == amount
    }

    /// Amount [`extract`](Self::extract) would remove, without mutating.
    pub fn try_extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> u64 {
        let mut extracted = 0;
        for slot in self.slots.iter() {
            if extracted == amount {
                break;
            }
            extracted += slot.try_extract(selector, amount - extracted);
        }
        extracted
    }

    // ===== mutation =====

    pub fn insert(&self, resource: R, overlay: &Overlay, amount: u64) -> u64 {
        self.insert_tx(resource, overlay, amount, None)
    }

    /// Fills slots left to right until `amount` is placed or slots run out.
    pub fn insert_tx(
        &self,
        resource: R,
        overlay: &Overlay,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let mut inserted = 0;
        for slot in self.slots.iter() {
            if inserted == amount {
                break;
            }
            inserted += slot.insert_tx(resource, overlay, amount - inserted, tx.as_deref_mut());
        }
        inserted
    }

    /// Tops up slots already holding the pair before touching any other slot.
    ///
    /// Ties between matching slots go to the lower index.
    pub fn insert_matching(
        &self,
        resource: R,
        overlay: &Overlay,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let mut inserted = 0;
        for slot in self.slots.iter() {
            if inserted == amount {
                return inserted;
            }
            if slot.contains_matching(resource, Some(overlay)) {
                inserted += slot.insert_tx(resource, overlay, amount - inserted, tx.as_deref_mut());
            }
        }
        inserted + self.insert_tx(resource, overlay, amount - inserted, tx)
    }

    pub fn extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> u64 {
        self.extract_tx(selector, amount, None)
    }

    /// Drains matching slots left to right until `amount` is removed.
    pub fn extract_tx(
        &self,
        selector: ResourceSelector<'_, R>,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let mut extracted = 0;
        for slot in self.slots.iter() {
            if extracted == amount {
                break;
            }
            extracted += slot.extract_tx(selector, amount - extracted, tx.as_deref_mut());
        }
        extracted
    }

    /// Removes one unit from the first matching slot.
    pub fn extract_one(&self, selector: ResourceSelector<'_, R>) -> bool {
        self.extract_one_tx(selector, None)
    }

    pub fn extract_one_tx(
        &self,
        selector: ResourceSelector<'_, R>,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.extract_one_tx(selector, tx.as_deref_mut()))
    }

    /// Moves up to `max` units of the pair from `self` into `to`.
    ///
    /// Runs in its own scope (nested under `tx` when given): the insert and the
    /// matching extract either both apply or neither does. Returns the amount moved.
    ///
    /// Slots held by both storages are never extracted from, so the returned
    /// amount is always a net move. Two views over the same slots move nothing.
    pub fn move_to(
        &self,
        to: &ResourceStorage<R>,
        resource: R,
        overlay: &Overlay,
        max: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        if max == 0 {
            return 0;
        }
        let source = self.without_slots_of(to);
        let selector = ResourceSelector::exact(resource, overlay);
        let available = source.try_extract(selector, max);
        if available == 0 {
            return 0;
        }
        let mut scope = Transaction::open_within(tx);
        let accepted = to.insert_tx(resource, overlay, available, Some(&mut scope));
        if accepted > 0 && source.extract_tx(selector, accepted, Some(&mut scope)) == accepted {
            scope.commit();
            accepted
        } else {
            scope.abort();
            0
        }
    }

    /// View over the slots of `self` that `other` does not also hold.
    fn without_slots_of(&self, other: &Self) -> Self {
        let shared = |slot: &ResourceSlot<R>| other.slots.iter().any(|held| held.ptr_eq(slot));
        if !self.slots.iter().any(shared) {
            return self.clone();
        }
        Self {
            slots: self.slots.iter().filter(|&slot| !shared(slot)).cloned().collect(),
            notifier: Rc::clone(&self.notifier),
        }
    }

    /// Empties every slot.
    pub fn clear(&self) {
        self.clear_tx(None);
    }

    pub fn clear_tx(&self, tx: Option<&mut Transaction<'_>>) {
        let mut scope = Transaction::open_within(tx);
        for slot in self.slots.iter().filter(|slot| !slot.is_empty()) {
            slot.set_tx(None, Overlay::EMPTY, 0, Some(&mut scope));
        }
        scope.commit();
    }

    /// Applies staged contents as one committed change.
    ///
    /// Grouping under a transaction fires the listener once for the batch.
    pub(crate) fn apply_staged(
        &self,
        staged: Vec<(usize, StagedContents<R>)>,
        tx: Option<&mut Transaction<'_>>,
    ) {
        if staged.is_empty() {
            return;
        }
        let mut scope = Transaction::open_within(tx);
        self.apply_staged_tx(staged, &mut scope);
        scope.commit();
    }

    pub(crate) fn apply_staged_tx(
        &self,
        staged: Vec<(usize, StagedContents<R>)>,
        tx: &mut Transaction<'_>,
    ) {
        for (index, contents) in staged {
            self.slots[index].apply_staged_tx(contents, Some(&mut *tx));
        }
    }

    /// Current state of every slot, in order.
    pub fn snapshot(&self) -> Vec<SlotState<R>> {
        self.slots.iter().map(ResourceSlot::snapshot).collect()
    }

    // ===== structured records =====

    pub fn to_record(&self) -> Result<StorageRecord, RecordError> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.to_record().map_err(|e| e.at_slot(index)))
            .collect::<Result<Vec<_>, _>>()
            .map(StorageRecord::new)
    }

    /// Loads `record` into the leading slots.
    ///
    /// Nothing changes unless every entry is valid. A record longer than the
    /// storage is rejected; a shorter one leaves trailing slots untouched.
    pub fn from_record(&self, record: &StorageRecord) -> Result<(), RecordError> {
        self.from_record_tx(record, None)
    }

    pub fn from_record_tx(
        &self,
        record: &StorageRecord,
        tx: Option<&mut Transaction<'_>>,
    ) -> Result<(), RecordError> {
        let staged = self.stage_record(record)?;
        self.apply_staged(staged, tx);
        Ok(())
    }

    pub(crate) fn stage_record(
        &self,
        record: &StorageRecord,
    ) -> Result<Vec<(usize, StagedContents<R>)>, RecordError> {
        if record.len() > self.size() {
            return Err(RecordError::LengthMismatch {
                expected: self.size(),
                actual: record.len(),
            });
        }
        record
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot_record)| {
                self.slots[index]
                    .stage_record(slot_record)
                    .map(|contents| (index, contents))
                    .map_err(|e| e.at_slot(index))
            })
            .collect()
    }

    // ===== wire form =====

    /// Full wire form: every slot's wire form, in slot order.
    pub fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        for slot in self.slots.iter() {
            slot.write_wire(writer)?;
        }
        Ok(())
    }

    pub fn read_wire(&self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        let staged = self.stage_full(reader)?;
        self.apply_staged(staged, None);
        Ok(())
    }

    pub(crate) fn stage_full(
        &self,
        reader: &mut WireReader<'_>,
    ) -> Result<Vec<(usize, StagedContents<R>)>, WireError> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.stage_wire(reader).map(|contents| (index, contents)))
            .collect()
    }

    /// SHA-256 of the full wire form.
    ///
    /// Two storages with equal digests hold the same resources, overlays and
    /// amounts in every slot.
    pub fn digest(&self) -> Result<[u8; 32], WireError> {
        let mut writer = WireWriter::new();
        self.write_wire(&mut writer)?;
        Ok(Sha256::digest(writer.as_slice()).into())
    }
}

impl<R: Resource> core::fmt::Debug for ResourceStorage<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceStorage")
            .field("slots", &self.slots)
            .finish()
    }
}
