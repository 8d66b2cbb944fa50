//! Resource slots: the minimal stateful storage cell.
//!
//! A slot holds at most one `(resource, overlay)` pair and an amount bounded by
//! its capacity for that pair. [`ResourceSlot`] is a cheap shared handle; clones
//! (and storage views) refer to the same cell.
//!
//! Every mutating operation has a transactional variant taking an optional
//! [`Transaction`]. With a scope, the slot captures its state in that scope
//! before the first mutation; without one, the change is final immediately.

mod record;
mod spec;

pub use record::{RecordError, SlotRecord};
pub use spec::SlotSpec;

use std::cell::{OnceCell, Ref, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::overlay::Overlay;
use crate::resource::{Resource, ResourceFilter, ResourceOracle, ResourceSelector};
use crate::storage::ChangeNotifier;
use crate::transaction::{Participant, Transaction};
use crate::transfer::{ResourceFlow, SlotDisplay, TransferType};
use crate::wire::{WireError, WireReader, WireWriter};

/// Observable contents of a slot plus its modification counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotState<R> {
    pub resource: Option<R>,
    pub overlay: Overlay,
    pub amount: u64,
    pub modifications: u64,
}

impl<R> SlotState<R> {
    fn empty() -> Self {
        Self {
            resource: None,
            overlay: Overlay::EMPTY,
            amount: 0,
            modifications: 1,
        }
    }

    /// `resource` is absent iff `amount` is zero, and an absent resource has no overlay.
    pub fn is_sane(&self) -> bool {
        match self.resource {
            None => self.amount == 0 && self.overlay.is_empty(),
            Some(_) => self.amount > 0,
        }
    }

    fn set_empty(&mut self) {
        self.resource = None;
        self.overlay = Overlay::EMPTY;
        self.amount = 0;
    }
}

/// Decoded slot contents not yet applied to a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StagedContents<R> {
    resource: Option<R>,
    overlay: Overlay,
    amount: u64,
}

struct SlotCell<R: Resource> {
    state: RefCell<SlotState<R>>,
    spec: SlotSpec<R>,
    oracle: Arc<dyn ResourceOracle<R>>,
    owner: OnceCell<Weak<ChangeNotifier>>,
}

impl<R: Resource> Participant for SlotCell<R> {
    type Snapshot = SlotState<R>;

    fn capture(&self) -> SlotState<R> {
        self.state.borrow().clone()
    }

    fn restore(&self, snapshot: SlotState<R>) {
        debug_assert!(snapshot.is_sane());
        *self.state.borrow_mut() = snapshot;
    }
}

/// Shared handle to one resource slot.
#[derive(Clone)]
pub struct ResourceSlot<R: Resource> {
    cell: Rc<SlotCell<R>>,
}

impl<R: Resource> ResourceSlot<R> {
    pub fn new(spec: SlotSpec<R>, oracle: Arc<dyn ResourceOracle<R>>) -> Self {
        assert!(spec.capacity > 0, "slot capacity must be positive");
        Self {
            cell: Rc::new(SlotCell {
                state: RefCell::new(SlotState::empty()),
                spec,
                oracle,
                owner: OnceCell::new(),
            }),
        }
    }

    /// Links this slot to the storage that owns it.
    ///
    /// # Panics
    ///
    /// Panics if the slot already has an owner.
    pub(crate) fn attach_owner(&self, owner: &Rc<ChangeNotifier>) {
        let attached = self.cell.owner.set(Rc::downgrade(owner));
        assert!(attached.is_ok(), "slot is already owned by a storage");
    }

    /// True if both handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    // ===== state accessors =====

    fn state(&self) -> Ref<'_, SlotState<R>> {
        self.cell.state.borrow()
    }

    /// Snapshot of the current contents and counter.
    pub fn snapshot(&self) -> SlotState<R> {
        self.state().clone()
    }

    pub fn resource(&self) -> Option<R> {
        self.state().resource
    }

    pub fn overlay(&self) -> Overlay {
        self.state().overlay.clone()
    }

    pub fn amount(&self) -> u64 {
        self.state().amount
    }

    pub fn modifications(&self) -> u64 {
        self.state().modifications
    }

    pub fn is_empty(&self) -> bool {
        self.state().amount == 0
    }

    pub fn is_full(&self) -> bool {
        self.amount() >= self.real_capacity()
    }

    // ===== metadata =====

    pub fn oracle(&self) -> &Arc<dyn ResourceOracle<R>> {
        &self.cell.oracle
    }

    pub fn transfer_type(&self) -> TransferType {
        self.cell.spec.transfer
    }

    pub fn filter(&self) -> &ResourceFilter<R> {
        &self.cell.spec.filter
    }

    pub fn display(&self) -> Option<SlotDisplay> {
        self.cell.spec.display
    }

    pub fn external_flow(&self) -> ResourceFlow {
        self.cell.spec.external_flow()
    }

    // ===== capacity =====

    /// Nominal configured capacity.
    pub fn capacity(&self) -> u64 {
        self.cell.spec.capacity
    }

    /// Capacity for a concrete `(resource, overlay)` pair.
    pub fn capacity_for(&self, resource: R, overlay: &Overlay) -> u64 {
        let mut capacity = self.cell.spec.capacity;
        if let Some(limit) = self.cell.oracle.max_amount(resource) {
            capacity = capacity.min(limit);
        }
        if let Some(limit) = overlay.max_amount() {
            capacity = capacity.min(limit);
        }
        capacity
    }

    /// Capacity resolved against the currently held resource.
    pub fn real_capacity(&self) -> u64 {
        let state = self.state();
        match state.resource {
            Some(resource) => self.capacity_for(resource, &state.overlay),
            None => self.cell.spec.capacity,
        }
    }

    // ===== queries =====

    fn accepts(state: &SlotState<R>, resource: R, overlay: &Overlay) -> bool {
        match state.resource {
            None => true,
            Some(held) => held == resource && state.overlay == *overlay,
        }
    }

    fn selected(state: &SlotState<R>, selector: &ResourceSelector<'_, R>) -> bool {
        match state.resource {
            Some(held) => selector.matches(held, &state.overlay),
            None => false,
        }
    }

    /// True if the slot could accept at least one more unit of the pair.
    pub fn can_insert(&self, resource: R, overlay: &Overlay) -> bool {
        let state = self.state();
        Self::accepts(&state, resource, overlay)
            && state.amount < self.capacity_for(resource, overlay)
    }

    /// True if all of `amount` fits.
    pub fn can_insert_amount(&self, resource: R, overlay: &Overlay, amount: u64) -> bool {
        let state = self.state();
        Self::accepts(&state, resource, overlay)
            && state
                .amount
                .checked_add(amount)
                .is_some_and(|total| total <= self.capacity_for(resource, overlay))
    }

    /// Insertion check for external automation: honours transfer rules and the filter.
    pub fn can_insert_external(&self, resource: R, overlay: &Overlay) -> bool {
        self.cell.spec.transfer.external_insertion()
            && self.cell.spec.filter.allows(resource, overlay)
            && self.can_insert(resource, overlay)
    }

    pub fn can_extract_external(&self) -> bool {
        self.cell.spec.transfer.external_extraction() && !self.is_empty()
    }

    /// Amount [`insert`](Self::insert) would accept, without mutating.
    pub fn try_insert(&self, resource: R, overlay: &Overlay, amount: u64) -> u64 {
        let state = self.state();
        if !Self::accepts(&state, resource, overlay) {
            return 0;
        }
        self.capacity_for(resource, overlay)
            .saturating_sub(state.amount)
            .min(amount)
    }

    /// True if the slot holds `resource`, whatever its overlay.
    pub fn contains(&self, resource: R) -> bool {
        self.state().resource == Some(resource)
    }

    /// True if the slot holds `resource`; `None` for the overlay ignores it.
    pub fn contains_matching(&self, resource: R, overlay: Option<&Overlay>) -> bool {
        let selector = ResourceSelector {
            resource: Some(resource),
            overlay,
        };
        Self::selected(&self.state(), &selector)
    }

    pub fn can_extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> bool {
        if amount == 0 {
            return true;
        }
        let state = self.state();
        Self::selected(&state, &selector) && state.amount >= amount
    }

    /// Amount [`extract`](Self::extract) would remove, without mutating.
    pub fn try_extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> u64 {
        let state = self.state();
        if Self::selected(&state, &selector) {
            state.amount.min(amount)
        } else {
            0
        }
    }

    // ===== mutation =====

    /// Applies `mutate` under the slot's change-tracking rules.
    ///
    /// Registers with `tx` before mutating, bumps the counter exactly once and
    /// routes the owner notification through the transaction when present.
    fn update(&self, tx: Option<&mut Transaction<'_>>, mutate: impl FnOnce(&mut SlotState<R>)) {
        let owner = self.cell.owner.get().and_then(Weak::upgrade);
        match tx {
            Some(tx) => {
                tx.participate(&self.cell);
                self.mutate_state(mutate);
                if let Some(owner) = owner {
                    tx.participate(&owner);
                }
            }
            None => {
                self.mutate_state(mutate);
                if let Some(owner) = owner {
                    owner.notify();
                }
            }
        }
    }

    fn mutate_state(&self, mutate: impl FnOnce(&mut SlotState<R>)) {
        let mut state = self.cell.state.borrow_mut();
        mutate(&mut state);
        state.modifications += 1;
        assert!(state.is_sane(), "slot left in an inconsistent state: {state:?}");
    }

    pub fn insert(&self, resource: R, overlay: &Overlay, amount: u64) -> u64 {
        self.insert_tx(resource, overlay, amount, None)
    }

    /// Inserts up to `amount`, returning how much was accepted.
    pub fn insert_tx(
        &self,
        resource: R,
        overlay: &Overlay,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let accepted = self.try_insert(resource, overlay, amount);
        if accepted == 0 {
            return 0;
        }
        self.update(tx, |state| {
            if state.resource.is_none() {
                state.resource = Some(resource);
                state.overlay = overlay.clone();
            }
            state.amount += accepted;
        });
        accepted
    }

    /// Same as [`insert_tx`](Self::insert_tx) for a single slot; storages
    /// give the matching variant its fill-matching-first meaning.
    pub fn insert_matching(
        &self,
        resource: R,
        overlay: &Overlay,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        self.insert_tx(resource, overlay, amount, tx)
    }

    pub fn extract(&self, selector: ResourceSelector<'_, R>, amount: u64) -> u64 {
        self.extract_tx(selector, amount, None)
    }

    /// Removes up to `amount` of matching contents, emptying the slot at zero.
    pub fn extract_tx(
        &self,
        selector: ResourceSelector<'_, R>,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let extracted = self.try_extract(selector, amount);
        if extracted == 0 {
            return 0;
        }
        self.update(tx, |state| {
            state.amount -= extracted;
            if state.amount == 0 {
                state.set_empty();
            }
        });
        extracted
    }

    /// Removes exactly one unit if the contents match.
    pub fn extract_one(&self, selector: ResourceSelector<'_, R>) -> bool {
        self.extract_one_tx(selector, None)
    }

    pub fn extract_one_tx(
        &self,
        selector: ResourceSelector<'_, R>,
        tx: Option<&mut Transaction<'_>>,
    ) -> bool {
        self.extract_tx(selector, 1, tx) == 1
    }

    /// Extracts like [`extract_tx`](Self::extract_tx), then leaves the
    /// consumed resource's remainder behind once the slot runs empty.
    pub fn consume(
        &self,
        selector: ResourceSelector<'_, R>,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let Some(resource) = self.resource() else {
            return 0;
        };
        let consumed = self.extract_tx(selector, amount, tx.as_deref_mut());
        if consumed > 0 {
            self.insert_remainder(resource, consumed, tx);
        }
        consumed
    }

    pub fn consume_one(
        &self,
        selector: ResourceSelector<'_, R>,
        tx: Option<&mut Transaction<'_>>,
    ) -> bool {
        self.consume(selector, 1, tx) == 1
    }

    fn insert_remainder(&self, consumed: R, amount: u64, tx: Option<&mut Transaction<'_>>) {
        if !self.is_empty() {
            return;
        }
        if let Some(remainder) = self.cell.oracle.remainder(consumed) {
            let placed = self.insert_tx(remainder, &Overlay::EMPTY, amount, tx);
            tracing::trace!(?consumed, ?remainder, placed, "left consumption remainder");
        }
    }

    /// Swaps the slot's contents for a different resource.
    ///
    /// - Already holding the pair: returns `min(amount, max)`, no change.
    /// - Holding exactly `max` units and the new pair admits `max`: replaces
    ///   the contents and returns `max`.
    /// - Otherwise: returns `0`.
    pub fn exchange(
        &self,
        resource: R,
        overlay: &Overlay,
        max: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        {
            let state = self.state();
            if state.resource == Some(resource) && state.overlay == *overlay {
                return state.amount.min(max);
            }
            if max == 0 || state.amount != max || self.capacity_for(resource, overlay) < max {
                return 0;
            }
        }
        self.update(tx, |state| {
            state.resource = Some(resource);
            state.overlay = overlay.clone();
        });
        max
    }

    /// Overwrites the slot unconditionally.
    ///
    /// # Panics
    ///
    /// Panics if the triple breaks the slot sanity rule.
    pub fn set(&self, resource: Option<R>, overlay: Overlay, amount: u64) {
        self.set_tx(resource, overlay, amount, None);
    }

    pub fn set_tx(
        &self,
        resource: Option<R>,
        overlay: Overlay,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) {
        self.update(tx, |state| {
            state.resource = resource;
            state.overlay = overlay;
            state.amount = amount;
        });
    }

    pub fn clear(&self) {
        self.set(None, Overlay::EMPTY, 0);
    }

    // ===== structured records =====

    fn identifier(&self, resource: R) -> Option<String> {
        self.cell.oracle.identifier(resource).map(str::to_owned)
    }

    pub fn to_record(&self) -> Result<SlotRecord, RecordError> {
        let state = self.state();
        let Some(resource) = state.resource else {
            return Ok(SlotRecord::empty());
        };
        let identifier = self
            .identifier(resource)
            .ok_or_else(|| RecordError::UnregisteredResource(format!("{resource:?}")))?;
        Ok(SlotRecord::new(identifier, state.overlay.clone(), state.amount))
    }

    pub(crate) fn stage_record(
        &self,
        record: &SlotRecord,
    ) -> Result<StagedContents<R>, RecordError> {
        let Some(identifier) = record.resource.as_deref() else {
            if record.amount != 0 || !record.overlay.is_empty() {
                return Err(RecordError::InconsistentEmptyRecord {
                    amount: record.amount,
                });
            }
            return Ok(StagedContents::empty());
        };
        let resource = self
            .cell
            .oracle
            .resolve(identifier)
            .ok_or_else(|| RecordError::UnknownResource(identifier.to_owned()))?;
        if record.amount == 0 {
            return Err(RecordError::ZeroAmount {
                resource: identifier.to_owned(),
            });
        }
        let capacity = self.capacity_for(resource, &record.overlay);
        if record.amount > capacity {
            return Err(RecordError::AmountExceedsCapacity {
                resource: identifier.to_owned(),
                amount: record.amount,
                capacity,
            });
        }
        Ok(StagedContents {
            resource: Some(resource),
            overlay: record.overlay.clone(),
            amount: record.amount,
        })
    }

    /// Replaces the contents with those described by `record`.
    ///
    /// The slot is left untouched if the record is invalid.
    pub fn from_record(&self, record: &SlotRecord) -> Result<(), RecordError> {
        let staged = self.stage_record(record)?;
        self.apply_staged(staged);
        Ok(())
    }

    pub(crate) fn apply_staged(&self, staged: StagedContents<R>) {
        self.apply_staged_tx(staged, None);
    }

    pub(crate) fn apply_staged_tx(
        &self,
        staged: StagedContents<R>,
        tx: Option<&mut Transaction<'_>>,
    ) {
        self.set_tx(staged.resource, staged.overlay, staged.amount, tx);
    }

    // ===== wire form =====

    /// Writes `amount`, then the identifier and overlay when non-empty.
    pub fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        let state = self.state();
        writer.write_varint(state.amount);
        if let Some(resource) = state.resource {
            let identifier = self
                .cell
                .oracle
                .identifier(resource)
                .ok_or_else(|| WireError::UnregisteredResource(format!("{resource:?}")))?;
            writer.write_str(identifier)?;
            state.overlay.write_wire(writer)?;
        }
        Ok(())
    }

    pub(crate) fn stage_wire(
        &self,
        reader: &mut WireReader<'_>,
    ) -> Result<StagedContents<R>, WireError> {
        let amount = reader.read_varint()?;
        if amount == 0 {
            return Ok(StagedContents::empty());
        }
        let identifier = reader.read_str()?;
        let resource = self
            .cell
            .oracle
            .resolve(identifier)
            .ok_or_else(|| WireError::UnknownResource(identifier.to_owned()))?;
        let overlay = Overlay::read_wire(reader)?;
        let capacity = self.capacity_for(resource, &overlay);
        if amount > capacity {
            return Err(WireError::AmountExceedsCapacity { amount, capacity });
        }
        Ok(StagedContents {
            resource: Some(resource),
            overlay,
            amount,
        })
    }

    /// Reads a wire form written by [`write_wire`](Self::write_wire).
    ///
    /// The slot is left untouched if the payload is malformed.
    pub fn read_wire(&self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        let staged = self.stage_wire(reader)?;
        self.apply_staged(staged);
        Ok(())
    }
}

impl<R> StagedContents<R> {
    fn empty() -> Self {
        Self {
            resource: None,
            overlay: Overlay::EMPTY,
            amount: 0,
        }
    }
}

impl<R: Resource> core::fmt::Debug for ResourceSlot<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state();
        f.debug_struct("ResourceSlot")
            .field("resource", &state.resource)
            .field("overlay", &state.overlay)
            .field("amount", &state.amount)
            .field("capacity", &self.cell.spec.capacity)
            .field("modifications", &state.modifications)
            .finish()
    }
}
