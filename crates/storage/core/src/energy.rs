//! Capacity-only energy storage.
//!
//! Energy has no identity or overlay: a single amount bounded by a capacity,
//! plus the rates at which external automation may move energy in and out.
//! It shares the slot change-tracking rules: one counter bump per committed
//! change, snapshot/rollback under a [`Transaction`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::slot::RecordError;
use crate::storage::{ChangeNotifier, SpecError};
use crate::transaction::{Participant, Transaction};
use crate::transfer::ResourceFlow;
use crate::wire::{WireError, WireReader, WireWriter};

/// Construction-time description of an energy storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnergySpec {
    pub capacity: u64,
    /// Most energy external automation may insert per operation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_input: u64,
    /// Most energy external automation may extract per operation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_output: u64,
}

impl EnergySpec {
    pub fn new(capacity: u64, max_input: u64, max_output: u64) -> Self {
        Self {
            capacity,
            max_input,
            max_output,
        }
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.capacity == 0 {
            return Err(SpecError::ZeroEnergyCapacity);
        }
        for (direction, rate) in [("input", self.max_input), ("output", self.max_output)] {
            if rate > self.capacity {
                return Err(SpecError::EnergyRateExceedsCapacity {
                    direction,
                    rate,
                    capacity: self.capacity,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EnergyState {
    amount: u64,
    modifications: u64,
}

struct EnergyCell {
    state: RefCell<EnergyState>,
    spec: EnergySpec,
    notifier: Rc<ChangeNotifier>,
}

impl Participant for EnergyCell {
    type Snapshot = EnergyState;

    fn capture(&self) -> EnergyState {
        *self.state.borrow()
    }

    fn restore(&self, snapshot: EnergyState) {
        *self.state.borrow_mut() = snapshot;
    }
}

/// Shared handle to an energy storage.
#[derive(Clone)]
pub struct EnergyStorage {
    cell: Rc<EnergyCell>,
}

impl EnergyStorage {
    pub fn new(spec: EnergySpec) -> Result<Self, SpecError> {
        spec.validate()?;
        Ok(Self::from_valid(spec))
    }

    /// Storage with no capacity, for devices that do not use energy.
    pub fn empty() -> Self {
        Self::from_valid(EnergySpec::default())
    }

    fn from_valid(spec: EnergySpec) -> Self {
        Self {
            cell: Rc::new(EnergyCell {
                state: RefCell::new(EnergyState {
                    amount: 0,
                    modifications: 1,
                }),
                spec,
                notifier: Rc::new(ChangeNotifier::default()),
            }),
        }
    }

    pub fn amount(&self) -> u64 {
        self.cell.state.borrow().amount
    }

    pub fn capacity(&self) -> u64 {
        self.cell.spec.capacity
    }

    pub fn modifications(&self) -> u64 {
        self.cell.state.borrow().modifications
    }

    pub fn is_empty(&self) -> bool {
        self.amount() == 0
    }

    pub fn is_full(&self) -> bool {
        self.amount() >= self.capacity()
    }

    pub fn external_insertion_rate(&self) -> u64 {
        self.cell.spec.max_input
    }

    pub fn external_extraction_rate(&self) -> u64 {
        self.cell.spec.max_output
    }

    /// Directions external automation may move energy.
    pub fn external_flow(&self) -> ResourceFlow {
        let mut flow = ResourceFlow::empty();
        flow.set(ResourceFlow::INPUT, self.cell.spec.max_input > 0);
        flow.set(ResourceFlow::OUTPUT, self.cell.spec.max_output > 0);
        flow
    }

    pub fn set_listener(&self, listener: impl FnMut() + 'static) {
        self.cell.notifier.set_listener(Some(Box::new(listener)));
    }

    // ===== queries =====

    pub fn can_insert(&self, amount: u64) -> bool {
        amount <= self.capacity() - self.amount()
    }

    pub fn can_extract(&self, amount: u64) -> bool {
        self.amount() >= amount
    }

    pub fn try_insert(&self, amount: u64) -> u64 {
        amount.min(self.capacity() - self.amount())
    }

    pub fn try_extract(&self, amount: u64) -> u64 {
        amount.min(self.amount())
    }

    // ===== mutation =====

    fn update(&self, tx: Option<&mut Transaction<'_>>, amount: u64) {
        debug_assert!(amount <= self.capacity());
        let notifier = &self.cell.notifier;
        match tx {
            Some(tx) => {
                tx.participate(&self.cell);
                self.write(amount);
                tx.participate(notifier);
            }
            None => {
                self.write(amount);
                notifier.notify();
            }
        }
    }

    fn write(&self, amount: u64) {
        let mut state = self.cell.state.borrow_mut();
        state.amount = amount;
        state.modifications += 1;
    }

    pub fn insert(&self, amount: u64) -> u64 {
        self.insert_tx(amount, None)
    }

    pub fn insert_tx(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        let inserted = self.try_insert(amount);
        if inserted > 0 {
            self.update(tx, self.amount() + inserted);
        }
        inserted
    }

    pub fn extract(&self, amount: u64) -> u64 {
        self.extract_tx(amount, None)
    }

    pub fn extract_tx(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        let extracted = self.try_extract(amount);
        if extracted > 0 {
            self.update(tx, self.amount() - extracted);
        }
        extracted
    }

    /// Inserts all of `amount` or nothing.
    pub fn insert_exact(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> bool {
        if !self.can_insert(amount) {
            return false;
        }
        if amount > 0 {
            self.update(tx, self.amount() + amount);
        }
        true
    }

    /// Extracts all of `amount` or nothing.
    pub fn extract_exact(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> bool {
        if !self.can_extract(amount) {
            return false;
        }
        if amount > 0 {
            self.update(tx, self.amount() - amount);
        }
        true
    }

    /// Insertion by external automation, capped at the input rate.
    pub fn insert_external(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        self.insert_tx(amount.min(self.cell.spec.max_input), tx)
    }

    /// Extraction by external automation, capped at the output rate.
    pub fn extract_external(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        self.extract_tx(amount.min(self.cell.spec.max_output), tx)
    }

    /// # Panics
    ///
    /// Panics if `amount` exceeds the capacity.
    pub fn set_energy(&self, amount: u64, tx: Option<&mut Transaction<'_>>) {
        assert!(
            amount <= self.capacity(),
            "energy {amount} exceeds capacity {}",
            self.capacity()
        );
        self.update(tx, amount);
    }

    // ===== records and wire =====

    pub fn to_record(&self) -> u64 {
        self.amount()
    }

    pub fn from_record(&self, amount: u64) -> Result<(), RecordError> {
        let amount = self.stage_record(amount)?;
        self.update(None, amount);
        Ok(())
    }

    pub(crate) fn stage_record(&self, amount: u64) -> Result<u64, RecordError> {
        self.check_amount(amount)
            .map_err(|capacity| RecordError::EnergyExceedsCapacity { amount, capacity })?;
        Ok(amount)
    }

    pub fn write_wire(&self, writer: &mut WireWriter) {
        writer.write_varint(self.amount());
    }

    pub fn read_wire(&self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        let amount = self.stage_wire(reader)?;
        self.update(None, amount);
        Ok(())
    }

    pub(crate) fn stage_wire(&self, reader: &mut WireReader<'_>) -> Result<u64, WireError> {
        let amount = reader.read_varint()?;
        self.check_amount(amount)
            .map_err(|capacity| WireError::AmountExceedsCapacity { amount, capacity })?;
        Ok(amount)
    }

    fn check_amount(&self, amount: u64) -> Result<(), u64> {
        if amount > self.capacity() {
            Err(self.capacity())
        } else {
            Ok(())
        }
    }
}

impl core::fmt::Debug for EnergyStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnergyStorage")
            .field("amount", &self.amount())
            .field("spec", &self.cell.spec)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn battery() -> EnergyStorage {
        EnergyStorage::new(EnergySpec::new(1_000, 100, 50)).unwrap()
    }

    #[test]
    fn partial_insert_and_extract() {
        let energy = battery();
        assert_eq!(energy.insert(1_200), 1_000);
        assert!(energy.is_full());
        assert_eq!(energy.extract(300), 300);
        assert_eq!(energy.amount(), 700);
    }

    #[test]
    fn exact_operations_are_all_or_nothing() {
        let energy = battery();
        energy.insert(900);
        let before = energy.modifications();
        assert!(!energy.insert_exact(200, None));
        assert_eq!(energy.modifications(), before);
        assert!(energy.insert_exact(100, None));
        assert!(!energy.extract_exact(1_001, None));
        assert!(energy.extract_exact(1_000, None));
        assert!(energy.is_empty());
    }

    #[test]
    fn external_operations_respect_rates() {
        let energy = battery();
        assert_eq!(energy.insert_external(500, None), 100);
        assert_eq!(energy.extract_external(500, None), 50);
        assert_eq!(energy.external_flow(), ResourceFlow::BOTH);
        assert!(EnergyStorage::empty().external_flow().is_empty());
    }

    #[test]
    fn aborted_changes_restore_amount_and_counter() {
        let energy = battery();
        energy.insert(10);
        let (amount, counter) = (energy.amount(), energy.modifications());

        let mut outer = Transaction::open();
        energy.insert_tx(100, Some(&mut outer));
        {
            let mut inner = outer.nested();
            energy.set_energy(0, Some(&mut inner));
            inner.commit();
        }
        assert_eq!(energy.amount(), 0);
        outer.abort();
        assert_eq!(energy.amount(), amount);
        assert_eq!(energy.modifications(), counter);
    }

    #[test]
    fn listener_fires_after_commit() {
        let energy = battery();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        energy.set_listener(move || counter.set(counter.get() + 1));

        let mut tx = Transaction::open();
        energy.insert_tx(5, Some(&mut tx));
        energy.insert_tx(5, Some(&mut tx));
        tx.commit();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn record_and_wire_forms_validate_capacity() {
        let energy = battery();
        assert_eq!(
            energy.from_record(5_000),
            Err(RecordError::EnergyExceedsCapacity {
                amount: 5_000,
                capacity: 1_000
            })
        );
        energy.from_record(640).unwrap();
        assert_eq!(energy.to_record(), 640);

        let mut writer = WireWriter::new();
        energy.write_wire(&mut writer);
        let bytes = writer.into_bytes();
        let mirror = battery();
        mirror.read_wire(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(mirror.amount(), 640);
    }

    #[test]
    fn spec_validation() {
        assert_eq!(
            EnergySpec::new(0, 0, 0).validate(),
            Err(SpecError::ZeroEnergyCapacity)
        );
        assert!(matches!(
            EnergySpec::new(10, 20, 0).validate(),
            Err(SpecError::EnergyRateExceedsCapacity {
                direction: "input",
                ..
            })
        ));
    }
}
