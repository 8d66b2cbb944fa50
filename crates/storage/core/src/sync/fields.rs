//! Scalar values synchronized alongside storages.

use std::cell::RefCell;
use std::rc::Rc;

use strum::IntoEnumIterator;

use crate::transaction::{Participant, Transaction};
use crate::wire::{WireError, WireReader, WireValue, WireWriter};

use super::DeltaSync;

struct FieldCell<T> {
    value: RefCell<T>,
}

impl<T: Clone + 'static> Participant for FieldCell<T> {
    type Snapshot = T;

    fn capture(&self) -> T {
        self.value.borrow().clone()
    }

    fn restore(&self, snapshot: T) {
        *self.value.borrow_mut() = snapshot;
    }
}

impl<T: Clone + 'static> FieldCell<T> {
    fn shared(value: T) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
        })
    }

    fn store(self: &Rc<Self>, value: T, tx: Option<&mut Transaction<'_>>) {
        if let Some(tx) = tx {
            tx.participate(self);
        }
        *self.value.borrow_mut() = value;
    }
}

/// Shared value whose delta form is its full wire form.
///
/// Change detection compares against the last sent value, so setting a field
/// back to what the observer already has costs nothing.
#[derive(Clone)]
pub struct ValueField<T> {
    cell: Rc<FieldCell<T>>,
}

impl<T: WireValue + 'static> ValueField<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: FieldCell::shared(value),
        }
    }

    pub fn get(&self) -> T {
        self.cell.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.cell.store(value, None);
    }

    pub fn set_tx(&self, value: T, tx: Option<&mut Transaction<'_>>) {
        self.cell.store(value, tx);
    }
}

impl<T: WireValue + 'static> DeltaSync for ValueField<T> {
    type Baseline = Option<T>;

    fn unsent(&self) -> Option<T> {
        None
    }

    fn baseline(&self) -> Option<T> {
        Some(self.get())
    }

    fn has_changed(&self, previous: &Option<T>) -> bool {
        previous.as_ref() != Some(&*self.cell.value.borrow())
    }

    fn write_full(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        self.cell.value.borrow().write_wire(writer)
    }

    fn read_full(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let value = T::read_wire(reader)?;
        self.cell.store(value, Some(tx));
        Ok(())
    }
}

impl<T: WireValue + core::fmt::Debug> core::fmt::Debug for ValueField<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ValueField")
            .field(&*self.cell.value.borrow())
            .finish()
    }
}

/// Shared optional enumeration value.
///
/// Encoded as a varint ordinal: `0` for none, `i + 1` for the variant at
/// declaration position `i`.
#[derive(Clone)]
pub struct EnumField<E> {
    cell: Rc<FieldCell<Option<E>>>,
}

impl<E> EnumField<E>
where
    E: IntoEnumIterator + Copy + PartialEq + 'static,
{
    pub fn new(value: Option<E>) -> Self {
        Self {
            cell: FieldCell::shared(value),
        }
    }

    pub fn get(&self) -> Option<E> {
        *self.cell.value.borrow()
    }

    pub fn set(&self, value: Option<E>) {
        self.cell.store(value, None);
    }

    pub fn set_tx(&self, value: Option<E>, tx: Option<&mut Transaction<'_>>) {
        self.cell.store(value, tx);
    }

    fn ordinal(value: Option<E>) -> u64 {
        value
            .and_then(|value| E::iter().position(|variant| variant == value))
            .map_or(0, |position| position as u64 + 1)
    }

    fn from_ordinal(ordinal: u64) -> Result<Option<E>, WireError> {
        let Some(position) = ordinal.checked_sub(1) else {
            return Ok(None);
        };
        usize::try_from(position)
            .ok()
            .and_then(|position| E::iter().nth(position))
            .map(Some)
            .ok_or(WireError::InvalidOrdinal(ordinal))
    }
}

impl<E> DeltaSync for EnumField<E>
where
    E: IntoEnumIterator + Copy + PartialEq + 'static,
{
    type Baseline = Option<Option<E>>;

    fn unsent(&self) -> Option<Option<E>> {
        None
    }

    fn baseline(&self) -> Option<Option<E>> {
        Some(self.get())
    }

    fn has_changed(&self, previous: &Option<Option<E>>) -> bool {
        *previous != Some(self.get())
    }

    fn write_full(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        writer.write_varint(Self::ordinal(self.get()));
        Ok(())
    }

    fn read_full(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let value = Self::from_ordinal(reader.read_varint()?)?;
        self.cell.store(value, Some(tx));
        Ok(())
    }
}

impl<E: core::fmt::Debug> core::fmt::Debug for EnumField<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("EnumField")
            .field(&*self.cell.value.borrow())
            .finish()
    }
}
