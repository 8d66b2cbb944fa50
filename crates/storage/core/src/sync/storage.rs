use crate::energy::EnergyStorage;
use crate::resource::Resource;
use crate::storage::ResourceStorage;
use crate::transaction::Transaction;
use crate::wire::{WireError, WireReader, WireWriter};

use super::DeltaSync;

/// Storages track one counter per slot.
///
/// Delta form: `count`, then `count` pairs of `(index, slot wire form)` in
/// ascending index order. When every slot changed, `count == size` and the
/// full form follows with no index prefixes.
impl<R: Resource> DeltaSync for ResourceStorage<R> {
    type Baseline = Vec<u64>;

    fn unsent(&self) -> Vec<u64> {
        // Counters start at 1
        vec![0; self.size()]
    }

    fn baseline(&self) -> Vec<u64> {
        self.counters()
    }

    fn has_changed(&self, previous: &Vec<u64>) -> bool {
        self.slots()
            .iter()
            .zip(previous)
            .any(|(slot, &seen)| slot.modifications() != seen)
    }

    fn write_full(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        self.write_wire(writer)
    }

    /// # Panics
    ///
    /// Panics if `previous` does not hold one counter per slot.
    fn write_delta(&self, writer: &mut WireWriter, previous: &Vec<u64>) -> Result<(), WireError> {
        assert_eq!(previous.len(), self.size(), "baseline length must match storage size");
        let changed: Vec<usize> = self
            .slots()
            .iter()
            .zip(previous)
            .enumerate()
            .filter(|(_, (slot, seen))| slot.modifications() != **seen)
            .map(|(index, _)| index)
            .collect();

        writer.write_varint(changed.len() as u64);
        if changed.len() == self.size() {
            tracing::trace!(slots = self.size(), "every slot changed, sending full form");
            return self.write_full(writer);
        }
        for index in changed {
            writer.write_varint(index as u64);
            self.slot(index).write_wire(writer)?;
        }
        Ok(())
    }

    fn read_full(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let staged = self.stage_full(reader)?;
        self.apply_staged_tx(staged, tx);
        Ok(())
    }

    fn read_delta(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let size = self.size();
        let count = reader.read_varint()?;
        if count == size as u64 {
            return self.read_full(reader, tx);
        }
        if count > size as u64 {
            tracing::debug!(count, size, "rejected storage delta");
            return Err(WireError::CountExceedsSize { count, size });
        }

        let mut seen = vec![false; size];
        let mut staged = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = reader.read_varint()?;
            let index = usize::try_from(raw)
                .ok()
                .filter(|&index| index < size)
                .ok_or(WireError::SlotIndexOutOfRange { index: raw, size })?;
            if std::mem::replace(&mut seen[index], true) {
                return Err(WireError::DuplicateSlotIndex(raw));
            }
            staged.push((index, self.slot(index).stage_wire(reader)?));
        }
        self.apply_staged_tx(staged, tx);
        Ok(())
    }
}

/// Energy tracks its single counter; the delta form is the full amount.
impl DeltaSync for EnergyStorage {
    type Baseline = u64;

    fn unsent(&self) -> u64 {
        0
    }

    fn baseline(&self) -> u64 {
        self.modifications()
    }

    fn has_changed(&self, previous: &u64) -> bool {
        self.modifications() != *previous
    }

    fn write_full(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        self.write_wire(writer);
        Ok(())
    }

    fn read_full(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let amount = self.stage_wire(reader)?;
        self.set_energy(amount, Some(tx));
        Ok(())
    }
}
