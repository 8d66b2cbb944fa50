use crate::transaction::Transaction;
use crate::wire::{WireError, WireReader, WireWriter};

use super::DeltaSync;

/// Type-erased datum plus the baseline of what was last sent.
trait Tracked {
    fn has_changed(&self) -> bool;

    fn write(&self, writer: &mut WireWriter, full: bool) -> Result<(), WireError>;

    fn mark_sent(&mut self);

    fn read(
        &self,
        reader: &mut WireReader<'_>,
        full: bool,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError>;
}

struct Entry<D: DeltaSync> {
    datum: D,
    previous: D::Baseline,
}

impl<D: DeltaSync> Tracked for Entry<D> {
    fn has_changed(&self) -> bool {
        self.datum.has_changed(&self.previous)
    }

    fn write(&self, writer: &mut WireWriter, full: bool) -> Result<(), WireError> {
        if full {
            self.datum.write_full(writer)
        } else {
            self.datum.write_delta(writer, &self.previous)
        }
    }

    fn mark_sent(&mut self) {
        self.previous = self.datum.baseline();
    }

    fn read(
        &self,
        reader: &mut WireReader<'_>,
        full: bool,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        if full {
            self.datum.read_full(reader, tx)
        } else {
            self.datum.read_delta(reader, tx)
        }
    }
}

/// Ordered set of synchronized data sharing one payload.
///
/// Sender and receiver register the same data in the same order.
///
/// Payload: `count` of changed data. When `count` equals the number of
/// registered data, every datum's full form follows in registration order;
/// otherwise `count` pairs of `(index, delta form)` in ascending index order.
#[derive(Default)]
pub struct SyncBatch {
    entries: Vec<Box<dyn Tracked>>,
}

impl SyncBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `datum` and returns its index. It counts as never sent.
    pub fn register<D: DeltaSync + 'static>(&mut self, datum: D) -> usize {
        let previous = datum.unsent();
        self.entries.push(Box::new(Entry { datum, previous }));
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any datum changed since it was last sent.
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|entry| entry.has_changed())
    }

    /// Encodes what changed since the previous encode, or `None` if nothing did.
    ///
    /// Baselines move only when encoding succeeds.
    pub fn encode(&mut self) -> Result<Option<Vec<u8>>, WireError> {
        let changed: Vec<usize> = (0..self.entries.len())
            .filter(|&index| self.entries[index].has_changed())
            .collect();
        if changed.is_empty() {
            return Ok(None);
        }
        if changed.len() == self.entries.len() {
            return self.encode_full().map(Some);
        }

        let mut writer = WireWriter::new();
        writer.write_varint(changed.len() as u64);
        for &index in &changed {
            writer.write_varint(index as u64);
            self.entries[index].write(&mut writer, false)?;
        }
        for &index in &changed {
            self.entries[index].mark_sent();
        }
        tracing::trace!(changed = changed.len(), size = self.entries.len(), "encoded sync delta");
        Ok(Some(writer.into_bytes()))
    }

    /// Encodes every datum in full, regardless of what changed.
    pub fn encode_full(&mut self) -> Result<Vec<u8>, WireError> {
        let mut writer = WireWriter::new();
        writer.write_varint(self.entries.len() as u64);
        for entry in &self.entries {
            entry.write(&mut writer, true)?;
        }
        for entry in &mut self.entries {
            entry.mark_sent();
        }
        tracing::trace!(size = self.entries.len(), "encoded full sync");
        Ok(writer.into_bytes())
    }

    /// Applies a payload from [`encode`](Self::encode) or
    /// [`encode_full`](Self::encode_full).
    ///
    /// The payload is applied as one transaction: on error nothing changes,
    /// and listeners fire once after a successful decode.
    pub fn decode(&self, payload: &[u8]) -> Result<(), WireError> {
        self.decode_tx(payload, None)
    }

    /// Like [`decode`](Self::decode), inside a scope nested under `tx`.
    pub fn decode_tx(
        &self,
        payload: &[u8],
        tx: Option<&mut Transaction<'_>>,
    ) -> Result<(), WireError> {
        let mut reader = WireReader::new(payload);
        let mut tx = Transaction::open_within(tx);
        let result = self
            .decode_into(&mut reader, &mut tx)
            .and_then(|()| reader.finish());
        match result {
            Ok(()) => {
                tx.commit();
                Ok(())
            }
            Err(error) => {
                tracing::debug!(%error, "rejected sync payload");
                tx.abort();
                Err(error)
            }
        }
    }

    fn decode_into(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        let size = self.entries.len();
        let count = reader.read_varint()?;
        if count == size as u64 {
            for entry in &self.entries {
                entry.read(reader, true, tx)?;
            }
            return Ok(());
        }
        if count > size as u64 {
            return Err(WireError::CountExceedsSize { count, size });
        }

        let mut seen = vec![false; size];
        for _ in 0..count {
            let raw = reader.read_varint()?;
            let index = usize::try_from(raw)
                .ok()
                .filter(|&index| index < size)
                .ok_or(WireError::FieldIndexOutOfRange { index: raw, size })?;
            if std::mem::replace(&mut seen[index], true) {
                return Err(WireError::DuplicateFieldIndex(raw));
            }
            self.entries[index].read(reader, false, tx)?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for SyncBatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncBatch")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ValueField;

    fn batch() -> (SyncBatch, ValueField<u32>, ValueField<bool>, ValueField<i64>) {
        let progress = ValueField::new(0u32);
        let active = ValueField::new(false);
        let heat = ValueField::new(20i64);
        let mut batch = SyncBatch::new();
        batch.register(progress.clone());
        batch.register(active.clone());
        batch.register(heat.clone());
        (batch, progress, active, heat)
    }

    #[test]
    fn first_encode_is_full_then_nothing() {
        let (mut sender, ..) = batch();
        let payload = sender.encode().unwrap().unwrap();
        assert_eq!(payload[0], 3);
        assert_eq!(sender.encode().unwrap(), None);
    }

    #[test]
    fn partial_change_sends_indexed_pairs() {
        let (mut sender, progress, _, heat) = batch();
        let (receiver, mirror_progress, mirror_active, mirror_heat) = batch();
        receiver.decode(&sender.encode_full().unwrap()).unwrap();

        progress.set(7);
        heat.set(-3);
        mirror_active.set(true);
        let payload = sender.encode().unwrap().unwrap();
        assert_eq!(&payload[..3], &[2, 0, 7]);
        receiver.decode(&payload).unwrap();

        assert_eq!(mirror_progress.get(), 7);
        assert_eq!(mirror_heat.get(), -3);
        assert!(mirror_active.get());
    }

    #[test]
    fn bad_payload_rolls_back_earlier_fields() {
        let (receiver, progress, ..) = batch();
        let mut writer = WireWriter::new();
        writer.write_varint(2);
        writer.write_varint(0);
        writer.write_varint(99);
        writer.write_varint(1);
        writer.write_u8(7);
        assert_eq!(receiver.decode(writer.as_slice()), Err(WireError::InvalidBool(7)));
        assert_eq!(progress.get(), 0);

        let mut writer = WireWriter::new();
        writer.write_varint(1);
        writer.write_varint(5);
        assert_eq!(
            receiver.decode(writer.as_slice()),
            Err(WireError::FieldIndexOutOfRange { index: 5, size: 3 })
        );
    }

    #[test]
    fn failed_encode_keeps_changes_pending() {
        let (mut sender, progress, ..) = batch();
        let label = ValueField::new(String::from("smelting"));
        sender.register(label.clone());
        sender.encode_full().unwrap();

        progress.set(3);
        label.set("x".repeat(crate::StorageConfig::MAX_WIRE_STRING_LEN + 1));
        assert!(matches!(sender.encode(), Err(WireError::StringTooLong { .. })));
        assert!(sender.has_changes());

        label.set(String::from("idle"));
        let payload = sender.encode().unwrap().unwrap();
        assert_eq!(&payload[..3], &[2, 0, 3]);
        assert!(!sender.has_changes());
    }
}
