//! Delta synchronization of storages and fields to a remote observer.
//!
//! Every synchronized datum keeps the sender-side *baseline* of what was last
//! sent. A datum that has not changed since its baseline costs nothing on the
//! wire; one that has changed is sent in its delta form, which for a storage
//! carries only the changed slots and for a field is simply its full value.
//!
//! Decoding never leaves a receiver half-updated: a payload is applied under
//! one [`Transaction`], which aborts on the first malformed datum.

mod batch;
mod fields;
mod storage;

pub use batch::SyncBatch;
pub use fields::{EnumField, ValueField};

use crate::transaction::Transaction;
use crate::wire::{WireError, WireReader, WireWriter};

/// Contract for anything that can be delta-synchronized.
///
/// Implementors are shared handles: the sender encodes from one handle while
/// game logic mutates through another.
pub trait DeltaSync {
    /// Sender-side record of the last sent state.
    type Baseline: 'static;

    /// Baseline that compares as changed against every possible state.
    fn unsent(&self) -> Self::Baseline;

    /// Baseline describing the current state.
    fn baseline(&self) -> Self::Baseline;

    fn has_changed(&self, previous: &Self::Baseline) -> bool;

    /// Self-contained encoding of the whole current state.
    fn write_full(&self, writer: &mut WireWriter) -> Result<(), WireError>;

    /// Encoding of what changed since `previous`; defaults to the full form.
    fn write_delta(
        &self,
        writer: &mut WireWriter,
        previous: &Self::Baseline,
    ) -> Result<(), WireError> {
        let _ = previous;
        self.write_full(writer)
    }

    /// Applies a full form under `tx`.
    fn read_full(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError>;

    /// Applies a delta form under `tx`; defaults to the full form.
    fn read_delta(
        &self,
        reader: &mut WireReader<'_>,
        tx: &mut Transaction<'_>,
    ) -> Result<(), WireError> {
        self.read_full(reader, tx)
    }
}

/// Encodes `datum`'s delta against `previous` into a standalone payload.
pub fn encode_delta<D: DeltaSync>(datum: &D, previous: &D::Baseline) -> Result<Vec<u8>, WireError> {
    let mut writer = WireWriter::new();
    datum.write_delta(&mut writer, previous)?;
    Ok(writer.into_bytes())
}

/// Applies a standalone payload produced by [`encode_delta`].
///
/// Nothing changes unless the whole payload is valid.
pub fn apply_delta<D: DeltaSync>(datum: &D, payload: &[u8]) -> Result<(), WireError> {
    apply_delta_tx(datum, payload, None)
}

/// Like [`apply_delta`], inside a scope nested under `tx`.
pub fn apply_delta_tx<D: DeltaSync>(
    datum: &D,
    payload: &[u8],
    tx: Option<&mut Transaction<'_>>,
) -> Result<(), WireError> {
    let mut reader = WireReader::new(payload);
    let mut tx = Transaction::open_within(tx);
    datum.read_delta(&mut reader, &mut tx)?;
    reader.finish()?;
    tx.commit();
    Ok(())
}
