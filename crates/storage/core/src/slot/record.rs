//! Structured persistence records for slots.

use crate::error::{EngineError, ErrorSeverity};
use crate::overlay::Overlay;

/// Persisted form of one slot.
///
/// The default (empty) record stands for an empty slot. A non-empty record
/// carries the resource identifier, the amount and the overlay. Every field
/// is always written, so the record also survives non-self-describing
/// formats such as bincode; readers accept omitted fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRecord {
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub amount: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub overlay: Overlay,
}

impl SlotRecord {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(resource: impl Into<String>, overlay: Overlay, amount: u64) -> Self {
        Self {
            resource: Some(resource.into()),
            amount,
            overlay,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_none() && self.amount == 0 && self.overlay.is_empty()
    }
}

/// Errors raised while converting between live state and structured records.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("unknown resource identifier '{0}'")]
    UnknownResource(String),

    #[error("resource {0} has no registered identifier")]
    UnregisteredResource(String),

    #[error("record for '{resource}' has zero amount")]
    ZeroAmount { resource: String },

    #[error("record without a resource carries amount {amount} or a non-empty overlay")]
    InconsistentEmptyRecord { amount: u64 },

    #[error("amount {amount} of '{resource}' exceeds slot capacity {capacity}")]
    AmountExceedsCapacity {
        resource: String,
        amount: u64,
        capacity: u64,
    },

    #[error("record holds {actual} entries but storage has {expected} slots")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("energy amount {amount} exceeds capacity {capacity}")]
    EnergyExceedsCapacity { amount: u64, capacity: u64 },

    #[error("slot {index}: {source}")]
    Slot {
        index: usize,
        #[source]
        source: Box<RecordError>,
    },

    #[error("record codec failed: {0}")]
    Codec(String),
}

impl RecordError {
    pub(crate) fn at_slot(self, index: usize) -> Self {
        Self::Slot {
            index,
            source: Box::new(self),
        }
    }
}

impl EngineError for RecordError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnregisteredResource(_) => ErrorSeverity::Internal,
            Self::Slot { source, .. } => source.severity(),
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownResource(_) => "RECORD_UNKNOWN_RESOURCE",
            Self::UnregisteredResource(_) => "RECORD_UNREGISTERED_RESOURCE",
            Self::ZeroAmount { .. } => "RECORD_ZERO_AMOUNT",
            Self::InconsistentEmptyRecord { .. } => "RECORD_INCONSISTENT_EMPTY",
            Self::AmountExceedsCapacity { .. } => "RECORD_AMOUNT_EXCEEDS_CAPACITY",
            Self::LengthMismatch { .. } => "RECORD_LENGTH_MISMATCH",
            Self::EnergyExceedsCapacity { .. } => "RECORD_ENERGY_EXCEEDS_CAPACITY",
            Self::Slot { source, .. } => source.error_code(),
            Self::Codec(_) => "RECORD_CODEC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_is_empty() {
        assert!(SlotRecord::empty().is_empty());
        assert!(!SlotRecord::new("stone", Overlay::EMPTY, 1).is_empty());
    }

    #[test]
    fn slot_wrapper_reports_inner_code() {
        let error = RecordError::UnregisteredResource("ItemHandle(4)".into()).at_slot(2);
        assert_eq!(error.error_code(), "RECORD_UNREGISTERED_RESOURCE");
        assert!(error.severity().is_internal());
        assert_eq!(
            error.to_string(),
            "slot 2: resource ItemHandle(4) has no registered identifier"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn omitted_fields_read_as_empty() {
        let record: SlotRecord = serde_json::from_str("{}").unwrap();
        assert!(record.is_empty());

        let record: SlotRecord =
            serde_json::from_str(r#"{"resource":"stone","amount":12}"#).unwrap();
        assert_eq!(record, SlotRecord::new("stone", Overlay::EMPTY, 12));
    }
}
