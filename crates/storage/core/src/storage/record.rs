#[cfg(feature = "serde")]
use crate::slot::RecordError;
use crate::slot::SlotRecord;

/// Persisted form of a storage: one record per slot, in slot order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageRecord {
    pub slots: Vec<SlotRecord>,
}

impl StorageRecord {
    pub fn new(slots: Vec<SlotRecord>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// JSON for human-edited saves, bincode for compact ones
#[cfg(feature = "serde")]
impl StorageRecord {
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
