//! Attribute overlays: immutable variant data carried alongside a resource.
//!
//! Two stacks of the same base resource only merge when their overlays are
//! structurally equal. Entry order never matters; the backing map is sorted,
//! so equality, hashing and the wire form are all canonical.

use std::collections::BTreeMap;

use crate::config::StorageConfig;
use crate::wire::{WireError, WireReader, WireWriter};

/// A single overlay value.
///
/// Externally tagged under serde (`Int(3)` in RON) so records stay readable by
/// non-self-describing formats.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverlayValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl OverlayValue {
    const TAG_BOOL: u8 = 0;
    const TAG_INT: u8 = 1;
    const TAG_TEXT: u8 = 2;

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        match self {
            Self::Bool(value) => {
                writer.write_u8(Self::TAG_BOOL);
                writer.write_bool(*value);
            }
            Self::Int(value) => {
                writer.write_u8(Self::TAG_INT);
                writer.write_signed(*value);
            }
            Self::Text(value) => {
                writer.write_u8(Self::TAG_TEXT);
                writer.write_str(value)?;
            }
        }
        Ok(())
    }

    fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        match reader.read_u8()? {
            Self::TAG_BOOL => reader.read_bool().map(Self::Bool),
            Self::TAG_INT => reader.read_signed().map(Self::Int),
            Self::TAG_TEXT => reader.read_str().map(|text| Self::Text(text.to_owned())),
            tag => Err(WireError::InvalidValueTag(tag)),
        }
    }
}

impl From<bool> for OverlayValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OverlayValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for OverlayValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for OverlayValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Immutable, order-independent key/value bag describing a resource variant.
///
/// [`Overlay::EMPTY`] is the canonical "no variant data" value. Overlays are
/// never mutated in place; [`Overlay::with`] returns a new overlay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Overlay {
    entries: BTreeMap<String, OverlayValue>,
}

impl Overlay {
    pub const EMPTY: Overlay = Overlay {
        entries: BTreeMap::new(),
    };

    /// Reserved key capping the capacity of any slot holding this variant.
    pub const MAX_AMOUNT_KEY: &'static str = "max_amount";

    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Returns a copy of this overlay with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<OverlayValue>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.into(), value.into());
        Self { entries }
    }

    /// Returns a copy of this overlay without `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(key);
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&OverlayValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OverlayValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Capacity cap declared by this overlay, if any.
    ///
    /// Negative values are treated as zero.
    pub fn max_amount(&self) -> Option<u64> {
        self.get(Self::MAX_AMOUNT_KEY)
            .and_then(OverlayValue::as_int)
            .map(|value| u64::try_from(value).unwrap_or(0))
    }

    /// Writes the entry count followed by each key and value.
    ///
    /// Overlays the reader would reject are refused here with the same error.
    pub fn write_wire(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        if self.entries.len() > StorageConfig::MAX_OVERLAY_ENTRIES {
            return Err(WireError::TooManyOverlayEntries {
                count: self.entries.len() as u64,
                max: StorageConfig::MAX_OVERLAY_ENTRIES,
            });
        }
        writer.write_varint(self.entries.len() as u64);
        for (key, value) in &self.entries {
            writer.write_str(key)?;
            value.write_wire(writer)?;
        }
        Ok(())
    }

    pub fn read_wire(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let count = reader.read_varint()?;
        if count > StorageConfig::MAX_OVERLAY_ENTRIES as u64 {
            return Err(WireError::TooManyOverlayEntries {
                count,
                max: StorageConfig::MAX_OVERLAY_ENTRIES,
            });
        }

        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let key = reader.read_str()?.to_owned();
            let value = OverlayValue::read_wire(reader)?;
            if entries.contains_key(&key) {
                return Err(WireError::DuplicateOverlayKey(key));
            }
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

impl<K: Into<String>, V: Into<OverlayValue>> FromIterator<(K, V)> for Overlay {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
