//! Storage construction specs and their validation.

use crate::config::StorageConfig;
use crate::error::{EngineError, ErrorSeverity};
use crate::resource::{Resource, ResourceKind};
use crate::slot::SlotSpec;

/// Errors raised while validating a storage or machine spec.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("storage declares {count} slots, limit is {max}")]
    TooManySlots { count: usize, max: usize },

    #[error("slot {index} has zero capacity")]
    ZeroCapacity { index: usize },

    #[error("item slot {index} capacity {capacity} exceeds the maximum stack of {max}")]
    ItemCapacityTooLarge { index: usize, capacity: u64, max: u64 },

    #[error("energy storage has zero capacity")]
    ZeroEnergyCapacity,

    #[error("energy {direction} rate {rate} exceeds capacity {capacity}")]
    EnergyRateExceedsCapacity {
        direction: &'static str,
        rate: u64,
        capacity: u64,
    },
}

impl EngineError for SpecError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TooManySlots { .. } => "SPEC_TOO_MANY_SLOTS",
            Self::ZeroCapacity { .. } => "SPEC_ZERO_CAPACITY",
            Self::ItemCapacityTooLarge { .. } => "SPEC_ITEM_CAPACITY_TOO_LARGE",
            Self::ZeroEnergyCapacity => "SPEC_ZERO_ENERGY_CAPACITY",
            Self::EnergyRateExceedsCapacity { .. } => "SPEC_ENERGY_RATE_EXCEEDS_CAPACITY",
        }
    }
}

/// Ordered slot specs for one storage.
#[derive(Clone, Debug)]
pub struct StorageSpec<R: Resource> {
    slots: Vec<SlotSpec<R>>,
}

impl<R: Resource> StorageSpec<R> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// `count` identical slots.
    pub fn uniform(count: usize, slot: SlotSpec<R>) -> Self {
        Self {
            slots: vec![slot; count],
        }
    }

    pub fn with_slot(mut self, slot: SlotSpec<R>) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn push(&mut self, slot: SlotSpec<R>) {
        self.slots.push(slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SlotSpec<R>] {
        &self.slots
    }

    pub fn validate(&self, config: &StorageConfig) -> Result<(), SpecError> {
        if self.slots.len() > config.max_slots {
            return Err(SpecError::TooManySlots {
                count: self.slots.len(),
                max: config.max_slots,
            });
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.capacity == 0 {
                return Err(SpecError::ZeroCapacity { index });
            }
            if R::KIND == ResourceKind::Item && slot.capacity > StorageConfig::MAX_ITEM_STACK {
                return Err(SpecError::ItemCapacityTooLarge {
                    index,
                    capacity: slot.capacity,
                    max: StorageConfig::MAX_ITEM_STACK,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn into_slots(self) -> Vec<SlotSpec<R>> {
        self.slots
    }
}

impl<R: Resource> Default for StorageSpec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> FromIterator<SlotSpec<R>> for StorageSpec<R> {
    fn from_iter<I: IntoIterator<Item = SlotSpec<R>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}
