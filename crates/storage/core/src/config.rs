/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StorageConfig {
    /// Nominal capacity given to item slots whose spec does not name one.
    pub default_item_capacity: u64,
    /// Nominal capacity given to fluid tanks whose spec does not name one.
    pub default_fluid_capacity: u64,
    /// Upper bound on the number of slots a single storage may be built with.
    pub max_slots: usize,
}

impl StorageConfig {
    // ===== compile-time constants =====
    /// Largest stack any item slot may hold, regardless of its spec.
    pub const MAX_ITEM_STACK: u64 = 64;
    /// One bucket of fluid, in droplets.
    pub const FLUID_BUCKET: u64 = 81_000;
    /// Longest string (identifier or overlay key/text) accepted from the wire.
    pub const MAX_WIRE_STRING_LEN: usize = 32 * 1024;
    /// Most overlay entries accepted from the wire for a single slot.
    pub const MAX_OVERLAY_ENTRIES: usize = 256;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_FLUID_CAPACITY: u64 = 8 * Self::FLUID_BUCKET;
    pub const DEFAULT_MAX_SLOTS: usize = 256;

    pub fn new() -> Self {
        Self {
            default_item_capacity: Self::MAX_ITEM_STACK,
            default_fluid_capacity: Self::DEFAULT_FLUID_CAPACITY,
            max_slots: Self::DEFAULT_MAX_SLOTS,
        }
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new()
    }
}
