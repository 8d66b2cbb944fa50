//! Wire decoding and encoding errors.

use crate::error::{EngineError, ErrorSeverity};

/// Errors raised while producing or consuming binary wire payloads.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The payload ended before the value being read was complete.
    #[error("unexpected end of payload (needed {needed} bytes, {remaining} remaining)")]
    UnexpectedEnd {
        /// Bytes required by the read.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },

    /// A variable-width integer ran past 64 bits.
    #[error("variable-width integer overflows 64 bits")]
    VarintOverflow,

    /// A length-prefixed string was longer than the configured limit.
    #[error("string of {len} bytes exceeds limit of {max}")]
    StringTooLong {
        /// Declared string length.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// A string was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// An overlay carried more entries than the configured limit.
    #[error("overlay declares {count} entries, limit is {max}")]
    TooManyOverlayEntries {
        /// Declared entry count.
        count: u64,
        /// Maximum accepted count.
        max: usize,
    },

    /// An overlay value carried an unknown type tag.
    #[error("unknown overlay value tag {0}")]
    InvalidValueTag(u8),

    /// An overlay key appeared twice.
    #[error("duplicate overlay key '{0}'")]
    DuplicateOverlayKey(String),

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),

    /// The receiving side does not know the resource identifier.
    #[error("unknown resource identifier '{0}'")]
    UnknownResource(String),

    /// The sending side holds a resource its oracle cannot name.
    #[error("resource {0} has no registered identifier")]
    UnregisteredResource(String),

    /// A stored or decoded amount does not fit the slot.
    #[error("amount {amount} exceeds slot capacity {capacity}")]
    AmountExceedsCapacity {
        /// Decoded amount.
        amount: u64,
        /// Capacity for the decoded resource.
        capacity: u64,
    },

    /// A differential payload named a slot the storage does not have.
    #[error("slot index {index} out of range for storage of {size} slots")]
    SlotIndexOutOfRange {
        /// Decoded index.
        index: u64,
        /// Storage size.
        size: usize,
    },

    /// A differential payload named the same slot twice.
    #[error("slot index {0} appears twice in one payload")]
    DuplicateSlotIndex(u64),

    /// A differential payload declared more changes than the storage has slots.
    #[error("payload declares {count} changed entries for {size} tracked entries")]
    CountExceedsSize {
        /// Declared count.
        count: u64,
        /// Tracked entry count.
        size: usize,
    },

    /// A sync batch payload named a field the batch does not have.
    #[error("field index {index} out of range for batch of {size} fields")]
    FieldIndexOutOfRange {
        /// Decoded index.
        index: u64,
        /// Batch size.
        size: usize,
    },

    /// A sync batch payload named the same field twice.
    #[error("field index {0} appears twice in one payload")]
    DuplicateFieldIndex(u64),

    /// An enumeration ordinal did not name a variant.
    #[error("invalid enumeration ordinal {0}")]
    InvalidOrdinal(u64),

    /// Bytes remained after the payload was fully decoded.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

impl EngineError for WireError {
    fn severity(&self) -> ErrorSeverity {
        use WireError::*;
        match self {
            // Transport-level damage; a full resync repairs the receiver
            UnexpectedEnd { .. }
            | VarintOverflow
            | TrailingBytes(_)
            | CountExceedsSize { .. }
            | SlotIndexOutOfRange { .. }
            | DuplicateSlotIndex(_)
            | FieldIndexOutOfRange { .. }
            | DuplicateFieldIndex(_) => ErrorSeverity::Recoverable,

            // Well-formed bytes carrying values this side refuses
            StringTooLong { .. }
            | InvalidUtf8
            | TooManyOverlayEntries { .. }
            | InvalidValueTag(_)
            | DuplicateOverlayKey(_)
            | InvalidBool(_)
            | InvalidOrdinal(_)
            | UnknownResource(_)
            | AmountExceedsCapacity { .. } => ErrorSeverity::Validation,

            // The sender's own catalog is inconsistent with its storage
            UnregisteredResource(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        use WireError::*;
        match self {
            UnexpectedEnd { .. } => "WIRE_UNEXPECTED_END",
            VarintOverflow => "WIRE_VARINT_OVERFLOW",
            StringTooLong { .. } => "WIRE_STRING_TOO_LONG",
            InvalidUtf8 => "WIRE_INVALID_UTF8",
            TooManyOverlayEntries { .. } => "WIRE_TOO_MANY_OVERLAY_ENTRIES",
            InvalidValueTag(_) => "WIRE_INVALID_VALUE_TAG",
            DuplicateOverlayKey(_) => "WIRE_DUPLICATE_OVERLAY_KEY",
            InvalidBool(_) => "WIRE_INVALID_BOOL",
            UnknownResource(_) => "WIRE_UNKNOWN_RESOURCE",
            UnregisteredResource(_) => "WIRE_UNREGISTERED_RESOURCE",
            AmountExceedsCapacity { .. } => "WIRE_AMOUNT_EXCEEDS_CAPACITY",
            SlotIndexOutOfRange { .. } => "WIRE_SLOT_INDEX_OUT_OF_RANGE",
            DuplicateSlotIndex(_) => "WIRE_DUPLICATE_SLOT_INDEX",
            CountExceedsSize { .. } => "WIRE_COUNT_EXCEEDS_SIZE",
            FieldIndexOutOfRange { .. } => "WIRE_FIELD_INDEX_OUT_OF_RANGE",
            DuplicateFieldIndex(_) => "WIRE_DUPLICATE_FIELD_INDEX",
            InvalidOrdinal(_) => "WIRE_INVALID_ORDINAL",
            TrailingBytes(_) => "WIRE_TRAILING_BYTES",
        }
    }
}
