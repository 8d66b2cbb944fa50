//! Common error infrastructure for storage-core.
//!
//! Ordinary capacity and compatibility refusals are never errors: insert and
//! extract operations report partial success through their return values.
//! The error types in this crate cover the boundaries where untrusted data
//! enters the engine (wire payloads, persisted records, loaded specs and
//! catalogs).
//!
//! # Design Principles
//!
//! - **Type Safety**: each boundary has its own error enum with specific variants
//! - **Severity Classification**: errors are categorized for recovery strategies
//! - **Stable Codes**: every variant exposes a static identifier for logs and tests

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the caller may retry, e.g. after a resync
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected state inconsistencies that require investigation
/// - **Fatal**: unrecoverable errors indicating corrupted engine state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - can retry, typically by requesting a full resync.
    ///
    /// Examples: truncated payload, payload for a storage of another size
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: zero-capacity slot spec, duplicate catalog identifier
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: a stored resource the oracle cannot name
    Internal,

    /// Fatal error - engine state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all storage-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
