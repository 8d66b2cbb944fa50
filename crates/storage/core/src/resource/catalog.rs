//! Data-driven [`ResourceOracle`] backed by an in-memory definition table.

use std::collections::HashMap;

use crate::error::{EngineError, ErrorSeverity};

use super::{Resource, ResourceOracle};

/// Static description of one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceDefinition {
    /// Persistent identifier, e.g. `"minecraft:water_bucket"`.
    pub identifier: String,
    /// Per-slot stack limit; `None` leaves the slot's own capacity in charge.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_amount: Option<u64>,
    /// Identifier of the resource left behind when this one is consumed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub remainder: Option<String>,
}

impl ResourceDefinition {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            max_amount: None,
            remainder: None,
        }
    }

    pub fn with_max_amount(mut self, max_amount: u64) -> Self {
        self.max_amount = Some(max_amount);
        self
    }

    pub fn with_remainder(mut self, remainder: impl Into<String>) -> Self {
        self.remainder = Some(remainder.into());
        self
    }
}

/// Errors raised while building a [`Catalog`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("resource identifier must not be empty")]
    EmptyIdentifier,

    #[error("resource '{0}' is defined more than once")]
    DuplicateIdentifier(String),

    #[error("resource '{0}' declares a max amount of zero")]
    ZeroMaxAmount(String),

    #[error("resource '{resource}' names unknown remainder '{remainder}'")]
    UnknownRemainder { resource: String, remainder: String },

    #[error("catalog holds more than u32::MAX resources")]
    TooManyResources,
}

impl EngineError for CatalogError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyIdentifier => "CATALOG_EMPTY_IDENTIFIER",
            Self::DuplicateIdentifier(_) => "CATALOG_DUPLICATE_IDENTIFIER",
            Self::ZeroMaxAmount(_) => "CATALOG_ZERO_MAX_AMOUNT",
            Self::UnknownRemainder { .. } => "CATALOG_UNKNOWN_REMAINDER",
            Self::TooManyResources => "CATALOG_TOO_MANY_RESOURCES",
        }
    }
}

#[derive(Clone, Debug)]
struct Entry<R> {
    identifier: String,
    max_amount: Option<u64>,
    remainder: Option<R>,
}

/// Resource table for one resource kind.
///
/// Handles are assigned densely in definition order, so the same definition
/// list always yields the same handles on both ends of a sync link.
#[derive(Clone, Debug)]
pub struct Catalog<R: Resource> {
    entries: Vec<Entry<R>>,
    by_identifier: HashMap<String, R>,
}

impl<R: Resource> Catalog<R> {
    pub fn new(definitions: Vec<ResourceDefinition>) -> Result<Self, CatalogError> {
        if u32::try_from(definitions.len()).is_err() {
            return Err(CatalogError::TooManyResources);
        }

        let mut by_identifier = HashMap::with_capacity(definitions.len());
        for (index, definition) in definitions.iter().enumerate() {
            if definition.identifier.is_empty() {
                return Err(CatalogError::EmptyIdentifier);
            }
            if definition.max_amount == Some(0) {
                return Err(CatalogError::ZeroMaxAmount(definition.identifier.clone()));
            }
            let handle = R::from_raw(index as u32);
            if by_identifier
                .insert(definition.identifier.clone(), handle)
                .is_some()
            {
                return Err(CatalogError::DuplicateIdentifier(
                    definition.identifier.clone(),
                ));
            }
        }

        let entries = definitions
            .into_iter()
            .map(|definition| {
                let remainder = match definition.remainder {
                    Some(remainder) => Some(by_identifier.get(&remainder).copied().ok_or_else(
                        || CatalogError::UnknownRemainder {
                            resource: definition.identifier.clone(),
                            remainder,
                        },
                    )?),
                    None => None,
                };
                Ok(Entry {
                    identifier: definition.identifier,
                    max_amount: definition.max_amount,
                    remainder,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        tracing::debug!(kind = %R::KIND, resources = entries.len(), "built resource catalog");

        Ok(Self {
            entries,
            by_identifier,
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            by_identifier: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a handle by identifier.
    ///
    /// Equivalent to [`ResourceOracle::resolve`], without needing the trait in scope.
    pub fn handle(&self, identifier: &str) -> Option<R> {
        self.by_identifier.get(identifier).copied()
    }

    pub fn handles(&self) -> impl Iterator<Item = R> + '_ {
        (0..self.entries.len() as u32).map(R::from_raw)
    }

    fn entry(&self, resource: R) -> Option<&Entry<R>> {
        self.entries.get(resource.raw() as usize)
    }
}

impl<R: Resource> ResourceOracle<R> for Catalog<R> {
    fn identifier(&self, resource: R) -> Option<&str> {
        self.entry(resource).map(|entry| entry.identifier.as_str())
    }

    fn resolve(&self, identifier: &str) -> Option<R> {
        self.handle(identifier)
    }

    fn max_amount(&self, resource: R) -> Option<u64> {
        self.entry(resource).and_then(|entry| entry.max_amount)
    }

    fn remainder(&self, resource: R) -> Option<R> {
        self.entry(resource).and_then(|entry| entry.remainder)
    }
}
