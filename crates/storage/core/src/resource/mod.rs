//! Resource identities and the oracle that describes them.
//!
//! A resource is an opaque handle compared by identity only. Everything the
//! engine needs to know about a resource beyond identity (its persistent
//! identifier, per-resource stack limit, crafting remainder) comes from a
//! [`ResourceOracle`] passed in at construction, never from global state.

mod catalog;
mod filter;
mod selector;

pub use catalog::{Catalog, CatalogError, ResourceDefinition};
pub use filter::ResourceFilter;
pub use selector::ResourceSelector;

use core::fmt::Debug;
use core::hash::Hash;

/// Broad family a resource type belongs to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Item,
    Fluid,
}

/// Identity-comparable resource handle.
///
/// Two resources are the same resource iff their handles are equal.
/// Handles cross threads alongside the shared [`ResourceOracle`].
pub trait Resource: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn from_raw(raw: u32) -> Self;

    fn raw(self) -> u32;
}

/// Handle to an item definition in a [`Catalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemHandle(pub u32);

impl Resource for ItemHandle {
    const KIND: ResourceKind = ResourceKind::Item;

    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

/// Handle to a fluid definition in a [`Catalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FluidHandle(pub u32);

impl Resource for FluidHandle {
    const KIND: ResourceKind = ResourceKind::Fluid;

    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

/// Read-only knowledge about resources of one kind.
///
/// Shared by every slot and storage built for that kind, so it must be
/// `Send + Sync` even though storages themselves are single-threaded.
pub trait ResourceOracle<R: Resource>: Send + Sync {
    /// Persistent identifier used by records and wire payloads.
    fn identifier(&self, resource: R) -> Option<&str>;

    /// Inverse of [`identifier`](Self::identifier).
    fn resolve(&self, identifier: &str) -> Option<R>;

    /// Per-resource upper bound on the amount one slot may hold.
    fn max_amount(&self, resource: R) -> Option<u64>;

    /// Resource left behind once a unit of `resource` is fully consumed.
    fn remainder(&self, resource: R) -> Option<R>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn handles_compare_by_identity() {
        assert_eq!(ItemHandle(3), ItemHandle::from_raw(3));
        assert_ne!(ItemHandle(3), ItemHandle(4));
        assert_eq!(FluidHandle(9).raw(), 9);
    }

    #[test]
    fn handles_resolve_on_another_thread() {
        let catalog: Arc<dyn ResourceOracle<ItemHandle>> =
            Arc::new(Catalog::new(vec![ResourceDefinition::new("flint")]).unwrap());
        let handle = ItemHandle(0);
        let worker = std::thread::spawn(move || catalog.identifier(handle).map(str::to_owned));
        let identifier = worker.join().unwrap();
        assert_eq!(identifier.as_deref(), Some("flint"));
    }

    #[test]
    fn kind_names() {
        assert_eq!(ItemHandle::KIND.to_string(), "item");
        assert_eq!("fluid".parse::<ResourceKind>().unwrap(), ResourceKind::Fluid);
    }
}
