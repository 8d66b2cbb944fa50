use std::sync::Arc;

use crate::overlay::Overlay;

use super::Resource;

/// Predicate restricting which resources external insertion may place in a slot.
///
/// Internal operations (machine processing, record loading) bypass filters;
/// only [`ResourceSlot::can_insert_external`](crate::ResourceSlot::can_insert_external)
/// consults them.
#[derive(Clone)]
pub enum ResourceFilter<R: Resource> {
    /// Accepts everything.
    Any,
    /// Accepts nothing.
    Nothing,
    /// Accepts the listed resources with any overlay.
    Resources(Vec<R>),
    /// Accepts any resource whose overlay carries the given key.
    OverlayKey(String),
    /// Arbitrary predicate supplied by the owning device.
    Custom(Arc<dyn Fn(R, &Overlay) -> bool + Send + Sync>),
}

impl<R: Resource> ResourceFilter<R> {
    pub fn custom(predicate: impl Fn(R, &Overlay) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    pub fn allows(&self, resource: R, overlay: &Overlay) -> bool {
        match self {
            Self::Any => true,
            Self::Nothing => false,
            Self::Resources(allowed) => allowed.contains(&resource),
            Self::OverlayKey(key) => overlay.get(key).is_some(),
            Self::Custom(predicate) => predicate(resource, overlay),
        }
    }
}

impl<R: Resource> Default for ResourceFilter<R> {
    fn default() -> Self {
        Self::Any
    }
}

impl<R: Resource> core::fmt::Debug for ResourceFilter<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Nothing => f.write_str("Nothing"),
            Self::Resources(allowed) => f.debug_tuple("Resources").field(allowed).finish(),
            Self::OverlayKey(key) => f.debug_tuple("OverlayKey").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ItemHandle;

    #[test]
    fn variants_apply_their_rule() {
        let marked = Overlay::EMPTY.with("fuel", true);
        assert!(ResourceFilter::Any.allows(ItemHandle(0), &Overlay::EMPTY));
        assert!(!ResourceFilter::Nothing.allows(ItemHandle(0), &Overlay::EMPTY));

        let listed = ResourceFilter::Resources(vec![ItemHandle(2)]);
        assert!(listed.allows(ItemHandle(2), &marked));
        assert!(!listed.allows(ItemHandle(3), &marked));

        let keyed = ResourceFilter::OverlayKey("fuel".into());
        assert!(keyed.allows(ItemHandle(9), &marked));
        assert!(!keyed.allows(ItemHandle(9), &Overlay::EMPTY));

        let even = ResourceFilter::custom(|resource: ItemHandle, _| resource.0 % 2 == 0);
        assert!(even.allows(ItemHandle(4), &Overlay::EMPTY));
        assert!(!even.allows(ItemHandle(5), &Overlay::EMPTY));
        assert_eq!(format!("{even:?}"), "Custom(..)");
    }
}
