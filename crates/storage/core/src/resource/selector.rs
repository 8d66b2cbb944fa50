use crate::overlay::Overlay;

use super::Resource;

static EMPTY_OVERLAY: Overlay = Overlay::EMPTY;

/// Describes which slot contents an extraction or query may match.
///
/// `None` in either position matches anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSelector<'a, R: Resource> {
    pub resource: Option<R>,
    pub overlay: Option<&'a Overlay>,
}

impl<'a, R: Resource> ResourceSelector<'a, R> {
    /// Matches any non-empty contents.
    pub const fn any() -> Self {
        Self {
            resource: None,
            overlay: None,
        }
    }

    /// Matches `resource` with any overlay.
    pub const fn of(resource: R) -> Self {
        Self {
            resource: Some(resource),
            overlay: None,
        }
    }

    /// Matches exactly the `(resource, overlay)` pair.
    pub const fn exact(resource: R, overlay: &'a Overlay) -> Self {
        Self {
            resource: Some(resource),
            overlay: Some(overlay),
        }
    }

    pub fn matches(&self, resource: R, overlay: &Overlay) -> bool {
        self.resource.is_none_or(|wanted| wanted == resource)
            && self.overlay.is_none_or(|wanted| wanted == overlay)
    }
}

impl<R: Resource> ResourceSelector<'static, R> {
    /// Matches `resource` carrying no variant data.
    pub fn plain(resource: R) -> Self {
        Self::exact(resource, &EMPTY_OVERLAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ItemHandle;

    #[test]
    fn wildcards_match_anything() {
        let enchanted = Overlay::EMPTY.with("enchant", true);
        assert!(ResourceSelector::any().matches(ItemHandle(1), &enchanted));
        assert!(ResourceSelector::of(ItemHandle(1)).matches(ItemHandle(1), &enchanted));
        assert!(!ResourceSelector::of(ItemHandle(2)).matches(ItemHandle(1), &enchanted));
    }

    #[test]
    fn exact_requires_equal_overlay() {
        let enchanted = Overlay::EMPTY.with("enchant", true);
        assert!(!ResourceSelector::plain(ItemHandle(1)).matches(ItemHandle(1), &enchanted));
        assert!(ResourceSelector::plain(ItemHandle(1)).matches(ItemHandle(1), &Overlay::EMPTY));
        let exact = ResourceSelector::exact(ItemHandle(1), &enchanted);
        assert!(exact.matches(ItemHandle(1), &enchanted));
    }
}
