//! Memoisation keyed on modification counters.

/// Derived value recomputed only when the watched counter moves.
///
/// Typical use is caching "which recipe matches the input slots" against
/// [`ResourceStorage::modifications`](crate::ResourceStorage::modifications).
/// A hit is always equal to what a fresh computation would return, provided
/// the computation depends only on state covered by the counter.
#[derive(Clone, Debug)]
pub struct ChangeCache<T> {
    entry: Option<(u64, T)>,
}

impl<T> ChangeCache<T> {
    pub const fn new() -> Self {
        Self { entry: None }
    }

    /// Returns the cached value, recomputing it if `modifications` differs
    /// from the counter it was computed at.
    pub fn get_or_update(&mut self, modifications: u64, compute: impl FnOnce() -> T) -> &T {
        if self.is_stale(modifications) {
            self.entry = None;
        }
        let (_, value) = self.entry.get_or_insert_with(|| (modifications, compute()));
        value
    }

    pub fn is_stale(&self, modifications: u64) -> bool {
        !matches!(self.entry, Some((seen, _)) if seen == modifications)
    }

    /// Cached value regardless of staleness.
    pub fn cached(&self) -> Option<&T> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

impl<T> Default for ChangeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
