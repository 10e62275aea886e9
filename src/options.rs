//! Binder configuration.

/// Options applied when an [`ObjectBinder`](crate::ObjectBinder) is installed.
///
/// ```
/// use tether::BinderOptions;
///
/// let options = BinderOptions::default().with_cache_lookups(false);
/// assert!(!options.cache_lookups);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinderOptions {
    /// Route `__index` through the interpreter's per-target lookup cache.
    pub cache_lookups: bool,
}

impl BinderOptions {
    pub fn with_cache_lookups(mut self, enabled: bool) -> Self {
        self.cache_lookups = enabled;
        self
    }
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self { cache_lookups: true }
    }
}
