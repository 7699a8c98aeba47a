//! Dependency keys.
//!
//! A dependency key is any `PartialEq` value. Tuples, arrays, slices and
//! `Vec` already compare element-wise, which is the shallow rule runners rely
//! on: same length, and each position equal. Elements whose equality should
//! mean "the same object" rather than "an equal value" go through
//! [`ByIdentity`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Dependency key element compared by pointer identity.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use remote_flow::ByIdentity;
///
/// let config = Arc::new(vec![1, 2, 3]);
/// let a = ByIdentity::new(config.clone());
/// let b = ByIdentity::new(config);
/// let c = ByIdentity::new(Arc::new(vec![1, 2, 3]));
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
pub struct ByIdentity<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> ByIdentity<T> {
    /// Wrap a shared value.
    pub fn new(value: Arc<T>) -> Self {
        ByIdentity(value)
    }

    /// Get the shared value back.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T: ?Sized> Clone for ByIdentity<T> {
    fn clone(&self) -> Self {
        ByIdentity(self.0.clone())
    }
}

impl<T: ?Sized> PartialEq for ByIdentity<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for ByIdentity<T> {}

impl<T: ?Sized> Hash for ByIdentity<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const ()).hash(state);
    }
}

impl<T: ?Sized> Deref for ByIdentity<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ByIdentity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ByIdentity").field(&&*self.0).finish()
    }
}

impl<T> From<Arc<T>> for ByIdentity<T> {
    fn from(value: Arc<T>) -> Self {
        ByIdentity(value)
    }
}
