//! Identity registry for handles the native side hands out more than once.
//!
//! Some native calls return the same handle on every call (the device queue,
//! a pipeline's bind group layout for one index, the swap chain's current
//! view). The registry maps each handle address to the single wrapper created
//! for it, so callers always see the same wrapper instance for the same
//! native object. Registries belong to a device; nothing is process-wide.

use std::fmt;
use std::marker::PhantomData;

use ahash::HashMap;
use parking_lot::Mutex;

use crate::error::GpuError;
use crate::handle::NativeObject;

/// Handle address to wrapper table for one resource kind.
pub struct IdentityRegistry<T: NativeObject, W> {
    entries: Mutex<HashMap<usize, W>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeObject, W: Clone> IdentityRegistry<T, W> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::default()),
            _marker: PhantomData,
        }
    }

    /// Return the wrapper registered for `raw`, building it with `factory` on
    /// first sight.
    pub fn get_or_create<F>(&self, raw: *mut T, factory: F) -> Result<W, GpuError>
    where
        F: FnOnce(*mut T) -> Result<W, GpuError>,
    {
        if raw.is_null() {
            tracing::warn!(kind = %T::KIND, "Native lookup returned a null handle");
            return Err(GpuError::CreationFailed { kind: T::KIND });
        }

        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&raw.addr()) {
            return Ok(existing.clone());
        }

        let wrapper = factory(raw)?;
        entries.insert(raw.addr(), wrapper.clone());
        tracing::trace!(kind = %T::KIND, handle = ?raw, "Registered wrapper");
        Ok(wrapper)
    }

    /// Look up without creating.
    pub fn get(&self, raw: *mut T) -> Option<W> {
        self.entries.lock().get(&raw.addr()).cloned()
    }

    /// Drop the entry for `raw`; a later `get_or_create` builds a new wrapper.
    pub fn forget(&self, raw: *mut T) -> Option<W> {
        self.entries.lock().remove(&raw.addr())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove and return every wrapper. The lock is not held while the
    /// caller processes them.
    pub(crate) fn drain(&self) -> Vec<W> {
        self.entries.lock().drain().map(|(_, wrapper)| wrapper).collect()
    }
}

impl<T: NativeObject, W: Clone> Default for IdentityRegistry<T, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NativeObject, W> fmt::Debug for IdentityRegistry<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("kind", &T::KIND)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;
    use native_wgpu_sys as sys;
    use std::ptr;
    use std::sync::Arc;

    fn fake(addr: usize) -> *mut sys::QueueImpl {
        ptr::without_provenance_mut(addr)
    }

    #[test]
    fn test_same_handle_same_wrapper() {
        let registry = IdentityRegistry::<sys::QueueImpl, Arc<u32>>::new();
        let first = registry.get_or_create(fake(0x10), |_| Ok(Arc::new(1))).unwrap();
        let second = registry.get_or_create(fake(0x10), |_| Ok(Arc::new(2))).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_null_handle_fails() {
        let registry = IdentityRegistry::<sys::QueueImpl, Arc<u32>>::new();
        let err = registry.get_or_create(ptr::null_mut(), |_| Ok(Arc::new(1))).unwrap_err();
        assert_eq!(
            err,
            GpuError::CreationFailed {
                kind: ResourceKind::Queue
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_forget_allows_new_wrapper() {
        let registry = IdentityRegistry::<sys::QueueImpl, Arc<u32>>::new();
        let first = registry.get_or_create(fake(0x20), |_| Ok(Arc::new(1))).unwrap();
        assert!(registry.forget(fake(0x20)).is_some());
        assert!(registry.get(fake(0x20)).is_none());

        let second = registry.get_or_create(fake(0x20), |_| Ok(Arc::new(2))).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_factory_error_leaves_no_entry() {
        let registry = IdentityRegistry::<sys::QueueImpl, Arc<u32>>::new();
        let result = registry.get_or_create(fake(0x30), |_| Err(GpuError::InvalidArgument("nope".into())));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drain_empties() {
        let registry = IdentityRegistry::<sys::QueueImpl, Arc<u32>>::new();
        registry.get_or_create(fake(0x40), |_| Ok(Arc::new(1))).unwrap();
        registry.get_or_create(fake(0x48), |_| Ok(Arc::new(2))).unwrap();

        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }
}
