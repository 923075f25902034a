//! Scratch storage for translating wrapper descriptors into ABI structs.
//!
//! An [`Arena`] lives for exactly one native call: it is created while the
//! `#[repr(C)]` descriptor is being filled in, kept alive across the call and
//! dropped right after, releasing every label, array and nested chain it
//! handed out.

use std::any::Any;
use std::ffi::{CStr, CString, c_char};
use std::ptr;

use native_wgpu_sys::ChainedStruct;

use crate::chain::ChainBuilder;
use crate::error::GpuError;

#[derive(Default)]
pub(crate) struct Arena {
    strings: Vec<CString>,
    storage: Vec<Box<dyn Any>>,
    chains: Vec<ChainBuilder>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn c_str(&mut self, value: &str, context: &'static str) -> Result<*const c_char, GpuError> {
        let owned = CString::new(value).map_err(|_| GpuError::InteriorNul { context })?;
        let data = owned.as_ptr();
        self.strings.push(owned);
        Ok(data)
    }

    /// Optional object label; `None` becomes null.
    pub fn label(&mut self, label: Option<&str>) -> Result<*const c_char, GpuError> {
        match label {
            Some(label) => self.c_str(label, "label"),
            None => Ok(ptr::null()),
        }
    }

    /// Copy a slice. Empty input yields `(null, 0)`.
    pub fn slice<T: Copy + 'static>(&mut self, items: &[T]) -> (*const T, usize) {
        self.collect(items.iter().copied())
    }

    pub fn collect<T: 'static>(&mut self, items: impl IntoIterator<Item = T>) -> (*const T, usize) {
        let owned: Vec<T> = items.into_iter().collect();
        if owned.is_empty() {
            return (ptr::null(), 0);
        }
        let (data, len) = (owned.as_ptr(), owned.len());
        self.storage.push(Box::new(owned));
        (data, len)
    }

    pub fn boxed<T: 'static>(&mut self, value: T) -> *const T {
        let owned = Box::new(value);
        let data: *const T = &*owned;
        self.storage.push(owned);
        data
    }

    /// A present value becomes a pointer to an arena copy; an absent one
    /// becomes null.
    pub fn optional<T: 'static>(&mut self, value: Option<T>) -> *const T {
        match value {
            Some(value) => self.boxed(value),
            None => ptr::null(),
        }
    }

    /// Keep `chain` alive for the call and return its head (null if empty).
    pub fn chain(&mut self, chain: ChainBuilder) -> *const ChainedStruct {
        let head = chain.as_ptr();
        if !chain.is_empty() {
            self.chains.push(chain);
        }
        head
    }

    pub fn len(&self) -> usize {
        self.strings.len() + self.storage.len() + self.chains.len()
    }
}

/// Copy a message borrowed from a native callback. Null yields an empty
/// string; invalid UTF-8 is replaced.
///
/// # Safety
///
/// `message` must be null or point at a NUL-terminated string that stays
/// valid for the duration of the call.
pub(crate) unsafe fn message_to_string(message: *const c_char) -> String {
    if message.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_wgpu_sys as sys;

    #[test]
    fn test_optional_maps_none_to_null() {
        let mut arena = Arena::new();
        assert!(arena.optional::<u32>(None).is_null());

        let present = arena.optional(Some(7u32));
        assert_eq!(unsafe { *present }, 7);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_slice_empty_is_null() {
        let mut arena = Arena::new();
        let (data, len) = arena.slice::<u32>(&[]);
        assert!(data.is_null());
        assert_eq!(len, 0);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_slice_copies() {
        let mut arena = Arena::new();
        let (data, len) = arena.slice(&[3u64, 4, 5]);
        assert_eq!(unsafe { std::slice::from_raw_parts(data, len) }, &[3, 4, 5]);
    }

    #[test]
    fn test_label() {
        let mut arena = Arena::new();
        assert!(arena.label(None).unwrap().is_null());

        let label = arena.label(Some("vertices")).unwrap();
        assert_eq!(unsafe { message_to_string(label) }, "vertices");
        assert!(matches!(
            arena.label(Some("bad\0label")),
            Err(GpuError::InteriorNul { context: "label" })
        ));
    }

    #[test]
    fn test_chain_kept_alive() {
        let mut arena = Arena::new();
        assert!(arena.chain(ChainBuilder::new()).is_null());

        let mut chain = ChainBuilder::new();
        chain.add_adapter_extras(sys::BackendType::METAL);
        let head = arena.chain(chain);
        assert_eq!(unsafe { (*head).s_type }, sys::SType::ADAPTER_EXTRAS);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_message_to_string_null() {
        assert_eq!(unsafe { message_to_string(ptr::null()) }, "");
    }
}
