//! Wrappers whose only state is a guarded handle and a label.

use crate::handle::{Guarded, NativeObject};

pub(crate) struct Labeled<T: NativeObject> {
    pub(crate) handle: Guarded<T>,
    pub(crate) label: Option<String>,
}

/// Define a cloneable wrapper around `Arc<Labeled<$opaque>>`.
macro_rules! labeled_resource {
    ($(#[$meta:meta])* $name:ident => $opaque:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            inner: std::sync::Arc<$crate::resource::Labeled<$opaque>>,
        }

        impl $name {
            pub(crate) fn from_raw(
                api: std::sync::Arc<dyn native_wgpu_sys::NativeApi>,
                raw: *mut $opaque,
                label: Option<&str>,
            ) -> Result<Self, $crate::error::GpuError> {
                let handle = $crate::handle::Guarded::new(api, raw)?;
                Ok(Self {
                    inner: std::sync::Arc::new($crate::resource::Labeled {
                        handle,
                        label: label.map(str::to_owned),
                    }),
                })
            }

            pub fn label(&self) -> Result<Option<&str>, $crate::error::GpuError> {
                self.inner.handle.raw()?;
                Ok(self.inner.label.as_deref())
            }

            pub fn state(&self) -> $crate::handle::HandleState {
                self.inner.handle.state()
            }

            /// Release the native handle. Returns `false` if it was already
            /// released.
            pub fn release(&self) -> bool {
                self.inner.handle.release()
            }

            pub(crate) fn raw(&self) -> Result<*mut $opaque, $crate::error::GpuError> {
                self.inner.handle.raw()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                std::sync::Arc::ptr_eq(&self.inner, &other.inner)
            }
        }

        impl Eq for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("label", &self.inner.label)
                    .field("handle", &self.inner.handle)
                    .finish()
            }
        }
    };
}

pub(crate) use labeled_resource;
