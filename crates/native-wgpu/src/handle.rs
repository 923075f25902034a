//! Handle lifetime guard.
//!
//! [`Guarded`] owns exactly one native handle and tracks where it is in its
//! lifecycle:
//!
//! ```text
//! Live --destroy--> Destroyed --release--> Released
//!   \-------------------release-----------------^
//! ```
//!
//! A destroyed resource keeps its handle (the native object still exists and
//! must be released), but it can no longer be handed to the GPU. A released
//! resource has no handle at all; every use reports
//! [`GpuError::UseAfterRelease`]. Releasing twice is harmless.

use std::fmt;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use native_wgpu_sys::{self as sys, NativeApi};

use crate::error::{GpuError, ResourceKind};

/// An opaque native object type the wrapper knows how to release.
pub trait NativeObject: Sized {
    const KIND: ResourceKind;

    /// Whether the native side has a separate destroy entry point.
    const DESTROYABLE: bool = false;

    /// # Safety
    ///
    /// `raw` must be a live handle of this kind that is not used afterwards.
    unsafe fn release(api: &dyn NativeApi, raw: *mut Self);

    /// # Safety
    ///
    /// `raw` must be a live handle of this kind.
    unsafe fn destroy(api: &dyn NativeApi, raw: *mut Self) {
        let _ = (api, raw);
    }
}

macro_rules! native_objects {
    (@destroy $destroy:ident) => {
        const DESTROYABLE: bool = true;

        unsafe fn destroy(api: &dyn NativeApi, raw: *mut Self) {
            unsafe { api.$destroy(raw) }
        }
    };
    ($($opaque:ident => $kind:ident, $release:ident $(, $destroy:ident)?;)*) => {
        $(
            impl NativeObject for sys::$opaque {
                const KIND: ResourceKind = ResourceKind::$kind;

                unsafe fn release(api: &dyn NativeApi, raw: *mut Self) {
                    unsafe { api.$release(raw) }
                }

                $(native_objects!(@destroy $destroy);)?
            }
        )*
    };
}

native_objects! {
    InstanceImpl => Instance, instance_drop;
    AdapterImpl => Adapter, adapter_drop;
    SurfaceImpl => Surface, surface_drop;
    DeviceImpl => Device, device_drop, device_destroy;
    QueueImpl => Queue, queue_drop;
    BufferImpl => Buffer, buffer_drop, buffer_destroy;
    TextureImpl => Texture, texture_drop, texture_destroy;
    TextureViewImpl => TextureView, texture_view_drop;
    SamplerImpl => Sampler, sampler_drop;
    BindGroupLayoutImpl => BindGroupLayout, bind_group_layout_drop;
    BindGroupImpl => BindGroup, bind_group_drop;
    PipelineLayoutImpl => PipelineLayout, pipeline_layout_drop;
    ShaderModuleImpl => ShaderModule, shader_module_drop;
    ComputePipelineImpl => ComputePipeline, compute_pipeline_drop;
    RenderPipelineImpl => RenderPipeline, render_pipeline_drop;
    CommandEncoderImpl => CommandEncoder, command_encoder_drop;
    CommandBufferImpl => CommandBuffer, command_buffer_drop;
    ComputePassEncoderImpl => ComputePass, compute_pass_encoder_drop;
    RenderPassEncoderImpl => RenderPass, render_pass_encoder_drop;
    QuerySetImpl => QuerySet, query_set_drop, query_set_destroy;
    SwapChainImpl => SwapChain, swap_chain_drop;
}

/// Where a guarded handle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Live,
    Destroyed,
    Released,
}

/// Owner of one native handle.
///
/// The slot is atomic, so a `Guarded` can be shared across threads, but the
/// native library still expects callers to synchronise use of one object.
pub struct Guarded<T: NativeObject> {
    raw: AtomicPtr<T>,
    destroyed: AtomicBool,
    api: Arc<dyn NativeApi>,
}

impl<T: NativeObject> Guarded<T> {
    /// Take ownership of `raw`. A null handle means the native create call
    /// failed.
    pub fn new(api: Arc<dyn NativeApi>, raw: *mut T) -> Result<Self, GpuError> {
        if raw.is_null() {
            tracing::warn!(kind = %T::KIND, "Native create returned a null handle");
            return Err(GpuError::CreationFailed { kind: T::KIND });
        }
        tracing::trace!(kind = %T::KIND, handle = ?raw, "Handle acquired");
        Ok(Self {
            raw: AtomicPtr::new(raw),
            destroyed: AtomicBool::new(false),
            api,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        T::KIND
    }

    pub fn api(&self) -> &Arc<dyn NativeApi> {
        &self.api
    }

    /// The handle, unless it was released.
    pub fn raw(&self) -> Result<*mut T, GpuError> {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            return Err(GpuError::UseAfterRelease { kind: T::KIND });
        }
        Ok(raw)
    }

    /// The handle, unless it was released or destroyed.
    pub fn live(&self) -> Result<*mut T, GpuError> {
        let raw = self.raw()?;
        if self.destroyed.load(Ordering::Acquire) {
            return Err(GpuError::Destroyed { kind: T::KIND });
        }
        Ok(raw)
    }

    pub fn state(&self) -> HandleState {
        if self.raw.load(Ordering::Acquire).is_null() {
            HandleState::Released
        } else if self.destroyed.load(Ordering::Acquire) {
            HandleState::Destroyed
        } else {
            HandleState::Live
        }
    }

    pub fn is_released(&self) -> bool {
        self.state() == HandleState::Released
    }

    /// Destroy the native resource. Only the first call reaches the native
    /// side; the return value tells whether this call did.
    pub fn destroy(&self) -> Result<bool, GpuError> {
        debug_assert!(T::DESTROYABLE, "{} has no destroy entry point", T::KIND);
        let raw = self.raw()?;
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        // SAFETY: `raw` was non-null, so it has not been released.
        unsafe { T::destroy(&*self.api, raw) };
        tracing::debug!(kind = %T::KIND, handle = ?raw, "Resource destroyed");
        Ok(true)
    }

    /// Release the handle. Returns `false` if it was already released, in
    /// which case nothing reaches the native side.
    pub fn release(&self) -> bool {
        let raw = self.raw.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            tracing::debug!(kind = %T::KIND, "Ignored repeated release");
            return false;
        }
        // SAFETY: the swap made this call the sole owner of `raw`.
        unsafe { T::release(&*self.api, raw) };
        tracing::trace!(kind = %T::KIND, handle = ?raw, "Handle released");
        true
    }

    /// Give up the handle without releasing it, for native calls that take
    /// ownership (finishing an encoder, ending a pass, submitting).
    pub(crate) fn consume(&self) -> Result<*mut T, GpuError> {
        let raw = self.raw.swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return Err(GpuError::UseAfterRelease { kind: T::KIND });
        }
        tracing::trace!(kind = %T::KIND, handle = ?raw, "Handle consumed");
        Ok(raw)
    }
}

impl<T: NativeObject> Drop for Guarded<T> {
    fn drop(&mut self) {
        if !self.raw.get_mut().is_null() {
            self.release();
        }
    }
}

impl<T: NativeObject> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("kind", &T::KIND)
            .field("handle", &self.raw.load(Ordering::Relaxed))
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_wgpu_test_utils::MockNative;

    fn mock() -> (Arc<MockNative>, Arc<dyn NativeApi>) {
        let mock = Arc::new(MockNative::new());
        let api: Arc<dyn NativeApi> = mock.clone();
        (mock, api)
    }

    #[test]
    fn test_null_handle_is_creation_failure() {
        let (_, api) = mock();
        let err = Guarded::<sys::BufferImpl>::new(api, ptr::null_mut()).unwrap_err();
        assert_eq!(
            err,
            GpuError::CreationFailed {
                kind: ResourceKind::Buffer
            }
        );
    }

    #[test]
    fn test_release_twice_is_harmless() {
        let (mock, api) = mock();
        let raw = mock.fake_handle::<sys::SamplerImpl>();
        let guarded = Guarded::new(api, raw).unwrap();

        assert!(guarded.release());
        assert!(!guarded.release());
        assert_eq!(mock.release_count(raw.addr()), 1);
        assert_eq!(
            guarded.raw().unwrap_err(),
            GpuError::UseAfterRelease {
                kind: ResourceKind::Sampler
            }
        );
    }

    #[test]
    fn test_drop_releases_live_handle() {
        let (mock, api) = mock();
        let raw = mock.fake_handle::<sys::ShaderModuleImpl>();
        drop(Guarded::new(api, raw).unwrap());
        assert_eq!(mock.release_count(raw.addr()), 1);
    }

    #[test]
    fn test_destroy_then_release() {
        let (mock, api) = mock();
        let raw = mock.fake_handle::<sys::BufferImpl>();
        let guarded = Guarded::new(api, raw).unwrap();

        assert_eq!(guarded.destroy(), Ok(true));
        assert_eq!(guarded.destroy(), Ok(false));
        assert_eq!(guarded.state(), HandleState::Destroyed);
        assert!(guarded.raw().is_ok());
        assert_eq!(
            guarded.live().unwrap_err(),
            GpuError::Destroyed {
                kind: ResourceKind::Buffer
            }
        );

        assert!(guarded.release());
        assert_eq!(guarded.state(), HandleState::Released);
        assert_eq!(mock.destroy_count(raw.addr()), 1);
        assert_eq!(mock.release_count(raw.addr()), 1);
    }

    #[test]
    fn test_consume_skips_release() {
        let (mock, api) = mock();
        let raw = mock.fake_handle::<sys::CommandEncoderImpl>();
        let guarded = Guarded::new(api, raw).unwrap();

        assert_eq!(guarded.consume().unwrap(), raw);
        assert!(guarded.consume().is_err());
        drop(guarded);
        assert_eq!(mock.release_count(raw.addr()), 0);
    }
}
