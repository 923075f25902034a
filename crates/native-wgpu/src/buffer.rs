use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys::{self as sys, NativeApi};

use crate::callback;
use crate::device::Device;
use crate::error::{GpuError, ResourceKind};
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::types::{BufferMapAsyncStatus, BufferUsages, MapMode};

/// Describes a [`Buffer`].
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: Option<&'a str>,
    pub size: u64,
    pub usage: BufferUsages,
    pub mapped_at_creation: bool,
}

struct BufferShared {
    handle: Guarded<sys::BufferImpl>,
    label: Option<String>,
    size: u64,
    usage: BufferUsages,
}

/// A block of GPU memory.
#[derive(Clone)]
pub struct Buffer {
    shared: Arc<BufferShared>,
}

impl Buffer {
    pub(crate) fn create(device: &Device, descriptor: &BufferDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = sys::BufferDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            usage: descriptor.usage.bits(),
            size: descriptor.size,
            mapped_at_creation: descriptor.mapped_at_creation,
        };
        let raw = unsafe { device.api().device_create_buffer(raw_device, &native) };
        Self::from_raw(device.api().clone(), raw, descriptor)
    }

    /// Wrap a handle created elsewhere. Fails with
    /// [`GpuError::CreationFailed`] for a null handle.
    pub fn from_raw(api: Arc<dyn NativeApi>, raw: sys::Buffer, descriptor: &BufferDescriptor) -> Result<Self, GpuError> {
        let handle = Guarded::new(api, raw)?;
        Ok(Self {
            shared: Arc::new(BufferShared {
                handle,
                label: descriptor.label.map(str::to_owned),
                size: descriptor.size,
                usage: descriptor.usage,
            }),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    pub(crate) fn live(&self) -> Result<sys::Buffer, GpuError> {
        self.shared.handle.live()
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn size(&self) -> Result<u64, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.size)
    }

    pub fn usage(&self) -> Result<BufferUsages, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.usage)
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Request CPU access to `size` bytes starting at `offset`. `callback`
    /// runs once the range is mapped or the request failed.
    pub fn map_async<F>(&self, mode: MapMode, offset: usize, size: usize, callback: F) -> Result<(), GpuError>
    where
        F: FnOnce(Result<(), GpuError>) + Send + 'static,
    {
        let buffer = self.live()?;
        let (trampoline, userdata) = callback::buffer_map(move |status| {
            callback(map_result(status));
        });
        unsafe {
            self.api()
                .buffer_map_async(buffer, mode.bits(), offset, size, trampoline, userdata)
        };
        Ok(())
    }

    /// Copy `data` into the mapped range at `offset`.
    pub fn write_mapped(&self, offset: usize, data: &[u8]) -> Result<(), GpuError> {
        let buffer = self.live()?;
        let target = unsafe { self.api().buffer_get_mapped_range(buffer, offset, data.len()) };
        if target.is_null() {
            return Err(unmapped_range(offset, data.len()));
        }
        // SAFETY: the native side returned a writable range of `data.len()`
        // bytes that stays valid until unmap.
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), target.cast::<u8>(), data.len()) };
        Ok(())
    }

    /// Copy `size` bytes of the mapped range at `offset` out of the buffer.
    pub fn read_mapped(&self, offset: usize, size: usize) -> Result<Vec<u8>, GpuError> {
        let buffer = self.live()?;
        let source = unsafe { self.api().buffer_get_const_mapped_range(buffer, offset, size) };
        if source.is_null() {
            return Err(unmapped_range(offset, size));
        }
        // SAFETY: as in `write_mapped`, for reads.
        Ok(unsafe { std::slice::from_raw_parts(source.cast::<u8>(), size) }.to_vec())
    }

    pub fn unmap(&self) -> Result<(), GpuError> {
        let buffer = self.live()?;
        unsafe { self.api().buffer_unmap(buffer) };
        Ok(())
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Free the GPU memory. The wrapper keeps its metadata and must still be
    /// released.
    pub fn destroy(&self) -> Result<bool, GpuError> {
        self.shared.handle.destroy()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

fn map_result(status: BufferMapAsyncStatus) -> Result<(), GpuError> {
    if status == BufferMapAsyncStatus::SUCCESS {
        return Ok(());
    }
    tracing::warn!(?status, "Buffer map failed");
    Err(GpuError::RequestFailed {
        kind: ResourceKind::Buffer,
        status: format!("{:?}", status),
        message: String::new(),
    })
}

fn unmapped_range(offset: usize, size: usize) -> GpuError {
    GpuError::InvalidArgument(format!(
        "buffer range {}..{} is not mapped",
        offset,
        offset.saturating_add(size)
    ))
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Buffer {}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.shared.label)
            .field("size", &self.shared.size)
            .field("usage", &self.shared.usage)
            .field("handle", &self.shared.handle)
            .finish()
    }
}
