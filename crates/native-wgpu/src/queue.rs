use std::fmt;
use std::sync::{Arc, Weak};

use ahash::HashSet;
use native_wgpu_sys::{self as sys, NativeApi};

use crate::buffer::Buffer;
use crate::callback;
use crate::command::CommandBuffer;
use crate::device::DeviceShared;
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::profiling::profile_function;
use crate::texture::{ImageCopyTexture, TextureDataLayout};
use crate::types::{Extent3d, QueueWorkDoneStatus};

struct QueueShared {
    handle: Guarded<sys::QueueImpl>,
    device: Weak<DeviceShared>,
}

/// The command queue of a device. There is one wrapper per native queue,
/// obtained through [`Device::queue`](crate::Device::queue).
#[derive(Clone)]
pub struct Queue {
    shared: Arc<QueueShared>,
}

impl Queue {
    pub(crate) fn from_raw(api: Arc<dyn NativeApi>, raw: sys::Queue, device: Weak<DeviceShared>) -> Result<Self, GpuError> {
        Ok(Self {
            shared: Arc::new(QueueShared {
                handle: Guarded::new(api, raw)?,
                device,
            }),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    /// Submit finished command buffers. The native side takes ownership of
    /// every buffer; the wrappers are released afterwards without a second
    /// free. A buffer listed twice is rejected before anything is consumed.
    pub fn submit(&self, command_buffers: &[CommandBuffer]) -> Result<(), GpuError> {
        profile_function!();
        let queue = self.shared.handle.raw()?;
        // Check everything before consuming anything, so a stale or repeated
        // buffer leaves the others untouched.
        let mut seen = HashSet::default();
        for command_buffer in command_buffers {
            let raw = command_buffer.raw()?;
            if !seen.insert(raw.addr()) {
                return Err(GpuError::InvalidArgument(format!(
                    "command buffer {:?} appears more than once in one submit",
                    command_buffer.label().ok().flatten().unwrap_or("<unlabeled>")
                )));
            }
        }
        let raws = command_buffers
            .iter()
            .map(CommandBuffer::consume)
            .collect::<Result<Vec<_>, _>>()?;

        unsafe { self.api().queue_submit(queue, raws.len() as u32, raws.as_ptr()) };
        tracing::trace!(count = raws.len(), "Submitted command buffers");
        Ok(())
    }

    /// Copy `data` into `buffer` at `offset` once previously submitted work
    /// has finished.
    pub fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<(), GpuError> {
        let queue = self.shared.handle.raw()?;
        let target = buffer.live()?;
        unsafe {
            self.api()
                .queue_write_buffer(queue, target, offset, data.as_ptr().cast(), data.len())
        };
        Ok(())
    }

    /// Copy `data` into a region of a texture. `layout` describes how the
    /// texels are laid out in `data`.
    pub fn write_texture(
        &self,
        destination: &ImageCopyTexture,
        data: &[u8],
        layout: TextureDataLayout,
        size: Extent3d,
    ) -> Result<(), GpuError> {
        let queue = self.shared.handle.raw()?;
        let destination = destination.to_native()?;
        let layout = layout.to_native();
        unsafe {
            self.api()
                .queue_write_texture(queue, &destination, data.as_ptr().cast(), data.len(), &layout, &size)
        };
        Ok(())
    }

    /// [`write_buffer`](Self::write_buffer) for plain-old-data slices.
    pub fn write_buffer_pod<T: bytemuck::Pod>(&self, buffer: &Buffer, offset: u64, data: &[T]) -> Result<(), GpuError> {
        self.write_buffer(buffer, offset, bytemuck::cast_slice(data))
    }

    /// Call `callback` once all work submitted so far has completed.
    pub fn on_submitted_work_done<F>(&self, callback: F) -> Result<(), GpuError>
    where
        F: FnOnce(QueueWorkDoneStatus) + Send + 'static,
    {
        let queue = self.shared.handle.raw()?;
        let (trampoline, userdata) = callback::work_done(callback);
        unsafe { self.api().queue_on_submitted_work_done(queue, trampoline, userdata) };
        Ok(())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    /// Release the queue and drop it from the device registry. The next
    /// [`Device::queue`](crate::Device::queue) call builds a new wrapper.
    pub fn release(&self) -> bool {
        let Ok(raw) = self.shared.handle.raw() else {
            tracing::debug!("Ignored repeated queue release");
            return false;
        };
        if let Some(device) = self.shared.device.upgrade() {
            device.queues.forget(raw);
        }
        self.shared.handle.release()
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Queue {}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("handle", &self.shared.handle).finish()
    }
}
