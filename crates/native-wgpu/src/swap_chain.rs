use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys as sys;
use parking_lot::Mutex;

use crate::device::Device;
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::profiling::profile_function;
use crate::surface::Surface;
use crate::texture::TextureView;
use crate::types::{PresentMode, TextureFormat, TextureUsages};

/// Describes a [`SwapChain`].
#[derive(Debug, Clone, Copy)]
pub struct SwapChainDescriptor<'a> {
    pub label: Option<&'a str>,
    pub usage: TextureUsages,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
}

struct SwapChainShared {
    handle: Guarded<sys::SwapChainImpl>,
    device: Device,
    _surface: Surface,
    label: Option<String>,
    current: Mutex<Option<TextureView>>,
}

impl SwapChainShared {
    fn release_current(&self) {
        if let Some(view) = self.current.lock().take() {
            view.release();
        }
    }
}

impl Drop for SwapChainShared {
    fn drop(&mut self) {
        self.release_current();
    }
}

/// The chain of images presented to a [`Surface`].
#[derive(Clone)]
pub struct SwapChain {
    shared: Arc<SwapChainShared>,
}

impl SwapChain {
    pub(crate) fn create(device: &Device, surface: &Surface, descriptor: &SwapChainDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let raw_surface = surface.raw()?;
        let mut arena = Arena::new();
        let native = sys::SwapChainDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            usage: descriptor.usage.bits(),
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
            present_mode: descriptor.present_mode,
        };
        let raw = unsafe { device.api().device_create_swap_chain(raw_device, raw_surface, &native) };
        tracing::debug!(width = descriptor.width, height = descriptor.height, format = ?descriptor.format, "Swap chain created");

        Ok(Self {
            shared: Arc::new(SwapChainShared {
                handle: Guarded::new(device.api().clone(), raw)?,
                device: device.clone(),
                _surface: surface.clone(),
                label: descriptor.label.map(str::to_owned),
                current: Mutex::new(None),
            }),
        })
    }

    /// The view to render the next frame into. Repeated calls before
    /// [`present`](Self::present) return the same wrapper. The view has no
    /// owning texture. When the native side hands out a different view, the
    /// previous one is released.
    pub fn current_texture_view(&self) -> Result<TextureView, GpuError> {
        let swap_chain = self.shared.handle.live()?;
        let device = &self.shared.device;
        let raw = unsafe { device.api().swap_chain_get_current_texture_view(swap_chain) };
        let view = device.shared.texture_views.get_or_create(raw, |raw| {
            TextureView::from_raw(device.api().clone(), raw, None, None, device.downgrade())
        })?;
        let previous = self.shared.current.lock().replace(view.clone());
        // The native side moved on to a new image; its old view is dead.
        if let Some(previous) = previous.filter(|previous| *previous != view) {
            tracing::trace!(label = ?self.shared.label, "Releasing superseded swap chain view");
            previous.release();
        }
        Ok(view)
    }

    /// Present the current image and release its view.
    pub fn present(&self) -> Result<(), GpuError> {
        profile_function!();
        let swap_chain = self.shared.handle.live()?;
        unsafe { self.shared.device.api().swap_chain_present(swap_chain) };
        self.shared.release_current();
        Ok(())
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn release(&self) -> bool {
        self.shared.release_current();
        self.shared.handle.release()
    }
}

impl PartialEq for SwapChain {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for SwapChain {}

impl fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChain")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}
