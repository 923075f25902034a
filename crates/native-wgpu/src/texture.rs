//! Textures and the views created from them.
//!
//! A texture tracks the views it created. Releasing the texture releases
//! those views first, even if the application still holds clones of them;
//! every later use of such a view fails with
//! [`GpuError::UseAfterRelease`]. Views handed out by a swap chain have no
//! owning texture and are released on their own.

use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};

use native_wgpu_sys::{self as sys, NativeApi};
use parking_lot::Mutex;

use crate::buffer::Buffer;
use crate::device::{Device, DeviceShared};
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::types::{
    Extent3d, Origin3d, TextureAspect, TextureDimension, TextureFormat, TextureUsages, TextureViewDimension,
};

/// Describes a [`Texture`].
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    pub label: Option<&'a str>,
    pub size: Extent3d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub dimension: TextureDimension,
    pub format: TextureFormat,
    pub usage: TextureUsages,
}

/// Describes a [`TextureView`]. `None` fields inherit from the texture.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureViewDescriptor<'a> {
    pub label: Option<&'a str>,
    pub format: Option<TextureFormat>,
    pub dimension: Option<TextureViewDimension>,
    pub aspect: TextureAspect,
    pub base_mip_level: u32,
    pub mip_level_count: Option<u32>,
    pub base_array_layer: u32,
    pub array_layer_count: Option<u32>,
}

pub(crate) struct TextureShared {
    handle: Guarded<sys::TextureImpl>,
    device: Device,
    label: Option<String>,
    size: Extent3d,
    mip_level_count: u32,
    sample_count: u32,
    dimension: TextureDimension,
    format: TextureFormat,
    usage: TextureUsages,
    views: Mutex<Vec<TextureView>>,
}

impl TextureShared {
    fn release(&self) -> bool {
        if self.handle.is_released() {
            return false;
        }

        let views = std::mem::take(&mut *self.views.lock());
        let released = views.iter().filter(|view| view.release()).count();
        tracing::debug!(label = ?self.label, views = released, "Releasing texture");

        if self.handle.state() == HandleState::Live {
            let _ = self.handle.destroy();
        }
        self.handle.release()
    }

    fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| "<unlabeled texture>".to_string())
    }
}

impl Drop for TextureShared {
    fn drop(&mut self) {
        self.release();
    }
}

/// A GPU image.
#[derive(Clone)]
pub struct Texture {
    shared: Arc<TextureShared>,
}

impl Texture {
    pub(crate) fn create(device: &Device, descriptor: &TextureDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = sys::TextureDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            usage: descriptor.usage.bits(),
            dimension: descriptor.dimension,
            size: descriptor.size,
            format: descriptor.format,
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
        };
        let raw = unsafe { device.api().device_create_texture(raw_device, &native) };
        let handle = Guarded::new(device.api().clone(), raw)?;

        Ok(Self {
            shared: Arc::new(TextureShared {
                handle,
                device: device.clone(),
                label: descriptor.label.map(str::to_owned),
                size: descriptor.size,
                mip_level_count: descriptor.mip_level_count,
                sample_count: descriptor.sample_count,
                dimension: descriptor.dimension,
                format: descriptor.format,
                usage: descriptor.usage,
                views: Mutex::new(Vec::new()),
            }),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn size(&self) -> Result<Extent3d, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.size)
    }

    pub fn mip_level_count(&self) -> Result<u32, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.mip_level_count)
    }

    pub fn sample_count(&self) -> Result<u32, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.sample_count)
    }

    pub fn dimension(&self) -> Result<TextureDimension, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.dimension)
    }

    pub fn format(&self) -> Result<TextureFormat, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.format)
    }

    pub fn usage(&self) -> Result<TextureUsages, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.usage)
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub(crate) fn live(&self) -> Result<sys::Texture, GpuError> {
        self.shared.handle.live()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Create a view owned by this texture.
    pub fn create_view(&self, descriptor: &TextureViewDescriptor) -> Result<TextureView, GpuError> {
        let texture = self.shared.handle.live()?;
        let mut arena = Arena::new();
        let native = sys::TextureViewDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            format: descriptor.format.unwrap_or(self.shared.format),
            dimension: descriptor.dimension.unwrap_or(TextureViewDimension::UNDEFINED),
            base_mip_level: descriptor.base_mip_level,
            mip_level_count: descriptor.mip_level_count.unwrap_or(sys::MIP_LEVEL_COUNT_UNDEFINED),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: descriptor.array_layer_count.unwrap_or(sys::ARRAY_LAYER_COUNT_UNDEFINED),
            aspect: descriptor.aspect,
        };
        let raw = unsafe { self.api().texture_create_view(texture, &native) };
        self.adopt_view(raw, descriptor.label)
    }

    /// Create a view of the whole texture, labeled after it.
    pub fn create_default_view(&self) -> Result<TextureView, GpuError> {
        let label = self.shared.label.as_ref().map(|label| format!("{} View", label));
        let dimension = match self.shared.dimension {
            TextureDimension::D1 => TextureViewDimension::D1,
            TextureDimension::D3 => TextureViewDimension::D3,
            _ => TextureViewDimension::D2,
        };
        let array_layers = if self.shared.dimension == TextureDimension::D3 {
            1
        } else {
            self.shared.size.depth_or_array_layers
        };
        self.create_view(&TextureViewDescriptor {
            label: label.as_deref(),
            format: Some(self.shared.format),
            dimension: Some(dimension),
            aspect: TextureAspect::ALL,
            base_mip_level: 0,
            mip_level_count: Some(self.shared.mip_level_count),
            base_array_layer: 0,
            array_layer_count: Some(array_layers),
        })
    }

    fn adopt_view(&self, raw: sys::TextureView, label: Option<&str>) -> Result<TextureView, GpuError> {
        let owner = Arc::downgrade(&self.shared);
        let view = self.shared.device.shared.texture_views.get_or_create(raw, |raw| {
            TextureView::from_raw(
                self.api().clone(),
                raw,
                label,
                Some(owner),
                self.shared.device.downgrade(),
            )
        })?;

        let mut views = self.shared.views.lock();
        if !views.contains(&view) {
            views.push(view.clone());
        }
        tracing::trace!(texture = ?self.shared.label, views = views.len(), "Texture view created");
        Ok(view)
    }

    /// Number of live views this texture still owns.
    pub fn view_count(&self) -> Result<usize, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.views.lock().len())
    }

    /// Stop tracking `view`. The view stays usable but has no owner
    /// afterwards. Neither this texture nor the device keeps it alive, so
    /// dropping its last clone releases it.
    pub fn remove_view(&self, view: &TextureView) -> Result<(), GpuError> {
        self.shared.handle.raw()?;
        if !view.is_owned_by(&self.shared) {
            return Err(GpuError::OwnershipViolation {
                view: view.display_label(),
                expected_owner: self.shared.display_label(),
            });
        }
        self.shared.views.lock().retain(|owned| owned != view);
        view.detach();
        Ok(())
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    pub fn destroy(&self) -> Result<bool, GpuError> {
        self.shared.handle.destroy()
    }

    /// Release every view this texture owns, then destroy and release the
    /// texture itself.
    pub fn release(&self) -> bool {
        self.shared.release()
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.shared.label)
            .field("size", &self.shared.size)
            .field("format", &self.shared.format)
            .field("handle", &self.shared.handle)
            .field("views", &self.shared.views.lock().len())
            .finish()
    }
}

// ============================================================================
// Copies
// ============================================================================

/// How texel rows are laid out in a linear buffer or byte slice. `None`
/// strides are left for the native side to derive from the copy size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureDataLayout {
    pub offset: u64,
    pub bytes_per_row: Option<u32>,
    pub rows_per_image: Option<u32>,
}

impl TextureDataLayout {
    pub(crate) fn to_native(self) -> sys::TextureDataLayout {
        sys::TextureDataLayout {
            next_in_chain: ptr::null(),
            offset: self.offset,
            bytes_per_row: self.bytes_per_row.unwrap_or(sys::COPY_STRIDE_UNDEFINED),
            rows_per_image: self.rows_per_image.unwrap_or(sys::COPY_STRIDE_UNDEFINED),
        }
    }
}

/// A region of a buffer taking part in a texture copy.
#[derive(Debug, Clone, Copy)]
pub struct ImageCopyBuffer<'a> {
    pub buffer: &'a Buffer,
    pub layout: TextureDataLayout,
}

impl ImageCopyBuffer<'_> {
    pub(crate) fn to_native(&self) -> Result<sys::ImageCopyBuffer, GpuError> {
        Ok(sys::ImageCopyBuffer {
            next_in_chain: ptr::null(),
            layout: self.layout.to_native(),
            buffer: self.buffer.live()?,
        })
    }
}

/// One mip level of a texture, from `origin`, taking part in a copy.
#[derive(Debug, Clone, Copy)]
pub struct ImageCopyTexture<'a> {
    pub texture: &'a Texture,
    pub mip_level: u32,
    pub origin: Origin3d,
    pub aspect: TextureAspect,
}

impl<'a> ImageCopyTexture<'a> {
    /// Mip level 0 of `texture`, all aspects, from the origin.
    pub fn whole(texture: &'a Texture) -> Self {
        Self {
            texture,
            mip_level: 0,
            origin: Origin3d::default(),
            aspect: TextureAspect::ALL,
        }
    }

    pub(crate) fn to_native(&self) -> Result<sys::ImageCopyTexture, GpuError> {
        Ok(sys::ImageCopyTexture {
            next_in_chain: ptr::null(),
            texture: self.texture.live()?,
            mip_level: self.mip_level,
            origin: self.origin,
            aspect: self.aspect,
        })
    }
}

// ============================================================================
// TextureView
// ============================================================================

struct ViewShared {
    handle: Guarded<sys::TextureViewImpl>,
    label: Option<String>,
    owner: Mutex<Option<Weak<TextureShared>>>,
    device: Weak<DeviceShared>,
}

/// A view into a texture, usable as a binding or render attachment.
#[derive(Clone)]
pub struct TextureView {
    shared: Arc<ViewShared>,
}

impl TextureView {
    pub(crate) fn from_raw(
        api: Arc<dyn NativeApi>,
        raw: sys::TextureView,
        label: Option<&str>,
        owner: Option<Weak<TextureShared>>,
        device: Weak<DeviceShared>,
    ) -> Result<Self, GpuError> {
        Ok(Self {
            shared: Arc::new(ViewShared {
                handle: Guarded::new(api, raw)?,
                label: label.map(str::to_owned),
                owner: Mutex::new(owner),
                device,
            }),
        })
    }

    pub(crate) fn raw(&self) -> Result<sys::TextureView, GpuError> {
        self.shared.handle.raw()
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    /// The texture this view was created from. `None` for swap chain views
    /// and views removed from their texture.
    pub fn owner(&self) -> Result<Option<Texture>, GpuError> {
        self.shared.handle.raw()?;
        let owner = self.shared.owner.lock().as_ref().and_then(Weak::upgrade);
        Ok(owner.map(|shared| Texture { shared }))
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    fn is_owned_by(&self, texture: &Arc<TextureShared>) -> bool {
        self.shared
            .owner
            .lock()
            .as_ref()
            .is_some_and(|owner| ptr::eq(owner.as_ptr(), Arc::as_ptr(texture)))
    }

    /// Drop the owner link and the device registry entry.
    fn detach(&self) {
        self.shared.owner.lock().take();
        if let (Ok(raw), Some(device)) = (self.shared.handle.raw(), self.shared.device.upgrade()) {
            device.texture_views.forget(raw);
        }
    }

    fn display_label(&self) -> String {
        self.shared
            .label
            .clone()
            .unwrap_or_else(|| "<unlabeled view>".to_string())
    }

    /// Release the view, detach it from its texture and drop it from the
    /// device registry.
    pub fn release(&self) -> bool {
        let Ok(raw) = self.shared.handle.raw() else {
            tracing::debug!(label = ?self.shared.label, "Ignored repeated texture view release");
            return false;
        };

        let owner = self.shared.owner.lock().take().and_then(|owner| owner.upgrade());
        if let Some(owner) = owner {
            owner.views.lock().retain(|view| view != self);
        }
        if let Some(device) = self.shared.device.upgrade() {
            device.texture_views.forget(raw);
        }
        self.shared.handle.release()
    }
}

impl PartialEq for TextureView {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for TextureView {}

impl fmt::Debug for TextureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureView")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}
