//! Bind group layouts, bind groups and pipeline layouts.

use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};

use native_wgpu_sys::{self as sys, NativeApi};

use crate::buffer::Buffer;
use crate::chain::ChainBuilder;
use crate::device::{Device, DeviceShared};
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::resource::labeled_resource;
use crate::sampler::Sampler;
use crate::texture::TextureView;
use crate::types::{
    BufferBindingType, PushConstantRange, SamplerBindingType, ShaderStages, StorageTextureAccess, TextureFormat,
    TextureSampleType, TextureViewDimension, WHOLE_SIZE,
};

// ============================================================================
// BindGroupLayout
// ============================================================================

/// What kind of resource a binding slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    Buffer {
        ty: BufferBindingType,
        has_dynamic_offset: bool,
        min_binding_size: u64,
    },
    Sampler(SamplerBindingType),
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
        multisampled: bool,
    },
    StorageTexture {
        access: StorageTextureAccess,
        format: TextureFormat,
        view_dimension: TextureViewDimension,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    /// Fill the one sub-layout matching `ty` and leave the others undefined.
    fn to_native(&self) -> sys::BindGroupLayoutEntry {
        let mut entry = sys::BindGroupLayoutEntry {
            next_in_chain: ptr::null(),
            binding: self.binding,
            visibility: self.visibility.bits(),
            buffer: sys::BufferBindingLayout {
                next_in_chain: ptr::null(),
                type_: BufferBindingType::UNDEFINED,
                has_dynamic_offset: false,
                min_binding_size: 0,
            },
            sampler: sys::SamplerBindingLayout {
                next_in_chain: ptr::null(),
                type_: SamplerBindingType::UNDEFINED,
            },
            texture: sys::TextureBindingLayout {
                next_in_chain: ptr::null(),
                sample_type: TextureSampleType::UNDEFINED,
                view_dimension: TextureViewDimension::UNDEFINED,
                multisampled: false,
            },
            storage_texture: sys::StorageTextureBindingLayout {
                next_in_chain: ptr::null(),
                access: StorageTextureAccess::UNDEFINED,
                format: TextureFormat::UNDEFINED,
                view_dimension: TextureViewDimension::UNDEFINED,
            },
        };
        match self.ty {
            BindingType::Buffer {
                ty,
                has_dynamic_offset,
                min_binding_size,
            } => {
                entry.buffer.type_ = ty;
                entry.buffer.has_dynamic_offset = has_dynamic_offset;
                entry.buffer.min_binding_size = min_binding_size;
            }
            BindingType::Sampler(ty) => entry.sampler.type_ = ty,
            BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            } => {
                entry.texture.sample_type = sample_type;
                entry.texture.view_dimension = view_dimension;
                entry.texture.multisampled = multisampled;
            }
            BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            } => {
                entry.storage_texture.access = access;
                entry.storage_texture.format = format;
                entry.storage_texture.view_dimension = view_dimension;
            }
        }
        entry
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BindGroupLayoutDescriptor<'a> {
    pub label: Option<&'a str>,
    pub entries: &'a [BindGroupLayoutEntry],
}

struct LayoutShared {
    handle: Guarded<sys::BindGroupLayoutImpl>,
    label: Option<String>,
    device: Weak<DeviceShared>,
}

/// The shape of a bind group. One wrapper exists per native layout, whether
/// it was created directly or read back from a pipeline.
#[derive(Clone)]
pub struct BindGroupLayout {
    shared: Arc<LayoutShared>,
}

impl BindGroupLayout {
    pub(crate) fn create(device: &Device, descriptor: &BindGroupLayoutDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let (entries, entry_count) = arena.collect(descriptor.entries.iter().map(BindGroupLayoutEntry::to_native));
        let native = sys::BindGroupLayoutDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            entry_count: entry_count as u32,
            entries,
        };
        let raw = unsafe { device.api().device_create_bind_group_layout(raw_device, &native) };
        device.shared.bind_group_layouts.get_or_create(raw, |raw| {
            Self::from_raw(device.api().clone(), raw, descriptor.label, device.downgrade())
        })
    }

    pub(crate) fn from_raw(
        api: Arc<dyn NativeApi>,
        raw: sys::BindGroupLayout,
        label: Option<&str>,
        device: Weak<DeviceShared>,
    ) -> Result<Self, GpuError> {
        Ok(Self {
            shared: Arc::new(LayoutShared {
                handle: Guarded::new(api, raw)?,
                label: label.map(str::to_owned),
                device,
            }),
        })
    }

    pub(crate) fn raw(&self) -> Result<sys::BindGroupLayout, GpuError> {
        self.shared.handle.raw()
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    /// Release the layout and drop it from the device registry.
    pub fn release(&self) -> bool {
        let Ok(raw) = self.shared.handle.raw() else {
            tracing::debug!(label = ?self.shared.label, "Ignored repeated bind group layout release");
            return false;
        };
        if let Some(device) = self.shared.device.upgrade() {
            device.bind_group_layouts.forget(raw);
        }
        self.shared.handle.release()
    }
}

impl PartialEq for BindGroupLayout {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for BindGroupLayout {}

impl fmt::Debug for BindGroupLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindGroupLayout")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}

// ============================================================================
// BindGroup
// ============================================================================

/// The resource bound to one slot.
#[derive(Debug, Clone, Copy)]
pub enum BindingResource<'a> {
    /// `size: None` binds to the end of the buffer.
    Buffer {
        buffer: &'a Buffer,
        offset: u64,
        size: Option<u64>,
    },
    Sampler(&'a Sampler),
    TextureView(&'a TextureView),
}

#[derive(Debug, Clone, Copy)]
pub struct BindGroupEntry<'a> {
    pub binding: u32,
    pub resource: BindingResource<'a>,
}

impl BindGroupEntry<'_> {
    fn to_native(&self) -> Result<sys::BindGroupEntry, GpuError> {
        let mut entry = sys::BindGroupEntry {
            next_in_chain: ptr::null(),
            binding: self.binding,
            buffer: ptr::null_mut(),
            offset: 0,
            size: WHOLE_SIZE,
            sampler: ptr::null_mut(),
            texture_view: ptr::null_mut(),
        };
        match self.resource {
            BindingResource::Buffer { buffer, offset, size } => {
                entry.buffer = buffer.live()?;
                entry.offset = offset;
                entry.size = size.unwrap_or(WHOLE_SIZE);
            }
            BindingResource::Sampler(sampler) => entry.sampler = sampler.raw()?,
            BindingResource::TextureView(view) => entry.texture_view = view.raw()?,
        }
        Ok(entry)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BindGroupDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: &'a BindGroupLayout,
    pub entries: &'a [BindGroupEntry<'a>],
}

labeled_resource! {
    /// A set of resources bound together for a shader.
    BindGroup => sys::BindGroupImpl
}

impl BindGroup {
    pub(crate) fn create(device: &Device, descriptor: &BindGroupDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let layout = descriptor.layout.raw()?;
        let entries = descriptor
            .entries
            .iter()
            .map(BindGroupEntry::to_native)
            .collect::<Result<Vec<_>, _>>()?;

        let mut arena = Arena::new();
        let (entries, entry_count) = arena.slice(&entries);
        let native = sys::BindGroupDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            layout,
            entry_count: entry_count as u32,
            entries,
        };
        let raw = unsafe { device.api().device_create_bind_group(raw_device, &native) };
        Self::from_raw(device.api().clone(), raw, descriptor.label)
    }
}

// ============================================================================
// PipelineLayout
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PipelineLayoutDescriptor<'a> {
    pub label: Option<&'a str>,
    pub bind_group_layouts: &'a [&'a BindGroupLayout],
    /// Needs [`NativeFeature::PUSH_CONSTANTS`](crate::types::NativeFeature::PUSH_CONSTANTS).
    pub push_constant_ranges: &'a [PushConstantRange],
}

labeled_resource! {
    /// The bind group layouts a pipeline uses.
    PipelineLayout => sys::PipelineLayoutImpl
}

impl PipelineLayout {
    pub(crate) fn create(device: &Device, descriptor: &PipelineLayoutDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let layouts = descriptor
            .bind_group_layouts
            .iter()
            .map(|layout| layout.raw())
            .collect::<Result<Vec<_>, _>>()?;

        let mut chain = ChainBuilder::new();
        if !descriptor.push_constant_ranges.is_empty() {
            let ranges: Vec<_> = descriptor
                .push_constant_ranges
                .iter()
                .map(PushConstantRange::to_native)
                .collect();
            chain.add_pipeline_layout_extras(&ranges);
        }

        let mut arena = Arena::new();
        let (bind_group_layouts, layout_count) = arena.slice(&layouts);
        let native = sys::PipelineLayoutDescriptor {
            next_in_chain: arena.chain(chain),
            label: arena.label(descriptor.label)?,
            bind_group_layout_count: layout_count as u32,
            bind_group_layouts,
        };
        let raw = unsafe { device.api().device_create_pipeline_layout(raw_device, &native) };
        Self::from_raw(device.api().clone(), raw, descriptor.label)
    }
}
