use std::ptr;

use native_wgpu_sys as sys;

use crate::device::Device;
use crate::error::GpuError;
use crate::marshal::Arena;
use crate::resource::labeled_resource;
use crate::types::{AddressMode, CompareFunction, FilterMode, MipmapFilterMode};

/// Describes a [`Sampler`].
#[derive(Debug, Clone, Copy)]
pub struct SamplerDescriptor<'a> {
    pub label: Option<&'a str>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: MipmapFilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    /// Turns the sampler into a comparison sampler.
    pub compare: Option<CompareFunction>,
    pub max_anisotropy: u16,
}

impl Default for SamplerDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::CLAMP_TO_EDGE,
            address_mode_v: AddressMode::CLAMP_TO_EDGE,
            address_mode_w: AddressMode::CLAMP_TO_EDGE,
            mag_filter: FilterMode::NEAREST,
            min_filter: FilterMode::NEAREST,
            mipmap_filter: MipmapFilterMode::NEAREST,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            max_anisotropy: 1,
        }
    }
}

labeled_resource! {
    /// Texture sampling state.
    Sampler => sys::SamplerImpl
}

impl Sampler {
    pub(crate) fn create(device: &Device, descriptor: &SamplerDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = sys::SamplerDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            address_mode_u: descriptor.address_mode_u,
            address_mode_v: descriptor.address_mode_v,
            address_mode_w: descriptor.address_mode_w,
            mag_filter: descriptor.mag_filter,
            min_filter: descriptor.min_filter,
            mipmap_filter: descriptor.mipmap_filter,
            lod_min_clamp: descriptor.lod_min_clamp,
            lod_max_clamp: descriptor.lod_max_clamp,
            compare: descriptor.compare.unwrap_or(CompareFunction::UNDEFINED),
            max_anisotropy: descriptor.max_anisotropy,
        };
        let raw = unsafe { device.api().device_create_sampler(raw_device, &native) };
        Self::from_raw(device.api().clone(), raw, descriptor.label)
    }
}
