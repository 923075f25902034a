//! Flag sets and plain value types shared by the wrappers.
//!
//! Enums come straight from the sys crate: they are transparent `u32`
//! newtypes, so an unknown value reported by the native side is still a valid
//! Rust value. Bit masks get `bitflags` types here.

use std::ops::Range;

use bitflags::bitflags;
use native_wgpu_sys as sys;

pub use sys::{
    AdapterType, AddressMode, BackendType, BlendComponent, BlendFactor, BlendOperation, BlendState, BufferBindingType,
    BufferMapAsyncStatus, Color, CompareFunction, CompilationInfoRequestStatus, CompilationMessageType,
    CreatePipelineAsyncStatus, CullMode, DeviceLostReason, ErrorFilter, ErrorType, Extent3d,
    FeatureName, FilterMode, FrontFace, IndexFormat, Limits, LoadOp, MipmapFilterMode, NativeFeature, Origin3d,
    PipelineStatisticName, PowerPreference, PresentMode, PrimitiveTopology, QueryType, QueueWorkDoneStatus,
    SamplerBindingType, StencilFaceState, StencilOperation, StorageTextureAccess, StoreOp, TextureAspect,
    TextureDimension, TextureFormat, TextureSampleType, TextureViewDimension, VertexAttribute, VertexFormat,
    VertexStepMode,
};

/// Log level of the native library itself.
pub use sys::LogLevel as NativeLogLevel;

/// Size argument meaning "to the end of the buffer".
pub const WHOLE_SIZE: u64 = sys::WHOLE_SIZE;

bitflags! {
    /// How a buffer may be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsages: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
        const INDIRECT = 1 << 8;
        const QUERY_RESOLVE = 1 << 9;
    }
}

bitflags! {
    /// How a texture may be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsages: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    /// Access requested when mapping a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MapMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

bitflags! {
    /// Shader stages a binding or push constant range is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

bitflags! {
    /// Color channels a render target writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL = Self::COLOR.bits() | Self::ALPHA.bits();
    }
}

/// A block of push constants visible to some shader stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub range: Range<u32>,
}

impl PushConstantRange {
    pub(crate) fn to_native(&self) -> sys::PushConstantRange {
        sys::PushConstantRange {
            stages: self.stages.bits(),
            start: self.range.start,
            end: self.range.end,
        }
    }
}

/// Adapter identification reported by the native side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub vendor_id: u32,
    pub device_id: u32,
    pub name: String,
    pub driver_description: String,
    pub adapter_type: AdapterType,
    pub backend: BackendType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits_match_native_values() {
        assert_eq!((BufferUsages::MAP_READ | BufferUsages::COPY_DST).bits(), 0x9);
        assert_eq!(TextureUsages::RENDER_ATTACHMENT.bits(), 0x10);
        assert_eq!(ColorWrites::ALL.bits(), 0xF);
        assert_eq!(ShaderStages::VERTEX_FRAGMENT.bits(), 0x3);
    }

    #[test]
    fn test_push_constant_range_to_native() {
        let range = PushConstantRange {
            stages: ShaderStages::COMPUTE,
            range: 0..16,
        };
        assert_eq!(
            range.to_native(),
            sys::PushConstantRange {
                stages: 4,
                start: 0,
                end: 16
            }
        );
    }
}
