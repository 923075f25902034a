//! Descriptor and plain-data layouts passed across the ABI.

use core::ffi::c_char;

use crate::chained::{ChainedStruct, ChainedStructOut};
use crate::enums::*;
use crate::handles::*;

pub const WHOLE_SIZE: u64 = u64::MAX;
pub const WHOLE_MAP_SIZE: usize = usize::MAX;
pub const COPY_STRIDE_UNDEFINED: u32 = u32::MAX;
pub const LIMIT_U32_UNDEFINED: u32 = u32::MAX;
pub const LIMIT_U64_UNDEFINED: u64 = u64::MAX;
pub const ARRAY_LAYER_COUNT_UNDEFINED: u32 = u32::MAX;
pub const MIP_LEVEL_COUNT_UNDEFINED: u32 = u32::MAX;

// ============================================================================
// Instance, adapter and device
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InstanceDescriptor {
    pub next_in_chain: *const ChainedStruct,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RequestAdapterOptions {
    pub next_in_chain: *const ChainedStruct,
    pub compatible_surface: Surface,
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AdapterProperties {
    pub next_in_chain: *mut ChainedStructOut,
    pub vendor_id: u32,
    pub device_id: u32,
    pub name: *const c_char,
    pub driver_description: *const c_char,
    pub adapter_type: AdapterType,
    pub backend_type: BackendType,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_texture_dimension_1d: u32,
    pub max_texture_dimension_2d: u32,
    pub max_texture_dimension_3d: u32,
    pub max_texture_array_layers: u32,
    pub max_bind_groups: u32,
    pub max_dynamic_uniform_buffers_per_pipeline_layout: u32,
    pub max_dynamic_storage_buffers_per_pipeline_layout: u32,
    pub max_sampled_textures_per_shader_stage: u32,
    pub max_samplers_per_shader_stage: u32,
    pub max_storage_buffers_per_shader_stage: u32,
    pub max_storage_textures_per_shader_stage: u32,
    pub max_uniform_buffers_per_shader_stage: u32,
    pub max_uniform_buffer_binding_size: u64,
    pub max_storage_buffer_binding_size: u64,
    pub min_uniform_buffer_offset_alignment: u32,
    pub min_storage_buffer_offset_alignment: u32,
    pub max_vertex_buffers: u32,
    pub max_vertex_attributes: u32,
    pub max_vertex_buffer_array_stride: u32,
    pub max_inter_stage_shader_components: u32,
    pub max_compute_workgroup_storage_size: u32,
    pub max_compute_invocations_per_workgroup: u32,
    pub max_compute_workgroup_size_x: u32,
    pub max_compute_workgroup_size_y: u32,
    pub max_compute_workgroup_size_z: u32,
    pub max_compute_workgroups_per_dimension: u32,
}

impl Limits {
    /// Every limit left to the implementation's default.
    pub const UNDEFINED: Self = Self {
        max_texture_dimension_1d: LIMIT_U32_UNDEFINED,
        max_texture_dimension_2d: LIMIT_U32_UNDEFINED,
        max_texture_dimension_3d: LIMIT_U32_UNDEFINED,
        max_texture_array_layers: LIMIT_U32_UNDEFINED,
        max_bind_groups: LIMIT_U32_UNDEFINED,
        max_dynamic_uniform_buffers_per_pipeline_layout: LIMIT_U32_UNDEFINED,
        max_dynamic_storage_buffers_per_pipeline_layout: LIMIT_U32_UNDEFINED,
        max_sampled_textures_per_shader_stage: LIMIT_U32_UNDEFINED,
        max_samplers_per_shader_stage: LIMIT_U32_UNDEFINED,
        max_storage_buffers_per_shader_stage: LIMIT_U32_UNDEFINED,
        max_storage_textures_per_shader_stage: LIMIT_U32_UNDEFINED,
        max_uniform_buffers_per_shader_stage: LIMIT_U32_UNDEFINED,
        max_uniform_buffer_binding_size: LIMIT_U64_UNDEFINED,
        max_storage_buffer_binding_size: LIMIT_U64_UNDEFINED,
        min_uniform_buffer_offset_alignment: LIMIT_U32_UNDEFINED,
        min_storage_buffer_offset_alignment: LIMIT_U32_UNDEFINED,
        max_vertex_buffers: LIMIT_U32_UNDEFINED,
        max_vertex_attributes: LIMIT_U32_UNDEFINED,
        max_vertex_buffer_array_stride: LIMIT_U32_UNDEFINED,
        max_inter_stage_shader_components: LIMIT_U32_UNDEFINED,
        max_compute_workgroup_storage_size: LIMIT_U32_UNDEFINED,
        max_compute_invocations_per_workgroup: LIMIT_U32_UNDEFINED,
        max_compute_workgroup_size_x: LIMIT_U32_UNDEFINED,
        max_compute_workgroup_size_y: LIMIT_U32_UNDEFINED,
        max_compute_workgroup_size_z: LIMIT_U32_UNDEFINED,
        max_compute_workgroups_per_dimension: LIMIT_U32_UNDEFINED,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RequiredLimits {
    pub next_in_chain: *const ChainedStruct,
    pub limits: Limits,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SupportedLimits {
    pub next_in_chain: *mut ChainedStructOut,
    pub limits: Limits,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct QueueDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DeviceDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub required_features_count: u32,
    pub required_features: *const FeatureName,
    pub required_limits: *const RequiredLimits,
    pub default_queue: QueueDescriptor,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SwapChainDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub usage: Flags,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
}

// ============================================================================
// Resources
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub usage: Flags,
    pub size: u64,
    pub mapped_at_creation: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Origin3d {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub usage: Flags,
    pub dimension: TextureDimension,
    pub size: Extent3d,
    pub format: TextureFormat,
    pub mip_level_count: u32,
    pub sample_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextureViewDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub format: TextureFormat,
    pub dimension: TextureViewDimension,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
    pub aspect: TextureAspect,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SamplerDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: MipmapFilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: CompareFunction,
    pub max_anisotropy: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct QuerySetDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub type_: QueryType,
    pub count: u32,
    pub pipeline_statistics: *const PipelineStatisticName,
    pub pipeline_statistics_count: u32,
}

// ============================================================================
// Binding
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferBindingLayout {
    pub next_in_chain: *const ChainedStruct,
    pub type_: BufferBindingType,
    pub has_dynamic_offset: bool,
    pub min_binding_size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SamplerBindingLayout {
    pub next_in_chain: *const ChainedStruct,
    pub type_: SamplerBindingType,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextureBindingLayout {
    pub next_in_chain: *const ChainedStruct,
    pub sample_type: TextureSampleType,
    pub view_dimension: TextureViewDimension,
    pub multisampled: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StorageTextureBindingLayout {
    pub next_in_chain: *const ChainedStruct,
    pub access: StorageTextureAccess,
    pub format: TextureFormat,
    pub view_dimension: TextureViewDimension,
}

/// One binding slot. Exactly one of the four layouts carries a defined type;
/// the others stay `UNDEFINED`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BindGroupLayoutEntry {
    pub next_in_chain: *const ChainedStruct,
    pub binding: u32,
    pub visibility: Flags,
    pub buffer: BufferBindingLayout,
    pub sampler: SamplerBindingLayout,
    pub texture: TextureBindingLayout,
    pub storage_texture: StorageTextureBindingLayout,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BindGroupLayoutDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub entry_count: u32,
    pub entries: *const BindGroupLayoutEntry,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BindGroupEntry {
    pub next_in_chain: *const ChainedStruct,
    pub binding: u32,
    pub buffer: Buffer,
    pub offset: u64,
    pub size: u64,
    pub sampler: Sampler,
    pub texture_view: TextureView,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BindGroupDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub layout: BindGroupLayout,
    pub entry_count: u32,
    pub entries: *const BindGroupEntry,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PipelineLayoutDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub bind_group_layout_count: u32,
    pub bind_group_layouts: *const BindGroupLayout,
}

// ============================================================================
// Shaders and pipelines
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleCompilationHint {
    pub next_in_chain: *const ChainedStruct,
    pub entry_point: *const c_char,
    pub layout: PipelineLayout,
}

/// The source itself travels in the chain (WGSL or SPIR-V node).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub hint_count: u32,
    pub hints: *const ShaderModuleCompilationHint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConstantEntry {
    pub next_in_chain: *const ChainedStruct,
    pub key: *const c_char,
    pub value: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProgrammableStageDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub module: ShaderModule,
    pub entry_point: *const c_char,
    pub constant_count: u32,
    pub constants: *const ConstantEntry,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub layout: PipelineLayout,
    pub compute: ProgrammableStageDescriptor,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attribute_count: u32,
    pub attributes: *const VertexAttribute,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VertexState {
    pub next_in_chain: *const ChainedStruct,
    pub module: ShaderModule,
    pub entry_point: *const c_char,
    pub constant_count: u32,
    pub constants: *const ConstantEntry,
    pub buffer_count: u32,
    pub buffers: *const VertexBufferLayout,
}

/// `next_in_chain` may carry a [`PrimitiveDepthClipControl`](crate::PrimitiveDepthClipControl).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveState {
    pub next_in_chain: *const ChainedStruct,
    pub topology: PrimitiveTopology,
    pub strip_index_format: IndexFormat,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DepthStencilState {
    pub next_in_chain: *const ChainedStruct,
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
    pub depth_bias: i32,
    pub depth_bias_slope_scale: f32,
    pub depth_bias_clamp: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MultisampleState {
    pub next_in_chain: *const ChainedStruct,
    pub count: u32,
    pub mask: u32,
    pub alpha_to_coverage_enabled: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendComponent {
    pub operation: BlendOperation,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ColorTargetState {
    pub next_in_chain: *const ChainedStruct,
    pub format: TextureFormat,
    pub blend: *const BlendState,
    pub write_mask: Flags,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FragmentState {
    pub next_in_chain: *const ChainedStruct,
    pub module: ShaderModule,
    pub entry_point: *const c_char,
    pub constant_count: u32,
    pub constants: *const ConstantEntry,
    pub target_count: u32,
    pub targets: *const ColorTargetState,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RenderPipelineDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub layout: PipelineLayout,
    pub vertex: VertexState,
    pub primitive: PrimitiveState,
    pub depth_stencil: *const DepthStencilState,
    pub multisample: MultisampleState,
    pub fragment: *const FragmentState,
}

// ============================================================================
// Command encoding
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CommandEncoderDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CommandBufferDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ComputePassDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RenderPassColorAttachment {
    pub view: TextureView,
    pub resolve_target: TextureView,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Color,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDepthStencilAttachment {
    pub view: TextureView,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDescriptor {
    pub next_in_chain: *const ChainedStruct,
    pub label: *const c_char,
    pub color_attachment_count: u32,
    pub color_attachments: *const RenderPassColorAttachment,
    pub depth_stencil_attachment: *const RenderPassDepthStencilAttachment,
    pub occlusion_query_set: QuerySet,
}

// ============================================================================
// Copies
// ============================================================================

/// Layout of texel data in a buffer or host slice.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TextureDataLayout {
    pub next_in_chain: *const ChainedStruct,
    pub offset: u64,
    pub bytes_per_row: u32,
    pub rows_per_image: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ImageCopyBuffer {
    pub next_in_chain: *const ChainedStruct,
    pub layout: TextureDataLayout,
    pub buffer: Buffer,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ImageCopyTexture {
    pub next_in_chain: *const ChainedStruct,
    pub texture: Texture,
    pub mip_level: u32,
    pub origin: Origin3d,
    pub aspect: TextureAspect,
}

// ============================================================================
// Shader compilation info
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CompilationMessage {
    pub next_in_chain: *const ChainedStruct,
    pub message: *const c_char,
    pub type_: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

/// Borrowed for the duration of the compilation info callback.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CompilationInfo {
    pub next_in_chain: *const ChainedStruct,
    pub message_count: usize,
    pub messages: *const CompilationMessage,
}
