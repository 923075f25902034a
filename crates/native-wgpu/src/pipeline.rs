//! Compute and render pipelines.
//!
//! Pipelines keep their device alive. Bind group layouts read back from a
//! pipeline go through the device registry, so asking twice for the same
//! index yields the same [`BindGroupLayout`] wrapper.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys::{self as sys, NativeApi};

use crate::binding::{BindGroupLayout, PipelineLayout};
use crate::callback;
use crate::chain::ChainBuilder;
use crate::device::Device;
use crate::error::{GpuError, ResourceKind};
use crate::handle::{Guarded, HandleState, NativeObject};
use crate::marshal::Arena;
use crate::shader::ShaderModule;
use crate::types::{
    BlendState, ColorWrites, CompareFunction, CullMode, FrontFace, IndexFormat, PrimitiveTopology, StencilFaceState,
    TextureFormat, VertexAttribute, VertexStepMode,
};

/// Pipeline-overridable constant, keyed by name or id.
pub type ConstantEntry<'a> = (&'a str, f64);

/// Marshal a shader stage: module handle, entry point and constants.
fn stage(
    arena: &mut Arena,
    module: &ShaderModule,
    entry_point: &str,
    constants: &[ConstantEntry],
) -> Result<(sys::ShaderModule, *const std::ffi::c_char, *const sys::ConstantEntry, u32), GpuError> {
    let module = module.raw()?;
    let entry_point = arena.c_str(entry_point, "entry point")?;
    let constants = constants
        .iter()
        .map(|&(key, value)| {
            Ok(sys::ConstantEntry {
                next_in_chain: ptr::null(),
                key: arena.c_str(key, "constant key")?,
                value,
            })
        })
        .collect::<Result<Vec<_>, GpuError>>()?;
    let (constants, count) = arena.collect(constants);
    Ok((module, entry_point, constants, count as u32))
}

fn layout_handle(layout: Option<&PipelineLayout>) -> Result<sys::PipelineLayout, GpuError> {
    match layout {
        Some(layout) => layout.raw(),
        None => Ok(ptr::null_mut()),
    }
}

struct PipelineShared<T: NativeObject> {
    handle: Guarded<T>,
    device: Device,
    label: Option<String>,
}

impl<T: NativeObject> PipelineShared<T> {
    fn new(device: &Device, raw: *mut T, label: Option<&str>) -> Result<Arc<Self>, GpuError> {
        Ok(Arc::new(Self {
            handle: Guarded::new(device.api().clone(), raw)?,
            device: device.clone(),
            label: label.map(str::to_owned),
        }))
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.handle.api()
    }

    /// Wrap a layout handle returned by the pipeline, reusing the registered
    /// wrapper when there is one.
    fn adopt_layout(&self, raw: sys::BindGroupLayout) -> Result<BindGroupLayout, GpuError> {
        self.device.shared.bind_group_layouts.get_or_create(raw, |raw| {
            BindGroupLayout::from_raw(self.api().clone(), raw, None, self.device.downgrade())
        })
    }
}

// ============================================================================
// Compute
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineDescriptor<'a> {
    pub label: Option<&'a str>,
    /// `None` lets the native side derive the layout from the shader.
    pub layout: Option<&'a PipelineLayout>,
    pub module: &'a ShaderModule,
    pub entry_point: &'a str,
    pub constants: &'a [ConstantEntry<'a>],
}

#[derive(Clone)]
pub struct ComputePipeline {
    shared: Arc<PipelineShared<sys::ComputePipelineImpl>>,
}

impl ComputePipeline {
    fn to_native(
        arena: &mut Arena,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<sys::ComputePipelineDescriptor, GpuError> {
        let layout = layout_handle(descriptor.layout)?;
        let (module, entry_point, constants, constant_count) =
            stage(arena, descriptor.module, descriptor.entry_point, descriptor.constants)?;
        Ok(sys::ComputePipelineDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            layout,
            compute: sys::ProgrammableStageDescriptor {
                next_in_chain: ptr::null(),
                module,
                entry_point,
                constant_count,
                constants,
            },
        })
    }

    pub(crate) fn create(device: &Device, descriptor: &ComputePipelineDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = Self::to_native(&mut arena, descriptor)?;
        let raw = unsafe { device.api().device_create_compute_pipeline(raw_device, &native) };
        Ok(Self {
            shared: PipelineShared::new(device, raw, descriptor.label)?,
        })
    }

    pub(crate) fn create_async<F>(
        device: &Device,
        descriptor: &ComputePipelineDescriptor,
        callback: F,
    ) -> Result<(), GpuError>
    where
        F: FnOnce(Result<Self, GpuError>) + Send + 'static,
    {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = Self::to_native(&mut arena, descriptor)?;
        let owner = device.clone();
        let label = descriptor.label.map(str::to_owned);
        let (trampoline, userdata) = callback::create_pipeline(move |status, raw: sys::ComputePipeline, message| {
            let result = if status == sys::CreatePipelineAsyncStatus::SUCCESS {
                PipelineShared::new(&owner, raw, label.as_deref()).map(|shared| Self { shared })
            } else {
                tracing::warn!(?status, %message, "Compute pipeline creation failed");
                Err(GpuError::RequestFailed {
                    kind: ResourceKind::ComputePipeline,
                    status: format!("{:?}", status),
                    message,
                })
            };
            callback(result);
        });
        unsafe {
            device
                .api()
                .device_create_compute_pipeline_async(raw_device, &native, trampoline, userdata)
        };
        Ok(())
    }

    pub(crate) fn raw(&self) -> Result<sys::ComputePipeline, GpuError> {
        self.shared.handle.raw()
    }

    /// The layout of bind group `index`.
    pub fn bind_group_layout(&self, index: u32) -> Result<BindGroupLayout, GpuError> {
        let pipeline = self.shared.handle.raw()?;
        let raw = unsafe { self.shared.api().compute_pipeline_get_bind_group_layout(pipeline, index) };
        self.shared.adopt_layout(raw)
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for ComputePipeline {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for ComputePipeline {}

impl fmt::Debug for ComputePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}

// ============================================================================
// Render
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct VertexBufferLayout<'a> {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: &'a [VertexAttribute],
}

#[derive(Debug, Clone, Copy)]
pub struct VertexState<'a> {
    pub module: &'a ShaderModule,
    pub entry_point: &'a str,
    pub constants: &'a [ConstantEntry<'a>],
    pub buffers: &'a [VertexBufferLayout<'a>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveState {
    pub topology: PrimitiveTopology,
    pub strip_index_format: Option<IndexFormat>,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
    /// Disable depth clipping. Needs
    /// [`FeatureName::DEPTH_CLIP_CONTROL`](crate::types::FeatureName::DEPTH_CLIP_CONTROL).
    pub unclipped_depth: bool,
}

impl Default for PrimitiveState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TRIANGLE_LIST,
            strip_index_format: None,
            front_face: FrontFace::CCW,
            cull_mode: CullMode::NONE,
            unclipped_depth: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
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

impl DepthStencilState {
    fn to_native(self) -> sys::DepthStencilState {
        sys::DepthStencilState {
            next_in_chain: ptr::null(),
            format: self.format,
            depth_write_enabled: self.depth_write_enabled,
            depth_compare: self.depth_compare,
            stencil_front: self.stencil_front,
            stencil_back: self.stencil_back,
            stencil_read_mask: self.stencil_read_mask,
            stencil_write_mask: self.stencil_write_mask,
            depth_bias: self.depth_bias,
            depth_bias_slope_scale: self.depth_bias_slope_scale,
            depth_bias_clamp: self.depth_bias_clamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisampleState {
    pub count: u32,
    pub mask: u32,
    pub alpha_to_coverage_enabled: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: Option<BlendState>,
    pub write_mask: ColorWrites,
}

#[derive(Debug, Clone, Copy)]
pub struct FragmentState<'a> {
    pub module: &'a ShaderModule,
    pub entry_point: &'a str,
    pub constants: &'a [ConstantEntry<'a>],
    pub targets: &'a [ColorTargetState],
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPipelineDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: Option<&'a PipelineLayout>,
    pub vertex: VertexState<'a>,
    pub primitive: PrimitiveState,
    pub depth_stencil: Option<DepthStencilState>,
    pub multisample: MultisampleState,
    pub fragment: Option<FragmentState<'a>>,
}

#[derive(Clone)]
pub struct RenderPipeline {
    shared: Arc<PipelineShared<sys::RenderPipelineImpl>>,
}

impl RenderPipeline {
    fn to_native(
        arena: &mut Arena,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<sys::RenderPipelineDescriptor, GpuError> {
        let layout = layout_handle(descriptor.layout)?;

        let vertex = &descriptor.vertex;
        let (module, entry_point, constants, constant_count) =
            stage(arena, vertex.module, vertex.entry_point, vertex.constants)?;
        let buffers: Vec<_> = vertex
            .buffers
            .iter()
            .map(|buffer| {
                let (attributes, attribute_count) = arena.slice(buffer.attributes);
                sys::VertexBufferLayout {
                    array_stride: buffer.array_stride,
                    step_mode: buffer.step_mode,
                    attribute_count: attribute_count as u32,
                    attributes,
                }
            })
            .collect();
        let (buffers, buffer_count) = arena.collect(buffers);

        let mut primitive_chain = ChainBuilder::new();
        if descriptor.primitive.unclipped_depth {
            primitive_chain.add_depth_clip_control(true);
        }
        let primitive = sys::PrimitiveState {
            next_in_chain: arena.chain(primitive_chain),
            topology: descriptor.primitive.topology,
            strip_index_format: descriptor.primitive.strip_index_format.unwrap_or(IndexFormat::UNDEFINED),
            front_face: descriptor.primitive.front_face,
            cull_mode: descriptor.primitive.cull_mode,
        };

        let fragment = match &descriptor.fragment {
            Some(fragment) => {
                let (module, entry_point, constants, constant_count) =
                    stage(arena, fragment.module, fragment.entry_point, fragment.constants)?;
                let targets: Vec<_> = fragment
                    .targets
                    .iter()
                    .map(|target| sys::ColorTargetState {
                        next_in_chain: ptr::null(),
                        format: target.format,
                        blend: arena.optional(target.blend),
                        write_mask: target.write_mask.bits(),
                    })
                    .collect();
                let (targets, target_count) = arena.collect(targets);
                Some(sys::FragmentState {
                    next_in_chain: ptr::null(),
                    module,
                    entry_point,
                    constant_count,
                    constants,
                    target_count: target_count as u32,
                    targets,
                })
            }
            None => None,
        };

        Ok(sys::RenderPipelineDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            layout,
            vertex: sys::VertexState {
                next_in_chain: ptr::null(),
                module,
                entry_point,
                constant_count,
                constants,
                buffer_count: buffer_count as u32,
                buffers,
            },
            primitive,
            depth_stencil: arena.optional(descriptor.depth_stencil.map(DepthStencilState::to_native)),
            multisample: sys::MultisampleState {
                next_in_chain: ptr::null(),
                count: descriptor.multisample.count,
                mask: descriptor.multisample.mask,
                alpha_to_coverage_enabled: descriptor.multisample.alpha_to_coverage_enabled,
            },
            fragment: arena.optional(fragment),
        })
    }

    pub(crate) fn create(device: &Device, descriptor: &RenderPipelineDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = Self::to_native(&mut arena, descriptor)?;
        let raw = unsafe { device.api().device_create_render_pipeline(raw_device, &native) };
        Ok(Self {
            shared: PipelineShared::new(device, raw, descriptor.label)?,
        })
    }

    pub(crate) fn create_async<F>(
        device: &Device,
        descriptor: &RenderPipelineDescriptor,
        callback: F,
    ) -> Result<(), GpuError>
    where
        F: FnOnce(Result<Self, GpuError>) + Send + 'static,
    {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = Self::to_native(&mut arena, descriptor)?;
        let owner = device.clone();
        let label = descriptor.label.map(str::to_owned);
        let (trampoline, userdata) = callback::create_pipeline(move |status, raw: sys::RenderPipeline, message| {
            let result = if status == sys::CreatePipelineAsyncStatus::SUCCESS {
                PipelineShared::new(&owner, raw, label.as_deref()).map(|shared| Self { shared })
            } else {
                tracing::warn!(?status, %message, "Render pipeline creation failed");
                Err(GpuError::RequestFailed {
                    kind: ResourceKind::RenderPipeline,
                    status: format!("{:?}", status),
                    message,
                })
            };
            callback(result);
        });
        unsafe {
            device
                .api()
                .device_create_render_pipeline_async(raw_device, &native, trampoline, userdata)
        };
        Ok(())
    }

    pub(crate) fn raw(&self) -> Result<sys::RenderPipeline, GpuError> {
        self.shared.handle.raw()
    }

    /// The layout of bind group `index`.
    pub fn bind_group_layout(&self, index: u32) -> Result<BindGroupLayout, GpuError> {
        let pipeline = self.shared.handle.raw()?;
        let raw = unsafe { self.shared.api().render_pipeline_get_bind_group_layout(pipeline, index) };
        self.shared.adopt_layout(raw)
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for RenderPipeline {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for RenderPipeline {}

impl fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}
