//! Command recording.
//!
//! Finishing an encoder, ending a pass and submitting a command buffer all
//! hand the native handle over to the native side. The wrapper is left in
//! the released state afterwards and never frees the handle itself.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys::{self as sys, NativeApi};

use crate::binding::BindGroup;
use crate::buffer::Buffer;
use crate::device::Device;
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState, NativeObject};
use crate::marshal::Arena;
use crate::pipeline::{ComputePipeline, RenderPipeline};
use crate::query_set::QuerySet;
use crate::resource::labeled_resource;
use crate::texture::{ImageCopyBuffer, ImageCopyTexture, TextureView};
use crate::types::{Color, Extent3d, IndexFormat, LoadOp, ShaderStages, StoreOp, WHOLE_SIZE};

labeled_resource! {
    /// Recorded commands, ready for [`Queue::submit`](crate::Queue::submit).
    CommandBuffer => sys::CommandBufferImpl
}

impl CommandBuffer {
    /// Hand the handle to the native side, leaving this wrapper released.
    pub(crate) fn consume(&self) -> Result<sys::CommandBuffer, GpuError> {
        self.inner.handle.consume()
    }
}

// ============================================================================
// Render pass descriptors
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RenderPassColorAttachment<'a> {
    pub view: &'a TextureView,
    pub resolve_target: Option<&'a TextureView>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPassDepthStencilAttachment<'a> {
    pub view: &'a TextureView,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
    pub depth_read_only: bool,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub stencil_clear_value: u32,
    pub stencil_read_only: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderPassDescriptor<'a> {
    pub label: Option<&'a str>,
    pub color_attachments: &'a [RenderPassColorAttachment<'a>],
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment<'a>>,
    pub occlusion_query_set: Option<&'a QuerySet>,
}

// ============================================================================
// CommandEncoder
// ============================================================================

struct EncoderShared {
    handle: Guarded<sys::CommandEncoderImpl>,
    label: Option<String>,
}

/// Records commands into a [`CommandBuffer`].
#[derive(Clone)]
pub struct CommandEncoder {
    shared: Arc<EncoderShared>,
}

impl CommandEncoder {
    pub(crate) fn create(device: &Device, label: Option<&str>) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let native = sys::CommandEncoderDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(label)?,
        };
        let raw = unsafe { device.api().device_create_command_encoder(raw_device, &native) };
        Ok(Self {
            shared: Arc::new(EncoderShared {
                handle: Guarded::new(device.api().clone(), raw)?,
                label: label.map(str::to_owned),
            }),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn begin_compute_pass(&self, label: Option<&str>) -> Result<ComputePass, GpuError> {
        let encoder = self.shared.handle.raw()?;
        let mut arena = Arena::new();
        let native = sys::ComputePassDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(label)?,
        };
        let raw = unsafe { self.api().command_encoder_begin_compute_pass(encoder, &native) };
        Ok(ComputePass {
            pass: Pass::new(self.api().clone(), raw)?,
        })
    }

    pub fn begin_render_pass(&self, descriptor: &RenderPassDescriptor) -> Result<RenderPass, GpuError> {
        let encoder = self.shared.handle.raw()?;
        let color_attachments = descriptor
            .color_attachments
            .iter()
            .map(|attachment| {
                Ok(sys::RenderPassColorAttachment {
                    view: attachment.view.raw()?,
                    resolve_target: match attachment.resolve_target {
                        Some(view) => view.raw()?,
                        None => ptr::null_mut(),
                    },
                    load_op: attachment.load_op,
                    store_op: attachment.store_op,
                    clear_value: attachment.clear_value,
                })
            })
            .collect::<Result<Vec<_>, GpuError>>()?;
        let depth_stencil = descriptor
            .depth_stencil_attachment
            .map(|depth| {
                Ok::<_, GpuError>(sys::RenderPassDepthStencilAttachment {
                    view: depth.view.raw()?,
                    depth_load_op: depth.depth_load_op,
                    depth_store_op: depth.depth_store_op,
                    depth_clear_value: depth.depth_clear_value,
                    depth_read_only: depth.depth_read_only,
                    stencil_load_op: depth.stencil_load_op,
                    stencil_store_op: depth.stencil_store_op,
                    stencil_clear_value: depth.stencil_clear_value,
                    stencil_read_only: depth.stencil_read_only,
                })
            })
            .transpose()?;
        let occlusion_query_set = match descriptor.occlusion_query_set {
            Some(query_set) => query_set.live()?,
            None => ptr::null_mut(),
        };

        let mut arena = Arena::new();
        let (color_attachments, color_attachment_count) = arena.collect(color_attachments);
        let native = sys::RenderPassDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            color_attachment_count: color_attachment_count as u32,
            color_attachments,
            depth_stencil_attachment: arena.optional(depth_stencil),
            occlusion_query_set,
        };
        let raw = unsafe { self.api().command_encoder_begin_render_pass(encoder, &native) };
        Ok(RenderPass {
            pass: Pass::new(self.api().clone(), raw)?,
        })
    }

    pub fn copy_buffer_to_buffer(
        &self,
        source: &Buffer,
        source_offset: u64,
        destination: &Buffer,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let (source, destination) = (source.live()?, destination.live()?);
        unsafe {
            self.api().command_encoder_copy_buffer_to_buffer(
                encoder,
                source,
                source_offset,
                destination,
                destination_offset,
                size,
            )
        };
        Ok(())
    }

    /// Zero `size` bytes of `buffer` from `offset`; `None` clears to the end.
    pub fn clear_buffer(&self, buffer: &Buffer, offset: u64, size: Option<u64>) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let buffer = buffer.live()?;
        unsafe {
            self.api()
                .command_encoder_clear_buffer(encoder, buffer, offset, size.unwrap_or(WHOLE_SIZE))
        };
        Ok(())
    }

    pub fn copy_buffer_to_texture(
        &self,
        source: &ImageCopyBuffer,
        destination: &ImageCopyTexture,
        size: Extent3d,
    ) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let (source, destination) = (source.to_native()?, destination.to_native()?);
        unsafe {
            self.api()
                .command_encoder_copy_buffer_to_texture(encoder, &source, &destination, &size)
        };
        Ok(())
    }

    pub fn copy_texture_to_buffer(
        &self,
        source: &ImageCopyTexture,
        destination: &ImageCopyBuffer,
        size: Extent3d,
    ) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let (source, destination) = (source.to_native()?, destination.to_native()?);
        unsafe {
            self.api()
                .command_encoder_copy_texture_to_buffer(encoder, &source, &destination, &size)
        };
        Ok(())
    }

    pub fn copy_texture_to_texture(
        &self,
        source: &ImageCopyTexture,
        destination: &ImageCopyTexture,
        size: Extent3d,
    ) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let (source, destination) = (source.to_native()?, destination.to_native()?);
        unsafe {
            self.api()
                .command_encoder_copy_texture_to_texture(encoder, &source, &destination, &size)
        };
        Ok(())
    }

    pub fn write_timestamp(&self, query_set: &QuerySet, query_index: u32) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let query_set = query_set.live()?;
        unsafe { self.api().command_encoder_write_timestamp(encoder, query_set, query_index) };
        Ok(())
    }

    /// Write the results of `queries` into `destination` at
    /// `destination_offset`, eight bytes per query.
    pub fn resolve_query_set(
        &self,
        query_set: &QuerySet,
        queries: std::ops::Range<u32>,
        destination: &Buffer,
        destination_offset: u64,
    ) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let (query_set, destination) = (query_set.live()?, destination.live()?);
        unsafe {
            self.api().command_encoder_resolve_query_set(
                encoder,
                query_set,
                queries.start,
                queries.end - queries.start,
                destination,
                destination_offset,
            )
        };
        Ok(())
    }

    pub fn insert_debug_marker(&self, label: &str) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let mut arena = Arena::new();
        let label = arena.c_str(label, "debug marker")?;
        unsafe { self.api().command_encoder_insert_debug_marker(encoder, label) };
        Ok(())
    }

    pub fn push_debug_group(&self, label: &str) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        let mut arena = Arena::new();
        let label = arena.c_str(label, "debug group")?;
        unsafe { self.api().command_encoder_push_debug_group(encoder, label) };
        Ok(())
    }

    pub fn pop_debug_group(&self) -> Result<(), GpuError> {
        let encoder = self.shared.handle.raw()?;
        unsafe { self.api().command_encoder_pop_debug_group(encoder) };
        Ok(())
    }

    /// Finish recording. The encoder is released afterwards; further calls
    /// fail with [`GpuError::UseAfterRelease`].
    pub fn finish(&self, label: Option<&str>) -> Result<CommandBuffer, GpuError> {
        let mut arena = Arena::new();
        let native = sys::CommandBufferDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(label)?,
        };
        let encoder = self.shared.handle.consume()?;
        let raw = unsafe { self.api().command_encoder_finish(encoder, &native) };
        CommandBuffer::from_raw(self.api().clone(), raw, label)
    }

    /// Drop the encoder without finishing it.
    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for CommandEncoder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for CommandEncoder {}

impl fmt::Debug for CommandEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEncoder")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .finish()
    }
}

// ============================================================================
// Passes
// ============================================================================

/// Shared handle of a pass encoder.
struct Pass<T: NativeObject> {
    handle: Arc<Guarded<T>>,
}

impl<T: NativeObject> Clone for Pass<T> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<T: NativeObject> Pass<T> {
    fn new(api: Arc<dyn NativeApi>, raw: *mut T) -> Result<Self, GpuError> {
        Ok(Self {
            handle: Arc::new(Guarded::new(api, raw)?),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.handle.api()
    }
}

/// Records dispatches. Call [`end`](Self::end) before finishing the encoder.
#[derive(Clone)]
pub struct ComputePass {
    pass: Pass<sys::ComputePassEncoderImpl>,
}

impl ComputePass {
    pub fn set_pipeline(&self, pipeline: &ComputePipeline) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let pipeline = pipeline.raw()?;
        unsafe { self.pass.api().compute_pass_encoder_set_pipeline(pass, pipeline) };
        Ok(())
    }

    pub fn set_bind_group(&self, index: u32, group: &BindGroup, dynamic_offsets: &[u32]) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let group = group.raw()?;
        unsafe {
            self.pass.api().compute_pass_encoder_set_bind_group(
                pass,
                index,
                group,
                dynamic_offsets.len() as u32,
                dynamic_offsets.as_ptr(),
            )
        };
        Ok(())
    }

    pub fn dispatch(&self, x: u32, y: u32, z: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().compute_pass_encoder_dispatch(pass, x, y, z) };
        Ok(())
    }

    /// Dispatch with workgroup counts read from `indirect_buffer`.
    pub fn dispatch_indirect(&self, indirect_buffer: &Buffer, indirect_offset: u64) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let buffer = indirect_buffer.live()?;
        unsafe {
            self.pass
                .api()
                .compute_pass_encoder_dispatch_indirect(pass, buffer, indirect_offset)
        };
        Ok(())
    }

    pub fn begin_pipeline_statistics_query(&self, query_set: &QuerySet, query_index: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let query_set = query_set.live()?;
        unsafe {
            self.pass
                .api()
                .compute_pass_encoder_begin_pipeline_statistics_query(pass, query_set, query_index)
        };
        Ok(())
    }

    pub fn end_pipeline_statistics_query(&self) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().compute_pass_encoder_end_pipeline_statistics_query(pass) };
        Ok(())
    }

    /// End the pass. The native side takes the handle.
    pub fn end(&self) -> Result<(), GpuError> {
        let pass = self.pass.handle.consume()?;
        unsafe { self.pass.api().compute_pass_encoder_end(pass) };
        Ok(())
    }

    pub fn state(&self) -> HandleState {
        self.pass.handle.state()
    }
}

impl fmt::Debug for ComputePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputePass").field("handle", &self.pass.handle).finish()
    }
}

/// Records draws into color and depth attachments.
#[derive(Clone)]
pub struct RenderPass {
    pass: Pass<sys::RenderPassEncoderImpl>,
}

impl RenderPass {
    pub fn set_pipeline(&self, pipeline: &RenderPipeline) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let pipeline = pipeline.raw()?;
        unsafe { self.pass.api().render_pass_encoder_set_pipeline(pass, pipeline) };
        Ok(())
    }

    pub fn set_bind_group(&self, index: u32, group: &BindGroup, dynamic_offsets: &[u32]) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let group = group.raw()?;
        unsafe {
            self.pass.api().render_pass_encoder_set_bind_group(
                pass,
                index,
                group,
                dynamic_offsets.len() as u32,
                dynamic_offsets.as_ptr(),
            )
        };
        Ok(())
    }

    /// Bind `buffer` from `offset` to the end to vertex slot `slot`.
    pub fn set_vertex_buffer(&self, slot: u32, buffer: &Buffer, offset: u64) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let buffer = buffer.live()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_set_vertex_buffer(pass, slot, buffer, offset, WHOLE_SIZE)
        };
        Ok(())
    }

    pub fn set_index_buffer(&self, buffer: &Buffer, format: IndexFormat, offset: u64) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let buffer = buffer.live()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_set_index_buffer(pass, buffer, format, offset, WHOLE_SIZE)
        };
        Ok(())
    }

    pub fn draw(&self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe {
            self.pass.api().render_pass_encoder_draw(
                pass,
                vertices.end - vertices.start,
                instances.end - instances.start,
                vertices.start,
                instances.start,
            )
        };
        Ok(())
    }

    pub fn draw_indexed(
        &self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    ) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe {
            self.pass.api().render_pass_encoder_draw_indexed(
                pass,
                indices.end - indices.start,
                instances.end - instances.start,
                indices.start,
                base_vertex,
                instances.start,
            )
        };
        Ok(())
    }

    pub fn draw_indirect(&self, indirect_buffer: &Buffer, indirect_offset: u64) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let buffer = indirect_buffer.live()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_draw_indirect(pass, buffer, indirect_offset)
        };
        Ok(())
    }

    pub fn draw_indexed_indirect(&self, indirect_buffer: &Buffer, indirect_offset: u64) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let buffer = indirect_buffer.live()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_draw_indexed_indirect(pass, buffer, indirect_offset)
        };
        Ok(())
    }

    /// Set the viewport transform. `depth` is the `min..max` depth range.
    pub fn set_viewport(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        depth: std::ops::Range<f32>,
    ) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_set_viewport(pass, x, y, width, height, depth.start, depth.end)
        };
        Ok(())
    }

    pub fn set_scissor_rect(&self, x: u32, y: u32, width: u32, height: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_set_scissor_rect(pass, x, y, width, height)
        };
        Ok(())
    }

    pub fn set_blend_constant(&self, color: Color) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().render_pass_encoder_set_blend_constant(pass, &color) };
        Ok(())
    }

    pub fn set_stencil_reference(&self, reference: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().render_pass_encoder_set_stencil_reference(pass, reference) };
        Ok(())
    }

    /// Write `data` into the push constant block at `offset` for `stages`.
    pub fn set_push_constants(&self, stages: ShaderStages, offset: u32, data: &[u8]) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe {
            self.pass.api().render_pass_encoder_set_push_constants(
                pass,
                stages.bits(),
                offset,
                data.len() as u32,
                data.as_ptr().cast(),
            )
        };
        Ok(())
    }

    /// Start occlusion query `query_index` in the pass's occlusion query set.
    pub fn begin_occlusion_query(&self, query_index: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().render_pass_encoder_begin_occlusion_query(pass, query_index) };
        Ok(())
    }

    pub fn end_occlusion_query(&self) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().render_pass_encoder_end_occlusion_query(pass) };
        Ok(())
    }

    pub fn begin_pipeline_statistics_query(&self, query_set: &QuerySet, query_index: u32) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        let query_set = query_set.live()?;
        unsafe {
            self.pass
                .api()
                .render_pass_encoder_begin_pipeline_statistics_query(pass, query_set, query_index)
        };
        Ok(())
    }

    pub fn end_pipeline_statistics_query(&self) -> Result<(), GpuError> {
        let pass = self.pass.handle.raw()?;
        unsafe { self.pass.api().render_pass_encoder_end_pipeline_statistics_query(pass) };
        Ok(())
    }

    /// End the pass. The native side takes the handle.
    pub fn end(&self) -> Result<(), GpuError> {
        let pass = self.pass.handle.consume()?;
        unsafe { self.pass.api().render_pass_encoder_end(pass) };
        Ok(())
    }

    pub fn state(&self) -> HandleState {
        self.pass.handle.state()
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass").field("handle", &self.pass.handle).finish()
    }
}
