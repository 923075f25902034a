//! The foreign function table.
//!
//! [`NativeApi`] has one method per native entry point. The wrapper crate only
//! ever talks to the library through a `dyn NativeApi`, which lets tests swap
//! in a recording mock. With the `link` feature, [`LinkedNative`] forwards each
//! method to the matching `wgpu*` symbol of `libwgpu_native`.
//!
//! Both the trait and the linked implementation are generated from the single
//! table below so their signatures cannot drift apart.

use core::ffi::{c_char, c_void};

use crate::callbacks::*;
use crate::descriptors::*;
use crate::enums::*;
use crate::handles::*;

macro_rules! native_api {
    (
        $(
            $(#[$meta:meta])*
            fn $method:ident => $symbol:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
        )*
    ) => {
        /// Native entry points.
        ///
        /// # Safety
        ///
        /// Every method has the contract of the C function it mirrors: handles
        /// must be live (or null where the header allows it), descriptor
        /// pointers must point at fully initialised structs for the duration of
        /// the call, and callbacks must stay callable until they fire.
        pub trait NativeApi: Send + Sync {
            $(
                $(#[$meta])*
                unsafe fn $method(&self, $($arg: $ty),*) $(-> $ret)?;
            )*
        }

        #[cfg(feature = "link")]
        #[allow(non_snake_case)]
        #[link(name = "wgpu_native")]
        unsafe extern "C" {
            $(fn $symbol($($arg: $ty),*) $(-> $ret)?;)*
        }

        /// [`NativeApi`] backed by the linked `wgpu_native` library.
        #[cfg(feature = "link")]
        #[derive(Debug, Default, Clone, Copy)]
        pub struct LinkedNative;

        #[cfg(feature = "link")]
        impl NativeApi for LinkedNative {
            $(
                #[inline]
                unsafe fn $method(&self, $($arg: $ty),*) $(-> $ret)? {
                    unsafe { $symbol($($arg),*) }
                }
            )*
        }
    };
}

native_api! {
    // ========================================================================
    // Global
    // ========================================================================

    fn create_instance => wgpuCreateInstance(descriptor: *const InstanceDescriptor) -> Instance;
    /// Installs the process-wide log sink. Passing `None` removes it.
    fn set_log_callback => wgpuSetLogCallback(callback: LogCallback, userdata: *mut c_void);
    fn set_log_level => wgpuSetLogLevel(level: LogLevel);

    // ========================================================================
    // Instance
    // ========================================================================

    fn instance_create_surface => wgpuInstanceCreateSurface(
        instance: Instance,
        descriptor: *const SurfaceDescriptor,
    ) -> Surface;
    fn instance_request_adapter => wgpuInstanceRequestAdapter(
        instance: Instance,
        options: *const RequestAdapterOptions,
        callback: RequestAdapterCallback,
        userdata: *mut c_void,
    );
    /// Drives pending callbacks.
    fn instance_process_events => wgpuInstanceProcessEvents(instance: Instance);
    fn instance_drop => wgpuInstanceDrop(instance: Instance);

    // ========================================================================
    // Adapter
    // ========================================================================

    fn adapter_get_properties => wgpuAdapterGetProperties(adapter: Adapter, properties: *mut AdapterProperties);
    fn adapter_get_limits => wgpuAdapterGetLimits(adapter: Adapter, limits: *mut SupportedLimits) -> bool;
    fn adapter_has_feature => wgpuAdapterHasFeature(adapter: Adapter, feature: FeatureName) -> bool;
    /// Call with null first to get the count, then with a buffer of that size.
    fn adapter_enumerate_features => wgpuAdapterEnumerateFeatures(adapter: Adapter, features: *mut FeatureName) -> usize;
    fn adapter_request_device => wgpuAdapterRequestDevice(
        adapter: Adapter,
        descriptor: *const DeviceDescriptor,
        callback: RequestDeviceCallback,
        userdata: *mut c_void,
    );
    fn adapter_drop => wgpuAdapterDrop(adapter: Adapter);

    // ========================================================================
    // Surface and swap chain
    // ========================================================================

    fn surface_get_preferred_format => wgpuSurfaceGetPreferredFormat(surface: Surface, adapter: Adapter) -> TextureFormat;
    fn surface_drop => wgpuSurfaceDrop(surface: Surface);
    fn swap_chain_get_current_texture_view => wgpuSwapChainGetCurrentTextureView(swap_chain: SwapChain) -> TextureView;
    fn swap_chain_present => wgpuSwapChainPresent(swap_chain: SwapChain);
    fn swap_chain_drop => wgpuSwapChainDrop(swap_chain: SwapChain);

    // ========================================================================
    // Device
    // ========================================================================

    fn device_create_buffer => wgpuDeviceCreateBuffer(device: Device, descriptor: *const BufferDescriptor) -> Buffer;
    fn device_create_texture => wgpuDeviceCreateTexture(device: Device, descriptor: *const TextureDescriptor) -> Texture;
    fn device_create_sampler => wgpuDeviceCreateSampler(device: Device, descriptor: *const SamplerDescriptor) -> Sampler;
    fn device_create_bind_group_layout => wgpuDeviceCreateBindGroupLayout(
        device: Device,
        descriptor: *const BindGroupLayoutDescriptor,
    ) -> BindGroupLayout;
    fn device_create_bind_group => wgpuDeviceCreateBindGroup(
        device: Device,
        descriptor: *const BindGroupDescriptor,
    ) -> BindGroup;
    fn device_create_pipeline_layout => wgpuDeviceCreatePipelineLayout(
        device: Device,
        descriptor: *const PipelineLayoutDescriptor,
    ) -> PipelineLayout;
    fn device_create_shader_module => wgpuDeviceCreateShaderModule(
        device: Device,
        descriptor: *const ShaderModuleDescriptor,
    ) -> ShaderModule;
    fn device_create_compute_pipeline => wgpuDeviceCreateComputePipeline(
        device: Device,
        descriptor: *const ComputePipelineDescriptor,
    ) -> ComputePipeline;
    fn device_create_render_pipeline => wgpuDeviceCreateRenderPipeline(
        device: Device,
        descriptor: *const RenderPipelineDescriptor,
    ) -> RenderPipeline;
    fn device_create_compute_pipeline_async => wgpuDeviceCreateComputePipelineAsync(
        device: Device,
        descriptor: *const ComputePipelineDescriptor,
        callback: CreateComputePipelineAsyncCallback,
        userdata: *mut c_void,
    );
    fn device_create_render_pipeline_async => wgpuDeviceCreateRenderPipelineAsync(
        device: Device,
        descriptor: *const RenderPipelineDescriptor,
        callback: CreateRenderPipelineAsyncCallback,
        userdata: *mut c_void,
    );
    fn device_create_command_encoder => wgpuDeviceCreateCommandEncoder(
        device: Device,
        descriptor: *const CommandEncoderDescriptor,
    ) -> CommandEncoder;
    fn device_create_query_set => wgpuDeviceCreateQuerySet(
        device: Device,
        descriptor: *const QuerySetDescriptor,
    ) -> QuerySet;
    fn device_create_swap_chain => wgpuDeviceCreateSwapChain(
        device: Device,
        surface: Surface,
        descriptor: *const SwapChainDescriptor,
    ) -> SwapChain;
    /// Returns the same queue handle on every call.
    fn device_get_queue => wgpuDeviceGetQueue(device: Device) -> Queue;
    fn device_get_limits => wgpuDeviceGetLimits(device: Device, limits: *mut SupportedLimits) -> bool;
    fn device_has_feature => wgpuDeviceHasFeature(device: Device, feature: FeatureName) -> bool;
    fn device_push_error_scope => wgpuDevicePushErrorScope(device: Device, filter: ErrorFilter);
    fn device_pop_error_scope => wgpuDevicePopErrorScope(
        device: Device,
        callback: ErrorCallback,
        userdata: *mut c_void,
    ) -> bool;
    fn device_set_uncaptured_error_callback => wgpuDeviceSetUncapturedErrorCallback(
        device: Device,
        callback: ErrorCallback,
        userdata: *mut c_void,
    );
    fn device_set_device_lost_callback => wgpuDeviceSetDeviceLostCallback(
        device: Device,
        callback: DeviceLostCallback,
        userdata: *mut c_void,
    );
    /// Returns `true` when the submission queue is empty.
    fn device_poll => wgpuDevicePoll(device: Device, wait: bool) -> bool;
    fn device_destroy => wgpuDeviceDestroy(device: Device);
    fn device_drop => wgpuDeviceDrop(device: Device);

    // ========================================================================
    // Queue
    // ========================================================================

    /// Takes ownership of every command buffer in `commands`.
    fn queue_submit => wgpuQueueSubmit(queue: Queue, command_count: u32, commands: *const CommandBuffer);
    fn queue_write_buffer => wgpuQueueWriteBuffer(
        queue: Queue,
        buffer: Buffer,
        buffer_offset: u64,
        data: *const c_void,
        size: usize,
    );
    fn queue_write_texture => wgpuQueueWriteTexture(
        queue: Queue,
        destination: *const ImageCopyTexture,
        data: *const c_void,
        data_size: usize,
        data_layout: *const TextureDataLayout,
        write_size: *const Extent3d,
    );
    fn queue_on_submitted_work_done => wgpuQueueOnSubmittedWorkDone(
        queue: Queue,
        callback: QueueWorkDoneCallback,
        userdata: *mut c_void,
    );
    fn queue_drop => wgpuQueueDrop(queue: Queue);

    // ========================================================================
    // Buffer
    // ========================================================================

    fn buffer_map_async => wgpuBufferMapAsync(
        buffer: Buffer,
        mode: Flags,
        offset: usize,
        size: usize,
        callback: BufferMapCallback,
        userdata: *mut c_void,
    );
    fn buffer_get_mapped_range => wgpuBufferGetMappedRange(buffer: Buffer, offset: usize, size: usize) -> *mut c_void;
    fn buffer_get_const_mapped_range => wgpuBufferGetConstMappedRange(
        buffer: Buffer,
        offset: usize,
        size: usize,
    ) -> *const c_void;
    fn buffer_unmap => wgpuBufferUnmap(buffer: Buffer);
    fn buffer_destroy => wgpuBufferDestroy(buffer: Buffer);
    fn buffer_drop => wgpuBufferDrop(buffer: Buffer);

    // ========================================================================
    // Texture
    // ========================================================================

    fn texture_create_view => wgpuTextureCreateView(texture: Texture, descriptor: *const TextureViewDescriptor) -> TextureView;
    fn texture_destroy => wgpuTextureDestroy(texture: Texture);
    fn texture_drop => wgpuTextureDrop(texture: Texture);
    fn texture_view_drop => wgpuTextureViewDrop(texture_view: TextureView);

    // ========================================================================
    // Binding, shaders and pipelines
    // ========================================================================

    fn sampler_drop => wgpuSamplerDrop(sampler: Sampler);
    fn bind_group_layout_drop => wgpuBindGroupLayoutDrop(bind_group_layout: BindGroupLayout);
    fn bind_group_drop => wgpuBindGroupDrop(bind_group: BindGroup);
    fn pipeline_layout_drop => wgpuPipelineLayoutDrop(pipeline_layout: PipelineLayout);
    fn shader_module_drop => wgpuShaderModuleDrop(shader_module: ShaderModule);
    fn shader_module_get_compilation_info => wgpuShaderModuleGetCompilationInfo(
        shader_module: ShaderModule,
        callback: CompilationInfoCallback,
        userdata: *mut c_void,
    );
    /// Returns the same layout handle for repeated calls with one index.
    fn compute_pipeline_get_bind_group_layout => wgpuComputePipelineGetBindGroupLayout(
        pipeline: ComputePipeline,
        group_index: u32,
    ) -> BindGroupLayout;
    fn compute_pipeline_drop => wgpuComputePipelineDrop(pipeline: ComputePipeline);
    fn render_pipeline_get_bind_group_layout => wgpuRenderPipelineGetBindGroupLayout(
        pipeline: RenderPipeline,
        group_index: u32,
    ) -> BindGroupLayout;
    fn render_pipeline_drop => wgpuRenderPipelineDrop(pipeline: RenderPipeline);

    // ========================================================================
    // Query sets
    // ========================================================================

    fn query_set_destroy => wgpuQuerySetDestroy(query_set: QuerySet);
    fn query_set_drop => wgpuQuerySetDrop(query_set: QuerySet);

    // ========================================================================
    // Command encoding
    // ========================================================================

    fn command_encoder_begin_compute_pass => wgpuCommandEncoderBeginComputePass(
        encoder: CommandEncoder,
        descriptor: *const ComputePassDescriptor,
    ) -> ComputePassEncoder;
    fn command_encoder_begin_render_pass => wgpuCommandEncoderBeginRenderPass(
        encoder: CommandEncoder,
        descriptor: *const RenderPassDescriptor,
    ) -> RenderPassEncoder;
    fn command_encoder_copy_buffer_to_buffer => wgpuCommandEncoderCopyBufferToBuffer(
        encoder: CommandEncoder,
        source: Buffer,
        source_offset: u64,
        destination: Buffer,
        destination_offset: u64,
        size: u64,
    );
    fn command_encoder_clear_buffer => wgpuCommandEncoderClearBuffer(
        encoder: CommandEncoder,
        buffer: Buffer,
        offset: u64,
        size: u64,
    );
    fn command_encoder_copy_buffer_to_texture => wgpuCommandEncoderCopyBufferToTexture(
        encoder: CommandEncoder,
        source: *const ImageCopyBuffer,
        destination: *const ImageCopyTexture,
        copy_size: *const Extent3d,
    );
    fn command_encoder_copy_texture_to_buffer => wgpuCommandEncoderCopyTextureToBuffer(
        encoder: CommandEncoder,
        source: *const ImageCopyTexture,
        destination: *const ImageCopyBuffer,
        copy_size: *const Extent3d,
    );
    fn command_encoder_copy_texture_to_texture => wgpuCommandEncoderCopyTextureToTexture(
        encoder: CommandEncoder,
        source: *const ImageCopyTexture,
        destination: *const ImageCopyTexture,
        copy_size: *const Extent3d,
    );
    fn command_encoder_write_timestamp => wgpuCommandEncoderWriteTimestamp(
        encoder: CommandEncoder,
        query_set: QuerySet,
        query_index: u32,
    );
    fn command_encoder_resolve_query_set => wgpuCommandEncoderResolveQuerySet(
        encoder: CommandEncoder,
        query_set: QuerySet,
        first_query: u32,
        query_count: u32,
        destination: Buffer,
        destination_offset: u64,
    );
    fn command_encoder_insert_debug_marker => wgpuCommandEncoderInsertDebugMarker(
        encoder: CommandEncoder,
        marker_label: *const c_char,
    );
    fn command_encoder_push_debug_group => wgpuCommandEncoderPushDebugGroup(
        encoder: CommandEncoder,
        group_label: *const c_char,
    );
    fn command_encoder_pop_debug_group => wgpuCommandEncoderPopDebugGroup(encoder: CommandEncoder);
    /// Consumes `encoder`; it must not be dropped afterwards.
    fn command_encoder_finish => wgpuCommandEncoderFinish(
        encoder: CommandEncoder,
        descriptor: *const CommandBufferDescriptor,
    ) -> CommandBuffer;
    fn command_encoder_drop => wgpuCommandEncoderDrop(encoder: CommandEncoder);
    fn command_buffer_drop => wgpuCommandBufferDrop(command_buffer: CommandBuffer);

    fn compute_pass_encoder_set_pipeline => wgpuComputePassEncoderSetPipeline(
        pass: ComputePassEncoder,
        pipeline: ComputePipeline,
    );
    fn compute_pass_encoder_set_bind_group => wgpuComputePassEncoderSetBindGroup(
        pass: ComputePassEncoder,
        group_index: u32,
        group: BindGroup,
        dynamic_offset_count: u32,
        dynamic_offsets: *const u32,
    );
    fn compute_pass_encoder_dispatch => wgpuComputePassEncoderDispatch(
        pass: ComputePassEncoder,
        workgroup_count_x: u32,
        workgroup_count_y: u32,
        workgroup_count_z: u32,
    );
    fn compute_pass_encoder_dispatch_indirect => wgpuComputePassEncoderDispatchIndirect(
        pass: ComputePassEncoder,
        indirect_buffer: Buffer,
        indirect_offset: u64,
    );
    fn compute_pass_encoder_begin_pipeline_statistics_query => wgpuComputePassEncoderBeginPipelineStatisticsQuery(
        pass: ComputePassEncoder,
        query_set: QuerySet,
        query_index: u32,
    );
    fn compute_pass_encoder_end_pipeline_statistics_query => wgpuComputePassEncoderEndPipelineStatisticsQuery(
        pass: ComputePassEncoder,
    );
    /// Consumes `pass`; it must not be dropped afterwards.
    fn compute_pass_encoder_end => wgpuComputePassEncoderEnd(pass: ComputePassEncoder);
    fn compute_pass_encoder_drop => wgpuComputePassEncoderDrop(pass: ComputePassEncoder);

    fn render_pass_encoder_set_pipeline => wgpuRenderPassEncoderSetPipeline(
        pass: RenderPassEncoder,
        pipeline: RenderPipeline,
    );
    fn render_pass_encoder_set_bind_group => wgpuRenderPassEncoderSetBindGroup(
        pass: RenderPassEncoder,
        group_index: u32,
        group: BindGroup,
        dynamic_offset_count: u32,
        dynamic_offsets: *const u32,
    );
    fn render_pass_encoder_set_vertex_buffer => wgpuRenderPassEncoderSetVertexBuffer(
        pass: RenderPassEncoder,
        slot: u32,
        buffer: Buffer,
        offset: u64,
        size: u64,
    );
    fn render_pass_encoder_set_index_buffer => wgpuRenderPassEncoderSetIndexBuffer(
        pass: RenderPassEncoder,
        buffer: Buffer,
        format: IndexFormat,
        offset: u64,
        size: u64,
    );
    fn render_pass_encoder_draw => wgpuRenderPassEncoderDraw(
        pass: RenderPassEncoder,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
    fn render_pass_encoder_draw_indexed => wgpuRenderPassEncoderDrawIndexed(
        pass: RenderPassEncoder,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    );
    fn render_pass_encoder_draw_indirect => wgpuRenderPassEncoderDrawIndirect(
        pass: RenderPassEncoder,
        indirect_buffer: Buffer,
        indirect_offset: u64,
    );
    fn render_pass_encoder_draw_indexed_indirect => wgpuRenderPassEncoderDrawIndexedIndirect(
        pass: RenderPassEncoder,
        indirect_buffer: Buffer,
        indirect_offset: u64,
    );
    fn render_pass_encoder_set_viewport => wgpuRenderPassEncoderSetViewport(
        pass: RenderPassEncoder,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        min_depth: f32,
        max_depth: f32,
    );
    fn render_pass_encoder_set_scissor_rect => wgpuRenderPassEncoderSetScissorRect(
        pass: RenderPassEncoder,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    );
    fn render_pass_encoder_set_blend_constant => wgpuRenderPassEncoderSetBlendConstant(
        pass: RenderPassEncoder,
        color: *const Color,
    );
    fn render_pass_encoder_set_stencil_reference => wgpuRenderPassEncoderSetStencilReference(
        pass: RenderPassEncoder,
        reference: u32,
    );
    /// Native extension; needs the push constants feature.
    fn render_pass_encoder_set_push_constants => wgpuRenderPassEncoderSetPushConstants(
        pass: RenderPassEncoder,
        stages: Flags,
        offset: u32,
        size_bytes: u32,
        data: *const c_void,
    );
    fn render_pass_encoder_begin_occlusion_query => wgpuRenderPassEncoderBeginOcclusionQuery(
        pass: RenderPassEncoder,
        query_index: u32,
    );
    fn render_pass_encoder_end_occlusion_query => wgpuRenderPassEncoderEndOcclusionQuery(pass: RenderPassEncoder);
    fn render_pass_encoder_begin_pipeline_statistics_query => wgpuRenderPassEncoderBeginPipelineStatisticsQuery(
        pass: RenderPassEncoder,
        query_set: QuerySet,
        query_index: u32,
    );
    fn render_pass_encoder_end_pipeline_statistics_query => wgpuRenderPassEncoderEndPipelineStatisticsQuery(
        pass: RenderPassEncoder,
    );
    /// Consumes `pass`; it must not be dropped afterwards.
    fn render_pass_encoder_end => wgpuRenderPassEncoderEnd(pass: RenderPassEncoder);
    fn render_pass_encoder_drop => wgpuRenderPassEncoderDrop(pass: RenderPassEncoder);
}
