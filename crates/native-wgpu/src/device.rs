//! Logical device and the per-device identity registries.
//!
//! A [`Device`] owns the registries for every kind the native side can hand
//! out more than once (the queue, bind group layouts, texture views).
//! Registered wrappers point back at the device weakly, so the registries
//! never keep a device alive. Releasing the device, explicitly or by dropping
//! the last clone, releases everything still registered first.

use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};

use native_wgpu_sys::{self as sys, NativeApi};

use crate::binding::{
    BindGroup, BindGroupDescriptor, BindGroupLayout, BindGroupLayoutDescriptor, PipelineLayout,
    PipelineLayoutDescriptor,
};
use crate::buffer::{Buffer, BufferDescriptor};
use crate::callback::{self, CallbackKeeper};
use crate::command::CommandEncoder;
use crate::error::{GpuError, ResourceKind};
use crate::handle::{Guarded, HandleState};
use crate::pipeline::{ComputePipeline, ComputePipelineDescriptor, RenderPipeline, RenderPipelineDescriptor};
use crate::profiling::profile_function;
use crate::query_set::{QuerySet, QuerySetDescriptor};
use crate::queue::Queue;
use crate::registry::IdentityRegistry;
use crate::sampler::{Sampler, SamplerDescriptor};
use crate::shader::{ShaderModule, ShaderModuleDescriptor};
use crate::surface::Surface;
use crate::swap_chain::{SwapChain, SwapChainDescriptor};
use crate::texture::{Texture, TextureDescriptor, TextureView};
use crate::types::{DeviceLostReason, ErrorFilter, ErrorType, FeatureName, Limits};

pub(crate) struct DeviceShared {
    pub(crate) handle: Guarded<sys::DeviceImpl>,
    /// Declared after `handle`: the native side may call these until the
    /// device handle is gone.
    callbacks: CallbackKeeper,
    label: Option<String>,
    pub(crate) queues: IdentityRegistry<sys::QueueImpl, Queue>,
    pub(crate) bind_group_layouts: IdentityRegistry<sys::BindGroupLayoutImpl, BindGroupLayout>,
    pub(crate) texture_views: IdentityRegistry<sys::TextureViewImpl, TextureView>,
}

impl DeviceShared {
    /// Release every registered wrapper, then the device handle.
    fn release(&self) -> bool {
        if self.handle.is_released() {
            return false;
        }

        let queues = self.queues.drain();
        let layouts = self.bind_group_layouts.drain();
        let views = self.texture_views.drain();
        let released = queues.iter().filter(|queue| queue.release()).count()
            + layouts.iter().filter(|layout| layout.release()).count()
            + views.iter().filter(|view| view.release()).count();
        tracing::debug!(label = ?self.label, dependents = released, "Releasing device");

        self.handle.release()
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        self.release();
    }
}

/// An open connection to a GPU.
#[derive(Clone)]
pub struct Device {
    pub(crate) shared: Arc<DeviceShared>,
}

impl Device {
    pub(crate) fn from_raw(api: Arc<dyn NativeApi>, raw: sys::Device, label: Option<String>) -> Result<Self, GpuError> {
        let handle = Guarded::new(api, raw)?;
        tracing::debug!(label = ?label, "Device created");
        Ok(Self {
            shared: Arc::new(DeviceShared {
                handle,
                callbacks: CallbackKeeper::default(),
                label,
                queues: IdentityRegistry::new(),
                bind_group_layouts: IdentityRegistry::new(),
                texture_views: IdentityRegistry::new(),
            }),
        })
    }

    pub(crate) fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    /// The device handle, unless the device was destroyed or released.
    pub(crate) fn live(&self) -> Result<sys::Device, GpuError> {
        self.shared.handle.live()
    }

    pub(crate) fn downgrade(&self) -> Weak<DeviceShared> {
        Arc::downgrade(&self.shared)
    }

    pub fn label(&self) -> Option<&str> {
        self.shared.label.as_deref()
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    // ========================================================================
    // Resource creation
    // ========================================================================

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<Buffer, GpuError> {
        profile_function!();
        Buffer::create(self, descriptor)
    }

    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<Texture, GpuError> {
        profile_function!();
        Texture::create(self, descriptor)
    }

    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<Sampler, GpuError> {
        Sampler::create(self, descriptor)
    }

    /// Create a bind group layout. The wrapper is registered with this device
    /// and released with it.
    pub fn create_bind_group_layout(&self, descriptor: &BindGroupLayoutDescriptor) -> Result<BindGroupLayout, GpuError> {
        BindGroupLayout::create(self, descriptor)
    }

    pub fn create_bind_group(&self, descriptor: &BindGroupDescriptor) -> Result<BindGroup, GpuError> {
        BindGroup::create(self, descriptor)
    }

    pub fn create_pipeline_layout(&self, descriptor: &PipelineLayoutDescriptor) -> Result<PipelineLayout, GpuError> {
        PipelineLayout::create(self, descriptor)
    }

    pub fn create_shader_module(&self, descriptor: &ShaderModuleDescriptor) -> Result<ShaderModule, GpuError> {
        profile_function!();
        ShaderModule::create(self, descriptor)
    }

    pub fn create_compute_pipeline(&self, descriptor: &ComputePipelineDescriptor) -> Result<ComputePipeline, GpuError> {
        profile_function!();
        ComputePipeline::create(self, descriptor)
    }

    pub fn create_render_pipeline(&self, descriptor: &RenderPipelineDescriptor) -> Result<RenderPipeline, GpuError> {
        profile_function!();
        RenderPipeline::create(self, descriptor)
    }

    /// Create a compute pipeline without blocking on shader compilation.
    /// `callback` runs once, either before this returns or from a later
    /// event poll.
    pub fn create_compute_pipeline_async<F>(
        &self,
        descriptor: &ComputePipelineDescriptor,
        callback: F,
    ) -> Result<(), GpuError>
    where
        F: FnOnce(Result<ComputePipeline, GpuError>) + Send + 'static,
    {
        profile_function!();
        ComputePipeline::create_async(self, descriptor, callback)
    }

    pub fn create_render_pipeline_async<F>(
        &self,
        descriptor: &RenderPipelineDescriptor,
        callback: F,
    ) -> Result<(), GpuError>
    where
        F: FnOnce(Result<RenderPipeline, GpuError>) + Send + 'static,
    {
        profile_function!();
        RenderPipeline::create_async(self, descriptor, callback)
    }

    pub fn create_command_encoder(&self, label: Option<&str>) -> Result<CommandEncoder, GpuError> {
        CommandEncoder::create(self, label)
    }

    pub fn create_query_set(&self, descriptor: &QuerySetDescriptor) -> Result<QuerySet, GpuError> {
        QuerySet::create(self, descriptor)
    }

    pub fn create_swap_chain(&self, surface: &Surface, descriptor: &SwapChainDescriptor) -> Result<SwapChain, GpuError> {
        SwapChain::create(self, surface, descriptor)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The device queue. Every call returns the same wrapper until the queue
    /// is released.
    pub fn queue(&self) -> Result<Queue, GpuError> {
        let device = self.live()?;
        let raw = unsafe { self.api().device_get_queue(device) };
        self.shared
            .queues
            .get_or_create(raw, |raw| Queue::from_raw(self.api().clone(), raw, self.downgrade()))
    }

    pub fn limits(&self) -> Result<Limits, GpuError> {
        let device = self.live()?;
        let mut supported = sys::SupportedLimits {
            next_in_chain: ptr::null_mut(),
            limits: Limits::UNDEFINED,
        };
        if !unsafe { self.api().device_get_limits(device, &mut supported) } {
            return Err(GpuError::RequestFailed {
                kind: ResourceKind::Device,
                status: "Unavailable".to_string(),
                message: "device limits are not available".to_string(),
            });
        }
        Ok(supported.limits)
    }

    pub fn has_feature(&self, feature: FeatureName) -> Result<bool, GpuError> {
        let device = self.live()?;
        Ok(unsafe { self.api().device_has_feature(device, feature) })
    }

    // ========================================================================
    // Errors and callbacks
    // ========================================================================

    pub fn push_error_scope(&self, filter: ErrorFilter) -> Result<(), GpuError> {
        let device = self.live()?;
        unsafe { self.api().device_push_error_scope(device, filter) };
        Ok(())
    }

    /// Pop the innermost error scope. `callback` receives the first error
    /// captured by the scope, or [`ErrorType::NO_ERROR`]. Returns whether a
    /// scope was open.
    pub fn pop_error_scope<F>(&self, callback: F) -> Result<bool, GpuError>
    where
        F: FnOnce(ErrorType, String) + Send + 'static,
    {
        let device = self.live()?;
        let (trampoline, userdata) = callback::error_once(callback);
        Ok(unsafe { self.api().device_pop_error_scope(device, trampoline, userdata) })
    }

    /// Install the handler for errors no error scope captured. Replaces any
    /// previous handler.
    pub fn on_uncaptured_error<F>(&self, callback: F) -> Result<(), GpuError>
    where
        F: Fn(ErrorType, String) + Send + Sync + 'static,
    {
        let device = self.live()?;
        let (trampoline, userdata, previous) = self.shared.callbacks.keep_uncaptured_error(callback);
        unsafe {
            self.api()
                .device_set_uncaptured_error_callback(device, trampoline, userdata)
        };
        drop(previous);
        Ok(())
    }

    /// Install the handler for device loss. Replaces any previous handler.
    pub fn on_device_lost<F>(&self, callback: F) -> Result<(), GpuError>
    where
        F: Fn(DeviceLostReason, String) + Send + Sync + 'static,
    {
        let device = self.live()?;
        let (trampoline, userdata, previous) = self.shared.callbacks.keep_device_lost(callback);
        unsafe { self.api().device_set_device_lost_callback(device, trampoline, userdata) };
        drop(previous);
        Ok(())
    }

    /// Drive pending callbacks. Returns `true` when the queue is empty.
    pub fn poll(&self, wait: bool) -> Result<bool, GpuError> {
        let device = self.live()?;
        Ok(unsafe { self.api().device_poll(device, wait) })
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Destroy the device. Only the first call reaches the native side.
    pub fn destroy(&self) -> Result<bool, GpuError> {
        self.shared.handle.destroy()
    }

    /// Release the queue, every registered bind group layout and texture
    /// view, then the device handle. Returns `false` if the device was
    /// already released.
    pub fn release(&self) -> bool {
        self.shared.release()
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Device {}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .field("queues", &self.shared.queues.len())
            .field("bind_group_layouts", &self.shared.bind_group_layouts.len())
            .field("texture_views", &self.shared.texture_views.len())
            .field("uncaptured_error_handler", &self.shared.callbacks.has_uncaptured_error())
            .field("device_lost_handler", &self.shared.callbacks.has_device_lost())
            .finish()
    }
}
