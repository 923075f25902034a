//! Native WGPU
//!
//! Safe wrapper objects over the wgpu-native C ABI.
//!
//! Every native object is owned by a wrapper that knows whether its handle is
//! still live, destroyed or released, so a stale handle is reported as an
//! error instead of reaching the native library. Descriptor extensions are
//! built with a [`ChainBuilder`], and objects the native side hands out more
//! than once (the device queue, bind group layouts, texture views) resolve to
//! a single wrapper through the device's [`IdentityRegistry`].
//!
//! The library is reached through a [`sys::NativeApi`] table. Enable the
//! `link` feature for [`Instance::linked`], or pass any other implementation
//! to [`Instance::new`].

pub use native_wgpu_sys as sys;

mod adapter;
mod binding;
mod buffer;
pub mod callback;
pub mod chain;
mod command;
pub mod config;
mod device;
pub mod error;
pub mod handle;
mod instance;
pub mod logging;
mod marshal;
mod pipeline;
pub mod profiling;
mod query_set;
mod queue;
pub mod registry;
mod resource;
mod sampler;
mod shader;
mod surface;
mod swap_chain;
mod texture;
pub mod types;

pub use adapter::{Adapter, DeviceDescriptor};
pub use binding::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingResource, BindingType, PipelineLayout, PipelineLayoutDescriptor,
};
pub use buffer::{Buffer, BufferDescriptor};
pub use chain::ChainBuilder;
pub use command::{
    CommandBuffer, CommandEncoder, ComputePass, RenderPass, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
    RenderPassDescriptor,
};
pub use config::Config;
pub use device::Device;
pub use error::{GpuError, ResourceKind};
pub use handle::{Guarded, HandleState, NativeObject};
pub use instance::{Instance, RequestAdapterOptions};
pub use pipeline::{
    ColorTargetState, ComputePipeline, ComputePipelineDescriptor, ConstantEntry, DepthStencilState, FragmentState,
    MultisampleState, PrimitiveState, RenderPipeline, RenderPipelineDescriptor, VertexBufferLayout, VertexState,
};
pub use query_set::{QuerySet, QuerySetDescriptor};
pub use queue::Queue;
pub use registry::IdentityRegistry;
pub use sampler::{Sampler, SamplerDescriptor};
pub use shader::{CompilationMessage, ShaderModule, ShaderModuleDescriptor, ShaderSource, spirv_words};
pub use surface::{Surface, SurfaceSource};
pub use swap_chain::{SwapChain, SwapChainDescriptor};
pub use texture::{
    ImageCopyBuffer, ImageCopyTexture, Texture, TextureDataLayout, TextureDescriptor, TextureView, TextureViewDescriptor,
};
pub use types::*;
