//! Opaque object handles.
//!
//! Every native object is passed around as a pointer to an opaque struct that
//! only the native library can look inside. A null pointer is the "invalid"
//! sentinel returned when creation fails.

macro_rules! opaque_handles {
    ($($(#[$meta:meta])* $name:ident => $opaque:ident;)*) => {
        $(
            #[repr(C)]
            #[doc = concat!("Opaque storage behind [`", stringify!($name), "`].")]
            pub struct $opaque {
                _private: [u8; 0],
            }

            $(#[$meta])*
            pub type $name = *mut $opaque;
        )*
    };
}

opaque_handles! {
    /// Entry point of the library; owns surfaces and hands out adapters.
    Instance => InstanceImpl;
    /// A physical device selected by `instance_request_adapter`.
    Adapter => AdapterImpl;
    Surface => SurfaceImpl;
    /// A logical device; every resource below is created from one.
    Device => DeviceImpl;
    Queue => QueueImpl;
    Buffer => BufferImpl;
    Texture => TextureImpl;
    TextureView => TextureViewImpl;
    Sampler => SamplerImpl;
    BindGroupLayout => BindGroupLayoutImpl;
    BindGroup => BindGroupImpl;
    PipelineLayout => PipelineLayoutImpl;
    ShaderModule => ShaderModuleImpl;
    ComputePipeline => ComputePipelineImpl;
    RenderPipeline => RenderPipelineImpl;
    CommandEncoder => CommandEncoderImpl;
    CommandBuffer => CommandBufferImpl;
    ComputePassEncoder => ComputePassEncoderImpl;
    RenderPassEncoder => RenderPassEncoderImpl;
    QuerySet => QuerySetImpl;
    SwapChain => SwapChainImpl;
}
