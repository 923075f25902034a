//! Error types for the wrapper layer.

use std::fmt;

/// The kind of native object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instance,
    Adapter,
    Surface,
    Device,
    Queue,
    Buffer,
    Texture,
    TextureView,
    Sampler,
    BindGroupLayout,
    BindGroup,
    PipelineLayout,
    ShaderModule,
    ComputePipeline,
    RenderPipeline,
    CommandEncoder,
    CommandBuffer,
    ComputePass,
    RenderPass,
    QuerySet,
    SwapChain,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Adapter => "Adapter",
            Self::Surface => "Surface",
            Self::Device => "Device",
            Self::Queue => "Queue",
            Self::Buffer => "Buffer",
            Self::Texture => "Texture",
            Self::TextureView => "TextureView",
            Self::Sampler => "Sampler",
            Self::BindGroupLayout => "BindGroupLayout",
            Self::BindGroup => "BindGroup",
            Self::PipelineLayout => "PipelineLayout",
            Self::ShaderModule => "ShaderModule",
            Self::ComputePipeline => "ComputePipeline",
            Self::RenderPipeline => "RenderPipeline",
            Self::CommandEncoder => "CommandEncoder",
            Self::CommandBuffer => "CommandBuffer",
            Self::ComputePass => "ComputePass",
            Self::RenderPass => "RenderPass",
            Self::QuerySet => "QuerySet",
            Self::SwapChain => "SwapChain",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the wrapper layer.
///
/// Errors the native library reports on its own (validation, out of memory)
/// arrive through the device's uncaptured-error callback instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The native create call returned a null handle.
    CreationFailed { kind: ResourceKind },
    /// The wrapper was used after its handle was released.
    UseAfterRelease { kind: ResourceKind },
    /// The resource was destroyed and can no longer be used by the GPU.
    Destroyed { kind: ResourceKind },
    /// A texture view was handed to a texture that does not own it.
    OwnershipViolation {
        view: String,
        expected_owner: String,
    },
    /// An asynchronous request completed with a non-success status.
    RequestFailed {
        kind: ResourceKind,
        status: String,
        message: String,
    },
    /// A string passed to the native side contained an interior NUL byte.
    InteriorNul { context: &'static str },
    /// Malformed input, rejected before reaching the native side.
    InvalidArgument(String),
}

impl GpuError {
    /// The resource kind the error is about, when there is one.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::CreationFailed { kind }
            | Self::UseAfterRelease { kind }
            | Self::Destroyed { kind }
            | Self::RequestFailed { kind, .. } => Some(*kind),
            Self::OwnershipViolation { .. } => Some(ResourceKind::TextureView),
            Self::InteriorNul { .. } | Self::InvalidArgument(_) => None,
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreationFailed { kind } => write!(f, "Failed to create {}: native call returned null", kind),
            Self::UseAfterRelease { kind } => write!(f, "{} used after it was released", kind),
            Self::Destroyed { kind } => write!(f, "{} used after it was destroyed", kind),
            Self::OwnershipViolation { view, expected_owner } => {
                write!(f, "Texture view '{}' is not owned by texture '{}'", view, expected_owner)
            }
            Self::RequestFailed { kind, status, message } => {
                write!(f, "{} request failed with status {}: {}", kind, status, message)
            }
            Self::InteriorNul { context } => write!(f, "Interior NUL byte in {}", context),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_kind() {
        let err = GpuError::UseAfterRelease {
            kind: ResourceKind::Buffer,
        };
        assert_eq!(err.to_string(), "Buffer used after it was released");

        let err = GpuError::CreationFailed {
            kind: ResourceKind::BindGroupLayout,
        };
        assert!(err.to_string().contains("BindGroupLayout"));
    }

    #[test]
    fn test_kind_accessor() {
        let err = GpuError::Destroyed {
            kind: ResourceKind::QuerySet,
        };
        assert_eq!(err.kind(), Some(ResourceKind::QuerySet));
        assert_eq!(GpuError::InvalidArgument("x".into()).kind(), None);
    }
}
