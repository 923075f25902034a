//! C enumerations.
//!
//! The native library may hand back values this crate does not know about, so
//! enums are transparent `u32` newtypes with associated constants rather than
//! Rust enums. An unknown value is representable and prints as `Name(0x..)`.

use core::fmt;

/// Bit-flag fields (`WGPUFlags`).
pub type Flags = u32;

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $value:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            $(pub const $variant: Self = Self($value);)*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    Self(other) => write!(f, "{}({:#x})", stringify!($name), other),
                }
            }
        }
    };
}

native_enum! {
    /// Tag carried by every [`ChainedStruct`](crate::ChainedStruct).
    SType {
        INVALID = 0x0000_0000,
        SURFACE_DESCRIPTOR_FROM_METAL_LAYER = 0x0000_0001,
        SURFACE_DESCRIPTOR_FROM_WINDOWS_HWND = 0x0000_0002,
        SURFACE_DESCRIPTOR_FROM_XLIB_WINDOW = 0x0000_0003,
        SURFACE_DESCRIPTOR_FROM_CANVAS_HTML_SELECTOR = 0x0000_0004,
        SHADER_MODULE_SPIRV_DESCRIPTOR = 0x0000_0005,
        SHADER_MODULE_WGSL_DESCRIPTOR = 0x0000_0006,
        PRIMITIVE_DEPTH_CLIP_CONTROL = 0x0000_0007,
        SURFACE_DESCRIPTOR_FROM_WAYLAND_SURFACE = 0x0000_0008,
        SURFACE_DESCRIPTOR_FROM_ANDROID_NATIVE_WINDOW = 0x0000_0009,
        SURFACE_DESCRIPTOR_FROM_XCB_WINDOW = 0x0000_000A,
        DEVICE_EXTRAS = 0x6000_0001,
        ADAPTER_EXTRAS = 0x6000_0002,
        REQUIRED_LIMITS_EXTRAS = 0x6000_0003,
        PIPELINE_LAYOUT_EXTRAS = 0x6000_0004,
    }
}

native_enum! {
    RequestAdapterStatus {
        SUCCESS = 0,
        UNAVAILABLE = 1,
        ERROR = 2,
        UNKNOWN = 3,
    }
}

native_enum! {
    RequestDeviceStatus {
        SUCCESS = 0,
        ERROR = 1,
        UNKNOWN = 2,
    }
}

native_enum! {
    CreatePipelineAsyncStatus {
        SUCCESS = 0,
        VALIDATION_ERROR = 1,
        INTERNAL_ERROR = 2,
        DEVICE_LOST = 3,
        DEVICE_DESTROYED = 4,
        UNKNOWN = 5,
    }
}

native_enum! {
    CompilationInfoRequestStatus {
        SUCCESS = 0,
        ERROR = 1,
        DEVICE_LOST = 2,
        UNKNOWN = 3,
    }
}

native_enum! {
    CompilationMessageType {
        ERROR = 0,
        WARNING = 1,
        INFO = 2,
    }
}

native_enum! {
    BufferMapAsyncStatus {
        SUCCESS = 0,
        ERROR = 1,
        UNKNOWN = 2,
        DEVICE_LOST = 3,
        DESTROYED_BEFORE_CALLBACK = 4,
        UNMAPPED_BEFORE_CALLBACK = 5,
    }
}

native_enum! {
    QueueWorkDoneStatus {
        SUCCESS = 0,
        ERROR = 1,
        UNKNOWN = 2,
        DEVICE_LOST = 3,
    }
}

native_enum! {
    ErrorType {
        NO_ERROR = 0,
        VALIDATION = 1,
        OUT_OF_MEMORY = 2,
        UNKNOWN = 3,
        DEVICE_LOST = 4,
    }
}

native_enum! {
    ErrorFilter {
        VALIDATION = 0,
        OUT_OF_MEMORY = 1,
    }
}

native_enum! {
    DeviceLostReason {
        UNDEFINED = 0,
        DESTROYED = 1,
    }
}

native_enum! {
    PowerPreference {
        UNDEFINED = 0,
        LOW_POWER = 1,
        HIGH_PERFORMANCE = 2,
    }
}

native_enum! {
    BackendType {
        NULL = 0,
        WEBGPU = 1,
        D3D11 = 2,
        D3D12 = 3,
        METAL = 4,
        VULKAN = 5,
        OPENGL = 6,
        OPENGLES = 7,
    }
}

native_enum! {
    AdapterType {
        DISCRETE_GPU = 0,
        INTEGRATED_GPU = 1,
        CPU = 2,
        UNKNOWN = 3,
    }
}

native_enum! {
    FeatureName {
        UNDEFINED = 0,
        DEPTH_CLIP_CONTROL = 1,
        DEPTH24_UNORM_STENCIL8 = 2,
        DEPTH32_FLOAT_STENCIL8 = 3,
        TIMESTAMP_QUERY = 4,
        PIPELINE_STATISTICS_QUERY = 5,
        TEXTURE_COMPRESSION_BC = 6,
        TEXTURE_COMPRESSION_ETC2 = 7,
        TEXTURE_COMPRESSION_ASTC = 8,
        INDIRECT_FIRST_INSTANCE = 9,
    }
}

native_enum! {
    /// Features only wgpu-native exposes, requested through `DeviceExtras`.
    NativeFeature {
        NONE = 0,
        PUSH_CONSTANTS = 0x0400_0000,
        TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES = 0x1000_0000,
    }
}

native_enum! {
    LogLevel {
        OFF = 0,
        ERROR = 1,
        WARN = 2,
        INFO = 3,
        DEBUG = 4,
        TRACE = 5,
    }
}

native_enum! {
    TextureFormat {
        UNDEFINED = 0x00,
        R8_UNORM = 0x01,
        R8_SNORM = 0x02,
        R8_UINT = 0x03,
        R8_SINT = 0x04,
        R16_UINT = 0x05,
        R16_SINT = 0x06,
        R16_FLOAT = 0x07,
        RG8_UNORM = 0x08,
        RG8_SNORM = 0x09,
        RG8_UINT = 0x0A,
        RG8_SINT = 0x0B,
        R32_FLOAT = 0x0C,
        R32_UINT = 0x0D,
        R32_SINT = 0x0E,
        RG16_UINT = 0x0F,
        RG16_SINT = 0x10,
        RG16_FLOAT = 0x11,
        RGBA8_UNORM = 0x12,
        RGBA8_UNORM_SRGB = 0x13,
        RGBA8_SNORM = 0x14,
        RGBA8_UINT = 0x15,
        RGBA8_SINT = 0x16,
        BGRA8_UNORM = 0x17,
        BGRA8_UNORM_SRGB = 0x18,
        RGB10A2_UNORM = 0x19,
        RG11B10_UFLOAT = 0x1A,
        RGB9E5_UFLOAT = 0x1B,
        RG32_FLOAT = 0x1C,
        RG32_UINT = 0x1D,
        RG32_SINT = 0x1E,
        RGBA16_UINT = 0x1F,
        RGBA16_SINT = 0x20,
        RGBA16_FLOAT = 0x21,
        RGBA32_FLOAT = 0x22,
        RGBA32_UINT = 0x23,
        RGBA32_SINT = 0x24,
        STENCIL8 = 0x25,
        DEPTH16_UNORM = 0x26,
        DEPTH24_PLUS = 0x27,
        DEPTH24_PLUS_STENCIL8 = 0x28,
        DEPTH24_UNORM_STENCIL8 = 0x29,
        DEPTH32_FLOAT = 0x2A,
        DEPTH32_FLOAT_STENCIL8 = 0x2B,
    }
}

native_enum! {
    TextureDimension {
        D1 = 0,
        D2 = 1,
        D3 = 2,
    }
}

native_enum! {
    TextureViewDimension {
        UNDEFINED = 0,
        D1 = 1,
        D2 = 2,
        D2_ARRAY = 3,
        CUBE = 4,
        CUBE_ARRAY = 5,
        D3 = 6,
    }
}

native_enum! {
    TextureAspect {
        ALL = 0,
        STENCIL_ONLY = 1,
        DEPTH_ONLY = 2,
    }
}

native_enum! {
    TextureSampleType {
        UNDEFINED = 0,
        FLOAT = 1,
        UNFILTERABLE_FLOAT = 2,
        DEPTH = 3,
        SINT = 4,
        UINT = 5,
    }
}

native_enum! {
    StorageTextureAccess {
        UNDEFINED = 0,
        WRITE_ONLY = 1,
    }
}

native_enum! {
    BufferBindingType {
        UNDEFINED = 0,
        UNIFORM = 1,
        STORAGE = 2,
        READ_ONLY_STORAGE = 3,
    }
}

native_enum! {
    SamplerBindingType {
        UNDEFINED = 0,
        FILTERING = 1,
        NON_FILTERING = 2,
        COMPARISON = 3,
    }
}

native_enum! {
    AddressMode {
        REPEAT = 0,
        MIRROR_REPEAT = 1,
        CLAMP_TO_EDGE = 2,
    }
}

native_enum! {
    FilterMode {
        NEAREST = 0,
        LINEAR = 1,
    }
}

native_enum! {
    MipmapFilterMode {
        NEAREST = 0,
        LINEAR = 1,
    }
}

native_enum! {
    CompareFunction {
        UNDEFINED = 0,
        NEVER = 1,
        LESS = 2,
        LESS_EQUAL = 3,
        GREATER = 4,
        GREATER_EQUAL = 5,
        EQUAL = 6,
        NOT_EQUAL = 7,
        ALWAYS = 8,
    }
}

native_enum! {
    QueryType {
        OCCLUSION = 0,
        PIPELINE_STATISTICS = 1,
        TIMESTAMP = 2,
    }
}

native_enum! {
    PipelineStatisticName {
        VERTEX_SHADER_INVOCATIONS = 0,
        CLIPPER_INVOCATIONS = 1,
        CLIPPER_PRIMITIVES_OUT = 2,
        FRAGMENT_SHADER_INVOCATIONS = 3,
        COMPUTE_SHADER_INVOCATIONS = 4,
    }
}

native_enum! {
    PresentMode {
        IMMEDIATE = 0,
        MAILBOX = 1,
        FIFO = 2,
    }
}

native_enum! {
    LoadOp {
        UNDEFINED = 0,
        CLEAR = 1,
        LOAD = 2,
    }
}

native_enum! {
    StoreOp {
        UNDEFINED = 0,
        STORE = 1,
        DISCARD = 2,
    }
}

native_enum! {
    PrimitiveTopology {
        POINT_LIST = 0,
        LINE_LIST = 1,
        LINE_STRIP = 2,
        TRIANGLE_LIST = 3,
        TRIANGLE_STRIP = 4,
    }
}

native_enum! {
    IndexFormat {
        UNDEFINED = 0,
        UINT16 = 1,
        UINT32 = 2,
    }
}

native_enum! {
    FrontFace {
        CCW = 0,
        CW = 1,
    }
}

native_enum! {
    CullMode {
        NONE = 0,
        FRONT = 1,
        BACK = 2,
    }
}

native_enum! {
    VertexStepMode {
        VERTEX = 0,
        INSTANCE = 1,
    }
}

native_enum! {
    VertexFormat {
        UNDEFINED = 0x00,
        UINT8X2 = 0x01,
        UINT8X4 = 0x02,
        SINT8X2 = 0x03,
        SINT8X4 = 0x04,
        UNORM8X2 = 0x05,
        UNORM8X4 = 0x06,
        SNORM8X2 = 0x07,
        SNORM8X4 = 0x08,
        UINT16X2 = 0x09,
        UINT16X4 = 0x0A,
        SINT16X2 = 0x0B,
        SINT16X4 = 0x0C,
        UNORM16X2 = 0x0D,
        UNORM16X4 = 0x0E,
        SNORM16X2 = 0x0F,
        SNORM16X4 = 0x10,
        FLOAT16X2 = 0x11,
        FLOAT16X4 = 0x12,
        FLOAT32 = 0x13,
        FLOAT32X2 = 0x14,
        FLOAT32X3 = 0x15,
        FLOAT32X4 = 0x16,
        UINT32 = 0x17,
        UINT32X2 = 0x18,
        UINT32X3 = 0x19,
        UINT32X4 = 0x1A,
        SINT32 = 0x1B,
        SINT32X2 = 0x1C,
        SINT32X3 = 0x1D,
        SINT32X4 = 0x1E,
    }
}

native_enum! {
    BlendOperation {
        ADD = 0,
        SUBTRACT = 1,
        REVERSE_SUBTRACT = 2,
        MIN = 3,
        MAX = 4,
    }
}

native_enum! {
    BlendFactor {
        ZERO = 0x0,
        ONE = 0x1,
        SRC = 0x2,
        ONE_MINUS_SRC = 0x3,
        SRC_ALPHA = 0x4,
        ONE_MINUS_SRC_ALPHA = 0x5,
        DST = 0x6,
        ONE_MINUS_DST = 0x7,
        DST_ALPHA = 0x8,
        ONE_MINUS_DST_ALPHA = 0x9,
        SRC_ALPHA_SATURATED = 0xA,
        CONSTANT = 0xB,
        ONE_MINUS_CONSTANT = 0xC,
    }
}

native_enum! {
    StencilOperation {
        KEEP = 0,
        ZERO = 1,
        REPLACE = 2,
        INVERT = 3,
        INCREMENT_CLAMP = 4,
        DECREMENT_CLAMP = 5,
        INCREMENT_WRAP = 6,
        DECREMENT_WRAP = 7,
    }
}
