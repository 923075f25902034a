//! Decoding of raw extension chains into owned values.
//!
//! The mock copies every chain it receives so tests can assert on node order
//! and contents after the wrapper has freed the originals.

use std::ffi::{CStr, c_char};

use native_wgpu_sys as sys;
use sys::SType;

/// An owned copy of one extension node.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEntry {
    DepthClipControl {
        unclipped_depth: bool,
    },
    SpirV {
        words: Vec<u32>,
    },
    Wgsl {
        code: String,
    },
    AndroidNativeWindow {
        window: usize,
    },
    CanvasHtmlSelector {
        selector: String,
    },
    MetalLayer {
        layer: usize,
    },
    WaylandSurface {
        display: usize,
        surface: usize,
    },
    WindowsHwnd {
        hinstance: usize,
        hwnd: usize,
    },
    XcbWindow {
        connection: usize,
        window: u32,
    },
    XlibWindow {
        display: usize,
        window: u32,
    },
    DeviceExtras {
        native_features: sys::NativeFeature,
        label: Option<String>,
        trace_path: Option<String>,
    },
    AdapterExtras {
        backend: sys::BackendType,
    },
    RequiredLimitsExtras {
        max_push_constant_size: u32,
    },
    PipelineLayoutExtras {
        ranges: Vec<sys::PushConstantRange>,
    },
    /// A tag the mock does not know how to decode.
    Unknown(SType),
}

impl ChainEntry {
    pub fn s_type(&self) -> SType {
        match self {
            Self::DepthClipControl { .. } => SType::PRIMITIVE_DEPTH_CLIP_CONTROL,
            Self::SpirV { .. } => SType::SHADER_MODULE_SPIRV_DESCRIPTOR,
            Self::Wgsl { .. } => SType::SHADER_MODULE_WGSL_DESCRIPTOR,
            Self::AndroidNativeWindow { .. } => SType::SURFACE_DESCRIPTOR_FROM_ANDROID_NATIVE_WINDOW,
            Self::CanvasHtmlSelector { .. } => SType::SURFACE_DESCRIPTOR_FROM_CANVAS_HTML_SELECTOR,
            Self::MetalLayer { .. } => SType::SURFACE_DESCRIPTOR_FROM_METAL_LAYER,
            Self::WaylandSurface { .. } => SType::SURFACE_DESCRIPTOR_FROM_WAYLAND_SURFACE,
            Self::WindowsHwnd { .. } => SType::SURFACE_DESCRIPTOR_FROM_WINDOWS_HWND,
            Self::XcbWindow { .. } => SType::SURFACE_DESCRIPTOR_FROM_XCB_WINDOW,
            Self::XlibWindow { .. } => SType::SURFACE_DESCRIPTOR_FROM_XLIB_WINDOW,
            Self::DeviceExtras { .. } => SType::DEVICE_EXTRAS,
            Self::AdapterExtras { .. } => SType::ADAPTER_EXTRAS,
            Self::RequiredLimitsExtras { .. } => SType::REQUIRED_LIMITS_EXTRAS,
            Self::PipelineLayoutExtras { .. } => SType::PIPELINE_LAYOUT_EXTRAS,
            Self::Unknown(s_type) => *s_type,
        }
    }
}

/// Copy a C string, `None` for null.
///
/// # Safety
///
/// `value` must be null or a valid NUL-terminated string.
pub unsafe fn read_c_str(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

/// Copy `len` elements starting at `data`; null or zero length gives an
/// empty vector.
///
/// # Safety
///
/// `data` must be null or valid for `len` reads.
pub unsafe fn read_slice<T: Copy>(data: *const T, len: usize) -> Vec<T> {
    if data.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
}

/// Decode every node reachable from `head`.
///
/// # Safety
///
/// `head` must be null or the head of a well-formed chain whose nodes match
/// the layouts their tags name.
pub unsafe fn decode_chain(head: *const sys::ChainedStruct) -> Vec<ChainEntry> {
    unsafe { sys::iter_chain(head) }
        .map(|node| unsafe { decode_node(node) })
        .collect()
}

unsafe fn decode_node(node: &sys::ChainedStruct) -> ChainEntry {
    let raw: *const sys::ChainedStruct = node;
    unsafe {
        match node.s_type {
            SType::PRIMITIVE_DEPTH_CLIP_CONTROL => {
                let ext = &*raw.cast::<sys::PrimitiveDepthClipControl>();
                ChainEntry::DepthClipControl {
                    unclipped_depth: ext.unclipped_depth,
                }
            }
            SType::SHADER_MODULE_SPIRV_DESCRIPTOR => {
                let ext = &*raw.cast::<sys::ShaderModuleSpirvDescriptor>();
                ChainEntry::SpirV {
                    words: read_slice(ext.code, ext.code_size as usize),
                }
            }
            SType::SHADER_MODULE_WGSL_DESCRIPTOR => {
                let ext = &*raw.cast::<sys::ShaderModuleWgslDescriptor>();
                ChainEntry::Wgsl {
                    code: read_c_str(ext.code).unwrap_or_default(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_ANDROID_NATIVE_WINDOW => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromAndroidNativeWindow>();
                ChainEntry::AndroidNativeWindow {
                    window: ext.window.addr(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_CANVAS_HTML_SELECTOR => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromCanvasHtmlSelector>();
                ChainEntry::CanvasHtmlSelector {
                    selector: read_c_str(ext.selector).unwrap_or_default(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_METAL_LAYER => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromMetalLayer>();
                ChainEntry::MetalLayer {
                    layer: ext.layer.addr(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_WAYLAND_SURFACE => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromWaylandSurface>();
                ChainEntry::WaylandSurface {
                    display: ext.display.addr(),
                    surface: ext.surface.addr(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_WINDOWS_HWND => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromWindowsHwnd>();
                ChainEntry::WindowsHwnd {
                    hinstance: ext.hinstance.addr(),
                    hwnd: ext.hwnd.addr(),
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_XCB_WINDOW => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromXcbWindow>();
                ChainEntry::XcbWindow {
                    connection: ext.connection.addr(),
                    window: ext.window,
                }
            }
            SType::SURFACE_DESCRIPTOR_FROM_XLIB_WINDOW => {
                let ext = &*raw.cast::<sys::SurfaceDescriptorFromXlibWindow>();
                ChainEntry::XlibWindow {
                    display: ext.display.addr(),
                    window: ext.window,
                }
            }
            SType::DEVICE_EXTRAS => {
                let ext = &*raw.cast::<sys::DeviceExtras>();
                ChainEntry::DeviceExtras {
                    native_features: ext.native_features,
                    label: read_c_str(ext.label),
                    trace_path: read_c_str(ext.trace_path),
                }
            }
            SType::ADAPTER_EXTRAS => {
                let ext = &*raw.cast::<sys::AdapterExtras>();
                ChainEntry::AdapterExtras { backend: ext.backend }
            }
            SType::REQUIRED_LIMITS_EXTRAS => {
                let ext = &*raw.cast::<sys::RequiredLimitsExtras>();
                ChainEntry::RequiredLimitsExtras {
                    max_push_constant_size: ext.max_push_constant_size,
                }
            }
            SType::PIPELINE_LAYOUT_EXTRAS => {
                let ext = &*raw.cast::<sys::PipelineLayoutExtras>();
                ChainEntry::PipelineLayoutExtras {
                    ranges: read_slice(ext.push_constant_ranges, ext.push_constant_range_count as usize),
                }
            }
            other => ChainEntry::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_decode_empty() {
        assert!(unsafe { decode_chain(ptr::null()) }.is_empty());
    }

    #[test]
    fn test_decode_two_nodes() {
        let code = c"fn main() {}";
        let tail = sys::ShaderModuleWgslDescriptor {
            chain: sys::ChainedStruct::new(SType::SHADER_MODULE_WGSL_DESCRIPTOR),
            code: code.as_ptr(),
        };
        let mut head = sys::PrimitiveDepthClipControl {
            chain: sys::ChainedStruct::new(SType::PRIMITIVE_DEPTH_CLIP_CONTROL),
            unclipped_depth: true,
        };
        head.chain.next = &tail.chain;

        let entries = unsafe { decode_chain(&head.chain) };
        assert_eq!(
            entries,
            vec![
                ChainEntry::DepthClipControl { unclipped_depth: true },
                ChainEntry::Wgsl {
                    code: "fn main() {}".into()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_tag() {
        let node = sys::ChainedStruct::new(SType(0x7777));
        let entries = unsafe { decode_chain(&node) };
        assert_eq!(entries, vec![ChainEntry::Unknown(SType(0x7777))]);
        assert_eq!(entries[0].s_type(), SType(0x7777));
    }
}
