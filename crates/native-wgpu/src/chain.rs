//! Extension chain builder.
//!
//! A [`ChainBuilder`] owns a singly linked list of heap-allocated extension
//! structs plus any arrays or strings those structs point at. Nodes are linked
//! in insertion order: the first node added is the head returned by
//! [`ChainBuilder::as_ptr`], and each later node is spliced after the previous
//! one. The last node's `next` is always null.
//!
//! Everything the builder allocated is freed exactly once, either by
//! [`ChainBuilder::dispose`] or when the builder is dropped.
//!
//! # Example
//!
//! ```
//! use native_wgpu::chain::ChainBuilder;
//! use native_wgpu::sys;
//!
//! let mut chain = ChainBuilder::new();
//! chain.add_wgsl("@compute @workgroup_size(1) fn main() {}")?;
//! assert_eq!(chain.tags(), vec![sys::SType::SHADER_MODULE_WGSL_DESCRIPTOR]);
//! assert!(!chain.as_ptr().is_null());
//! assert_eq!(chain.dispose(), 2); // the node and the source string
//! # Ok::<(), native_wgpu::GpuError>(())
//! ```

use std::any::Any;
use std::ffi::{CString, c_char, c_void};
use std::fmt;
use std::ptr::{self, NonNull};

use native_wgpu_sys as sys;
use sys::{ChainedStruct, SType};

use crate::error::GpuError;

/// Placeholder header; [`ChainBuilder`] writes the real tag and link.
const UNLINKED: ChainedStruct = ChainedStruct::new(SType::INVALID);

/// A `#[repr(C)]` layout that starts with a [`ChainedStruct`] header.
trait Extension: Sized {
    const S_TYPE: SType;

    fn header_mut(&mut self) -> &mut ChainedStruct;

    fn into_node(node: NonNull<Self>) -> ChainNode;
}

macro_rules! chain_nodes {
    ($($variant:ident($layout:ident) = $s_type:ident,)*) => {
        /// One allocated extension struct.
        enum ChainNode {
            $($variant(NonNull<sys::$layout>),)*
        }

        impl ChainNode {
            /// Address of the node's header. This is the only place a node
            /// turns into a `ChainedStruct` pointer; the cast is sound
            /// because every layout keeps the header at offset zero.
            fn header(&self) -> NonNull<ChainedStruct> {
                match self {
                    $(Self::$variant(node) => node.cast(),)*
                }
            }
        }

        impl Drop for ChainNode {
            fn drop(&mut self) {
                match self {
                    // SAFETY: every node comes from `Box::leak` in `push` and
                    // is dropped exactly once, here.
                    $(Self::$variant(node) => drop(unsafe { Box::from_raw(node.as_ptr()) }),)*
                }
            }
        }

        $(
            impl Extension for sys::$layout {
                const S_TYPE: SType = SType::$s_type;

                fn header_mut(&mut self) -> &mut ChainedStruct {
                    &mut self.chain
                }

                fn into_node(node: NonNull<Self>) -> ChainNode {
                    ChainNode::$variant(node)
                }
            }
        )*
    };
}

chain_nodes! {
    DepthClipControl(PrimitiveDepthClipControl) = PRIMITIVE_DEPTH_CLIP_CONTROL,
    SpirV(ShaderModuleSpirvDescriptor) = SHADER_MODULE_SPIRV_DESCRIPTOR,
    Wgsl(ShaderModuleWgslDescriptor) = SHADER_MODULE_WGSL_DESCRIPTOR,
    AndroidNativeWindow(SurfaceDescriptorFromAndroidNativeWindow) = SURFACE_DESCRIPTOR_FROM_ANDROID_NATIVE_WINDOW,
    CanvasHtmlSelector(SurfaceDescriptorFromCanvasHtmlSelector) = SURFACE_DESCRIPTOR_FROM_CANVAS_HTML_SELECTOR,
    MetalLayer(SurfaceDescriptorFromMetalLayer) = SURFACE_DESCRIPTOR_FROM_METAL_LAYER,
    WaylandSurface(SurfaceDescriptorFromWaylandSurface) = SURFACE_DESCRIPTOR_FROM_WAYLAND_SURFACE,
    WindowsHwnd(SurfaceDescriptorFromWindowsHwnd) = SURFACE_DESCRIPTOR_FROM_WINDOWS_HWND,
    XcbWindow(SurfaceDescriptorFromXcbWindow) = SURFACE_DESCRIPTOR_FROM_XCB_WINDOW,
    XlibWindow(SurfaceDescriptorFromXlibWindow) = SURFACE_DESCRIPTOR_FROM_XLIB_WINDOW,
    DeviceExtras(DeviceExtras) = DEVICE_EXTRAS,
    AdapterExtras(AdapterExtras) = ADAPTER_EXTRAS,
    RequiredLimitsExtras(RequiredLimitsExtras) = REQUIRED_LIMITS_EXTRAS,
    PipelineLayoutExtras(PipelineLayoutExtras) = PIPELINE_LAYOUT_EXTRAS,
}

// SAFETY: a node is an exclusively owned heap allocation. The raw pointers
// inside it either point into allocations owned by the same builder or are
// opaque platform handles the builder never dereferences.
unsafe impl Send for ChainNode {}
unsafe impl Sync for ChainNode {}

/// Builder for a linked list of extension structs.
#[derive(Default)]
pub struct ChainBuilder {
    nodes: Vec<ChainNode>,
    tracked: Vec<Box<dyn Any + Send + Sync>>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Node insertion
    // ========================================================================

    fn push<T: Extension>(&mut self, mut value: T) -> &mut Self {
        *value.header_mut() = ChainedStruct::new(T::S_TYPE);
        let node = T::into_node(NonNull::from(Box::leak(Box::new(value))));

        if let Some(last) = self.nodes.last() {
            // SAFETY: `last` is a live allocation owned by this builder and
            // nothing else holds a reference to it.
            unsafe {
                (*last.header().as_ptr()).next = node.header().as_ptr();
            }
        }
        self.nodes.push(node);

        tracing::trace!(s_type = ?T::S_TYPE, len = self.nodes.len(), "Chain node added");
        self
    }

    /// Disable depth clipping on a primitive state.
    pub fn add_depth_clip_control(&mut self, unclipped_depth: bool) -> &mut Self {
        self.push(sys::PrimitiveDepthClipControl {
            chain: UNLINKED,
            unclipped_depth,
        })
    }

    /// SPIR-V shader source. `code_size` is recorded in words.
    pub fn add_spirv(&mut self, words: &[u32]) -> &mut Self {
        let code = self.track_slice(words);
        self.push(sys::ShaderModuleSpirvDescriptor {
            chain: UNLINKED,
            code_size: words.len() as u32,
            code,
        })
    }

    /// WGSL shader source.
    pub fn add_wgsl(&mut self, source: &str) -> Result<&mut Self, GpuError> {
        let code = self.track_c_str(source, "WGSL source")?;
        Ok(self.push(sys::ShaderModuleWgslDescriptor { chain: UNLINKED, code }))
    }

    pub fn add_android_native_window(&mut self, window: *mut c_void) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromAndroidNativeWindow {
            chain: UNLINKED,
            window,
        })
    }

    pub fn add_canvas_html_selector(&mut self, selector: &str) -> Result<&mut Self, GpuError> {
        let selector = self.track_c_str(selector, "canvas selector")?;
        Ok(self.push(sys::SurfaceDescriptorFromCanvasHtmlSelector {
            chain: UNLINKED,
            selector,
        }))
    }

    pub fn add_metal_layer(&mut self, layer: *mut c_void) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromMetalLayer { chain: UNLINKED, layer })
    }

    pub fn add_wayland_surface(&mut self, display: *mut c_void, surface: *mut c_void) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromWaylandSurface {
            chain: UNLINKED,
            display,
            surface,
        })
    }

    pub fn add_windows_hwnd(&mut self, hinstance: *mut c_void, hwnd: *mut c_void) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromWindowsHwnd {
            chain: UNLINKED,
            hinstance,
            hwnd,
        })
    }

    pub fn add_xcb_window(&mut self, connection: *mut c_void, window: u32) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromXcbWindow {
            chain: UNLINKED,
            connection,
            window,
        })
    }

    pub fn add_xlib_window(&mut self, display: *mut c_void, window: u32) -> &mut Self {
        self.push(sys::SurfaceDescriptorFromXlibWindow {
            chain: UNLINKED,
            display,
            window,
        })
    }

    /// Native device options. Absent strings are passed as null.
    pub fn add_device_extras(
        &mut self,
        native_features: sys::NativeFeature,
        label: Option<&str>,
        trace_path: Option<&str>,
    ) -> Result<&mut Self, GpuError> {
        let label = match label {
            Some(label) => self.track_c_str(label, "device label")?,
            None => ptr::null(),
        };
        let trace_path = match trace_path {
            Some(path) => self.track_c_str(path, "trace path")?,
            None => ptr::null(),
        };
        Ok(self.push(sys::DeviceExtras {
            chain: UNLINKED,
            native_features,
            label,
            trace_path,
        }))
    }

    pub fn add_adapter_extras(&mut self, backend: sys::BackendType) -> &mut Self {
        self.push(sys::AdapterExtras { chain: UNLINKED, backend })
    }

    pub fn add_required_limits_extras(&mut self, max_push_constant_size: u32) -> &mut Self {
        self.push(sys::RequiredLimitsExtras {
            chain: UNLINKED,
            max_push_constant_size,
        })
    }

    pub fn add_pipeline_layout_extras(&mut self, ranges: &[sys::PushConstantRange]) -> &mut Self {
        let push_constant_ranges = self.track_slice(ranges);
        self.push(sys::PipelineLayoutExtras {
            chain: UNLINKED,
            push_constant_range_count: ranges.len() as u32,
            push_constant_ranges,
        })
    }

    // ========================================================================
    // Auxiliary storage
    // ========================================================================

    /// Copy `items` into builder-owned storage and return a pointer that
    /// stays valid until the builder is disposed. An empty slice is not
    /// stored and yields null.
    pub fn track_slice<T>(&mut self, items: &[T]) -> *const T
    where
        T: Copy + Send + Sync + 'static,
    {
        if items.is_empty() {
            return ptr::null();
        }
        let owned: Vec<T> = items.to_vec();
        let data = owned.as_ptr();
        self.tracked.push(Box::new(owned));
        data
    }

    /// Copy `value` into a builder-owned C string.
    pub fn track_c_str(&mut self, value: &str, context: &'static str) -> Result<*const c_char, GpuError> {
        let owned = CString::new(value).map_err(|_| GpuError::InteriorNul { context })?;
        let data = owned.as_ptr();
        self.tracked.push(Box::new(owned));
        Ok(data)
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Head of the chain, or null when no node was added.
    pub fn as_ptr(&self) -> *const ChainedStruct {
        self.nodes
            .first()
            .map_or(ptr::null(), |node| node.header().as_ptr().cast_const())
    }

    /// Number of extension nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of auxiliary allocations (arrays and strings).
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Node tags in link order.
    pub fn tags(&self) -> Vec<SType> {
        self.nodes
            .iter()
            // SAFETY: nodes stay allocated while `self` is borrowed.
            .map(|node| unsafe { node.header().as_ref().s_type })
            .collect()
    }

    /// Free every node and tracked allocation, returning how many
    /// allocations were released.
    pub fn dispose(self) -> usize {
        let released = self.nodes.len() + self.tracked.len();
        tracing::trace!(nodes = self.nodes.len(), tracked = self.tracked.len(), "Chain disposed");
        drop(self);
        released
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("tags", &self.tags())
            .field("tracked", &self.tracked.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn walk(chain: &ChainBuilder) -> Vec<*const ChainedStruct> {
        let mut out = Vec::new();
        let mut cursor = chain.as_ptr();
        while !cursor.is_null() {
            out.push(cursor);
            cursor = unsafe { (*cursor).next };
        }
        out
    }

    #[test]
    fn test_empty_chain_is_null() {
        let chain = ChainBuilder::new();
        assert!(chain.as_ptr().is_null());
        assert!(chain.is_empty());
        assert_eq!(chain.dispose(), 0);
    }

    #[test]
    fn test_nodes_link_in_insertion_order() {
        let mut chain = ChainBuilder::new();
        chain
            .add_adapter_extras(sys::BackendType::VULKAN)
            .add_required_limits_extras(64)
            .add_depth_clip_control(true);

        let nodes = walk(&chain);
        assert_eq!(nodes.len(), 3);
        let tags: Vec<SType> = nodes.iter().map(|node| unsafe { (**node).s_type }).collect();
        assert_eq!(
            tags,
            vec![
                SType::ADAPTER_EXTRAS,
                SType::REQUIRED_LIMITS_EXTRAS,
                SType::PRIMITIVE_DEPTH_CLIP_CONTROL
            ]
        );
        assert_eq!(tags, chain.tags());
        assert!(unsafe { (*nodes[2]).next }.is_null());
    }

    #[test]
    fn test_node_fields_are_copied() {
        let mut chain = ChainBuilder::new();
        chain.add_required_limits_extras(128);

        let node = chain.as_ptr().cast::<sys::RequiredLimitsExtras>();
        assert_eq!(unsafe { (*node).max_push_constant_size }, 128);
    }

    #[test]
    fn test_wgsl_source_is_nul_terminated() {
        let mut chain = ChainBuilder::new();
        chain.add_wgsl("fn main() {}").unwrap();

        let node = chain.as_ptr().cast::<sys::ShaderModuleWgslDescriptor>();
        let code = unsafe { CStr::from_ptr((*node).code) };
        assert_eq!(code.to_str().unwrap(), "fn main() {}");
        assert_eq!(chain.tracked_len(), 1);
    }

    #[test]
    fn test_wgsl_interior_nul_rejected() {
        let mut chain = ChainBuilder::new();
        let err = chain.add_wgsl("fn\0main").unwrap_err();
        assert_eq!(err, GpuError::InteriorNul { context: "WGSL source" });
        assert!(chain.is_empty());
    }

    #[test]
    fn test_spirv_size_counts_words() {
        let words = [0x0723_0203, 0x0001_0000, 0, 1, 2];
        let mut chain = ChainBuilder::new();
        chain.add_spirv(&words);

        let node = chain.as_ptr().cast::<sys::ShaderModuleSpirvDescriptor>();
        let (size, code) = unsafe { ((*node).code_size, (*node).code) };
        assert_eq!(size, 5);
        assert_eq!(unsafe { std::slice::from_raw_parts(code, 5) }, &words);
    }

    #[test]
    fn test_empty_slice_is_null_and_untracked() {
        let mut chain = ChainBuilder::new();
        chain.add_pipeline_layout_extras(&[]);

        let node = chain.as_ptr().cast::<sys::PipelineLayoutExtras>();
        assert!(unsafe { (*node).push_constant_ranges }.is_null());
        assert_eq!(unsafe { (*node).push_constant_range_count }, 0);
        assert_eq!(chain.tracked_len(), 0);
    }

    #[test]
    fn test_device_extras_optional_strings() {
        let mut chain = ChainBuilder::new();
        chain
            .add_device_extras(sys::NativeFeature::PUSH_CONSTANTS, Some("main device"), None)
            .unwrap();

        let node = chain.as_ptr().cast::<sys::DeviceExtras>();
        let label = unsafe { CStr::from_ptr((*node).label) };
        assert_eq!(label.to_str().unwrap(), "main device");
        assert!(unsafe { (*node).trace_path }.is_null());
        assert_eq!(chain.tracked_len(), 1);
    }

    #[test]
    fn test_dispose_counts_nodes_and_tracked() {
        let mut chain = ChainBuilder::new();
        chain.add_spirv(&[1, 2, 3]);
        chain.add_wgsl("x").unwrap();
        chain.add_metal_layer(ptr::null_mut());
        let extra = chain.track_slice(&[1u8, 2, 3]);
        assert!(!extra.is_null());

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.tracked_len(), 3);
        assert_eq!(chain.dispose(), 6);
    }
}
