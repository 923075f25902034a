//! Extension chains.
//!
//! Descriptors carry a `next_in_chain` pointer to a singly linked list of
//! extension structs. Each extension starts with a [`ChainedStruct`] header so
//! the native side can read the tag and follow `next` without knowing the
//! concrete layout.

use core::ffi::{c_char, c_void};
use core::marker::PhantomData;
use core::mem::offset_of;
use core::ptr;

use static_assertions::const_assert_eq;

use crate::enums::{BackendType, Flags, NativeFeature, SType};

/// Header shared by every extension struct.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChainedStruct {
    pub next: *const ChainedStruct,
    pub s_type: SType,
}

impl ChainedStruct {
    /// Unlinked header carrying `s_type`.
    pub const fn new(s_type: SType) -> Self {
        Self {
            next: ptr::null(),
            s_type,
        }
    }
}

/// Header for chains the native side writes into (output structs).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChainedStructOut {
    pub next: *mut ChainedStructOut,
    pub s_type: SType,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveDepthClipControl {
    pub chain: ChainedStruct,
    pub unclipped_depth: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleSpirvDescriptor {
    pub chain: ChainedStruct,
    /// Length of `code` in 32-bit words.
    pub code_size: u32,
    pub code: *const u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleWgslDescriptor {
    pub chain: ChainedStruct,
    pub code: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromAndroidNativeWindow {
    pub chain: ChainedStruct,
    pub window: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromCanvasHtmlSelector {
    pub chain: ChainedStruct,
    pub selector: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromMetalLayer {
    pub chain: ChainedStruct,
    pub layer: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromWaylandSurface {
    pub chain: ChainedStruct,
    pub display: *mut c_void,
    pub surface: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromWindowsHwnd {
    pub chain: ChainedStruct,
    pub hinstance: *mut c_void,
    pub hwnd: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromXcbWindow {
    pub chain: ChainedStruct,
    pub connection: *mut c_void,
    pub window: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDescriptorFromXlibWindow {
    pub chain: ChainedStruct,
    pub display: *mut c_void,
    pub window: u32,
}

// ============================================================================
// wgpu-native extras
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DeviceExtras {
    pub chain: ChainedStruct,
    pub native_features: NativeFeature,
    pub label: *const c_char,
    /// Directory for API traces, or null.
    pub trace_path: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AdapterExtras {
    pub chain: ChainedStruct,
    pub backend: BackendType,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RequiredLimitsExtras {
    pub chain: ChainedStruct,
    pub max_push_constant_size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: Flags,
    pub start: u32,
    pub end: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PipelineLayoutExtras {
    pub chain: ChainedStruct,
    pub push_constant_range_count: u32,
    pub push_constant_ranges: *const PushConstantRange,
}

// The native side casts a `*const ChainedStruct` to the concrete layout, which
// is only sound while the header sits at offset zero.
const_assert_eq!(offset_of!(PrimitiveDepthClipControl, chain), 0);
const_assert_eq!(offset_of!(ShaderModuleSpirvDescriptor, chain), 0);
const_assert_eq!(offset_of!(ShaderModuleWgslDescriptor, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromAndroidNativeWindow, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromCanvasHtmlSelector, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromMetalLayer, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromWaylandSurface, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromWindowsHwnd, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromXcbWindow, chain), 0);
const_assert_eq!(offset_of!(SurfaceDescriptorFromXlibWindow, chain), 0);
const_assert_eq!(offset_of!(DeviceExtras, chain), 0);
const_assert_eq!(offset_of!(AdapterExtras, chain), 0);
const_assert_eq!(offset_of!(RequiredLimitsExtras, chain), 0);
const_assert_eq!(offset_of!(PipelineLayoutExtras, chain), 0);

/// Iterator over the headers of a raw chain.
///
/// Created with [`iter_chain`].
pub struct ChainIter<'a> {
    cursor: *const ChainedStruct,
    _marker: PhantomData<&'a ChainedStruct>,
}

/// Walk a chain starting at `head` (which may be null).
///
/// # Safety
///
/// Every node reachable from `head` must be a valid `ChainedStruct` header
/// that stays alive and unmodified for `'a`.
pub unsafe fn iter_chain<'a>(head: *const ChainedStruct) -> ChainIter<'a> {
    ChainIter {
        cursor: head,
        _marker: PhantomData,
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a ChainedStruct;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: upheld by the caller of `iter_chain`.
        let node = unsafe { self.cursor.as_ref()? };
        self.cursor = node.next;
        Some(node)
    }
}
