//! Presentation surfaces.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use native_wgpu_sys as sys;

use crate::adapter::Adapter;
use crate::chain::ChainBuilder;
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::instance::Instance;
use crate::marshal::Arena;
use crate::types::TextureFormat;

/// A platform window handle to present into.
///
/// The pointers are passed through untouched. They must stay valid for as
/// long as the surface exists.
#[derive(Debug, Clone, Copy)]
pub enum SurfaceSource<'a> {
    AndroidNativeWindow { window: *mut c_void },
    CanvasHtmlSelector(&'a str),
    MetalLayer { layer: *mut c_void },
    WaylandSurface { display: *mut c_void, surface: *mut c_void },
    WindowsHwnd { hinstance: *mut c_void, hwnd: *mut c_void },
    XcbWindow { connection: *mut c_void, window: u32 },
    XlibWindow { display: *mut c_void, window: u32 },
}

impl SurfaceSource<'_> {
    fn to_chain(self) -> Result<ChainBuilder, GpuError> {
        let mut chain = ChainBuilder::new();
        match self {
            Self::AndroidNativeWindow { window } => {
                chain.add_android_native_window(window);
            }
            Self::CanvasHtmlSelector(selector) => {
                chain.add_canvas_html_selector(selector)?;
            }
            Self::MetalLayer { layer } => {
                chain.add_metal_layer(layer);
            }
            Self::WaylandSurface { display, surface } => {
                chain.add_wayland_surface(display, surface);
            }
            Self::WindowsHwnd { hinstance, hwnd } => {
                chain.add_windows_hwnd(hinstance, hwnd);
            }
            Self::XcbWindow { connection, window } => {
                chain.add_xcb_window(connection, window);
            }
            Self::XlibWindow { display, window } => {
                chain.add_xlib_window(display, window);
            }
        }
        Ok(chain)
    }
}

struct SurfaceShared {
    handle: Guarded<sys::SurfaceImpl>,
    /// Outlives `handle`; the native side may read it until the surface is
    /// released.
    chain: ChainBuilder,
    label: Option<String>,
    _instance: Instance,
}

#[derive(Clone)]
pub struct Surface {
    shared: Arc<SurfaceShared>,
}

impl Surface {
    /// # Safety
    ///
    /// The platform handles in `source` must be valid for the surface's
    /// lifetime.
    pub(crate) unsafe fn create(instance: &Instance, source: SurfaceSource, label: Option<&str>) -> Result<Self, GpuError> {
        let raw_instance = instance.raw()?;
        let chain = source.to_chain()?;
        let mut arena = Arena::new();
        let native = sys::SurfaceDescriptor {
            next_in_chain: chain.as_ptr(),
            label: arena.label(label)?,
        };
        let raw = unsafe { instance.api().instance_create_surface(raw_instance, &native) };
        let handle = Guarded::new(instance.api().clone(), raw)?;
        tracing::debug!(label = ?label, chain = ?chain.tags(), "Surface created");

        Ok(Self {
            shared: Arc::new(SurfaceShared {
                handle,
                chain,
                label: label.map(str::to_owned),
                _instance: instance.clone(),
            }),
        })
    }

    pub(crate) fn raw(&self) -> Result<sys::Surface, GpuError> {
        self.shared.handle.raw()
    }

    /// The texture format this surface presents best with on `adapter`.
    pub fn preferred_format(&self, adapter: &Adapter) -> Result<TextureFormat, GpuError> {
        let surface = self.shared.handle.raw()?;
        let adapter = adapter.raw()?;
        Ok(unsafe {
            self.shared
                .handle
                .api()
                .surface_get_preferred_format(surface, adapter)
        })
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    /// Number of extension structs kept alive for this surface.
    pub fn chain_len(&self) -> usize {
        self.shared.chain.len()
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Surface {}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("label", &self.shared.label)
            .field("handle", &self.shared.handle)
            .field("chain", &self.shared.chain)
            .finish()
    }
}
