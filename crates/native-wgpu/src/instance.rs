//! Library entry point.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys::{self as sys, NativeApi};
use parking_lot::Mutex;

use crate::adapter::Adapter;
use crate::callback;
use crate::chain::ChainBuilder;
use crate::config::Config;
use crate::error::{GpuError, ResourceKind};
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::surface::{Surface, SurfaceSource};
use crate::types::{BackendType, PowerPreference};

/// Options for [`Instance::request_adapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAdapterOptions<'a> {
    pub compatible_surface: Option<&'a Surface>,
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
    /// Overrides [`Config::backend`] for this request.
    pub backend: Option<BackendType>,
}

struct InstanceShared {
    handle: Guarded<sys::InstanceImpl>,
    config: Config,
}

/// Entry point of the library: creates surfaces and finds adapters.
#[derive(Clone)]
pub struct Instance {
    shared: Arc<InstanceShared>,
}

impl Instance {
    /// Apply `config` to the native library and create an instance.
    pub fn new(api: Arc<dyn NativeApi>, config: &Config) -> Result<Self, GpuError> {
        if config.forward_native_logs {
            unsafe { api.set_log_callback(Some(callback::forward_native_log), ptr::null_mut()) };
        }
        unsafe { api.set_log_level(config.native_log_level) };

        let descriptor = sys::InstanceDescriptor {
            next_in_chain: ptr::null(),
        };
        let raw = unsafe { api.create_instance(&descriptor) };
        let handle = Guarded::new(api, raw)?;
        tracing::info!(log_level = ?config.native_log_level, backend = ?config.backend, "Native instance created");

        Ok(Self {
            shared: Arc::new(InstanceShared {
                handle,
                config: config.clone(),
            }),
        })
    }

    /// Create an instance backed by the linked `wgpu_native` library.
    #[cfg(feature = "link")]
    pub fn linked(config: &Config) -> Result<Self, GpuError> {
        Self::new(Arc::new(sys::LinkedNative), config)
    }

    pub(crate) fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    pub(crate) fn raw(&self) -> Result<sys::Instance, GpuError> {
        self.shared.handle.raw()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    /// Create a surface for a platform window.
    ///
    /// # Safety
    ///
    /// The handles in `source` must be valid and outlive the surface.
    pub unsafe fn create_surface(&self, source: SurfaceSource, label: Option<&str>) -> Result<Surface, GpuError> {
        unsafe { Surface::create(self, source, label) }
    }

    /// Ask for an adapter. `callback` may run before this returns or during a
    /// later [`process_events`](Self::process_events).
    pub fn request_adapter<F>(&self, options: &RequestAdapterOptions, callback: F) -> Result<(), GpuError>
    where
        F: FnOnce(Result<Adapter, GpuError>) + Send + 'static,
    {
        let instance = self.raw()?;
        let compatible_surface = match options.compatible_surface {
            Some(surface) => surface.raw()?,
            None => ptr::null_mut(),
        };

        let mut chain = ChainBuilder::new();
        if let Some(backend) = options.backend.or(self.shared.config.backend) {
            chain.add_adapter_extras(backend);
        }

        let mut arena = Arena::new();
        let native = sys::RequestAdapterOptions {
            next_in_chain: arena.chain(chain),
            compatible_surface,
            power_preference: options.power_preference,
            force_fallback_adapter: options.force_fallback_adapter,
        };

        let owner = self.clone();
        let (trampoline, userdata) = callback::request_adapter(move |status, raw, message| {
            let result = if status == sys::RequestAdapterStatus::SUCCESS {
                Adapter::from_raw(owner, raw)
            } else {
                tracing::warn!(?status, %message, "Adapter request failed");
                Err(GpuError::RequestFailed {
                    kind: ResourceKind::Adapter,
                    status: format!("{:?}", status),
                    message,
                })
            };
            callback(result);
        });
        unsafe {
            self.api()
                .instance_request_adapter(instance, &native, trampoline, userdata)
        };
        Ok(())
    }

    /// [`request_adapter`](Self::request_adapter), driving events until the
    /// answer arrives.
    pub fn request_adapter_sync(&self, options: &RequestAdapterOptions) -> Result<Adapter, GpuError> {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        self.request_adapter(options, move |result| {
            *sink.lock() = Some(result);
        })?;
        if slot.lock().is_none() {
            self.process_events()?;
        }
        let result = slot.lock().take();
        result.unwrap_or_else(|| {
            Err(GpuError::RequestFailed {
                kind: ResourceKind::Adapter,
                status: "Pending".to_string(),
                message: "adapter request did not complete".to_string(),
            })
        })
    }

    /// Run callbacks the native side has queued.
    pub fn process_events(&self) -> Result<(), GpuError> {
        let instance = self.raw()?;
        unsafe { self.api().instance_process_events(instance) };
        Ok(())
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("handle", &self.shared.handle)
            .field("config", &self.shared.config)
            .finish()
    }
}
