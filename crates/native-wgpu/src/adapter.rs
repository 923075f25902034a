//! Physical adapters and device requests.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys::{self as sys, NativeApi};
use parking_lot::Mutex;

use crate::callback;
use crate::chain::ChainBuilder;
use crate::device::Device;
use crate::error::{GpuError, ResourceKind};
use crate::handle::{Guarded, HandleState};
use crate::instance::Instance;
use crate::marshal::{Arena, message_to_string};
use crate::types::{AdapterInfo, FeatureName, Limits, NativeFeature};

/// Describes the device requested from an [`Adapter`].
#[derive(Debug, Clone, Copy)]
pub struct DeviceDescriptor<'a> {
    pub label: Option<&'a str>,
    pub required_features: &'a [FeatureName],
    pub required_limits: Option<Limits>,
    /// Features outside the WebGPU set.
    pub native_features: NativeFeature,
    /// Directory for API call traces.
    pub trace_path: Option<&'a str>,
    /// Needs [`NativeFeature::PUSH_CONSTANTS`].
    pub max_push_constant_size: Option<u32>,
}

impl Default for DeviceDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            required_features: &[],
            required_limits: None,
            native_features: NativeFeature::NONE,
            trace_path: None,
            max_push_constant_size: None,
        }
    }
}

struct AdapterShared {
    handle: Guarded<sys::AdapterImpl>,
    instance: Instance,
}

/// A physical device.
#[derive(Clone)]
pub struct Adapter {
    shared: Arc<AdapterShared>,
}

impl Adapter {
    pub(crate) fn from_raw(instance: Instance, raw: sys::Adapter) -> Result<Self, GpuError> {
        Ok(Self {
            shared: Arc::new(AdapterShared {
                handle: Guarded::new(instance.api().clone(), raw)?,
                instance,
            }),
        })
    }

    fn api(&self) -> &Arc<dyn NativeApi> {
        self.shared.handle.api()
    }

    pub(crate) fn raw(&self) -> Result<sys::Adapter, GpuError> {
        self.shared.handle.raw()
    }

    pub fn properties(&self) -> Result<AdapterInfo, GpuError> {
        let adapter = self.raw()?;
        let mut properties = sys::AdapterProperties {
            next_in_chain: ptr::null_mut(),
            vendor_id: 0,
            device_id: 0,
            name: ptr::null(),
            driver_description: ptr::null(),
            adapter_type: Default::default(),
            backend_type: Default::default(),
        };
        unsafe { self.api().adapter_get_properties(adapter, &mut properties) };
        Ok(AdapterInfo {
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
            name: unsafe { message_to_string(properties.name) },
            driver_description: unsafe { message_to_string(properties.driver_description) },
            adapter_type: properties.adapter_type,
            backend: properties.backend_type,
        })
    }

    pub fn limits(&self) -> Result<Limits, GpuError> {
        let adapter = self.raw()?;
        let mut supported = sys::SupportedLimits {
            next_in_chain: ptr::null_mut(),
            limits: Limits::UNDEFINED,
        };
        if !unsafe { self.api().adapter_get_limits(adapter, &mut supported) } {
            return Err(GpuError::RequestFailed {
                kind: ResourceKind::Adapter,
                status: "Unavailable".to_string(),
                message: "adapter limits are not available".to_string(),
            });
        }
        Ok(supported.limits)
    }

    pub fn has_feature(&self, feature: FeatureName) -> Result<bool, GpuError> {
        let adapter = self.raw()?;
        Ok(unsafe { self.api().adapter_has_feature(adapter, feature) })
    }

    /// Every feature the adapter supports.
    pub fn features(&self) -> Result<Vec<FeatureName>, GpuError> {
        let adapter = self.raw()?;
        let count = unsafe { self.api().adapter_enumerate_features(adapter, ptr::null_mut()) };
        let mut features = vec![FeatureName::UNDEFINED; count];
        let written = unsafe { self.api().adapter_enumerate_features(adapter, features.as_mut_ptr()) };
        features.truncate(written.min(count));
        Ok(features)
    }

    /// Ask for a device. `callback` may run before this returns or during a
    /// later event poll.
    pub fn request_device<F>(&self, descriptor: &DeviceDescriptor, callback: F) -> Result<(), GpuError>
    where
        F: FnOnce(Result<Device, GpuError>) + Send + 'static,
    {
        let adapter = self.raw()?;
        let mut arena = Arena::new();

        let mut chain = ChainBuilder::new();
        if descriptor.native_features != NativeFeature::NONE || descriptor.trace_path.is_some() {
            chain.add_device_extras(descriptor.native_features, descriptor.label, descriptor.trace_path)?;
        }

        let required_limits = if descriptor.required_limits.is_some() || descriptor.max_push_constant_size.is_some() {
            let mut limits_chain = ChainBuilder::new();
            if let Some(size) = descriptor.max_push_constant_size {
                limits_chain.add_required_limits_extras(size);
            }
            let next_in_chain = arena.chain(limits_chain);
            arena.boxed(sys::RequiredLimits {
                next_in_chain,
                limits: descriptor.required_limits.unwrap_or(Limits::UNDEFINED),
            })
        } else {
            ptr::null()
        };

        let (required_features, feature_count) = arena.slice(descriptor.required_features);
        let label = arena.label(descriptor.label)?;
        let native = sys::DeviceDescriptor {
            next_in_chain: arena.chain(chain),
            label,
            required_features_count: feature_count as u32,
            required_features,
            required_limits,
            default_queue: sys::QueueDescriptor {
                next_in_chain: ptr::null(),
                label: ptr::null(),
            },
        };

        let api = self.api().clone();
        let device_label = descriptor.label.map(str::to_owned);
        let (trampoline, userdata) = callback::request_device(move |status, raw, message| {
            let result = if status == sys::RequestDeviceStatus::SUCCESS {
                Device::from_raw(api, raw, device_label)
            } else {
                tracing::warn!(?status, %message, "Device request failed");
                Err(GpuError::RequestFailed {
                    kind: ResourceKind::Device,
                    status: format!("{:?}", status),
                    message,
                })
            };
            callback(result);
        });
        unsafe {
            self.api()
                .adapter_request_device(adapter, &native, trampoline, userdata)
        };
        Ok(())
    }

    /// [`request_device`](Self::request_device), driving instance events
    /// until the answer arrives.
    pub fn request_device_sync(&self, descriptor: &DeviceDescriptor) -> Result<Device, GpuError> {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        self.request_device(descriptor, move |result| {
            *sink.lock() = Some(result);
        })?;
        if slot.lock().is_none() {
            self.shared.instance.process_events()?;
        }
        let result = slot.lock().take();
        result.unwrap_or_else(|| {
            Err(GpuError::RequestFailed {
                kind: ResourceKind::Device,
                status: "Pending".to_string(),
                message: "device request did not complete".to_string(),
            })
        })
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for Adapter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Adapter {}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").field("handle", &self.shared.handle).finish()
    }
}
