//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use native_wgpu::sys::NativeApi;
use native_wgpu::{
    Adapter, Config, Device, DeviceDescriptor, Extent3d, FeatureName, Instance, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages,
};
use native_wgpu_test_utils::{MockNative, NativeCall};

pub struct Fixture {
    pub mock: Arc<MockNative>,
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
}

pub fn instance_with(config: &Config) -> (Arc<MockNative>, Instance) {
    let mock = Arc::new(MockNative::new());
    let api: Arc<dyn NativeApi> = mock.clone();
    let instance = Instance::new(api, config).expect("instance");
    (mock, instance)
}

pub fn fixture() -> Fixture {
    let (mock, instance) = instance_with(&Config::default());
    let adapter = instance.request_adapter_sync(&Default::default()).expect("adapter");
    let device = adapter
        .request_device_sync(&DeviceDescriptor {
            label: Some("device"),
            ..Default::default()
        })
        .expect("device");
    Fixture {
        mock,
        instance,
        adapter,
        device,
    }
}

/// The mock address of the device handle.
pub fn device_addr(mock: &MockNative, device: &Device) -> usize {
    device.has_feature(FeatureName::DEPTH_CLIP_CONTROL).expect("live device");
    mock.calls()
        .into_iter()
        .rev()
        .find_map(|call| match call {
            NativeCall::Command {
                name: "device_has_feature",
                target,
            } => Some(target),
            _ => None,
        })
        .expect("device_has_feature was recorded")
}

pub fn texture_descriptor(label: Option<&str>) -> TextureDescriptor<'_> {
    TextureDescriptor {
        label,
        size: Extent3d {
            width: 256,
            height: 256,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::RGBA8_UNORM,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::RENDER_ATTACHMENT,
    }
}
